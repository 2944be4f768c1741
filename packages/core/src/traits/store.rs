//! Storage traits over the relational+vector store (§6 "Store contract").
//!
//! Split into focused traits per entity, the way this codebase's prior
//! storage layer split `PageCache`/`SummaryCache`/`EmbeddingStore`. A
//! concrete store (e.g. [`crate::stores::postgres::PostgresStore`]) or the
//! in-memory [`crate::stores::memory::MemoryStore`] implements all of them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Component, Document, ExtractedAction, QuerySource, Site, UserQuery};

/// CRUD over sites.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>>;
    async fn get_site_by_code(&self, site_code: &str) -> Result<Option<Site>>;
    async fn upsert_site(&self, site: &Site) -> Result<()>;
    async fn list_sites(&self) -> Result<Vec<Site>>;
}

/// CRUD and spec search over components.
#[async_trait]
pub trait ComponentStore: Send + Sync {
    async fn get_component(&self, id: Uuid) -> Result<Option<Component>>;
    async fn get_component_by_external_id(&self, site_id: Uuid, external_id: &str) -> Result<Option<Component>>;
    async fn upsert_component(&self, component: &Component) -> Result<()>;
    async fn list_components(&self, site_id: Uuid) -> Result<Vec<Component>>;

    /// Equality probe over structured specification fields (§4.F op 3).
    async fn search_components_by_spec(
        &self,
        site_id: Uuid,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<Component>>;
}

/// A fulltext or semantic retrieval hit over documents, before excerpt
/// windowing (§4.F).
#[derive(Debug, Clone)]
pub struct DocumentHit {
    pub document: Document,
    /// Cosine distance for semantic hits, a store-native rank for
    /// fulltext hits (lower is better in both cases by convention here).
    pub rank: f32,
}

/// CRUD and search over documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>>;
    async fn get_document_by_content_hash(&self, site_id: Uuid, content_hash: &str) -> Result<Option<Document>>;
    async fn upsert_document(&self, document: &Document) -> Result<()>;
    async fn delete_document(&self, id: Uuid) -> Result<()>;
    async fn list_documents(&self, site_id: Uuid) -> Result<Vec<Document>>;

    /// Lexical match against titles and processed text, ranked by the
    /// store's native text-ranking; stable tie-break by created_at
    /// descending (§4.F op 1).
    async fn search_fulltext(&self, site_id: Uuid, query: &str, limit: usize) -> Result<Vec<DocumentHit>>;

    /// Nearest neighbors by cosine distance, already filtered to entries
    /// with distance < threshold and tie-broken by distance then
    /// created_at (§4.F op 2).
    async fn search_semantic(
        &self,
        site_id: Uuid,
        vector: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<DocumentHit>>;
}

/// CRUD over extracted actions.
#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn insert_action(&self, action: &ExtractedAction) -> Result<()>;
    async fn get_action(&self, id: Uuid) -> Result<Option<ExtractedAction>>;
    async fn list_actions_for_document(&self, document_id: Uuid) -> Result<Vec<ExtractedAction>>;
    async fn list_actions_for_component(&self, component_id: Uuid) -> Result<Vec<ExtractedAction>>;
    async fn list_actions_for_work_order(&self, site_id: Uuid, work_order_number: &str) -> Result<Vec<ExtractedAction>>;

    /// Up to `limit` most recent actions of the given kind for a site,
    /// used by the Retriever to surface maintenance-history sources when
    /// the query intent carries component filters (§4.F).
    async fn list_recent_actions_by_kind(
        &self,
        site_id: Uuid,
        kind: crate::types::ActionKind,
        limit: usize,
    ) -> Result<Vec<ExtractedAction>>;
}

/// CRUD over queries and their source attributions.
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn insert_query(&self, query: &UserQuery) -> Result<()>;
    async fn get_query(&self, id: Uuid) -> Result<Option<UserQuery>>;
    async fn list_queries_for_user(&self, user_id: &str) -> Result<Vec<UserQuery>>;
    async fn insert_query_source(&self, source: &QuerySource) -> Result<()>;
    async fn list_sources_for_query(&self, query_id: Uuid) -> Result<Vec<QuerySource>>;
}

/// Composite storage trait combining every entity store. Anything
/// implementing the five focused traits is automatically a `Store`.
pub trait Store: SiteStore + ComponentStore + DocumentStore + ActionStore + QueryStore {}

impl<T: SiteStore + ComponentStore + DocumentStore + ActionStore + QueryStore> Store for T {}

/// Cosine similarity between two equal-length vectors; 0.0 for
/// mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance (1 - similarity), the quantity the semantic search
/// threshold τ in §4.F is compared against.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn cosine_similarity_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
    }

    #[test]
    fn cosine_distance_is_complement_of_similarity() {
        let a = vec![1.0, 0.0];
        assert!((cosine_distance(&a, &a)).abs() < 0.001);
    }
}

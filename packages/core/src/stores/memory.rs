//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::{ActionStore, ComponentStore, DocumentHit, DocumentStore, QueryStore, SiteStore};
use crate::types::{ActionKind, Component, Document, ExtractedAction, QuerySource, Site, UserQuery};

/// In-memory storage for the full entity set. Not suitable for
/// production — data is lost on restart, and searches are linear scans —
/// but exercises every trait a real store must satisfy.
#[derive(Default)]
pub struct MemoryStore {
    sites: RwLock<HashMap<Uuid, Site>>,
    components: RwLock<HashMap<Uuid, Component>>,
    documents: RwLock<HashMap<Uuid, Document>>,
    actions: RwLock<HashMap<Uuid, ExtractedAction>>,
    queries: RwLock<HashMap<Uuid, UserQuery>>,
    query_sources: RwLock<HashMap<Uuid, QuerySource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>> {
        Ok(self.sites.read().unwrap().get(&id).cloned())
    }

    async fn get_site_by_code(&self, site_code: &str) -> Result<Option<Site>> {
        Ok(self.sites.read().unwrap().values().find(|s| s.site_code == site_code).cloned())
    }

    async fn upsert_site(&self, site: &Site) -> Result<()> {
        self.sites.write().unwrap().insert(site.id, site.clone());
        Ok(())
    }

    async fn list_sites(&self) -> Result<Vec<Site>> {
        Ok(self.sites.read().unwrap().values().cloned().collect())
    }
}

#[async_trait]
impl ComponentStore for MemoryStore {
    async fn get_component(&self, id: Uuid) -> Result<Option<Component>> {
        Ok(self.components.read().unwrap().get(&id).cloned())
    }

    async fn get_component_by_external_id(&self, site_id: Uuid, external_id: &str) -> Result<Option<Component>> {
        Ok(self
            .components
            .read()
            .unwrap()
            .values()
            .find(|c| c.site_id == site_id && c.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn upsert_component(&self, component: &Component) -> Result<()> {
        self.components.write().unwrap().insert(component.id, component.clone());
        Ok(())
    }

    async fn list_components(&self, site_id: Uuid) -> Result<Vec<Component>> {
        Ok(self.components.read().unwrap().values().filter(|c| c.site_id == site_id).cloned().collect())
    }

    async fn search_components_by_spec(
        &self,
        site_id: Uuid,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<Vec<Component>> {
        Ok(self
            .components
            .read()
            .unwrap()
            .values()
            .filter(|c| c.site_id == site_id && c.matches_spec(key, value))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.documents.read().unwrap().get(&id).cloned())
    }

    async fn get_document_by_content_hash(&self, site_id: Uuid, content_hash: &str) -> Result<Option<Document>> {
        Ok(self
            .documents
            .read()
            .unwrap()
            .values()
            .find(|d| d.site_id == site_id && d.content_hash == content_hash)
            .cloned())
    }

    async fn upsert_document(&self, document: &Document) -> Result<()> {
        self.documents.write().unwrap().insert(document.id, document.clone());
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.documents.write().unwrap().remove(&id);
        Ok(())
    }

    async fn list_documents(&self, site_id: Uuid) -> Result<Vec<Document>> {
        Ok(self.documents.read().unwrap().values().filter(|d| d.site_id == site_id).cloned().collect())
    }

    async fn search_fulltext(&self, site_id: Uuid, query: &str, limit: usize) -> Result<Vec<DocumentHit>> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();

        let documents = self.documents.read().unwrap();
        let mut hits: Vec<(Document, f32)> = documents
            .values()
            .filter(|d| d.site_id == site_id)
            .filter_map(|d| {
                let haystack = format!("{} {}", d.title.to_lowercase(), d.processed_text.to_lowercase());
                let score: f32 = terms.iter().map(|t| haystack.matches(t).count() as f32).sum();
                (score > 0.0).then(|| (d.clone(), score))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.document_date.cmp(&a.0.document_date))
        });
        hits.truncate(limit);

        Ok(hits.into_iter().map(|(document, score)| DocumentHit { document, rank: 1.0 / (1.0 + score) }).collect())
    }

    async fn search_semantic(
        &self,
        site_id: Uuid,
        vector: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<DocumentHit>> {
        let documents = self.documents.read().unwrap();
        let mut hits: Vec<DocumentHit> = documents
            .values()
            .filter(|d| d.site_id == site_id)
            .filter_map(|d| {
                let embedding = d.embedding.as_ref()?;
                let distance = crate::traits::cosine_distance(vector, embedding);
                (distance < threshold).then(|| DocumentHit { document: d.clone(), rank: distance })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.rank
                .partial_cmp(&b.rank)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.document.document_date.cmp(&a.document.document_date))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl ActionStore for MemoryStore {
    async fn insert_action(&self, action: &ExtractedAction) -> Result<()> {
        if self.actions.read().unwrap().contains_key(&action.id) {
            return Err(StoreError::Constraint(format!("action {} already exists", action.id)).into());
        }
        self.actions.write().unwrap().insert(action.id, action.clone());
        Ok(())
    }

    async fn get_action(&self, id: Uuid) -> Result<Option<ExtractedAction>> {
        Ok(self.actions.read().unwrap().get(&id).cloned())
    }

    async fn list_actions_for_document(&self, document_id: Uuid) -> Result<Vec<ExtractedAction>> {
        Ok(self.actions.read().unwrap().values().filter(|a| a.document_id == document_id).cloned().collect())
    }

    async fn list_actions_for_component(&self, component_id: Uuid) -> Result<Vec<ExtractedAction>> {
        Ok(self
            .actions
            .read()
            .unwrap()
            .values()
            .filter(|a| a.primary_component_id == Some(component_id))
            .cloned()
            .collect())
    }

    async fn list_actions_for_work_order(&self, site_id: Uuid, work_order_number: &str) -> Result<Vec<ExtractedAction>> {
        Ok(self
            .actions
            .read()
            .unwrap()
            .values()
            .filter(|a| a.site_id == site_id && a.work_order_number.as_deref() == Some(work_order_number))
            .cloned()
            .collect())
    }

    async fn list_recent_actions_by_kind(&self, site_id: Uuid, kind: ActionKind, limit: usize) -> Result<Vec<ExtractedAction>> {
        let mut actions: Vec<ExtractedAction> = self
            .actions
            .read()
            .unwrap()
            .values()
            .filter(|a| a.site_id == site_id && a.kind == kind)
            .cloned()
            .collect();
        actions.sort_by(|a, b| b.action_date.cmp(&a.action_date));
        actions.truncate(limit);
        Ok(actions)
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn insert_query(&self, query: &UserQuery) -> Result<()> {
        self.queries.write().unwrap().insert(query.id, query.clone());
        Ok(())
    }

    async fn get_query(&self, id: Uuid) -> Result<Option<UserQuery>> {
        Ok(self.queries.read().unwrap().get(&id).cloned())
    }

    async fn list_queries_for_user(&self, user_id: &str) -> Result<Vec<UserQuery>> {
        Ok(self.queries.read().unwrap().values().filter(|q| q.user_id == user_id).cloned().collect())
    }

    async fn insert_query_source(&self, source: &QuerySource) -> Result<()> {
        self.query_sources.write().unwrap().insert(source.id, source.clone());
        Ok(())
    }

    async fn list_sources_for_query(&self, query_id: Uuid) -> Result<Vec<QuerySource>> {
        Ok(self.query_sources.read().unwrap().values().filter(|s| s.query_id == query_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentKind, DocumentKind};

    #[tokio::test]
    async fn site_crud_roundtrips() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();
        assert_eq!(store.get_site(site.id).await.unwrap().unwrap().site_code, "CA-1");
        assert_eq!(store.get_site_by_code("CA-1").await.unwrap().unwrap().id, site.id);
    }

    #[tokio::test]
    async fn search_fulltext_ranks_by_term_frequency() {
        let store = MemoryStore::new();
        let site_id = Uuid::now_v7();
        let mut d1 = Document::new(site_id, DocumentKind::Email, "a.txt", "h1", 1, "text/plain");
        d1.processed_text = "inverter inverter inverter replaced".to_string();
        let mut d2 = Document::new(site_id, DocumentKind::Email, "b.txt", "h2", 1, "text/plain");
        d2.processed_text = "inverter replaced".to_string();
        store.upsert_document(&d1).await.unwrap();
        store.upsert_document(&d2).await.unwrap();

        let hits = store.search_fulltext(site_id, "inverter", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document.id, d1.id);
    }

    #[tokio::test]
    async fn search_components_by_spec_filters_by_exact_equality() {
        let store = MemoryStore::new();
        let site_id = Uuid::now_v7();
        let component = Component::new(site_id, ComponentKind::Inverter, "INV-31")
            .with_specification("phase", serde_json::json!("three"));
        store.upsert_component(&component).await.unwrap();

        let hits = store.search_components_by_spec(site_id, "phase", &serde_json::json!("three")).await.unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store.search_components_by_spec(site_id, "phase", &serde_json::json!("single")).await.unwrap();
        assert!(misses.is_empty());
    }
}

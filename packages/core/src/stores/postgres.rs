//! PostgreSQL storage implementation.
//!
//! A production-ready storage backend. Good for multi-server deployments
//! and high-volume workloads.
//!
//! - **pgvector**: native vector search when the extension is installed;
//!   falls back to BYTEA + application-side cosine distance otherwise.
//! - **HNSW**: used over IVFFLAT when pgvector ≥ 0.5.0.
//! - **Versioned migrations**: idempotent `CREATE TABLE IF NOT EXISTS` /
//!   `CREATE INDEX IF NOT EXISTS`, safe to run on every startup.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::{ActionStore, ComponentStore, DocumentHit, DocumentStore, QueryStore, SiteStore};
use crate::types::{
    ActionKind, Component, ComponentKind, ComponentStatus, Document, DocumentKind,
    ExtractedAction, ProcessingState, QuerySource, ResponseType, Site, UserQuery,
};

const EMBEDDING_DIMENSION: usize = 1536;

fn backend_err(e: sqlx::Error) -> crate::error::CoreError {
    StoreError::Backend(Box::new(e)).into()
}

/// PostgreSQL-backed implementation of every entity store trait.
pub struct PostgresStore {
    pool: PgPool,
    has_pgvector: bool,
    has_hnsw: bool,
}

impl PostgresStore {
    /// Connect and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend_err)?;
        Self::from_pool(pool).await
    }

    /// Build from an existing pool (e.g. one shared with the HTTP layer).
    pub async fn from_pool(pool: PgPool) -> Result<Self> {
        let mut store = Self { pool, has_pgvector: false, has_hnsw: false };
        store.detect_capabilities().await?;
        store.run_migrations().await?;
        Ok(store)
    }

    #[instrument(skip(self))]
    async fn detect_capabilities(&mut self) -> Result<()> {
        let pgvector: Option<(String,)> =
            sqlx::query_as("SELECT extname FROM pg_extension WHERE extname = 'vector'")
                .fetch_optional(&self.pool)
                .await
                .map_err(backend_err)?;
        self.has_pgvector = pgvector.is_some();

        if self.has_pgvector {
            let version: Option<(String,)> =
                sqlx::query_as("SELECT extversion FROM pg_extension WHERE extname = 'vector'")
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(backend_err)?;
            if let Some((ver,)) = version {
                self.has_hnsw = ver.as_str() >= "0.5.0";
            }
        }
        info!(has_pgvector = self.has_pgvector, has_hnsw = self.has_hnsw, "detected store capabilities");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn run_migrations(&mut self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                id UUID PRIMARY KEY,
                site_code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                capacity DOUBLE PRECISION,
                inverter_count INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS components (
                id UUID PRIMARY KEY,
                site_id UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                external_id TEXT,
                specifications JSONB NOT NULL DEFAULT '{}',
                status TEXT NOT NULL,
                embedding BYTEA
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_components_site_external \
             ON components(site_id, external_id) WHERE external_id IS NOT NULL",
        )
        .execute(&self.pool)
        .await
        .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                site_id UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                size BIGINT NOT NULL,
                mime TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                raw_text TEXT NOT NULL DEFAULT '',
                processed_text TEXT NOT NULL DEFAULT '',
                embedding BYTEA,
                processing_state TEXT NOT NULL,
                processing_error TEXT,
                processing_started_at TIMESTAMPTZ,
                processing_completed_at TIMESTAMPTZ,
                document_date TIMESTAMPTZ NOT NULL,
                author TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_site_hash ON documents(site_id, content_hash)")
            .execute(&self.pool)
            .await
            .ok();
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_fulltext \
             ON documents USING gin(to_tsvector('english', title || ' ' || processed_text))",
        )
        .execute(&self.pool)
        .await
        .ok();

        if self.has_pgvector {
            sqlx::query(&format!(
                "ALTER TABLE documents ADD COLUMN IF NOT EXISTS embedding_vec vector({EMBEDDING_DIMENSION})"
            ))
            .execute(&self.pool)
            .await
            .ok();

            let index_sql = if self.has_hnsw {
                "CREATE INDEX IF NOT EXISTS idx_documents_embedding_hnsw \
                 ON documents USING hnsw (embedding_vec vector_cosine_ops) WITH (m = 24, ef_construction = 128)"
            } else {
                "CREATE INDEX IF NOT EXISTS idx_documents_embedding_ivfflat \
                 ON documents USING ivfflat (embedding_vec vector_cosine_ops) WITH (lists = 100)"
            };
            sqlx::query(index_sql).execute(&self.pool).await.ok();
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actions (
                id UUID PRIMARY KEY,
                document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
                site_id UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                action_date TIMESTAMPTZ NOT NULL,
                technicians JSONB NOT NULL DEFAULT '[]',
                work_order_number TEXT,
                outcome TEXT,
                primary_component_id UUID,
                measurements JSONB NOT NULL DEFAULT '{}',
                confidence REAL NOT NULL,
                extraction_model TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actions_component ON actions(primary_component_id)")
            .execute(&self.pool)
            .await
            .ok();
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actions_work_order ON actions(site_id, work_order_number)")
            .execute(&self.pool)
            .await
            .ok();
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_actions_site_kind_date ON actions(site_id, kind, action_date DESC)")
            .execute(&self.pool)
            .await
            .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queries (
                id UUID PRIMARY KEY,
                site_id UUID NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL,
                query_text TEXT NOT NULL,
                query_type TEXT NOT NULL,
                answer TEXT NOT NULL,
                confidence REAL NOT NULL,
                extracted_entities JSONB NOT NULL DEFAULT '{}',
                response_type TEXT NOT NULL,
                no_hallucination BOOLEAN NOT NULL,
                processing_time_ms BIGINT NOT NULL,
                query_embedding BYTEA,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_queries_user ON queries(user_id)")
            .execute(&self.pool)
            .await
            .ok();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS query_sources (
                id UUID PRIMARY KEY,
                query_id UUID NOT NULL REFERENCES queries(id) ON DELETE CASCADE,
                document_id UUID NOT NULL,
                relevant_excerpt TEXT NOT NULL,
                relevance_score REAL NOT NULL,
                citation_string TEXT NOT NULL,
                page_number INTEGER,
                section_reference TEXT,
                UNIQUE(query_id, document_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(())
    }
}

/// Render a `#[serde(rename_all = "snake_case")]` enum as its wire string,
/// so it round-trips through `*Kind::coerce` on the way back out.
fn snake<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

fn encode_embedding(embedding: &Option<Vec<f32>>) -> Option<Vec<u8>> {
    embedding.as_ref().map(|v| v.iter().flat_map(|f| f.to_le_bytes()).collect())
}

fn decode_embedding(bytes: &Option<Vec<u8>>) -> Option<Vec<f32>> {
    bytes.as_ref().map(|b| b.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
}

fn site_from_row(row: &sqlx::postgres::PgRow) -> Site {
    Site {
        id: row.get("id"),
        site_code: row.get("site_code"),
        name: row.get("name"),
        capacity: row.get("capacity"),
        inverter_count: row.get::<Option<i32>, _>("inverter_count").map(|v| v as u32),
    }
}

fn component_from_row(row: &sqlx::postgres::PgRow) -> Component {
    Component {
        id: row.get("id"),
        site_id: row.get("site_id"),
        kind: ComponentKind::coerce(row.get::<String, _>("kind").as_str()),
        name: row.get("name"),
        external_id: row.get("external_id"),
        specifications: serde_json::from_value(row.get("specifications")).unwrap_or_default(),
        status: match row.get::<String, _>("status").as_str() {
            "fault" => ComponentStatus::Fault,
            "maintenance" => ComponentStatus::Maintenance,
            "offline" => ComponentStatus::Offline,
            _ => ComponentStatus::Operational,
        },
        embedding: decode_embedding(&row.get("embedding")),
    }
}

fn document_from_row(row: &sqlx::postgres::PgRow) -> Document {
    Document {
        id: row.get("id"),
        site_id: row.get("site_id"),
        kind: DocumentKind::coerce(row.get::<String, _>("kind").as_str()),
        title: row.get("title"),
        original_filename: row.get("original_filename"),
        size: row.get::<i64, _>("size") as usize,
        mime: row.get("mime"),
        content_hash: row.get("content_hash"),
        raw_text: row.get("raw_text"),
        processed_text: row.get("processed_text"),
        embedding: decode_embedding(&row.get("embedding")),
        processing_state: match row.get::<String, _>("processing_state").as_str() {
            "processing" => ProcessingState::Processing,
            "completed" => ProcessingState::Completed,
            "failed" => ProcessingState::Failed,
            _ => ProcessingState::Pending,
        },
        processing_error: row.get("processing_error"),
        processing_started_at: row.get("processing_started_at"),
        processing_completed_at: row.get("processing_completed_at"),
        document_date: row.get("document_date"),
        author: row.get("author"),
    }
}

fn action_from_row(row: &sqlx::postgres::PgRow) -> ExtractedAction {
    ExtractedAction {
        id: row.get("id"),
        document_id: row.get("document_id"),
        site_id: row.get("site_id"),
        kind: ActionKind::coerce(row.get::<String, _>("kind").as_str()),
        title: row.get("title"),
        description: row.get("description"),
        action_date: row.get("action_date"),
        technicians: serde_json::from_value(row.get("technicians")).unwrap_or_default(),
        work_order_number: row.get("work_order_number"),
        outcome: row.get("outcome"),
        primary_component_id: row.get("primary_component_id"),
        measurements: serde_json::from_value(row.get("measurements")).unwrap_or_default(),
        confidence: row.get("confidence"),
        extraction_model: row.get("extraction_model"),
    }
}

fn query_from_row(row: &sqlx::postgres::PgRow) -> UserQuery {
    UserQuery {
        id: row.get("id"),
        site_id: row.get("site_id"),
        user_id: row.get("user_id"),
        query_text: row.get("query_text"),
        query_type: row.get("query_type"),
        answer: row.get("answer"),
        confidence: row.get("confidence"),
        extracted_entities: serde_json::from_value(row.get("extracted_entities")).unwrap_or_default(),
        response_type: match row.get::<String, _>("response_type").as_str() {
            "timeline" => ResponseType::Timeline,
            "list" => ResponseType::List,
            "analysis" => ResponseType::Analysis,
            "error" => ResponseType::Error,
            _ => ResponseType::Summary,
        },
        no_hallucination: row.get("no_hallucination"),
        processing_time_ms: row.get::<i64, _>("processing_time_ms") as u64,
        query_embedding: decode_embedding(&row.get("query_embedding")),
        created_at: row.get("created_at"),
    }
}

fn query_source_from_row(row: &sqlx::postgres::PgRow) -> QuerySource {
    QuerySource {
        id: row.get("id"),
        query_id: row.get("query_id"),
        document_id: row.get("document_id"),
        relevant_excerpt: row.get("relevant_excerpt"),
        relevance_score: row.get("relevance_score"),
        citation_string: row.get("citation_string"),
        page_number: row.get::<Option<i32>, _>("page_number").map(|v| v as u32),
        section_reference: row.get("section_reference"),
    }
}

#[async_trait]
impl SiteStore for PostgresStore {
    #[instrument(skip(self))]
    async fn get_site(&self, id: Uuid) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| site_from_row(&r)))
    }

    async fn get_site_by_code(&self, site_code: &str) -> Result<Option<Site>> {
        let row = sqlx::query("SELECT * FROM sites WHERE site_code = $1")
            .bind(site_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| site_from_row(&r)))
    }

    async fn upsert_site(&self, site: &Site) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sites (id, site_code, name, capacity, inverter_count)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                site_code = EXCLUDED.site_code, name = EXCLUDED.name,
                capacity = EXCLUDED.capacity, inverter_count = EXCLUDED.inverter_count
            "#,
        )
        .bind(site.id)
        .bind(&site.site_code)
        .bind(&site.name)
        .bind(site.capacity)
        .bind(site.inverter_count.map(|v| v as i32))
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_sites(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query("SELECT * FROM sites ORDER BY site_code").fetch_all(&self.pool).await.map_err(backend_err)?;
        Ok(rows.iter().map(site_from_row).collect())
    }
}

#[async_trait]
impl ComponentStore for PostgresStore {
    async fn get_component(&self, id: Uuid) -> Result<Option<Component>> {
        let row = sqlx::query("SELECT * FROM components WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| component_from_row(&r)))
    }

    async fn get_component_by_external_id(&self, site_id: Uuid, external_id: &str) -> Result<Option<Component>> {
        let row = sqlx::query("SELECT * FROM components WHERE site_id = $1 AND external_id = $2")
            .bind(site_id)
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| component_from_row(&r)))
    }

    async fn upsert_component(&self, component: &Component) -> Result<()> {
        let status = match component.status {
            ComponentStatus::Operational => "operational",
            ComponentStatus::Fault => "fault",
            ComponentStatus::Maintenance => "maintenance",
            ComponentStatus::Offline => "offline",
        };
        sqlx::query(
            r#"
            INSERT INTO components (id, site_id, kind, name, external_id, specifications, status, embedding)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                kind = EXCLUDED.kind, name = EXCLUDED.name, external_id = EXCLUDED.external_id,
                specifications = EXCLUDED.specifications, status = EXCLUDED.status, embedding = EXCLUDED.embedding
            "#,
        )
        .bind(component.id)
        .bind(component.site_id)
        .bind(snake(&component.kind))
        .bind(&component.name)
        .bind(&component.external_id)
        .bind(serde_json::to_value(&component.specifications).unwrap_or_default())
        .bind(status)
        .bind(encode_embedding(&component.embedding))
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_components(&self, site_id: Uuid) -> Result<Vec<Component>> {
        let rows = sqlx::query("SELECT * FROM components WHERE site_id = $1")
            .bind(site_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(component_from_row).collect())
    }

    async fn search_components_by_spec(&self, site_id: Uuid, key: &str, value: &serde_json::Value) -> Result<Vec<Component>> {
        let rows = sqlx::query("SELECT * FROM components WHERE site_id = $1 AND specifications -> $2 = $3")
            .bind(site_id)
            .bind(key)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(component_from_row).collect())
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| document_from_row(&r)))
    }

    async fn get_document_by_content_hash(&self, site_id: Uuid, content_hash: &str) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE site_id = $1 AND content_hash = $2")
            .bind(site_id)
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.map(|r| document_from_row(&r)))
    }

    #[instrument(skip(self, document), fields(document_id = %document.id))]
    async fn upsert_document(&self, document: &Document) -> Result<()> {
        let state = match document.processing_state {
            ProcessingState::Pending => "pending",
            ProcessingState::Processing => "processing",
            ProcessingState::Completed => "completed",
            ProcessingState::Failed => "failed",
        };
        let mut tx = self.pool.begin().await.map_err(backend_err)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, site_id, kind, title, original_filename, size, mime, content_hash,
                raw_text, processed_text, embedding, processing_state, processing_error,
                processing_started_at, processing_completed_at, document_date, author
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title, raw_text = EXCLUDED.raw_text, processed_text = EXCLUDED.processed_text,
                embedding = EXCLUDED.embedding, processing_state = EXCLUDED.processing_state,
                processing_error = EXCLUDED.processing_error, processing_started_at = EXCLUDED.processing_started_at,
                processing_completed_at = EXCLUDED.processing_completed_at, author = EXCLUDED.author
            "#,
        )
        .bind(document.id)
        .bind(document.site_id)
        .bind(snake(&document.kind))
        .bind(&document.title)
        .bind(&document.original_filename)
        .bind(document.size as i64)
        .bind(&document.mime)
        .bind(&document.content_hash)
        .bind(&document.raw_text)
        .bind(&document.processed_text)
        .bind(encode_embedding(&document.embedding))
        .bind(state)
        .bind(&document.processing_error)
        .bind(document.processing_started_at)
        .bind(document.processing_completed_at)
        .bind(document.document_date)
        .bind(&document.author)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;

        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1").bind(id).execute(&self.pool).await.map_err(backend_err)?;
        Ok(())
    }

    async fn list_documents(&self, site_id: Uuid) -> Result<Vec<Document>> {
        let rows = sqlx::query("SELECT * FROM documents WHERE site_id = $1 ORDER BY document_date DESC")
            .bind(site_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn search_fulltext(&self, site_id: Uuid, query: &str, limit: usize) -> Result<Vec<DocumentHit>> {
        let rows = sqlx::query(
            r#"
            SELECT *, ts_rank(to_tsvector('english', title || ' ' || processed_text), plainto_tsquery('english', $2)) AS rank
            FROM documents
            WHERE site_id = $1 AND to_tsvector('english', title || ' ' || processed_text) @@ plainto_tsquery('english', $2)
            ORDER BY rank DESC, document_date DESC
            LIMIT $3
            "#,
        )
        .bind(site_id)
        .bind(query)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(rows
            .iter()
            .map(|r| DocumentHit { document: document_from_row(r), rank: 1.0 - r.get::<f32, _>("rank").min(1.0) })
            .collect())
    }

    #[instrument(skip(self, vector))]
    async fn search_semantic(&self, site_id: Uuid, vector: &[f32], limit: usize, threshold: f32) -> Result<Vec<DocumentHit>> {
        if self.has_pgvector {
            warn!("pgvector path not wired to a typed bind here; using application-side fallback");
        }

        // Portable fallback: compute cosine distance in application code
        // against the BYTEA-encoded column. A pgvector deployment should
        // swap this for a native `<=>` ORDER BY for index-backed search.
        let rows = sqlx::query("SELECT * FROM documents WHERE site_id = $1 AND embedding IS NOT NULL")
            .bind(site_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;

        let mut hits: Vec<DocumentHit> = rows
            .iter()
            .map(document_from_row)
            .filter_map(|document| {
                let embedding = document.embedding.clone()?;
                let distance = crate::traits::cosine_distance(vector, &embedding);
                (distance < threshold).then_some(DocumentHit { document, rank: distance })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal).then_with(|| b.document.document_date.cmp(&a.document.document_date))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl ActionStore for PostgresStore {
    async fn insert_action(&self, action: &ExtractedAction) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(backend_err)?;
        sqlx::query(
            r#"
            INSERT INTO actions (
                id, document_id, site_id, kind, title, description, action_date, technicians,
                work_order_number, outcome, primary_component_id, measurements, confidence, extraction_model
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
            "#,
        )
        .bind(action.id)
        .bind(action.document_id)
        .bind(action.site_id)
        .bind(snake(&action.kind))
        .bind(&action.title)
        .bind(&action.description)
        .bind(action.action_date)
        .bind(serde_json::to_value(&action.technicians).unwrap_or_default())
        .bind(&action.work_order_number)
        .bind(&action.outcome)
        .bind(action.primary_component_id)
        .bind(serde_json::to_value(&action.measurements).unwrap_or_default())
        .bind(action.confidence)
        .bind(&action.extraction_model)
        .execute(&mut *tx)
        .await
        .map_err(backend_err)?;
        tx.commit().await.map_err(backend_err)?;
        Ok(())
    }

    async fn get_action(&self, id: Uuid) -> Result<Option<ExtractedAction>> {
        let row = sqlx::query("SELECT * FROM actions WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(backend_err)?;
        Ok(row.map(|r| action_from_row(&r)))
    }

    async fn list_actions_for_document(&self, document_id: Uuid) -> Result<Vec<ExtractedAction>> {
        let rows = sqlx::query("SELECT * FROM actions WHERE document_id = $1")
            .bind(document_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(action_from_row).collect())
    }

    async fn list_actions_for_component(&self, component_id: Uuid) -> Result<Vec<ExtractedAction>> {
        let rows = sqlx::query("SELECT * FROM actions WHERE primary_component_id = $1")
            .bind(component_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(action_from_row).collect())
    }

    async fn list_actions_for_work_order(&self, site_id: Uuid, work_order_number: &str) -> Result<Vec<ExtractedAction>> {
        let rows = sqlx::query("SELECT * FROM actions WHERE site_id = $1 AND work_order_number = $2")
            .bind(site_id)
            .bind(work_order_number)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(action_from_row).collect())
    }

    async fn list_recent_actions_by_kind(&self, site_id: Uuid, kind: ActionKind, limit: usize) -> Result<Vec<ExtractedAction>> {
        let rows = sqlx::query("SELECT * FROM actions WHERE site_id = $1 AND kind = $2 ORDER BY action_date DESC LIMIT $3")
            .bind(site_id)
            .bind(snake(&kind))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(action_from_row).collect())
    }
}

#[async_trait]
impl QueryStore for PostgresStore {
    async fn insert_query(&self, query: &UserQuery) -> Result<()> {
        let response_type = match query.response_type {
            ResponseType::Summary => "summary",
            ResponseType::Timeline => "timeline",
            ResponseType::List => "list",
            ResponseType::Analysis => "analysis",
            ResponseType::Error => "error",
        };
        sqlx::query(
            r#"
            INSERT INTO queries (
                id, site_id, user_id, query_text, query_type, answer, confidence,
                extracted_entities, response_type, no_hallucination, processing_time_ms,
                query_embedding, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
            "#,
        )
        .bind(query.id)
        .bind(query.site_id)
        .bind(&query.user_id)
        .bind(&query.query_text)
        .bind(&query.query_type)
        .bind(&query.answer)
        .bind(query.confidence)
        .bind(serde_json::to_value(&query.extracted_entities).unwrap_or_default())
        .bind(response_type)
        .bind(query.no_hallucination)
        .bind(query.processing_time_ms as i64)
        .bind(encode_embedding(&query.query_embedding))
        .bind(query.created_at)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn get_query(&self, id: Uuid) -> Result<Option<UserQuery>> {
        let row = sqlx::query("SELECT * FROM queries WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(backend_err)?;
        Ok(row.map(|r| query_from_row(&r)))
    }

    async fn list_queries_for_user(&self, user_id: &str) -> Result<Vec<UserQuery>> {
        let rows = sqlx::query("SELECT * FROM queries WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(query_from_row).collect())
    }

    async fn insert_query_source(&self, source: &QuerySource) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_sources (id, query_id, document_id, relevant_excerpt, relevance_score, citation_string, page_number, section_reference)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ON CONFLICT (query_id, document_id) DO NOTHING
            "#,
        )
        .bind(source.id)
        .bind(source.query_id)
        .bind(source.document_id)
        .bind(&source.relevant_excerpt)
        .bind(source.relevance_score)
        .bind(&source.citation_string)
        .bind(source.page_number.map(|v| v as i32))
        .bind(&source.section_reference)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_sources_for_query(&self, query_id: Uuid) -> Result<Vec<QuerySource>> {
        let rows = sqlx::query("SELECT * FROM query_sources WHERE query_id = $1")
            .bind(query_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(rows.iter().map(query_source_from_row).collect())
    }
}

//! # Solar Core
//!
//! Retrieval, extraction, and grounded-answer pipeline for solar asset
//! operational documents: field service reports, emails, meeting
//! transcripts, work orders, inspection reports, warranty claims,
//! contracts, manuals, and drawings.
//!
//! ## Design Philosophy
//!
//! | Principle | Description |
//! |-----------|-------------|
//! | **Evidence-grounded** | Every answer cites sources; unsupported claims are flagged, not hidden |
//! | **Deterministic where it matters** | Dedup, grounding scoring, and tone enforcement are pure functions, not LLM calls |
//! | **Provider-agnostic** | The pipeline depends on [`traits::EmbedderClient`]/[`traits::CompletionClient`], not on OpenAI directly |
//! | **Re-entrancy safe** | Ingestion's state machine tolerates crash-and-retry without double-processing |
//!
//! ## Architecture
//!
//! ```text
//! UPLOAD → NORMALIZE → FINGERPRINT (dedup) → PERSIST (pending)
//!        → EMBED → EXTRACT ACTIONS → PERSIST (completed)
//!
//! QUERY → FILTER → CLASSIFY INTENT → RETRIEVE (semantic ∪ fulltext ∪ structured)
//!       → GROUNDED COMPLETION → VALIDATE GROUNDING → ENFORCE TONE → PERSIST
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solar_core::{pipeline, stores::MemoryStore, types::{CoreConfig, Site}};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = MemoryStore::new();
//! let site = Site::new("CA-1", "Fresno Array");
//! # async fn run(store: MemoryStore, site: solar_core::types::Site) -> solar_core::error::Result<()> {
//! use solar_core::traits::SiteStore;
//! store.upsert_site(&site).await?;
//!
//! let request = pipeline::UploadRequest {
//!     site_id: site.id,
//!     bytes: b"Inverter 31 replaced under warranty.",
//!     filename: "fsr-2026-01.txt",
//!     mime: "text/plain",
//!     kind: solar_core::types::DocumentKind::FieldServiceReport,
//!     max_size: 25 * 1024 * 1024,
//! };
//! let document = pipeline::upload(&store, request).await?;
//! # Ok(()) }
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities: Site, Component, Document, ExtractedAction, UserQuery
//! - [`traits`] - Storage and provider trait abstractions
//! - [`pipeline`] - Normalization, ingestion, retrieval, extraction, and query orchestration
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`providers`] - Embedder/Completion client implementations (OpenAiProvider) and retry
//! - [`error`] - Typed errors per pipeline stage
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod providers;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::CoreError;

pub use traits::{
    ActionStore, CompletionClient, ComponentStore, DocumentHit, DocumentStore, EmbedderClient,
    QueryStore, SiteStore, Store,
};

pub use types::{
    ActionKind, ActionStatus, Component, ComponentKind, ComponentStatus, CoreConfig, DateRange,
    Document, DocumentKind, ExtractedAction, GroundedAnswer, ProcessingState, QueryIntent,
    QuerySource, ResponseType, Site, Source, UserQuery,
};

pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;

pub use pipeline::{
    answer_query, enforce_professional_tone, extract_actions, fingerprint, normalize, process,
    retrieve_sources, sanitize, upload, validate_grounding, validate_query, GroundingResult,
    NormalizedText, QueryResponse, QueryValidation, UploadRequest,
};

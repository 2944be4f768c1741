//! Typed errors for the core pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each concern gets its
//! own enum; `CoreError` composes them for callers that don't care
//! which stage failed.

use thiserror::Error;

/// Top-level error for the retrieval/extraction/grounded-answer pipeline.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("normalization failed: {0}")]
    Normalizer(#[from] NormalizerError),

    #[error("embedding failed: {0}")]
    Embedder(#[from] EmbedderError),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// A short stable token identifying the error kind, for operator-facing
    /// logs. Never includes provider names or internal detail.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Normalizer(_) => "normalizer_error",
            CoreError::Embedder(_) => "embedder_error",
            CoreError::Completion(_) => "completion_error",
            CoreError::Ingestion(_) => "ingestion_error",
            CoreError::Extraction(_) => "extraction_error",
            CoreError::Query(_) => "query_error",
            CoreError::Store(_) => "store_error",
            CoreError::Cancelled => "cancelled",
        }
    }
}

/// Errors from the Text Normalizer (§4.A).
#[derive(Debug, Error)]
pub enum NormalizerError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode document bytes: {0}")]
    DecodeFailure(String),
}

/// Errors from the Embedder Client (§4.C).
#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("embedding provider unavailable after retry budget exhausted")]
    ProviderUnavailable,

    #[error("embedding response malformed: {0}")]
    ResponseMalformed(String),

    #[error("input too large for provider: {0} bytes")]
    RequestTooLarge(usize),

    #[error("operation cancelled")]
    Cancelled,
}

/// Errors from the Completion Client (§4.D).
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion provider unavailable after retry budget exhausted")]
    ProviderUnavailable,

    #[error("completion response malformed: {0}")]
    ResponseMalformed(String),

    #[error("operation cancelled")]
    Cancelled,
}

/// Errors from the Ingestion Pipeline (§4.G).
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("site not found: {0}")]
    SiteNotFound(uuid::Uuid),

    #[error("document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    #[error("uploaded file is empty")]
    EmptyUpload,

    #[error("uploaded file exceeds maximum size ({size} > {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error(transparent)]
    Normalizer(#[from] NormalizerError),

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the Action Extractor (§4.H).
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the Query Pipeline (§4.I).
///
/// Content-filter rejections are NOT represented here: they produce a
/// well-formed response, not an error (see §7).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("site not found: {0}")]
    SiteNotFound(uuid::Uuid),

    #[error("could not parse query intent: {0}")]
    IntentUnparseable(String),

    #[error(transparent)]
    Embedder(#[from] EmbedderError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for the core pipeline.
pub type Result<T> = std::result::Result<T, CoreError>;

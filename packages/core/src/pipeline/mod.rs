//! The retrieval, extraction, and grounded-answer pipeline — the core of
//! this crate.
//!
//! Orchestrates:
//! - Text normalization and fingerprinting on upload
//! - Hybrid (semantic + lexical) retrieval with relevance windowing
//! - Ingestion's embed → extract → complete state machine
//! - Query answering: filter → intent → retrieve → grounded completion →
//!   grounding validation → tone/sanitize

pub mod action_extractor;
pub mod content_filter;
pub mod fingerprint;
pub mod grounding;
pub mod ingestion;
pub mod json_repair;
pub mod normalizer;
pub mod prompts;
pub mod query_pipeline;
pub mod retriever;

pub use action_extractor::extract_actions;
pub use content_filter::{enforce_professional_tone, sanitize, validate_query, QueryValidation};
pub use fingerprint::fingerprint;
pub use grounding::{validate_grounding, GroundingResult};
pub use ingestion::{process, upload, UploadRequest};
pub use json_repair::repair_and_parse;
pub use normalizer::{normalize, NormalizedText};
pub use query_pipeline::{answer_query, QueryResponse};
pub use retriever::retrieve_sources;

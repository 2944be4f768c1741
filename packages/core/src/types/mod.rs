//! Domain types for the retrieval, extraction, and grounded-answer
//! pipeline (§3).

pub mod action;
pub mod config;
pub mod document;
pub mod query;
pub mod site;

pub use action::{ActionKind, ActionStatus, ExtractedAction};
pub use config::CoreConfig;
pub use document::{Document, DocumentKind, ProcessingState};
pub use query::{DateRange, GroundedAnswer, QueryIntent, QuerySource, ResponseType, Source, UserQuery};
pub use site::{Component, ComponentKind, ComponentStatus, Site};

//! Document entity and its processing-state machine (§3, §4.G).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of document kinds (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    FieldServiceReport,
    Email,
    MeetingTranscript,
    WorkOrder,
    InspectionReport,
    WarrantyClaim,
    Contract,
    Manual,
    Drawing,
    Other,
}

impl DocumentKind {
    pub fn coerce(raw: &str) -> Self {
        match raw.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "field_service_report" => Self::FieldServiceReport,
            "email" => Self::Email,
            "meeting_transcript" => Self::MeetingTranscript,
            "work_order" => Self::WorkOrder,
            "inspection_report" => Self::InspectionReport,
            "warranty_claim" => Self::WarrantyClaim,
            "contract" => Self::Contract,
            "manual" => Self::Manual,
            "drawing" => Self::Drawing,
            _ => Self::Other,
        }
    }
}

/// Processing state of a [`Document`] (§4.G).
///
/// Entry is always `Pending`. Transitions follow the DAG
/// `Pending -> Processing -> {Completed | Failed}`; no state recurs within
/// one document's history of transitions for a single attempt, though
/// operator-triggered reprocessing resets `Failed -> Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// An uploaded artifact describing work performed (or to be performed) at a
/// site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub site_id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    pub original_filename: String,
    pub size: usize,
    pub mime: String,
    /// Hex-encoded SHA-256 of the raw uploaded bytes (§4.B). Dedup key,
    /// unique per site; never affects retrieval ranking.
    pub content_hash: String,
    /// Only populated for text-family inputs; PDFs never retain raw bytes
    /// as text (§4.A).
    pub raw_text: String,
    pub processed_text: String,
    pub embedding: Option<Vec<f32>>,
    pub processing_state: ProcessingState,
    pub processing_error: Option<String>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_completed_at: Option<DateTime<Utc>>,
    pub document_date: DateTime<Utc>,
    pub author: Option<String>,
}

impl Document {
    pub fn new(
        site_id: Uuid,
        kind: DocumentKind,
        original_filename: impl Into<String>,
        content_hash: impl Into<String>,
        size: usize,
        mime: impl Into<String>,
    ) -> Self {
        let original_filename = original_filename.into();
        Self {
            id: Uuid::now_v7(),
            site_id,
            kind,
            title: original_filename.clone(),
            original_filename,
            size,
            mime: mime.into(),
            content_hash: content_hash.into(),
            raw_text: String::new(),
            processed_text: String::new(),
            embedding: None,
            processing_state: ProcessingState::Pending,
            processing_error: None,
            processing_started_at: None,
            processing_completed_at: None,
            document_date: Utc::now(),
            author: None,
        }
    }

    /// Invariant check: `embedding != null ⇒ processing_state == Completed`.
    pub fn embedding_invariant_holds(&self) -> bool {
        self.embedding.is_none() || self.processing_state == ProcessingState::Completed
    }

    /// CAS the state from `Pending` to `Processing`. Returns `false`
    /// (no-op, no error) when the document is not `Pending` — re-entrancy
    /// safe per §4.G step 1.
    pub fn try_begin_processing(&mut self, now: DateTime<Utc>) -> bool {
        if self.processing_state != ProcessingState::Pending {
            return false;
        }
        self.processing_state = ProcessingState::Processing;
        self.processing_started_at = Some(now);
        self.processing_error = None;
        true
    }

    pub fn mark_completed(&mut self, embedding: Vec<f32>, now: DateTime<Utc>) {
        self.embedding = Some(embedding);
        self.processing_state = ProcessingState::Completed;
        self.processing_completed_at = Some(now);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.processing_state = ProcessingState::Failed;
        self.processing_error = Some(error.into());
    }

    /// Operator-triggered reprocessing: `Failed` is terminal for the
    /// current attempt but re-processable (§4.G failure semantics).
    pub fn reset_for_reprocessing(&mut self) {
        self.processing_state = ProcessingState::Pending;
        self.processing_error = None;
        self.processing_started_at = None;
        self.processing_completed_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Uuid::now_v7(), DocumentKind::Email, "r.txt", "deadbeef", 10, "text/plain")
    }

    #[test]
    fn begin_processing_is_reentrancy_safe() {
        let mut d = doc();
        let now = Utc::now();
        assert!(d.try_begin_processing(now));
        assert_eq!(d.processing_state, ProcessingState::Processing);
        // Already processing: no-op, no error.
        assert!(!d.try_begin_processing(now));
    }

    #[test]
    fn embedding_invariant_enforced_through_lifecycle() {
        let mut d = doc();
        assert!(d.embedding_invariant_holds());
        d.try_begin_processing(Utc::now());
        assert!(d.embedding_invariant_holds());
        d.mark_completed(vec![0.1, 0.2], Utc::now());
        assert!(d.embedding_invariant_holds());
        assert_eq!(d.processing_state, ProcessingState::Completed);
    }

    #[test]
    fn failed_is_reprocessable() {
        let mut d = doc();
        d.try_begin_processing(Utc::now());
        d.mark_failed("provider unavailable");
        assert_eq!(d.processing_state, ProcessingState::Failed);
        d.reset_for_reprocessing();
        assert_eq!(d.processing_state, ProcessingState::Pending);
        assert!(d.processing_error.is_none());
    }
}

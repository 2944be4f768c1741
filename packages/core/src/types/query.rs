//! UserQuery, QuerySource, and query-pipeline intermediate types (§3, §4.I).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Shape of a [`UserQuery`]'s answer, chosen by the completion provider
/// (intent classification) or forced to `Error` by the content filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Summary,
    Timeline,
    List,
    Analysis,
    Error,
}

/// A natural-language question and its resolved, grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserQuery {
    pub id: Uuid,
    pub site_id: Uuid,
    pub user_id: String,
    pub query_text: String,
    pub query_type: String,
    pub answer: String,
    pub confidence: f32,
    #[serde(default)]
    pub extracted_entities: HashMap<String, Vec<String>>,
    pub response_type: ResponseType,
    pub no_hallucination: bool,
    pub processing_time_ms: u64,
    pub query_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl UserQuery {
    /// Build the content-filter rejection shape: the only place a
    /// `UserQuery` is constructed without running steps 2-7 of §4.I.
    pub fn rejected(site_id: Uuid, user_id: impl Into<String>, query_text: impl Into<String>, reason: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_id,
            user_id: user_id.into(),
            query_text: query_text.into(),
            query_type: "rejected".to_string(),
            answer: format!("I cannot process this query: {reason}"),
            confidence: 0.0,
            extracted_entities: HashMap::new(),
            response_type: ResponseType::Error,
            no_hallucination: true,
            processing_time_ms: 0,
            query_embedding: None,
            created_at: Utc::now(),
        }
    }

    /// Invariant: `response_type == Error ⇒ sources empty ∧ no_hallucination`.
    /// Checked against the caller's materialized source list since sources
    /// live in a separate collection ([`QuerySource`]), not on this struct.
    pub fn error_invariant_holds(&self, source_count: usize) -> bool {
        if self.response_type != ResponseType::Error {
            return true;
        }
        source_count == 0 && self.no_hallucination
    }

    /// Invariant: whenever sources are non-empty, `no_hallucination ==
    /// (confidence > 0.7)`.
    pub fn hallucination_flag_consistent(&self, source_count: usize) -> bool {
        if source_count == 0 {
            return true;
        }
        self.no_hallucination == (self.confidence > 0.7)
    }
}

/// The attribution of one retrieved source to one answer (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySource {
    pub id: Uuid,
    pub query_id: Uuid,
    pub document_id: Uuid,
    pub relevant_excerpt: String,
    pub relevance_score: f32,
    pub citation_string: String,
    pub page_number: Option<u32>,
    pub section_reference: Option<String>,
}

impl QuerySource {
    pub fn new(
        query_id: Uuid,
        document_id: Uuid,
        relevant_excerpt: impl Into<String>,
        relevance_score: f32,
        citation_string: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            query_id,
            document_id,
            relevant_excerpt: relevant_excerpt.into(),
            relevance_score: relevance_score.clamp(0.0, 1.0),
            citation_string: citation_string.into(),
            page_number: None,
            section_reference: None,
        }
    }
}

/// A retrieved, citable piece of evidence, produced by the Retriever
/// (§4.F) and consumed by the grounded-completion step and the Grounding
/// Validator before being persisted as a [`QuerySource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub document_id: Uuid,
    pub title: String,
    pub kind: String,
    pub excerpt: String,
    pub relevance_score: f32,
    pub citation_string: String,
    pub document_date: Option<DateTime<Utc>>,
}

/// Structured classification of a query's intent (§4.I step 2, §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryIntent {
    #[serde(rename = "type")]
    pub query_type: String,
    pub confidence: f32,
    #[serde(default)]
    pub extracted_entities: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    #[serde(default)]
    pub required_sources: Vec<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub component_filters: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The grounded-answer JSON contract (§6) returned by the completion
/// provider in step 4 of §4.I, before grounding validation assigns the
/// final confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    #[serde(default)]
    pub confidence_score: f32,
    #[serde(default)]
    pub related_concepts: Vec<String>,
    #[serde(default)]
    pub response_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_query_satisfies_error_invariant() {
        let q = UserQuery::rejected(Uuid::now_v7(), "u1", "what's the weather", "off_topic");
        assert_eq!(q.response_type, ResponseType::Error);
        assert!(q.answer.starts_with("I cannot process this query:"));
        assert!(q.error_invariant_holds(0));
    }
}

//! Query Pipeline (§4.I): filter → intent → retrieve → grounded
//! completion → validate → tone/sanitize → persist.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{QueryError, Result};
use crate::pipeline::content_filter::{enforce_professional_tone, sanitize, validate_query};
use crate::pipeline::grounding::validate_grounding;
use crate::pipeline::prompts::{
    format_classify_intent_prompt, format_grounded_answer_prompt, prompt_hash,
    GROUNDED_ANSWER_PROMPT,
};
use crate::pipeline::retriever::retrieve_sources;
use crate::traits::{CompletionClient, EmbedderClient, Store};
use crate::types::{GroundedAnswer, QueryIntent, QuerySource, ResponseType, Source, UserQuery};

/// The enriched response returned to the HTTP boundary (§4.I step 8, §6).
pub struct QueryResponse {
    pub query: UserQuery,
    pub sources: Vec<Source>,
}

fn intent_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "type": {"type": "string"},
            "confidence": {"type": "number"},
            "extracted_entities": {"type": "object"},
            "related_concepts": {"type": "array", "items": {"type": "string"}},
            "required_sources": {"type": "array", "items": {"type": "string"}},
            "date_range": {"type": "object"},
            "component_filters": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["type", "confidence"]
    })
}

fn answer_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": {"type": "string"},
            "confidence_score": {"type": "number"},
            "related_concepts": {"type": "array", "items": {"type": "string"}},
            "response_type": {"type": "string"}
        },
        "required": ["answer"]
    })
}

fn parse_response_type(raw: &str) -> ResponseType {
    match raw.to_ascii_lowercase().as_str() {
        "timeline" => ResponseType::Timeline,
        "list" => ResponseType::List,
        "analysis" => ResponseType::Analysis,
        "error" => ResponseType::Error,
        _ => ResponseType::Summary,
    }
}

/// Run the full query pipeline (§4.I).
#[instrument(
    skip(store, embedder, completion, cancel),
    fields(site_id = %site_id, user_id = %user_id, prompt_version = %prompt_hash(GROUNDED_ANSWER_PROMPT))
)]
pub async fn answer_query<S: Store + ?Sized, E: EmbedderClient + ?Sized, C: CompletionClient + ?Sized>(
    store: &S,
    embedder: &E,
    completion: &C,
    site_id: Uuid,
    user_id: &str,
    query_text: &str,
    cancel: &CancellationToken,
) -> Result<QueryResponse> {
    let started = Instant::now();

    if store.get_site(site_id).await?.is_none() {
        return Err(QueryError::SiteNotFound(site_id).into());
    }

    // Step 1: filter.
    let validation = validate_query(query_text);
    if !validation.valid || !validation.appropriate {
        let reason = validation.reason.unwrap_or_else(|| "rejected".to_string());
        let rejected = UserQuery::rejected(site_id, user_id, query_text, &reason);
        store.insert_query(&rejected).await?;
        return Ok(QueryResponse { query: rejected, sources: Vec::new() });
    }

    // Step 2: intent.
    let intent_prompt = format_classify_intent_prompt(query_text);
    let intent: QueryIntent = completion
        .complete_json(
            "You classify the intent of questions about solar asset operations.",
            &intent_prompt,
            &intent_json_schema(),
            cancel,
        )
        .await
        .map_err(|e| QueryError::IntentUnparseable(e.to_string()))?;

    if intent.query_type.is_empty() {
        return Err(QueryError::IntentUnparseable("empty intent type".to_string()).into());
    }

    // Step 3: retrieve.
    let sources = retrieve_sources(store, embedder, site_id, query_text, &intent, cancel).await?;

    // Step 4: grounded completion.
    let numbered: Vec<(usize, String, String)> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| (i + 1, s.title.clone(), s.excerpt.clone()))
        .collect();
    let answer_prompt = format_grounded_answer_prompt(query_text, &numbered);
    let grounded: GroundedAnswer = completion
        .complete_json(
            "You are a professional solar asset operations assistant. Use only the provided sources.",
            &answer_prompt,
            &answer_json_schema(),
            cancel,
        )
        .await?;

    // Step 5: validate grounding.
    let grounding = validate_grounding(&grounded.answer, &sources);

    // Step 6: tone + sanitize.
    let toned = enforce_professional_tone(&grounded.answer);
    let sanitized = sanitize(&toned);

    let query_embedding = embedder.embed(query_text, cancel).await.ok();

    let mut user_query = UserQuery {
        id: Uuid::now_v7(),
        site_id,
        user_id: user_id.to_string(),
        query_text: query_text.to_string(),
        query_type: intent.query_type.clone(),
        answer: sanitized,
        confidence: grounding.confidence,
        extracted_entities: intent.extracted_entities.clone(),
        response_type: if grounded.response_type.is_empty() {
            parse_response_type(&intent.query_type)
        } else {
            parse_response_type(&grounded.response_type)
        },
        no_hallucination: grounding.no_hallucination,
        processing_time_ms: started.elapsed().as_millis() as u64,
        query_embedding,
        created_at: chrono::Utc::now(),
    };

    // Step 7: persist.
    store.insert_query(&user_query).await?;
    for source in &sources {
        let query_source = QuerySource::new(
            user_query.id,
            source.document_id,
            source.excerpt.clone(),
            source.relevance_score,
            source.citation_string.clone(),
        );
        store.insert_query_source(&query_source).await?;
    }

    user_query.processing_time_ms = started.elapsed().as_millis() as u64;

    Ok(QueryResponse { query: user_query, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::memory::MemoryStore;
    use crate::testing::{MockCompletionClient, MockEmbedderClient};
    use crate::types::Site;

    #[tokio::test]
    async fn off_topic_query_is_rejected_without_calling_the_completion_provider() {
        let store = MemoryStore::new();
        let site = Site::new("CA-1", "Fresno Array");
        store.upsert_site(&site).await.unwrap();

        let embedder = MockEmbedderClient::new(4);
        let completion = MockCompletionClient::new();
        let cancel = CancellationToken::new();

        let response = answer_query(
            &store,
            &embedder,
            &completion,
            site.id,
            "user-1",
            "What is the weather like today?",
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(response.query.response_type, ResponseType::Error);
        assert!(response.sources.is_empty());
        assert!(response.query.no_hallucination);
        assert_eq!(response.query.confidence, 0.0);
    }

    #[tokio::test]
    async fn unknown_site_is_rejected() {
        let store = MemoryStore::new();
        let embedder = MockEmbedderClient::new(4);
        let completion = MockCompletionClient::new();
        let cancel = CancellationToken::new();

        let result = answer_query(
            &store,
            &embedder,
            &completion,
            Uuid::now_v7(),
            "user-1",
            "What work was performed on inverter 31?",
            &cancel,
        )
        .await;
        assert!(result.is_err());
    }
}

//! Retriever (§4.F): hybrid lexical + vector + structured search over the
//! store, composed into `retrieve_sources`.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::{DocumentHit, EmbedderClient, Store};
use crate::types::{ActionKind, QueryIntent, Source};

const SEMANTIC_LIMIT: usize = 10;
const SEMANTIC_THRESHOLD: f32 = 0.7;
const FULLTEXT_FALLBACK_LIMIT: usize = 5;
const EXCERPT_WINDOW: usize = 8000;
const EXCERPT_STEP: usize = 500;
const TERM_WEIGHT: f32 = 10.0;
const FRONT_OF_DOCUMENT_BONUS: f32 = 2.0;
const MAX_RECENT_ACTIONS: usize = 5;
const ACTION_SOURCE_RELEVANCE: f32 = 0.7;

/// Render an enum the way its own `snake_case` serde derive would, rather
/// than `Debug`'s `PascalCase` (the two disagree for multi-word variants).
fn snake<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Lexical match against titles and processed text (§4.F op 1).
pub async fn search_fulltext<S: Store + ?Sized>(
    store: &S,
    site_id: Uuid,
    query: &str,
    limit: usize,
) -> Result<Vec<DocumentHit>> {
    Ok(store.search_fulltext(site_id, query, limit).await?)
}

/// Nearest neighbors by cosine distance (§4.F op 2).
pub async fn search_semantic<S: Store + ?Sized>(
    store: &S,
    site_id: Uuid,
    vector: &[f32],
    limit: usize,
    threshold: f32,
) -> Result<Vec<DocumentHit>> {
    Ok(store.search_semantic(site_id, vector, limit, threshold).await?)
}

/// Extract key terms from a query for relevance windowing: component
/// identifiers, date-like tokens, capitalized names, and generic
/// maintenance vocabulary all count, but we don't try to classify them —
/// any word longer than 2 characters contributes.
fn key_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty() && (w.len() > 2 || w.chars().all(|c| c.is_ascii_digit())))
        .collect()
}

/// Score a window of text by weighted term occurrence, with a small bonus
/// for windows near the start of the document (§4.F).
fn score_window(window: &str, terms: &[String], window_start: usize, doc_len: usize) -> f32 {
    let lower = window.to_lowercase();
    let mut score: f32 = terms.iter().map(|t| lower.matches(t.as_str()).count() as f32 * TERM_WEIGHT).sum();

    if doc_len > 0 {
        let position_fraction = window_start as f32 / doc_len as f32;
        score += FRONT_OF_DOCUMENT_BONUS * (1.0 - position_fraction).max(0.0);
    }
    score
}

/// Relevance-windowed excerpt extraction (§4.F): slide a `W`-character
/// window across `text` in `EXCERPT_STEP`-sized steps, keep the
/// highest-scoring one.
fn windowed_excerpt(text: &str, terms: &[String]) -> String {
    if text.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= EXCERPT_WINDOW {
        return text.to_string();
    }

    let mut best_start = 0usize;
    let mut best_score = f32::MIN;
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + EXCERPT_WINDOW).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let score = score_window(&window, terms, start, chars.len());
        if score > best_score {
            best_score = score;
            best_start = start;
        }
        if end == chars.len() {
            break;
        }
        start += EXCERPT_STEP;
    }

    let end = (best_start + EXCERPT_WINDOW).min(chars.len());
    let window: String = chars[best_start..end].iter().collect();

    let prefix = if best_start > 0 { "…" } else { "" };
    let suffix = if end < chars.len() { "…" } else { "" };
    format!("{prefix}{window}{suffix}")
}

/// Build a [`Source`] excerpt from a document hit, falling back to
/// title/metadata when both raw and processed text are empty (§4.F edge
/// case).
fn excerpt_for(hit: &DocumentHit, terms: &[String]) -> String {
    let document = &hit.document;
    if !document.processed_text.is_empty() {
        return windowed_excerpt(&document.processed_text, terms);
    }
    if !document.raw_text.is_empty() {
        return windowed_excerpt(&document.raw_text, terms);
    }
    format!(
        "{} ({}, uploaded {})",
        document.title,
        document.original_filename,
        document.document_date.format("%Y-%m-%d")
    )
}

fn hit_to_source(hit: &DocumentHit, terms: &[String], relevance_score: f32) -> Source {
    let document = &hit.document;
    Source {
        document_id: document.id,
        title: document.title.clone(),
        kind: snake(&document.kind),
        excerpt: excerpt_for(hit, terms),
        relevance_score,
        citation_string: document.title.clone(),
        document_date: Some(document.document_date),
    }
}

/// Relevance score in [0,1] for a hit, derived from the store-native
/// `rank` (cosine distance for semantic hits, a smaller-is-better
/// ranking position for fulltext hits either way).
fn relevance_from_rank(rank: f32) -> f32 {
    (1.0 - rank).clamp(0.0, 1.0)
}

/// Composite retrieval operation (§4.F): embed the query, try semantic
/// search, fall back to fulltext, window excerpts, and fold in recent
/// maintenance actions when the intent names component filters.
pub async fn retrieve_sources<S: Store + ?Sized, E: EmbedderClient + ?Sized>(
    store: &S,
    embedder: &E,
    site_id: Uuid,
    text: &str,
    intent: &QueryIntent,
    cancel: &CancellationToken,
) -> Result<Vec<Source>> {
    let terms = key_terms(text);

    let query_vector = embedder.embed(text, cancel).await?;
    let semantic_hits = search_semantic(store, site_id, &query_vector, SEMANTIC_LIMIT, SEMANTIC_THRESHOLD).await?;

    let hits = if semantic_hits.is_empty() {
        search_fulltext(store, site_id, text, FULLTEXT_FALLBACK_LIMIT).await?
    } else {
        semantic_hits
    };

    let mut sources: Vec<Source> = hits
        .iter()
        .map(|hit| hit_to_source(hit, &terms, relevance_from_rank(hit.rank)))
        .collect();

    if let Some(component_filters) = &intent.component_filters {
        if !component_filters.is_empty() {
            let recent = store
                .list_recent_actions_by_kind(site_id, ActionKind::Maintenance, MAX_RECENT_ACTIONS)
                .await?;
            for action in recent {
                sources.push(Source {
                    document_id: action.document_id,
                    title: action.title.clone(),
                    kind: "extracted_action".to_string(),
                    excerpt: action.description.clone(),
                    relevance_score: ACTION_SOURCE_RELEVANCE,
                    citation_string: format!("Maintenance record: {}", action.title),
                    document_date: Some(action.action_date),
                });
            }
        }
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_returned_as_whole_excerpt() {
        let text = "Inverter 31 replaced on 2024-04-09.";
        let excerpt = windowed_excerpt(text, &key_terms("inverter 31"));
        assert_eq!(excerpt, text);
    }

    #[test]
    fn key_terms_drops_short_tokens_and_punctuation() {
        let terms = key_terms("What work was performed on inverter 31?");
        assert!(terms.contains(&"inverter".to_string()));
        assert!(terms.contains(&"31".to_string()));
        assert!(!terms.contains(&"on".to_string()));
    }

    #[test]
    fn relevance_from_rank_clamps_into_unit_interval() {
        assert_eq!(relevance_from_rank(-1.0), 1.0);
        assert_eq!(relevance_from_rank(2.0), 0.0);
    }
}

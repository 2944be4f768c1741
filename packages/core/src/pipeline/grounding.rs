//! Grounding Validator (§4.J): a pure function of (answer, sources).
//!
//! No I/O, no clients, no store — the whole point is that citation
//! enforcement is independently testable and never bypassed by a cache or
//! a provider quirk.

use crate::types::Source;

/// Result of validating one answer against its cited sources.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundingResult {
    pub confidence: f32,
    pub no_hallucination: bool,
    pub unsupported_claims: Vec<String>,
}

const GROUNDING_THRESHOLD: f32 = 0.7;

/// A token naming a citation, e.g. "[source" / "1]" fragments produced by
/// whitespace-splitting "[Source 1]" — dropped before scoring since they
/// carry no content to validate.
fn is_citation_token(token: &str) -> bool {
    let t = token.trim_matches(|c: char| !c.is_alphanumeric());
    t.eq_ignore_ascii_case("source") || t.chars().all(|c| c.is_ascii_digit())
}

/// Validate `answer` against `sources` per §4.J / §4.I step 5.
pub fn validate_grounding(answer: &str, sources: &[Source]) -> GroundingResult {
    if sources.is_empty() {
        return GroundingResult {
            confidence: 0.0,
            no_hallucination: false,
            unsupported_claims: vec!["No sources provided".to_string()],
        };
    }

    let corpus: Vec<String> = sources.iter().map(|s| s.excerpt.to_lowercase()).collect();

    let mut total = 0usize;
    let mut supported = 0usize;
    let mut unsupported_claims = Vec::new();

    for raw_token in answer.split_whitespace() {
        let lower = raw_token.to_lowercase();
        let cleaned: String = lower.chars().filter(|c| c.is_alphanumeric()).collect();

        if cleaned.chars().count() <= 3 || is_citation_token(raw_token) {
            continue;
        }

        total += 1;
        if corpus.iter().any(|excerpt| excerpt.contains(&cleaned)) {
            supported += 1;
        } else {
            unsupported_claims.push(raw_token.to_string());
        }
    }

    let confidence = if total == 0 { 0.5 } else { supported as f32 / total as f32 };

    GroundingResult {
        confidence,
        no_hallucination: confidence > GROUNDING_THRESHOLD,
        unsupported_claims,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn source(excerpt: &str) -> Source {
        Source {
            document_id: Uuid::now_v7(),
            title: "Field report".to_string(),
            kind: "field_service_report".to_string(),
            excerpt: excerpt.to_string(),
            relevance_score: 0.9,
            citation_string: "Field report".to_string(),
            document_date: None,
        }
    }

    #[test]
    fn empty_sources_yields_zero_confidence_and_no_hallucination_false() {
        let result = validate_grounding("inverter 31 replaced", &[]);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.no_hallucination);
        assert_eq!(result.unsupported_claims, vec!["No sources provided"]);
    }

    #[test]
    fn answer_fully_covered_by_sources_scores_high_confidence() {
        let sources = vec![source("inverter 31 was replaced by technician alex on work order 00549595")];
        let answer = "Inverter 31 was replaced [Source 1] per work order 00549595.";
        let result = validate_grounding(answer, &sources);
        assert!(result.confidence >= 0.9, "confidence was {}", result.confidence);
        assert!(result.no_hallucination);
    }

    #[test]
    fn answer_of_only_citation_tokens_yields_half_confidence() {
        let sources = vec![source("irrelevant content")];
        let result = validate_grounding("[Source 1] [Source 2]", &sources);
        assert_eq!(result.confidence, 0.5);
        assert!(!result.no_hallucination);
    }

    #[test]
    fn unsupported_tokens_are_listed_and_drag_confidence_down() {
        let sources = vec![source("inverter 31 was replaced")];
        let result = validate_grounding("Inverter 31 exploded violently yesterday", &sources);
        assert!(result.confidence < 0.9);
        assert!(!result.unsupported_claims.is_empty());
    }

    #[test]
    fn adding_a_fully_supporting_source_cannot_decrease_confidence() {
        let weak = vec![source("unrelated text entirely")];
        let answer = "Inverter 31 replaced under work order 00549595";
        let before = validate_grounding(answer, &weak);

        let mut strong = weak.clone();
        strong.push(source("inverter 31 replaced under work order 00549595"));
        let after = validate_grounding(answer, &strong);

        assert!(after.confidence >= before.confidence);
    }
}

//! Centralized, versioned LLM prompts (§9: "centralize prompt templates in
//! one module; version them; log prompt version with each query").

use sha2::{Digest, Sha256};

/// Prompt for the Action Extractor (§4.H).
pub const EXTRACT_ACTIONS_PROMPT: &str = r#"You are reviewing an operational document for a solar asset site. Extract every maintenance action described.

Component catalog for this site (kind, name, external_id):
{components}

Document text:
{content}

For each action found, report:
- action_type: one of maintenance, replacement, troubleshoot, inspection, repair, testing, installation, commissioning, fault_clearing, monitoring, cleaning, other
- description: a human-readable label for the action
- component_type: the kind of component involved
- component_id: the component's external_id if it matches the catalog above, otherwise omit
- technician_names: list of technicians named
- work_order_number: if mentioned
- action_date: RFC-3339 timestamp; infer from the document if not explicit
- action_status: one of completed, pending, failed
- confidence_score: 0.0 to 1.0, how confident you are this action actually occurred
- details: any other structured detail (measurements, part numbers), optional

Only report actions explicitly described in the text. Do not invent technicians, dates, or work orders.

Output JSON:
{
    "actions": [
        {
            "action_type": "...",
            "description": "...",
            "component_type": "...",
            "component_id": "...",
            "technician_names": ["..."],
            "work_order_number": "...",
            "action_date": "...",
            "action_status": "...",
            "confidence_score": 0.0,
            "details": {}
        }
    ]
}"#;

/// Prompt for query-intent classification (§4.I step 2, §6).
pub const CLASSIFY_INTENT_PROMPT: &str = r#"Classify the intent of this question about a solar asset site.

Query: {query}

Output JSON:
{
    "type": "summary" | "timeline" | "list" | "analysis",
    "confidence": 0.0 to 1.0,
    "extracted_entities": {"component": ["..."], "date": ["..."], "technician": ["..."]},
    "related_concepts": ["..."],
    "required_sources": ["..."],
    "date_range": {"start": "RFC-3339", "end": "RFC-3339"},
    "component_filters": ["..."]
}

Omit date_range and component_filters if the query doesn't name them."#;

/// Prompt for grounded-answer generation (§4.I step 4).
pub const GROUNDED_ANSWER_PROMPT: &str = r#"You are a professional operations assistant for solar asset management. Answer the question using ONLY the sources provided below. Do not use outside knowledge.

Cite every factual claim with a bracketed source number, like [Source 1]. If the sources do not contain enough information to answer, say so explicitly rather than guessing.

Question: {query}

Sources:
{sources}

Be concise but complete. Output JSON:
{
    "answer": "...",
    "confidence_score": 0.0,
    "related_concepts": ["..."],
    "response_type": "summary" | "timeline" | "list" | "analysis"
}"#;

/// Generate a hash of a prompt constant, logged alongside each query so a
/// prompt-behavior regression can be traced to a specific template
/// revision.
pub fn prompt_hash(prompt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Format the action-extraction prompt.
pub fn format_extract_actions_prompt(components: &str, content: &str) -> String {
    EXTRACT_ACTIONS_PROMPT
        .replace("{components}", components)
        .replace("{content}", content)
}

/// Format the intent-classification prompt.
pub fn format_classify_intent_prompt(query: &str) -> String {
    CLASSIFY_INTENT_PROMPT.replace("{query}", query)
}

/// Format the grounded-answer prompt, rendering sources with their
/// 1-based citation numbers.
pub fn format_grounded_answer_prompt(query: &str, sources: &[(usize, String, String)]) -> String {
    let sources_text = sources
        .iter()
        .map(|(n, title, excerpt)| format!("[Source {n}] {title}\n{excerpt}\n"))
        .collect::<Vec<_>>()
        .join("\n---\n");

    GROUNDED_ANSWER_PROMPT
        .replace("{query}", query)
        .replace("{sources}", &sources_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_hash_is_deterministic() {
        let h1 = prompt_hash(EXTRACT_ACTIONS_PROMPT);
        let h2 = prompt_hash(EXTRACT_ACTIONS_PROMPT);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn different_prompts_hash_differently() {
        assert_ne!(prompt_hash(EXTRACT_ACTIONS_PROMPT), prompt_hash(CLASSIFY_INTENT_PROMPT));
    }

    #[test]
    fn format_grounded_answer_prompt_includes_citation_numbers() {
        let sources = vec![(1, "Field report".to_string(), "Inverter 31 replaced".to_string())];
        let formatted = format_grounded_answer_prompt("what happened to inverter 31?", &sources);
        assert!(formatted.contains("[Source 1] Field report"));
        assert!(formatted.contains("Inverter 31 replaced"));
    }
}

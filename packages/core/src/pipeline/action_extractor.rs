//! Action Extractor (§4.H): completion-driven extraction of structured
//! maintenance actions from a document's processed text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::pipeline::prompts::format_extract_actions_prompt;
use crate::traits::CompletionClient;
use crate::types::{ActionKind, ActionStatus, Component, Document, ExtractedAction};

const MAX_COMPONENTS_IN_CONTEXT: usize = 100;

/// Render an enum the way its own `snake_case` serde derive would, rather
/// than `Debug`'s `PascalCase` (the two disagree for multi-word variants).
fn snake<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Raw shape of one action as returned by the completion provider (§6
/// normative contract), before post-processing.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RawAction {
    #[serde(default)]
    action_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    component_type: String,
    #[serde(default)]
    component_id: Option<String>,
    #[serde(default)]
    technician_names: Vec<String>,
    #[serde(default)]
    work_order_number: Option<String>,
    #[serde(default)]
    action_date: Option<String>,
    #[serde(default)]
    action_status: String,
    #[serde(default)]
    confidence_score: f32,
    #[serde(default)]
    details: serde_json::Value,
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct ExtractionResponse {
    #[serde(default)]
    actions: Vec<RawAction>,
}

fn extraction_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "actions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "action_type": {"type": "string"},
                        "description": {"type": "string"},
                        "component_type": {"type": "string"},
                        "component_id": {"type": "string"},
                        "technician_names": {"type": "array", "items": {"type": "string"}},
                        "work_order_number": {"type": "string"},
                        "action_date": {"type": "string"},
                        "action_status": {"type": "string"},
                        "confidence_score": {"type": "number"},
                        "details": {"type": "object"}
                    },
                    "required": ["action_type", "description"]
                }
            }
        },
        "required": ["actions"]
    })
}

fn component_catalog(components: &[Component]) -> String {
    components
        .iter()
        .take(MAX_COMPONENTS_IN_CONTEXT)
        .map(|c| {
            format!(
                "- {} \"{}\" (external_id: {})",
                snake(&c.kind),
                c.name,
                c.external_id.as_deref().unwrap_or("none")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve_component_id(components: &[Component], external_id: Option<&str>) -> Option<uuid::Uuid> {
    let external_id = external_id?;
    components
        .iter()
        .find(|c| c.external_id.as_deref() == Some(external_id))
        .map(|c| c.id)
}

fn parse_action_date(raw: &Option<String>) -> DateTime<Utc> {
    raw.as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Post-process one raw action into an [`ExtractedAction`] (§4.H).
fn post_process(raw: RawAction, document: &Document, components: &[Component], model: &str) -> ExtractedAction {
    let mut action = ExtractedAction::new(
        document.id,
        document.site_id,
        ActionKind::coerce(&raw.action_type),
        raw.description,
        parse_action_date(&raw.action_date),
        model,
    )
    .with_confidence(raw.confidence_score)
    .with_technicians(raw.technician_names);

    if let Some(wo) = raw.work_order_number {
        action = action.with_work_order_number(wo);
    }
    if let Some(component_id) = resolve_component_id(components, raw.component_id.as_deref()) {
        action = action.with_primary_component(component_id);
    }

    action.outcome = Some(snake(&ActionStatus::coerce(&raw.action_status)));

    if let serde_json::Value::Object(map) = raw.details {
        action.measurements = map.into_iter().collect();
    }

    action
}

/// Extract structured actions from `document`'s processed text (§4.H).
pub async fn extract_actions<C: CompletionClient + ?Sized>(
    completion: &C,
    document: &Document,
    components: &[Component],
    cancel: &CancellationToken,
) -> Result<Vec<ExtractedAction>> {
    let prompt = format_extract_actions_prompt(&component_catalog(components), &document.processed_text);
    let schema = extraction_json_schema();

    let response: ExtractionResponse = completion
        .complete_json(
            "You are an assistant that extracts structured maintenance facts from solar asset documents.",
            &prompt,
            &schema,
            cancel,
        )
        .await?;

    Ok(response
        .actions
        .into_iter()
        .map(|raw| post_process(raw, document, components, "extraction-v1"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn document() -> Document {
        Document::new(Uuid::now_v7(), crate::types::DocumentKind::FieldServiceReport, "r.txt", "h", 10, "text/plain")
    }

    #[test]
    fn unrecognized_status_and_missing_date_fall_back() {
        let raw = RawAction {
            action_type: "replacement".to_string(),
            description: "Inverter 31 replaced".to_string(),
            action_status: "".to_string(),
            confidence_score: 1.4,
            ..Default::default()
        };
        let doc = document();
        let action = post_process(raw, &doc, &[], "model-x");
        assert_eq!(action.kind, ActionKind::Replacement);
        assert_eq!(action.confidence, 1.0);
        assert_eq!(action.outcome.as_deref(), Some("completed"));
    }

    #[test]
    fn component_external_id_resolves_to_component_uuid() {
        let site_id = Uuid::now_v7();
        let component = Component::new(site_id, crate::types::ComponentKind::Inverter, "INV-31")
            .with_external_id("INV-31");
        let raw = RawAction {
            action_type: "repair".to_string(),
            description: "repaired".to_string(),
            component_id: Some("INV-31".to_string()),
            ..Default::default()
        };
        let doc = document();
        let action = post_process(raw, &doc, std::slice::from_ref(&component), "model-x");
        assert_eq!(action.primary_component_id, Some(component.id));
    }

    #[test]
    fn unresolvable_component_id_leaves_primary_component_null() {
        let raw = RawAction {
            action_type: "repair".to_string(),
            description: "repaired".to_string(),
            component_id: Some("NOT-IN-CATALOG".to_string()),
            ..Default::default()
        };
        let doc = document();
        let action = post_process(raw, &doc, &[], "model-x");
        assert_eq!(action.primary_component_id, None);
    }
}

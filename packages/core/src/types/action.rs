//! ExtractedAction entity (§3, §4.H).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Closed set of action kinds (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Maintenance,
    Replacement,
    Troubleshoot,
    Inspection,
    Repair,
    Testing,
    Installation,
    Commissioning,
    FaultClearing,
    Monitoring,
    Cleaning,
    Other,
}

impl ActionKind {
    /// Coerce an arbitrary string into the closed set, falling back to
    /// `Other` for unrecognized values (§4.H post-processing).
    pub fn coerce(raw: &str) -> Self {
        match raw.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "maintenance" => Self::Maintenance,
            "replacement" => Self::Replacement,
            "troubleshoot" | "troubleshooting" => Self::Troubleshoot,
            "inspection" => Self::Inspection,
            "repair" => Self::Repair,
            "testing" | "test" => Self::Testing,
            "installation" => Self::Installation,
            "commissioning" => Self::Commissioning,
            "fault_clearing" => Self::FaultClearing,
            "monitoring" => Self::Monitoring,
            "cleaning" => Self::Cleaning,
            _ => Self::Other,
        }
    }
}

/// Outcome status of an [`ExtractedAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
    Pending,
    Failed,
}

impl ActionStatus {
    /// Coerce an arbitrary string, falling back to `Completed` for
    /// unrecognized values (§4.H post-processing).
    pub fn coerce(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "failed" => Self::Failed,
            _ => Self::Completed,
        }
    }
}

/// A structured maintenance fact extracted from a [`crate::types::document::Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedAction {
    pub id: Uuid,
    pub document_id: Uuid,
    pub site_id: Uuid,
    pub kind: ActionKind,
    pub title: String,
    pub description: String,
    pub action_date: DateTime<Utc>,
    pub technicians: Vec<String>,
    pub work_order_number: Option<String>,
    pub outcome: Option<String>,
    /// Weak reference: lookup only. Deleting the component does not
    /// delete the action (§3 ownership notes).
    pub primary_component_id: Option<Uuid>,
    #[serde(default)]
    pub measurements: HashMap<String, serde_json::Value>,
    pub confidence: f32,
    pub extraction_model: String,
}

impl ExtractedAction {
    pub fn new(
        document_id: Uuid,
        site_id: Uuid,
        kind: ActionKind,
        description: impl Into<String>,
        action_date: DateTime<Utc>,
        extraction_model: impl Into<String>,
    ) -> Self {
        let description = description.into();
        Self {
            id: Uuid::now_v7(),
            document_id,
            site_id,
            kind,
            // title = description per §4.H post-processing ("description
            // is the human-readable label").
            title: description.clone(),
            description,
            action_date,
            technicians: Vec::new(),
            work_order_number: None,
            outcome: None,
            primary_component_id: None,
            measurements: HashMap::new(),
            confidence: 1.0,
            extraction_model: extraction_model.into(),
        }
    }

    /// Clamp confidence into [0,1] per §4.H post-processing.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_technicians(mut self, technicians: Vec<String>) -> Self {
        self.technicians = technicians;
        self
    }

    pub fn with_work_order_number(mut self, wo: impl Into<String>) -> Self {
        self.work_order_number = Some(wo.into());
        self
    }

    pub fn with_primary_component(mut self, component_id: Uuid) -> Self {
        self.primary_component_id = Some(component_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamps_into_unit_interval() {
        let a = ExtractedAction::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            ActionKind::Maintenance,
            "replaced fan",
            Utc::now(),
            "gpt-4o",
        )
        .with_confidence(1.4);
        assert_eq!(a.confidence, 1.0);

        let b = ExtractedAction::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            ActionKind::Maintenance,
            "replaced fan",
            Utc::now(),
            "gpt-4o",
        )
        .with_confidence(-0.2);
        assert_eq!(b.confidence, 0.0);
    }

    #[test]
    fn title_mirrors_description() {
        let a = ExtractedAction::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            ActionKind::Repair,
            "Inverter 31 replaced",
            Utc::now(),
            "gpt-4o",
        );
        assert_eq!(a.title, "Inverter 31 replaced");
    }

    #[test]
    fn unrecognized_kind_and_status_fall_back() {
        assert_eq!(ActionKind::coerce("xyz"), ActionKind::Other);
        assert_eq!(ActionStatus::coerce("xyz"), ActionStatus::Completed);
    }
}

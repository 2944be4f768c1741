//! Site and Component entities (§3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A solar installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    /// Unique, human-readable code (e.g. "CA-FRESNO-12").
    pub site_code: String,
    pub name: String,
    /// Nameplate capacity in kW.
    pub capacity: Option<f64>,
    pub inverter_count: Option<u32>,
}

impl Site {
    pub fn new(site_code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_code: site_code.into(),
            name: name.into(),
            capacity: None,
            inverter_count: None,
        }
    }

    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_inverter_count(mut self, count: u32) -> Self {
        self.inverter_count = Some(count);
        self
    }
}

/// The kind of equipment a [`Component`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Inverter,
    Combiner,
    Panel,
    Transformer,
    Meter,
    Switchgear,
    Monitoring,
    Other,
}

impl ComponentKind {
    /// Coerce an arbitrary string (as might arrive from the completion
    /// provider) into the closed enum, defaulting unknown values to `Other`.
    pub fn coerce(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "inverter" => Self::Inverter,
            "combiner" => Self::Combiner,
            "panel" => Self::Panel,
            "transformer" => Self::Transformer,
            "meter" => Self::Meter,
            "switchgear" => Self::Switchgear,
            "monitoring" => Self::Monitoring,
            _ => Self::Other,
        }
    }
}

/// Operational status of a [`Component`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Operational,
    Fault,
    Maintenance,
    Offline,
}

/// A piece of equipment at a [`Site`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub site_id: Uuid,
    pub kind: ComponentKind,
    pub name: String,
    /// External identifier (e.g. manufacturer serial or SCADA tag). When
    /// present, unique within the site.
    pub external_id: Option<String>,
    #[serde(default)]
    pub specifications: HashMap<String, serde_json::Value>,
    pub status: ComponentStatus,
    pub embedding: Option<Vec<f32>>,
}

impl Component {
    pub fn new(site_id: Uuid, kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            site_id,
            kind,
            name: name.into(),
            external_id: None,
            specifications: HashMap::new(),
            status: ComponentStatus::Operational,
            embedding: None,
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_specification(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.specifications.insert(key.into(), value);
        self
    }

    pub fn with_status(mut self, status: ComponentStatus) -> Self {
        self.status = status;
        self
    }

    /// Look up a specification by an exact key/value equality probe,
    /// mirroring the store's `search_components_by_spec` contract (§4.F).
    pub fn matches_spec(&self, key: &str, value: &serde_json::Value) -> bool {
        self.specifications.get(key) == Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_unknown_component_kind_to_other() {
        assert_eq!(ComponentKind::coerce("inverter"), ComponentKind::Inverter);
        assert_eq!(ComponentKind::coerce("INVERTER"), ComponentKind::Inverter);
        assert_eq!(ComponentKind::coerce("gremlin"), ComponentKind::Other);
    }

    #[test]
    fn spec_match_is_exact_equality() {
        let site_id = Uuid::now_v7();
        let c = Component::new(site_id, ComponentKind::Inverter, "INV-31")
            .with_specification("phase", serde_json::json!("three"));
        assert!(c.matches_spec("phase", &serde_json::json!("three")));
        assert!(!c.matches_spec("phase", &serde_json::json!("single")));
        assert!(!c.matches_spec("voltage", &serde_json::json!("three")));
    }
}

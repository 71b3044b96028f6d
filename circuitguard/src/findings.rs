//! Structured compliance findings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::standards::Severity;

/// Detail bag attached to a finding.
pub type Details = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Cable,
    Voltage,
    Protection,
    Coordination,
    /// Findings raised by the engine itself
    Engine,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::Cable => "cable",
            RuleCategory::Voltage => "voltage",
            RuleCategory::Protection => "protection",
            RuleCategory::Coordination => "coordination",
            RuleCategory::Engine => "engine",
        }
    }
}

/// One way to resolve a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remedy {
    /// Machine-readable action, e.g. `increase_gauge`
    pub action: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_value: Option<Value>,
}

impl Remedy {
    pub fn new(action: &str, description: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            description: description.into(),
            suggested_value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.suggested_value = Some(value.into());
        self
    }
}

/// One rule's compliance failure for one circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonConformity {
    pub rule_code: String,
    pub rule_name: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub message: String,
    pub actual: Option<f64>,
    pub limit: Option<f64>,
    pub unit: String,
    pub compliant: bool,
    pub details: Details,
    pub normative_reference: String,
    pub remedies: Vec<Remedy>,
}

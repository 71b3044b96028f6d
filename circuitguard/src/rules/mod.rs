//! Compliance rules
//!
//! Each rule is gated on a set of [`TriggerField`]s, computes one compliance
//! test against the reference libraries and proposes remedies from its own
//! outcome. Rules are stateless and independent of each other.

pub mod cable;
pub mod protection;
pub mod voltage;

pub use cable::{CableAmpacityRule, CableVoltageRatingRule};
pub use protection::{LoopImpedanceRule, ProtectionSizingRule, SelectivityRule};
pub use voltage::{VoltageDropRule, VoltageRangeRule};

use std::sync::Arc;

use serde_json::Value;

use crate::cables::CableLibrary;
use crate::circuit::{CircuitRecord, TriggerField};
use crate::findings::{Details, NonConformity, Remedy, RuleCategory};
use crate::protection::ProtectionLibrary;
use crate::standards::{Severity, StandardsData};

/// Rule codes as they appear in findings.
pub mod codes {
    pub const CABLE_UNDERSIZED_AMPACITY: &str = "CABLE_UNDERSIZED_AMPACITY";
    pub const VOLTAGE_DROP_EXCESSIVE: &str = "VOLTAGE_DROP_EXCESSIVE";
    pub const PROTECTION_DEVICE_UNDERSIZED: &str = "PROTECTION_DEVICE_UNDERSIZED";
    pub const IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE: &str =
        "IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE";
    pub const VOLTAGE_OUT_OF_RANGE: &str = "VOLTAGE_OUT_OF_RANGE";
    pub const CABLE_VOLTAGE_RATING_EXCEEDED: &str = "CABLE_VOLTAGE_RATING_EXCEEDED";
    pub const COORDINATION_NOT_SELECTIVE: &str = "COORDINATION_NOT_SELECTIVE";
    /// Synthetic finding for a rule that failed to execute.
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("Missing field: {0}")]
    MissingField(TriggerField),
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    #[error("Calculation failed: {0}")]
    Calculation(String),
}

/// The three reference libraries, shared read-only by every rule.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub cables: Arc<CableLibrary>,
    pub protection: Arc<ProtectionLibrary>,
    pub standards: Arc<StandardsData>,
}

impl ReferenceData {
    pub fn new(
        cables: CableLibrary,
        protection: ProtectionLibrary,
        standards: StandardsData,
    ) -> Self {
        Self {
            cables: Arc::new(cables),
            protection: Arc::new(protection),
            standards: Arc::new(standards),
        }
    }
}

/// Result of [`Rule::calculate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub actual: Option<f64>,
    pub limit: Option<f64>,
    pub unit: &'static str,
    pub compliant: bool,
    pub message: String,
    pub details: Details,
}

impl RuleOutcome {
    /// Outcome of a numeric comparison.
    pub fn measured(actual: f64, limit: f64, unit: &'static str, compliant: bool) -> Self {
        Self {
            actual: Some(actual),
            limit: Some(limit),
            unit,
            compliant,
            message: String::new(),
            details: Details::new(),
        }
    }

    /// Non-compliant outcome for a value the reference tables do not know.
    pub fn unrecognized(field: &str, value: impl Into<Value>, reason: &str) -> Self {
        let value = value.into();
        let mut details = Details::new();
        details.insert("unrecognized".to_string(), Value::from(field));
        details.insert("value".to_string(), value.clone());
        Self {
            actual: None,
            limit: None,
            unit: "",
            compliant: false,
            message: format!("{} {} {}", field, value, reason),
            details,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// The record field the tables did not recognize, if any.
    pub fn unrecognized_field(&self) -> Option<&str> {
        self.details.get("unrecognized").and_then(Value::as_str)
    }

    pub fn detail_f64(&self, key: &str) -> Option<f64> {
        self.details.get(key).and_then(Value::as_f64)
    }

    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }
}

pub trait Rule: Send + Sync {
    fn code(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn category(&self) -> RuleCategory;
    fn severity(&self) -> Severity;
    fn trigger_fields(&self) -> &'static [TriggerField];
    fn normative_reference(&self) -> &'static str;

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError>;

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy>;

    /// All trigger fields are present on the record.
    fn is_triggered(&self, record: &CircuitRecord) -> bool {
        self.trigger_fields()
            .iter()
            .all(|field| field.is_present(record))
    }

    /// Build the finding for a non-compliant outcome.
    fn non_conformity(&self, outcome: RuleOutcome, data: &ReferenceData) -> NonConformity {
        let remedies = match outcome.unrecognized_field() {
            Some(field) => vec![Remedy::new(
                "correct_input",
                format!("Enter a value for '{}' that the reference tables list", field),
            )],
            None => self.remedy_options(&outcome, data),
        };
        NonConformity {
            rule_code: self.code().to_string(),
            rule_name: self.name().to_string(),
            category: self.category(),
            severity: self.severity(),
            message: outcome.message,
            actual: outcome.actual,
            limit: outcome.limit,
            unit: outcome.unit.to_string(),
            compliant: outcome.compliant,
            details: outcome.details,
            normative_reference: self.normative_reference().to_string(),
            remedies,
        }
    }
}

/// The ordered list of rules an engine evaluates.
#[derive(Clone)]
pub struct RuleSet {
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleSet {
    /// The seven built-in rules.
    pub fn standard() -> Self {
        let rules: Vec<Arc<dyn Rule>> = vec![
            Arc::new(CableAmpacityRule),
            Arc::new(VoltageDropRule),
            Arc::new(ProtectionSizingRule),
            Arc::new(LoopImpedanceRule),
            Arc::new(VoltageRangeRule),
            Arc::new(CableVoltageRatingRule),
            Arc::new(SelectivityRule),
        ];
        Self::from_rules(rules)
    }

    pub fn from_rules(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self { rules }
    }

    pub fn add_rule(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    pub fn get(&self, code: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.iter().find(|r| r.code().eq_ignore_ascii_case(code))
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.codes()).finish()
    }
}

/// Numeric field that the trigger gate has already checked.
pub(crate) fn required(value: Option<f64>, field: TriggerField) -> Result<f64, RuleError> {
    value
        .filter(|v| v.is_finite())
        .ok_or(RuleError::MissingField(field))
}

pub(crate) fn required_text(
    value: &Option<String>,
    field: TriggerField,
) -> Result<&str, RuleError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RuleError::MissingField(field))
}

/// Round for display in details; comparisons always use the raw value.
pub(crate) fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rule_set() {
        let rules = RuleSet::standard();
        assert_eq!(rules.len(), 7);
        assert_eq!(
            rules.codes(),
            vec![
                codes::CABLE_UNDERSIZED_AMPACITY,
                codes::VOLTAGE_DROP_EXCESSIVE,
                codes::PROTECTION_DEVICE_UNDERSIZED,
                codes::IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE,
                codes::VOLTAGE_OUT_OF_RANGE,
                codes::CABLE_VOLTAGE_RATING_EXCEEDED,
                codes::COORDINATION_NOT_SELECTIVE,
            ]
        );
        assert!(rules.get("voltage_out_of_range").is_some());
        assert!(rules.get("NOPE").is_none());
    }

    #[test]
    fn test_severities() {
        for rule in RuleSet::standard().iter() {
            let expected = match rule.code() {
                codes::VOLTAGE_DROP_EXCESSIVE | codes::COORDINATION_NOT_SELECTIVE => {
                    Severity::Warning
                }
                _ => Severity::Critical,
            };
            assert_eq!(rule.severity(), expected, "{}", rule.code());
        }
    }

    #[test]
    fn test_trigger_gate() {
        let rules = RuleSet::standard();
        let rule = rules.get(codes::VOLTAGE_OUT_OF_RANGE).unwrap();
        let mut record = CircuitRecord::new("c");
        assert!(!rule.is_triggered(&record));
        record.voltage = Some(230.0);
        assert!(rule.is_triggered(&record));
    }

    #[test]
    fn test_unrecognized_outcome() {
        let outcome = RuleOutcome::unrecognized(
            TriggerField::CableType.as_str(),
            "XYZ",
            "is not in the cable catalogue",
        );
        assert!(!outcome.compliant);
        assert_eq!(outcome.unrecognized_field(), Some("cableType"));
        assert_eq!(outcome.detail_str("value"), Some("XYZ"));
    }

    #[test]
    fn test_round() {
        assert_eq!(round(1.28869, 2), 1.29);
        assert_eq!(round(46.0, 1), 46.0);
    }
}

//! Validation engine shared by the library API, the scheduler and the CLI.
//! Purely synchronous; no I/O except the record loading helpers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::circuit::CircuitRecord;
use crate::findings::{Details, NonConformity, Remedy, RuleCategory};
use crate::rules::{codes, ReferenceData, Rule, RuleError, RuleSet};
use crate::standards::Severity;

#[derive(Debug, thiserror::Error)]
pub enum CircuitGuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// Options for validation runs (library, scheduler or CLI).
#[derive(Clone, Debug)]
pub struct ValidationOptions {
    /// Rule codes to evaluate; empty means all.
    pub rules: Vec<String>,
    /// Quiet period before a scheduled validation runs.
    pub debounce: Duration,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            rules: vec![],
            debounce: Duration::from_millis(500),
        }
    }
}

impl ValidationOptions {
    fn includes(&self, code: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|r| r.eq_ignore_ascii_case(code))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub rules_applicable: usize,
    pub compliant: Vec<String>,
    pub non_compliant: Vec<String>,
    /// Rules whose trigger fields were not all present
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Milliseconds
    pub execution_time: f64,
}

/// Per-circuit validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub circuit_id: String,
    pub timestamp: DateTime<Utc>,
    pub non_conformities: Vec<NonConformity>,
    pub summary: ValidationSummary,
    pub performance: Performance,
}

impl ValidationResult {
    pub fn is_compliant(&self) -> bool {
        self.non_conformities.is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.non_conformities
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn has_critical(&self) -> bool {
        self.count(Severity::Critical) > 0
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.non_conformities.iter().map(|n| n.severity).max()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchValidationResult {
    pub total_circuits: usize,
    pub valid_circuits: usize,
    pub circuits_with_issues: usize,
    pub critical_issues: usize,
    pub warnings: usize,
    pub circuit_results: Vec<ValidationResult>,
}

impl BatchValidationResult {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.circuit_results
            .iter()
            .filter_map(ValidationResult::highest_severity)
            .max()
    }
}

/// Runs the rule set against circuit records and caches the latest result
/// per circuit id.
#[derive(Debug)]
pub struct ValidationEngine {
    data: ReferenceData,
    rules: RuleSet,
    options: ValidationOptions,
    cache: RwLock<HashMap<String, ValidationResult>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Engine with the built-in reference tables and the seven standard rules.
    pub fn new() -> Self {
        Self::with_options(ValidationOptions::default())
    }

    pub fn with_options(options: ValidationOptions) -> Self {
        Self::from_parts(ReferenceData::default(), RuleSet::standard(), options)
    }

    pub fn from_parts(data: ReferenceData, rules: RuleSet, options: ValidationOptions) -> Self {
        Self {
            data,
            rules,
            options,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate one record. Rules whose trigger fields are incomplete are
    /// skipped; a rule that fails is reported as `VALIDATION_ERROR` and the
    /// remaining rules still run.
    pub fn validate(&self, record: &CircuitRecord) -> ValidationResult {
        let start = Instant::now();
        let circuit_id = if record.id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            record.id.clone()
        };

        let mut non_conformities = Vec::new();
        let mut summary = ValidationSummary {
            rules_applicable: 0,
            compliant: Vec::new(),
            non_compliant: Vec::new(),
            skipped: Vec::new(),
        };

        for rule in self.rules.iter().filter(|r| self.options.includes(r.code())) {
            if !rule.is_triggered(record) {
                debug!("Skipping {} for circuit {}: trigger fields incomplete", rule.code(), circuit_id);
                summary.skipped.push(rule.code().to_string());
                continue;
            }

            summary.rules_applicable += 1;
            match rule.calculate(record, &self.data) {
                Ok(outcome) if outcome.compliant => {
                    summary.compliant.push(rule.code().to_string());
                }
                Ok(outcome) => {
                    summary.non_compliant.push(rule.code().to_string());
                    non_conformities.push(rule.non_conformity(outcome, &self.data));
                }
                Err(err) => {
                    warn!("Rule {} failed for circuit {}: {}", rule.code(), circuit_id, err);
                    summary.non_compliant.push(rule.code().to_string());
                    non_conformities.push(validation_error(rule.as_ref(), &err));
                }
            }
        }

        let result = ValidationResult {
            circuit_id,
            timestamp: Utc::now(),
            non_conformities,
            summary,
            performance: Performance {
                execution_time: start.elapsed().as_secs_f64() * 1000.0,
            },
        };

        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(result.circuit_id.clone(), result.clone());

        result
    }

    /// Validate records in order. Every record is validated; a failing
    /// circuit never stops the batch.
    pub fn validate_batch(&self, records: &[CircuitRecord]) -> BatchValidationResult {
        let mut batch = BatchValidationResult {
            total_circuits: records.len(),
            valid_circuits: 0,
            circuits_with_issues: 0,
            critical_issues: 0,
            warnings: 0,
            circuit_results: Vec::with_capacity(records.len()),
        };

        for record in records {
            let result = self.validate(record);
            if result.is_compliant() {
                batch.valid_circuits += 1;
            } else {
                batch.circuits_with_issues += 1;
            }
            batch.critical_issues += result.count(Severity::Critical);
            batch.warnings += result.count(Severity::Warning);
            batch.circuit_results.push(result);
        }

        info!(
            "Validated {} circuits: {} valid, {} with issues ({} critical, {} warnings)",
            batch.total_circuits,
            batch.valid_circuits,
            batch.circuits_with_issues,
            batch.critical_issues,
            batch.warnings
        );

        batch
    }

    /// Latest cached result for a circuit.
    pub fn cached(&self, circuit_id: &str) -> Option<ValidationResult> {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(circuit_id)
            .cloned()
    }

    pub fn cache_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

fn validation_error(rule: &dyn Rule, err: &RuleError) -> NonConformity {
    let mut details = Details::new();
    details.insert("rule".to_string(), rule.code().into());
    details.insert("error".to_string(), err.to_string().into());

    NonConformity {
        rule_code: codes::VALIDATION_ERROR.to_string(),
        rule_name: format!("{} could not be evaluated", rule.name()),
        category: RuleCategory::Engine,
        severity: Severity::Critical,
        message: format!("{} failed: {}", rule.code(), err),
        actual: None,
        limit: None,
        unit: String::new(),
        compliant: false,
        details,
        normative_reference: rule.normative_reference().to_string(),
        remedies: vec![Remedy::new(
            "check_input",
            "Check the circuit's values; the rule could not be evaluated with them",
        )],
    }
}

/// Parse circuit records from JSON holding either one record or an array.
pub fn parse_circuit_records(json: &str) -> Result<Vec<CircuitRecord>, CircuitGuardError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let records = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(value)?],
        other => {
            return Err(CircuitGuardError::Other(format!(
                "Expected a circuit record or an array of records, found {}",
                json_kind(&other)
            )))
        }
    };
    Ok(records)
}

/// Load circuit records from a JSON file.
pub fn load_circuit_records(path: &Path) -> Result<Vec<CircuitRecord>, CircuitGuardError> {
    let content = std::fs::read_to_string(path)?;
    parse_circuit_records(&content)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::LoadType;

    fn compliant_record() -> CircuitRecord {
        CircuitRecord {
            voltage: Some(230.0),
            current: Some(10.0),
            frequency: Some(50.0),
            phase_count: Some(1),
            cable_type: Some("NYM-J".to_string()),
            gauge: Some(2.5),
            distance: Some(20.0),
            installation_method: Some("conduit/tray".to_string()),
            ambient_temperature: Some(30.0),
            grouping_count: Some(1),
            protection_device_type: Some("B16".to_string()),
            protection_current: Some(16.0),
            loop_impedance: Some(0.8),
            load_type: Some(LoadType::Socket),
            power_factor: Some(1.0),
            upstream_device_type: Some("C32".to_string()),
            downstream_device_type: Some("B16".to_string()),
            ..CircuitRecord::new("C-001")
        }
    }

    #[test]
    fn test_compliant_record_has_no_findings() {
        let engine = ValidationEngine::new();
        let result = engine.validate(&compliant_record());
        assert!(result.is_compliant(), "{:?}", result.non_conformities);
        assert_eq!(result.summary.rules_applicable, 7);
        assert_eq!(result.summary.compliant.len(), 7);
        assert!(result.summary.skipped.is_empty());
    }

    #[test]
    fn test_empty_record_skips_everything() {
        let engine = ValidationEngine::new();
        let result = engine.validate(&CircuitRecord::new("empty"));
        assert_eq!(result.summary.rules_applicable, 0);
        assert_eq!(result.summary.skipped.len(), 7);
        assert!(result.is_compliant());
    }

    #[test]
    fn test_rule_error_becomes_validation_error() {
        let engine = ValidationEngine::new();
        let mut record = compliant_record();
        record.voltage = Some(0.0);
        let result = engine.validate(&record);

        let errors: Vec<_> = result
            .non_conformities
            .iter()
            .filter(|n| n.rule_code == codes::VALIDATION_ERROR)
            .collect();
        // Voltage drop and loop impedance both reject 0 V
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.severity == Severity::Critical));
        assert_eq!(result.summary.rules_applicable, 7);
        // The remaining rules still ran
        assert!(result
            .non_conformities
            .iter()
            .any(|n| n.rule_code == codes::VOLTAGE_OUT_OF_RANGE));
    }

    #[test]
    fn test_options_restrict_rules() {
        let engine = ValidationEngine::with_options(ValidationOptions {
            rules: vec!["voltage_out_of_range".to_string()],
            ..Default::default()
        });
        let mut record = compliant_record();
        record.voltage = Some(410.0);
        record.distance = Some(500.0);
        let result = engine.validate(&record);
        assert_eq!(result.summary.rules_applicable, 1);
        assert_eq!(result.non_conformities.len(), 1);
        assert_eq!(result.non_conformities[0].rule_code, codes::VOLTAGE_OUT_OF_RANGE);
    }

    #[test]
    fn test_cache_last_write_wins() {
        let engine = ValidationEngine::new();
        let mut record = compliant_record();
        engine.validate(&record);
        assert!(engine.cached("C-001").unwrap().is_compliant());

        record.voltage = Some(410.0);
        engine.validate(&record);
        assert_eq!(engine.cache_len(), 1);
        assert!(!engine.cached("C-001").unwrap().is_compliant());

        engine.clear_cache();
        assert!(engine.cached("C-001").is_none());
    }

    #[test]
    fn test_empty_id_gets_generated() {
        let engine = ValidationEngine::new();
        let mut record = compliant_record();
        record.id = String::new();
        let result = engine.validate(&record);
        assert!(uuid::Uuid::parse_str(&result.circuit_id).is_ok());
        assert!(engine.cached(&result.circuit_id).is_some());
    }

    #[test]
    fn test_batch_counts() {
        let engine = ValidationEngine::new();
        let mut bad = compliant_record();
        bad.id = "C-002".to_string();
        bad.voltage = Some(410.0);
        // 5.4 % drop at 410 V
        bad.distance = Some(150.0);
        let batch = engine.validate_batch(&[compliant_record(), bad]);
        assert_eq!(batch.total_circuits, 2);
        assert_eq!(batch.valid_circuits, 1);
        assert_eq!(batch.circuits_with_issues, 1);
        assert_eq!(batch.critical_issues, 1);
        assert_eq!(batch.warnings, 1);
        assert_eq!(batch.highest_severity(), Some(Severity::Critical));
    }

    #[test]
    fn test_parse_single_and_array() {
        let single = parse_circuit_records(r#"{"id": "a", "voltage": 230}"#).unwrap();
        assert_eq!(single.len(), 1);
        let many = parse_circuit_records(r#"[{"id": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert!(matches!(
            parse_circuit_records("42"),
            Err(CircuitGuardError::Other(_))
        ));
        assert!(matches!(
            parse_circuit_records("{not json"),
            Err(CircuitGuardError::Json(_))
        ));
    }
}

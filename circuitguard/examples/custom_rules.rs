//! Example: adding a project-specific rule next to the standard ones.
//! Run with: cargo run --example custom_rules

use std::sync::Arc;

use circuitguard::findings::{Remedy, RuleCategory};
use circuitguard::rules::{ReferenceData, Rule, RuleError, RuleOutcome};
use circuitguard::{
    CircuitRecord, RuleSet, Severity, TriggerField, ValidationEngine, ValidationOptions,
};

/// Site rule: final circuits longer than 50 m need a documented exception.
struct MaxRunLengthRule;

const MAX_RUN_M: f64 = 50.0;

impl Rule for MaxRunLengthRule {
    fn code(&self) -> &'static str {
        "SITE_RUN_TOO_LONG"
    }

    fn name(&self) -> &'static str {
        "Site run length"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Cable
    }

    fn severity(&self) -> Severity {
        Severity::Info
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[TriggerField::Distance]
    }

    fn normative_reference(&self) -> &'static str {
        "Site installation guideline 4.2"
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        _data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let distance = record
            .distance
            .ok_or(RuleError::MissingField(TriggerField::Distance))?;
        Ok(
            RuleOutcome::measured(distance, MAX_RUN_M, "m", distance <= MAX_RUN_M)
                .with_message(format!("Run of {} m exceeds the site limit of {} m", distance, MAX_RUN_M)),
        )
    }

    fn remedy_options(&self, _outcome: &RuleOutcome, _data: &ReferenceData) -> Vec<Remedy> {
        vec![Remedy::new(
            "document_exception",
            "Record the exception in the installation log",
        )]
    }
}

fn main() {
    let mut rules = RuleSet::standard();
    rules.add_rule(Arc::new(MaxRunLengthRule));

    let engine =
        ValidationEngine::from_parts(ReferenceData::default(), rules, ValidationOptions::default());

    let record = CircuitRecord {
        voltage: Some(230.0),
        current: Some(10.0),
        phase_count: Some(1),
        cable_type: Some("NYM-J".to_string()),
        gauge: Some(2.5),
        distance: Some(65.0),
        ..CircuitRecord::new("garage")
    };

    let result = engine.validate(&record);
    println!(
        "{}: {} findings from {} applicable rules",
        result.circuit_id,
        result.non_conformities.len(),
        result.summary.rules_applicable
    );
    for finding in &result.non_conformities {
        println!("  [{}] {}: {}", finding.severity, finding.rule_code, finding.message);
    }
}

//! Integration tests for the CircuitGuard library

use circuitguard::prelude::*;
use circuitguard::rules::codes;
use circuitguard::{load_circuit_records, CircuitGuardError};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn compliant_record() -> CircuitRecord {
    let mut records =
        load_circuit_records(&fixture_path("compliant_circuit.json")).expect("Should load fixture");
    assert_eq!(records.len(), 1);
    records.remove(0)
}

#[test]
fn test_compliant_circuit_has_no_findings() {
    let engine = ValidationEngine::new();
    let result = engine.validate(&compliant_record());

    assert_eq!(result.circuit_id, "C-001");
    assert!(
        result.non_conformities.is_empty(),
        "Compliant circuit should have no findings: {:?}",
        result
            .non_conformities
            .iter()
            .map(|n| &n.message)
            .collect::<Vec<_>>()
    );
    assert_eq!(result.summary.rules_applicable, 7);
    assert!(result.summary.non_compliant.is_empty());
}

#[test]
fn test_single_violation_yields_single_finding() {
    let engine = ValidationEngine::new();

    let variants: Vec<(&str, Box<dyn Fn(&mut CircuitRecord)>)> = vec![
        (
            codes::CABLE_UNDERSIZED_AMPACITY,
            Box::new(|r: &mut CircuitRecord| r.grouping_count = Some(12)),
        ),
        (
            codes::VOLTAGE_DROP_EXCESSIVE,
            Box::new(|r: &mut CircuitRecord| r.distance = Some(80.0)),
        ),
        (
            codes::PROTECTION_DEVICE_UNDERSIZED,
            Box::new(|r: &mut CircuitRecord| {
                r.protection_device_type = Some("B6".to_string());
                r.protection_current = Some(6.0);
            }),
        ),
        (
            codes::IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE,
            Box::new(|r: &mut CircuitRecord| r.loop_impedance = Some(4.0)),
        ),
        (
            codes::VOLTAGE_OUT_OF_RANGE,
            Box::new(|r: &mut CircuitRecord| r.voltage = Some(410.0)),
        ),
        (
            codes::CABLE_VOLTAGE_RATING_EXCEEDED,
            Box::new(|r: &mut CircuitRecord| r.voltage = Some(690.0)),
        ),
        (
            codes::COORDINATION_NOT_SELECTIVE,
            Box::new(|r: &mut CircuitRecord| r.upstream_device_type = Some("C20".to_string())),
        ),
    ];

    for (code, mutate) in variants {
        let mut record = compliant_record();
        mutate(&mut record);
        let result = engine.validate(&record);
        let found: Vec<_> = result
            .non_conformities
            .iter()
            .map(|n| n.rule_code.as_str())
            .collect();
        assert_eq!(found, vec![code], "Expected only {}", code);

        let finding = &result.non_conformities[0];
        assert!(!finding.compliant);
        assert!(!finding.normative_reference.is_empty());
        assert!(!finding.remedies.is_empty(), "{} has no remedies", code);
    }
}

#[test]
fn test_revalidation_is_stable() {
    let engine = ValidationEngine::new();
    let mut record = compliant_record();
    record.distance = Some(80.0);
    record.voltage = Some(410.0);

    let first = engine.validate(&record);
    let second = engine.validate(&record);
    assert_eq!(first.non_conformities, second.non_conformities);
    assert_eq!(first.summary, second.summary);
}

#[test]
fn test_partial_record_skips_rules() {
    let engine = ValidationEngine::new();
    let mut record = CircuitRecord::new("partial");
    record.voltage = Some(230.0);
    record.cable_type = Some("NYM".to_string());

    let result = engine.validate(&record);
    assert_eq!(result.summary.rules_applicable, 2);
    assert_eq!(result.summary.skipped.len(), 5);
    assert!(result.non_conformities.is_empty());
}

#[test]
fn test_scenario_feeder_undersized() {
    let engine = ValidationEngine::new();
    let record = CircuitRecord {
        voltage: Some(400.0),
        current: Some(100.0),
        phase_count: Some(3),
        cable_type: Some("NYY".to_string()),
        gauge: Some(10.0),
        distance: Some(100.0),
        installation_method: Some("conduit/tray".to_string()),
        ambient_temperature: Some(30.0),
        ..CircuitRecord::new("feeder")
    };

    let result = engine.validate(&record);
    let codes_found: Vec<_> = result
        .non_conformities
        .iter()
        .map(|n| n.rule_code.as_str())
        .collect();
    assert!(codes_found.contains(&codes::CABLE_UNDERSIZED_AMPACITY));
    assert!(codes_found.contains(&codes::VOLTAGE_DROP_EXCESSIVE));

    let ampacity = result
        .non_conformities
        .iter()
        .find(|n| n.rule_code == codes::CABLE_UNDERSIZED_AMPACITY)
        .unwrap();
    assert_eq!(ampacity.limit, Some(46.0));
    assert_eq!(ampacity.severity, Severity::Critical);
}

#[test]
fn test_scenario_nominal_voltage() {
    let engine = ValidationEngine::new();
    let mut record = CircuitRecord::new("v");
    record.voltage = Some(410.0);

    let result = engine.validate(&record);
    assert_eq!(result.non_conformities.len(), 1);
    let finding = &result.non_conformities[0];
    assert_eq!(finding.rule_code, codes::VOLTAGE_OUT_OF_RANGE);
    assert_eq!(
        finding.details.get("nearestValidVoltage").and_then(|v| v.as_f64()),
        Some(400.0)
    );
}

#[test]
fn test_batch_validation_from_fixture() {
    let records = load_circuit_records(&fixture_path("project.json")).expect("Should load project");
    let engine = ValidationEngine::new();
    let batch = engine.validate_batch(&records);

    assert_eq!(batch.total_circuits, 3);
    assert_eq!(batch.valid_circuits, 1);
    assert_eq!(batch.circuits_with_issues, 2);
    assert_eq!(batch.critical_issues, 2);
    assert_eq!(batch.warnings, 1);

    let ids: Vec<_> = batch.circuit_results.iter().map(|r| r.circuit_id.as_str()).collect();
    assert_eq!(ids, vec!["C-001", "F-100", "DRAFT-7"]);
    assert_eq!(engine.cache_len(), 3);
}

#[test]
fn test_result_json_shape() {
    let engine = ValidationEngine::new();
    let mut record = compliant_record();
    record.loop_impedance = Some(4.0);
    let result = engine.validate(&record);

    let json = serde_json::to_value(&result).expect("Should serialize");
    assert_eq!(json["circuitId"], "C-001");
    assert!(json["timestamp"].is_string());
    assert_eq!(json["summary"]["rulesApplicable"], 7);
    assert!(json["performance"]["executionTime"].is_number());

    let finding = &json["nonConformities"][0];
    assert_eq!(finding["ruleCode"], codes::IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE);
    assert_eq!(finding["severity"], "CRITICAL");
    assert_eq!(finding["category"], "protection");
    assert_eq!(finding["unit"], "Ω");
    assert!(finding["remedies"][0]["action"].is_string());

    let batch = serde_json::to_value(engine.validate_batch(&[record])).unwrap();
    for key in [
        "totalCircuits",
        "validCircuits",
        "circuitsWithIssues",
        "criticalIssues",
        "warnings",
        "circuitResults",
    ] {
        assert!(batch.get(key).is_some(), "missing {}", key);
    }
}

#[test]
fn test_load_errors() {
    let missing = load_circuit_records(&fixture_path("does_not_exist.json"));
    assert!(matches!(missing, Err(CircuitGuardError::Io(_))));

    let malformed = load_circuit_records(&fixture_path("malformed.json"));
    assert!(matches!(malformed, Err(CircuitGuardError::Json(_))));
}

#[test]
fn test_load_from_temp_file() {
    let dir = tempfile::tempdir().expect("Should create temp dir");

    let single = dir.path().join("single.json");
    std::fs::write(&single, r#"{"id": "T-1", "voltage": 230, "loadType": "lighting"}"#)
        .expect("Should write file");
    let records = load_circuit_records(&single).expect("Should load single record");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "T-1");

    let scalar = dir.path().join("scalar.json");
    std::fs::write(&scalar, "42").expect("Should write file");
    assert!(matches!(
        load_circuit_records(&scalar),
        Err(CircuitGuardError::Other(_))
    ));
}

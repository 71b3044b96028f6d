//! Simple validation example: validate the circuits in a JSON file and print results.

use circuitguard::load_circuit_records;
use circuitguard::prelude::*;
use std::path::Path;

fn main() -> Result<(), CircuitGuardError> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tests/fixtures/project.json".to_string());
    let path = Path::new(&path);

    if !path.exists() {
        eprintln!("File not found: {}", path.display());
        eprintln!("Usage: cargo run --example simple_validation [path/to/circuits.json]");
        std::process::exit(1);
    }

    let records = load_circuit_records(path)?;
    let engine = ValidationEngine::new();
    let batch = engine.validate_batch(&records);

    println!("Validation results for: {}", path.display());
    println!(
        "Circuits: {} ({} valid, {} with issues)",
        batch.total_circuits, batch.valid_circuits, batch.circuits_with_issues
    );
    println!();

    for result in &batch.circuit_results {
        println!(
            "{}: {} of {} applicable rules failed",
            result.circuit_id,
            result.summary.non_compliant.len(),
            result.summary.rules_applicable
        );
        for finding in &result.non_conformities {
            println!("  - [{}] {}", finding.severity, finding.message);
            for remedy in &finding.remedies {
                println!("    Remedy: {}", remedy.description);
            }
        }
    }

    if batch.critical_issues > 0 {
        println!("\nValidation failed ({} critical issues).", batch.critical_issues);
        std::process::exit(1);
    }

    println!("\nValidation passed (no critical issues).");
    Ok(())
}

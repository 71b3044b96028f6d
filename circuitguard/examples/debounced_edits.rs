//! Example: coalescing rapid edits with the validation scheduler.
//! Run with: cargo run --example debounced_edits

use std::sync::Arc;
use std::time::Duration;

use circuitguard::{CircuitRecord, ValidationEngine, ValidationScheduler};

#[tokio::main]
async fn main() {
    let engine = Arc::new(ValidationEngine::new());
    let scheduler = ValidationScheduler::with_delay(engine, Duration::from_millis(200));
    let mut results = scheduler.subscribe();

    // A user typing "400" into the voltage field
    let mut record = CircuitRecord::new("C-007");
    for voltage in [4.0, 40.0, 400.0] {
        record.voltage = Some(voltage);
        scheduler.schedule(record.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    println!("Pending: {:?}", scheduler.pending());

    match results.recv().await {
        Ok(result) => println!(
            "{} validated once, {} findings",
            result.circuit_id,
            result.non_conformities.len()
        ),
        Err(e) => eprintln!("No result: {}", e),
    }
}

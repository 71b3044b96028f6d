use criterion::{black_box, criterion_group, criterion_main, Criterion};
use circuitguard::load_circuit_records;
use circuitguard::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn project_records() -> Vec<CircuitRecord> {
    load_circuit_records(&fixture_path("project.json")).expect("fixture should load")
}

fn bench_validate_circuit(c: &mut Criterion) {
    let engine = ValidationEngine::new();
    let record = project_records().remove(0);

    c.bench_function("validate_circuit", |b| {
        b.iter(|| engine.validate(black_box(&record)));
    });
}

fn bench_validate_batch(c: &mut Criterion) {
    let engine = ValidationEngine::new();
    let template = project_records();
    let records: Vec<CircuitRecord> = (0..48)
        .map(|i| {
            let mut record = template[i % template.len()].clone();
            record.id = format!("{}-{}", record.id, i);
            record
        })
        .collect();

    c.bench_function("validate_batch_48", |b| {
        b.iter(|| engine.validate_batch(black_box(&records)));
    });
}

criterion_group!(benches, bench_validate_circuit, bench_validate_batch);
criterion_main!(benches);

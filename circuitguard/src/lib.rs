//! CircuitGuard - electrical circuit compliance validation library
//!
//! Validates circuit designs against a fixed low-voltage wiring code: cable
//! ampacity, voltage drop, protection device sizing, earth-fault loop
//! impedance, nominal voltage, cable voltage rating and selectivity between
//! protective devices. Findings are advisory, not a safety sign-off.
//!
//! # Quick Start
//!
//! ```
//! use circuitguard::{CircuitRecord, ValidationEngine};
//!
//! let engine = ValidationEngine::new();
//!
//! let mut record = CircuitRecord::new("C-001");
//! record.voltage = Some(410.0);
//!
//! let result = engine.validate(&record);
//! for finding in &result.non_conformities {
//!     println!("{}: {}", finding.severity, finding.message);
//! }
//! assert_eq!(result.non_conformities.len(), 1);
//! ```
//!
//! # Features
//!
//! - **Reference libraries**: cable ampacity and derating, impedance, protective
//!   device characteristics, wiring-code constants
//! - **Rules**: seven independent rules gated on the fields a record provides
//! - **Engine**: per-circuit results with a cache, batch validation
//! - **Debounce**: coalesces rapid edits into one validation per circuit

pub mod cables;
pub mod circuit;
pub mod core;
pub mod debounce;
pub mod findings;
pub mod protection;
pub mod rules;
pub mod standards;

// Re-export main types
pub use cables::{CableLibrary, Gauge, InstallationMethod};
pub use circuit::{CircuitRecord, LoadType, TriggerField};
pub use core::{
    load_circuit_records, parse_circuit_records, BatchValidationResult, CircuitGuardError,
    ValidationEngine, ValidationOptions, ValidationResult, ValidationSummary,
};
pub use debounce::ValidationScheduler;
pub use findings::{NonConformity, Remedy, RuleCategory};
pub use protection::{DeviceFamily, ProtectionLibrary};
pub use rules::{ReferenceData, Rule, RuleError, RuleOutcome, RuleSet};
pub use standards::{Severity, StandardsData};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BatchValidationResult, CircuitGuardError, CircuitRecord, NonConformity, RuleSet,
        Severity, ValidationEngine, ValidationOptions, ValidationResult,
    };
}

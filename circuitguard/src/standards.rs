//! Wiring-code constants
//!
//! Nominal voltages and frequencies, voltage-drop ceilings, the protective
//! device size ladder, the severity taxonomy and the earth-fault loop
//! impedance limit:
//!
//! ```text
//! Z_max = U₀ / (I_a × 0.8)
//!
//! Where:
//! - U₀  = nominal line-to-earth voltage (V)
//! - I_a = current causing automatic disconnection (A)
//! - 0.8 = allowance for conductor heating during the fault
//! ```

use serde::{Deserialize, Serialize};

use crate::circuit::LoadType;

/// Nominal system voltages (V).
pub const VALID_VOLTAGES: [f64; 7] = [12.0, 24.0, 48.0, 110.0, 230.0, 400.0, 690.0];

/// Nominal system frequencies (Hz).
pub const VALID_FREQUENCIES: [f64; 2] = [50.0, 60.0];

/// Voltage-drop ceiling for lighting circuits (%).
pub const LIGHTING_DROP_LIMIT_PERCENT: f64 = 3.0;

/// Voltage-drop ceiling for every other load (%).
pub const GENERAL_DROP_LIMIT_PERCENT: f64 = 5.0;

/// Standard rated currents for protective devices (A).
pub const DEVICE_SIZE_LADDER: [f64; 16] = [
    6.0, 10.0, 13.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0,
    250.0,
];

/// Conductor heating allowance in the loop impedance limit.
pub const LOOP_IMPEDANCE_FACTOR: f64 = 0.8;

/// Line-to-earth voltage assumed when only a fault path is known.
pub const NOMINAL_LINE_TO_EARTH: f64 = 230.0;

/// Defaults applied when optional record fields are missing.
pub const DEFAULT_AMBIENT_TEMPERATURE: f64 = 30.0;
pub const DEFAULT_GROUPING_COUNT: u32 = 1;
pub const DEFAULT_POWER_FACTOR: f64 = 0.85;
pub const DEFAULT_INSTALLATION_METHOD: &str = "conduit/tray";

/// Normative references quoted in findings.
pub mod references {
    pub const AMPACITY: &str = "DIN VDE 0298-4:2013-06, Tab. 3/4, 17, 21";
    pub const VOLTAGE_DROP: &str = "DIN VDE 0100-520:2013-06, Anhang G; DIN 18015-1";
    pub const OVERLOAD_PROTECTION: &str = "DIN VDE 0100-430:2010-10, 433.1";
    pub const DISCONNECTION: &str = "DIN VDE 0100-410:2018-10, 411.4.4";
    pub const NOMINAL_VOLTAGE: &str = "DIN EN 60038 (VDE 0175-1):2012-04";
    pub const CABLE_RATING: &str = "DIN VDE 0298-3:2006-06, 4.2";
    pub const SELECTIVITY: &str = "DIN VDE 0100-530:2018-06, 536.4";
}

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constants and lookups of the wiring code.
///
/// The built-in values come from [`StandardsData::new`]; fields are public so
/// a caller can construct substitute tables for testing.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardsData {
    pub valid_voltages: Vec<f64>,
    pub valid_frequencies: Vec<f64>,
    pub lighting_drop_limit: f64,
    pub general_drop_limit: f64,
    pub device_ladder: Vec<f64>,
    pub loop_impedance_factor: f64,
}

impl Default for StandardsData {
    fn default() -> Self {
        Self {
            valid_voltages: VALID_VOLTAGES.to_vec(),
            valid_frequencies: VALID_FREQUENCIES.to_vec(),
            lighting_drop_limit: LIGHTING_DROP_LIMIT_PERCENT,
            general_drop_limit: GENERAL_DROP_LIMIT_PERCENT,
            device_ladder: DEVICE_SIZE_LADDER.to_vec(),
            loop_impedance_factor: LOOP_IMPEDANCE_FACTOR,
        }
    }
}

impl StandardsData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid_voltage(&self, voltage: f64) -> bool {
        self.valid_voltages
            .iter()
            .any(|v| (v - voltage).abs() < f64::EPSILON * v.max(1.0))
    }

    pub fn is_valid_frequency(&self, frequency: f64) -> bool {
        self.valid_frequencies
            .iter()
            .any(|f| (f - frequency).abs() < f64::EPSILON * f.max(1.0))
    }

    /// Closest nominal voltage by absolute difference. Ties go to the lower
    /// voltage.
    pub fn nearest_valid_voltage(&self, voltage: f64) -> Option<f64> {
        self.valid_voltages.iter().copied().fold(None, |best, v| match best {
            Some(b) if (b - voltage).abs() <= (v - voltage).abs() => Some(b),
            _ => Some(v),
        })
    }

    /// Maximum permitted voltage drop (%) for a load type.
    pub fn max_voltage_drop_percent(&self, load_type: LoadType) -> f64 {
        match load_type {
            LoadType::Lighting => self.lighting_drop_limit,
            _ => self.general_drop_limit,
        }
    }

    /// Line-to-earth voltage U₀ for a nominal voltage.
    pub fn line_to_earth_voltage(&self, voltage: f64, three_phase: bool) -> f64 {
        if three_phase {
            voltage / 3f64.sqrt()
        } else {
            voltage
        }
    }

    /// `Z_max = U₀ / (I_trip × 0.8)`; `None` for a non-positive trip current.
    pub fn max_loop_impedance(&self, u0: f64, trip_current: f64) -> Option<f64> {
        if trip_current <= 0.0 || !trip_current.is_finite() {
            return None;
        }
        Some(u0 / (trip_current * self.loop_impedance_factor))
    }
}

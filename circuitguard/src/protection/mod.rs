//! Protection Device Reference Library
//!
//! Catalogue of miniature circuit breakers (MCB) and combined residual
//! current breakers (RCBO), their tripping characteristics, a coarse trip
//! time envelope, let-through energy and selectivity between two devices.
//!
//! Tripping characteristics as multiples of the rated current `I_n`:
//!
//! ```text
//! Family | instantaneous trip range
//! -------|-------------------------
//!   Z    |  2 – 3   × I_n
//!   B    |  3 – 5   × I_n
//!   C    |  5 – 10  × I_n
//!   K    |  8 – 14  × I_n
//!   D    | 10 – 20  × I_n
//! ```
//!
//! The trip time and I²t models are advisory envelopes, not manufacturer
//! curves.

pub mod library;

pub use library::{
    LetThroughEnergy, EnergySource, ProtectionLibrary, SelectivityAssessment, TripRegion,
    TripTime,
};

use serde::{Deserialize, Serialize};

/// Conventional non-tripping current (× I_n).
pub const CONVENTIONAL_NON_TRIP: f64 = 1.13;

/// Conventional tripping current (× I_n).
pub const CONVENTIONAL_TRIP: f64 = 1.45;

/// Minimum upstream/downstream rated current ratio for selectivity.
pub const SELECTIVITY_RATIO: f64 = 1.6;

/// Tripping characteristic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceFamily {
    B,
    C,
    D,
    K,
    Z,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 5] = [
        DeviceFamily::B,
        DeviceFamily::C,
        DeviceFamily::D,
        DeviceFamily::K,
        DeviceFamily::Z,
    ];

    /// Family with the highest instantaneous trip multiple, i.e. the one
    /// that permits the lowest loop impedance.
    pub const MOST_CONSERVATIVE: DeviceFamily = DeviceFamily::D;

    pub fn letter(&self) -> char {
        match self {
            DeviceFamily::B => 'B',
            DeviceFamily::C => 'C',
            DeviceFamily::D => 'D',
            DeviceFamily::K => 'K',
            DeviceFamily::Z => 'Z',
        }
    }

    pub fn from_letter(c: char) -> Option<DeviceFamily> {
        match c.to_ascii_uppercase() {
            'B' => Some(DeviceFamily::B),
            'C' => Some(DeviceFamily::C),
            'D' => Some(DeviceFamily::D),
            'K' => Some(DeviceFamily::K),
            'Z' => Some(DeviceFamily::Z),
            _ => None,
        }
    }

    pub fn characteristic(&self) -> Characteristic {
        let (min, max, description) = match self {
            DeviceFamily::B => (3.0, 5.0, "Line protection, resistive loads"),
            DeviceFamily::C => (5.0, 10.0, "Line protection, moderate inrush loads"),
            DeviceFamily::D => (10.0, 20.0, "High inrush loads, transformers"),
            DeviceFamily::K => (8.0, 14.0, "Motors and transformers"),
            DeviceFamily::Z => (2.0, 3.0, "Semiconductor and measuring circuits"),
        };
        Characteristic {
            family: *self,
            trip_point: TripPoint { min, max },
            description: description.to_string(),
        }
    }
}

impl std::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Instantaneous trip range as multiples of the rated current.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripPoint {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Characteristic {
    pub family: DeviceFamily,
    pub trip_point: TripPoint,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceKind {
    Mcb,
    Rcbo,
}

/// Catalogue entry for one protective device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectionDeviceSpec {
    pub code: String,
    pub kind: DeviceKind,
    pub family: DeviceFamily,
    /// Rated current I_n (A)
    pub rated_current: f64,
    /// Residual current sensitivity I_Δn (mA), RCBO only
    pub sensitivity: Option<f64>,
    /// Typical instantaneous response (ms)
    pub response_time: f64,
    pub poles: u8,
    /// Rated short-circuit capacity (kA)
    pub breaking_capacity: f64,
}

impl ProtectionDeviceSpec {
    pub fn characteristic(&self) -> Characteristic {
        self.family.characteristic()
    }
}

/// Current threshold used by [`ProtectionLibrary::get_minimum_fault_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    Instantaneous,
    Thermal,
}

/// Normalize a device code: upper case, blanks removed, trailing unit `A`
/// dropped (`"b 16a"` → `"B16"`).
pub fn normalize_device_code(code: &str) -> String {
    let compact: String = code
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    match compact.strip_suffix('A') {
        Some(stripped) if stripped.ends_with(|c: char| c.is_ascii_digit()) => stripped.to_string(),
        _ => compact,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_letters() {
        for family in DeviceFamily::ALL {
            assert_eq!(DeviceFamily::from_letter(family.letter()), Some(family));
        }
        assert_eq!(DeviceFamily::from_letter('c'), Some(DeviceFamily::C));
        assert_eq!(DeviceFamily::from_letter('X'), None);
    }

    #[test]
    fn test_most_conservative_has_highest_trip_multiple() {
        let conservative = DeviceFamily::MOST_CONSERVATIVE.characteristic().trip_point.min;
        for family in DeviceFamily::ALL {
            assert!(family.characteristic().trip_point.min <= conservative);
        }
    }

    #[test]
    fn test_normalize_device_code() {
        assert_eq!(normalize_device_code("b 16a"), "B16");
        assert_eq!(normalize_device_code("C32"), "C32");
        assert_eq!(normalize_device_code("rcbo-b16"), "RCBO-B16");
        // Trailing A without a digit before it stays
        assert_eq!(normalize_device_code("LSA"), "LSA");
    }
}

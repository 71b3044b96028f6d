//! Cable Reference Library
//!
//! Cable catalogue, current-carrying capacity (ampacity) with temperature and
//! grouping derating, conductor impedance and voltage drop.
//!
//! ```text
//! I_z = ⌊ I_base(gauge, method) × f_temp(ϑ) × f_group(n) ⌋
//! ΔU  = k × L × I × (R' cos φ + X' sin φ)      k = √3 (3~) or 2 (1~)
//! ```
//!
//! All lookups are keyed by the fixed enumerations in this module; a value
//! outside them is a miss, never an extrapolation.

pub mod library;
pub mod tables;

pub use library::{Ampacity, CableLibrary, Impedance, VoltageDrop, VoltageDropInput};
pub use tables::CableTables;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Standard conductor cross-sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gauge {
    Mm1_5,
    Mm2_5,
    Mm4,
    Mm6,
    Mm10,
    Mm16,
    Mm25,
    Mm35,
    Mm50,
    Mm70,
    Mm95,
    Mm120,
}

impl Gauge {
    /// The gauge ladder in ascending order.
    pub const ALL: [Gauge; 12] = [
        Gauge::Mm1_5,
        Gauge::Mm2_5,
        Gauge::Mm4,
        Gauge::Mm6,
        Gauge::Mm10,
        Gauge::Mm16,
        Gauge::Mm25,
        Gauge::Mm35,
        Gauge::Mm50,
        Gauge::Mm70,
        Gauge::Mm95,
        Gauge::Mm120,
    ];

    /// Cross-section in mm².
    pub fn mm2(&self) -> f64 {
        match self {
            Gauge::Mm1_5 => 1.5,
            Gauge::Mm2_5 => 2.5,
            Gauge::Mm4 => 4.0,
            Gauge::Mm6 => 6.0,
            Gauge::Mm10 => 10.0,
            Gauge::Mm16 => 16.0,
            Gauge::Mm25 => 25.0,
            Gauge::Mm35 => 35.0,
            Gauge::Mm50 => 50.0,
            Gauge::Mm70 => 70.0,
            Gauge::Mm95 => 95.0,
            Gauge::Mm120 => 120.0,
        }
    }

    /// Exact match against the ladder; anything else is not a standard gauge.
    pub fn from_mm2(mm2: f64) -> Option<Gauge> {
        Gauge::ALL
            .iter()
            .copied()
            .find(|g| (g.mm2() - mm2).abs() < 1e-6)
    }

    /// Next larger standard gauge.
    pub fn next(&self) -> Option<Gauge> {
        let idx = Gauge::ALL.iter().position(|g| g == self)?;
        Gauge::ALL.get(idx + 1).copied()
    }
}

impl std::fmt::Display for Gauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mm²", self.mm2())
    }
}

/// Installation reference methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstallationMethod {
    /// Single cores in conduit in a thermally insulated wall
    A1,
    /// Multi-core cable in conduit in a thermally insulated wall
    A2,
    /// Single cores in conduit on a wall
    B1,
    /// Multi-core cable in conduit or trunking on a wall
    B2,
    /// Cable clipped direct to a wall
    C,
    /// Cable in the ground
    D,
    /// Multi-core cable in free air or on a perforated tray
    E,
}

impl InstallationMethod {
    pub const ALL: [InstallationMethod; 7] = [
        InstallationMethod::A1,
        InstallationMethod::A2,
        InstallationMethod::B1,
        InstallationMethod::B2,
        InstallationMethod::C,
        InstallationMethod::D,
        InstallationMethod::E,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            InstallationMethod::A1 => "A1",
            InstallationMethod::A2 => "A2",
            InstallationMethod::B1 => "B1",
            InstallationMethod::B2 => "B2",
            InstallationMethod::C => "C",
            InstallationMethod::D => "D",
            InstallationMethod::E => "E",
        }
    }

    pub fn environment(&self) -> Environment {
        match self {
            InstallationMethod::D => Environment::Ground,
            _ => Environment::Air,
        }
    }
}

impl std::fmt::Display for InstallationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InstallationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let method = match key.as_str() {
            "a1" | "insulated-wall" => InstallationMethod::A1,
            "a2" | "insulated-wall-multicore" => InstallationMethod::A2,
            "b1" | "conduit" => InstallationMethod::B1,
            "b2" | "conduit/tray" | "trunking" => InstallationMethod::B2,
            "c" | "wall" | "surface" | "clipped-direct" => InstallationMethod::C,
            "d" | "ground" | "buried" => InstallationMethod::D,
            "e" | "free-air" | "tray" => InstallationMethod::E,
            _ => return Err(format!("Unknown installation method: {}", s)),
        };
        Ok(method)
    }
}

/// Surrounding medium; selects the temperature derating table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    Air,
    Ground,
}

impl Environment {
    /// Ambient temperature at which the base ampacity applies (°C).
    pub fn reference_temperature(&self) -> f64 {
        match self {
            Environment::Air => 30.0,
            Environment::Ground => 20.0,
        }
    }
}

/// Conductor insulation material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Insulation {
    /// PVC, 70 °C conductor temperature
    Pvc,
    /// Cross-linked polyethylene, 90 °C conductor temperature
    Xlpe,
}

/// Catalogue entry for one cable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableSpec {
    pub code: String,
    pub standard: String,
    pub description: String,
    pub insulation: Insulation,
    /// Rated voltage U, phase-to-phase (V).
    pub rated_voltage: f64,
    /// Maximum conductor operating temperature (°C).
    pub max_temperature: f64,
    /// Minimum bend radius as a multiple of the outer diameter.
    pub bend_radius_factor: f64,
    pub shielded: bool,
    pub armored: bool,
    /// Installation methods this cable type may be laid in.
    pub methods: Vec<InstallationMethod>,
}

/// Normalize a cable type code for lookup: upper case, conductor
/// identification suffix (`-J`/`-O`) dropped.
pub fn normalize_type_code(code: &str) -> String {
    let upper = code.trim().to_uppercase();
    upper
        .strip_suffix("-J")
        .or_else(|| upper.strip_suffix("-O"))
        .unwrap_or(upper.as_str())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_ladder_is_ascending() {
        for pair in Gauge::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].mm2() < pair[1].mm2());
        }
    }

    #[test]
    fn test_gauge_from_mm2() {
        assert_eq!(Gauge::from_mm2(10.0), Some(Gauge::Mm10));
        assert_eq!(Gauge::from_mm2(1.5), Some(Gauge::Mm1_5));
        assert_eq!(Gauge::from_mm2(3.0), None);
        assert_eq!(Gauge::Mm120.next(), None);
        assert_eq!(Gauge::Mm6.next(), Some(Gauge::Mm10));
    }

    #[test]
    fn test_installation_method_aliases() {
        assert_eq!("conduit/tray".parse::<InstallationMethod>(), Ok(InstallationMethod::B2));
        assert_eq!("b2".parse::<InstallationMethod>(), Ok(InstallationMethod::B2));
        assert_eq!(" Ground ".parse::<InstallationMethod>(), Ok(InstallationMethod::D));
        assert!("ceiling".parse::<InstallationMethod>().is_err());
    }

    #[test]
    fn test_normalize_type_code() {
        assert_eq!(normalize_type_code("nym-j"), "NYM");
        assert_eq!(normalize_type_code("NYY-O"), "NYY");
        assert_eq!(normalize_type_code("H07V-K"), "H07V-K");
    }
}

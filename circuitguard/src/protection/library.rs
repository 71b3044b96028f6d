//! Protection device lookups and calculators.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{
    normalize_device_code, Characteristic, DeviceFamily, DeviceKind, ProtectionDeviceSpec,
    TripType, CONVENTIONAL_NON_TRIP, CONVENTIONAL_TRIP, SELECTIVITY_RATIO,
};
use crate::standards::{DEVICE_SIZE_LADDER, NOMINAL_LINE_TO_EARTH};

/// Upper bound of the thermal region (ms), the conventional time.
const THERMAL_MAX_MS: f64 = 3_600_000.0;
const MAGNETIC_MS: f64 = 100.0;
const INSTANTANEOUS_MS: f64 = 10.0;

/// Concrete MCB ratings per family (A).
const MCB_RATINGS: [(DeviceFamily, &[f64]); 5] = [
    (DeviceFamily::B, &[6.0, 10.0, 13.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0]),
    (DeviceFamily::C, &[6.0, 10.0, 13.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0]),
    (DeviceFamily::D, &[6.0, 10.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0]),
    (DeviceFamily::K, &[6.0, 10.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0]),
    (DeviceFamily::Z, &[6.0, 10.0, 16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0]),
];

const RCBO_RATINGS: [f64; 8] = [6.0, 10.0, 13.0, 16.0, 20.0, 25.0, 32.0, 40.0];

/// Energy-limiting class 3 I²t bands for B and C devices:
/// `(max rated current, [(prospective fault current upper bound, I²t)])`.
const I2T_CLASS_3: [(f64, [(f64, f64); 5]); 2] = [
    (16.0, [(1_500.0, 8_000.0), (3_000.0, 15_000.0), (4_500.0, 25_000.0), (6_000.0, 35_000.0), (10_000.0, 70_000.0)]),
    (32.0, [(1_500.0, 10_000.0), (3_000.0, 18_000.0), (4_500.0, 32_000.0), (6_000.0, 45_000.0), (10_000.0, 90_000.0)]),
];

/// Region of the trip envelope a fault current falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TripRegion {
    Instantaneous,
    Magnetic,
    Thermal,
    NoTrip,
}

impl TripRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripRegion::Instantaneous => "instantaneous",
            TripRegion::Magnetic => "magnetic",
            TripRegion::Thermal => "thermal",
            TripRegion::NoTrip => "noTrip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripTime {
    pub region: TripRegion,
    /// Fault current as multiple of the rated current
    pub multiplier: f64,
    /// `None` when the device does not trip
    pub time_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergySource {
    Tabulated,
    Calculated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetThroughEnergy {
    /// I²t (A²s)
    pub energy: f64,
    pub source: EnergySource,
}

/// Outcome of [`ProtectionLibrary::is_selective`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectivityAssessment {
    pub selective: bool,
    pub upstream_rated: f64,
    pub downstream_rated: f64,
    /// upstream / downstream rated current
    pub ratio: f64,
    pub reason: String,
    pub note: Option<String>,
    /// Fault current up to which selectivity holds, when limited
    pub selectivity_limit: Option<f64>,
}

/// Read-only protection device library.
#[derive(Debug, Clone)]
pub struct ProtectionLibrary {
    devices: BTreeMap<String, ProtectionDeviceSpec>,
    ladder: Vec<f64>,
}

impl Default for ProtectionLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectionLibrary {
    /// Library with the built-in catalogue.
    pub fn new() -> Self {
        Self::from_devices(standard_catalogue(), DEVICE_SIZE_LADDER.to_vec())
    }

    /// Library backed by a substitute catalogue and size ladder.
    pub fn from_devices(devices: Vec<ProtectionDeviceSpec>, ladder: Vec<f64>) -> Self {
        let devices = devices
            .into_iter()
            .map(|d| (normalize_device_code(&d.code), d))
            .collect();
        Self { devices, ladder }
    }

    pub fn get_device(&self, code: &str) -> Option<&ProtectionDeviceSpec> {
        self.devices.get(&normalize_device_code(code))
    }

    pub fn devices(&self) -> impl Iterator<Item = &ProtectionDeviceSpec> {
        self.devices.values()
    }

    /// Characteristic for a device code (`C16`), a bare family letter (`C`)
    /// or any string containing a family letter followed by a digit
    /// (`LS-C16A`), in that order. Unresolvable input falls back to the most
    /// conservative family.
    pub fn get_characteristic(&self, query: &str) -> Characteristic {
        if let Some(device) = self.get_device(query) {
            return device.characteristic();
        }

        let trimmed = query.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if let Some(family) = DeviceFamily::from_letter(c) {
                return family.characteristic();
            }
        }

        if let Some(family) = family_from_pattern(trimmed) {
            return family.characteristic();
        }

        tracing::warn!(
            "Unrecognized protection device '{}', assuming family {}",
            query,
            DeviceFamily::MOST_CONSERVATIVE
        );
        DeviceFamily::MOST_CONSERVATIVE.characteristic()
    }

    /// Smallest MCB of `family` on the size ladder rated at least `current`.
    pub fn find_minimum_device(
        &self,
        family: DeviceFamily,
        current: f64,
    ) -> Option<&ProtectionDeviceSpec> {
        self.ladder
            .iter()
            .filter(|size| **size >= current)
            .find_map(|size| {
                self.devices.values().find(|d| {
                    d.kind == DeviceKind::Mcb && d.family == family && d.rated_current == *size
                })
            })
    }

    /// Fault current needed to trip the device: `I_n × trip_point.min` for
    /// instantaneous, `I_n × 1.13` for thermal.
    pub fn get_minimum_fault_current(&self, code: &str, trip_type: TripType) -> Option<f64> {
        let device = self.get_device(code)?;
        let multiple = match trip_type {
            TripType::Instantaneous => device.characteristic().trip_point.min,
            TripType::Thermal => CONVENTIONAL_NON_TRIP,
        };
        Some(device.rated_current * multiple)
    }

    /// Coarse trip time envelope for a fault current. `rated_current`
    /// overrides the catalogue rating when given.
    pub fn get_trip_time(
        &self,
        code: &str,
        fault_current: f64,
        rated_current: Option<f64>,
    ) -> Option<TripTime> {
        let device = self.get_device(code)?;
        let rated = rated_current.unwrap_or(device.rated_current);
        if rated <= 0.0 {
            return None;
        }

        let trip_point = device.characteristic().trip_point;
        let multiplier = fault_current / rated;

        let (region, time_ms) = if multiplier >= trip_point.max {
            (TripRegion::Instantaneous, Some(INSTANTANEOUS_MS))
        } else if multiplier >= trip_point.min {
            (TripRegion::Magnetic, Some(MAGNETIC_MS))
        } else if multiplier >= CONVENTIONAL_TRIP {
            let t = THERMAL_MAX_MS * (CONVENTIONAL_TRIP / multiplier).powi(4);
            (TripRegion::Thermal, Some(t))
        } else if multiplier >= CONVENTIONAL_NON_TRIP {
            (TripRegion::Thermal, Some(THERMAL_MAX_MS))
        } else {
            (TripRegion::NoTrip, None)
        };

        Some(TripTime {
            region,
            multiplier,
            time_ms,
        })
    }

    /// Let-through energy I²t. Uses the tabulated class 3 band when the
    /// device is current limiting at this fault current, otherwise
    /// `I² × t` with `duration_ms`, otherwise `None`.
    pub fn calculate_let_through_energy(
        &self,
        code: &str,
        fault_current: f64,
        duration_ms: Option<f64>,
    ) -> Option<LetThroughEnergy> {
        let device = self.get_device(code)?;

        if let Some(energy) = tabulated_i2t(device, fault_current) {
            return Some(LetThroughEnergy {
                energy,
                source: EnergySource::Tabulated,
            });
        }

        duration_ms.map(|ms| LetThroughEnergy {
            energy: fault_current * fault_current * ms / 1000.0,
            source: EnergySource::Calculated,
        })
    }

    /// Rated-current selectivity between an upstream and a downstream device.
    ///
    /// Rejected when the downstream rating is not strictly below the upstream
    /// one, when the ratio is below 1.6, or for the known-poor pairing of an
    /// upstream B with a downstream C device. A loop impedance adds an
    /// advisory note on the fault current up to which selectivity holds.
    pub fn is_selective(
        &self,
        upstream: &str,
        downstream: &str,
        loop_impedance: Option<f64>,
    ) -> Option<SelectivityAssessment> {
        let up = self.get_device(upstream)?;
        let down = self.get_device(downstream)?;

        let ratio = up.rated_current / down.rated_current;
        let mut assessment = SelectivityAssessment {
            selective: false,
            upstream_rated: up.rated_current,
            downstream_rated: down.rated_current,
            ratio,
            reason: String::new(),
            note: None,
            selectivity_limit: None,
        };

        if down.rated_current >= up.rated_current {
            assessment.reason = format!(
                "Downstream {} ({} A) is not rated below upstream {} ({} A)",
                down.code, down.rated_current, up.code, up.rated_current
            );
            return Some(assessment);
        }

        if ratio < SELECTIVITY_RATIO {
            assessment.reason = format!(
                "Rated current ratio {:.2} is below {}",
                ratio, SELECTIVITY_RATIO
            );
            return Some(assessment);
        }

        if up.family == DeviceFamily::B && down.family == DeviceFamily::C {
            assessment.reason = format!(
                "Upstream family B with downstream family C is not selective: the downstream \
                 magnetic trip ({}–{} × I_n) overlaps the upstream one",
                down.characteristic().trip_point.min,
                down.characteristic().trip_point.max
            );
            return Some(assessment);
        }

        assessment.selective = true;
        assessment.reason = format!("Rated current ratio {:.2} ≥ {}", ratio, SELECTIVITY_RATIO);

        let upstream_threshold = up.rated_current * up.characteristic().trip_point.min;
        assessment.note = Some(match loop_impedance.filter(|z| *z > 0.0) {
            Some(z) => {
                let fault_current = NOMINAL_LINE_TO_EARTH / z;
                if fault_current >= upstream_threshold {
                    assessment.selectivity_limit = Some(upstream_threshold);
                    format!(
                        "Prospective fault current {:.0} A reaches the upstream instantaneous \
                         threshold {:.0} A; selectivity is partial up to {:.0} A",
                        fault_current, upstream_threshold, upstream_threshold
                    )
                } else {
                    format!(
                        "Prospective fault current {:.0} A stays below the upstream \
                         instantaneous threshold {:.0} A",
                        fault_current, upstream_threshold
                    )
                }
            }
            None => "Assessed by rated current ratio only; confirm with the manufacturer's \
                     selectivity tables"
                .to_string(),
        });

        Some(assessment)
    }
}

/// First family letter directly followed by a digit.
fn family_from_pattern(query: &str) -> Option<DeviceFamily> {
    let chars: Vec<char> = query.chars().collect();
    chars.windows(2).find_map(|w| {
        if w[1].is_ascii_digit() {
            DeviceFamily::from_letter(w[0])
        } else {
            None
        }
    })
}

fn tabulated_i2t(device: &ProtectionDeviceSpec, fault_current: f64) -> Option<f64> {
    if !matches!(device.family, DeviceFamily::B | DeviceFamily::C) {
        return None;
    }
    let threshold = device.rated_current * device.characteristic().trip_point.min;
    if fault_current < threshold {
        return None;
    }
    let (_, bands) = I2T_CLASS_3
        .iter()
        .find(|(max_rated, _)| device.rated_current <= *max_rated)?;
    bands
        .iter()
        .find(|(max_fault, _)| fault_current <= *max_fault)
        .map(|(_, energy)| *energy)
}

fn standard_catalogue() -> Vec<ProtectionDeviceSpec> {
    let mut devices = Vec::new();

    for (family, ratings) in MCB_RATINGS.iter() {
        for rated in ratings.iter() {
            devices.push(ProtectionDeviceSpec {
                code: format!("{}{}", family.letter(), rated),
                kind: DeviceKind::Mcb,
                family: *family,
                rated_current: *rated,
                sensitivity: None,
                response_time: INSTANTANEOUS_MS,
                poles: 1,
                breaking_capacity: if *rated <= 63.0 { 6.0 } else { 10.0 },
            });
        }
    }

    for family in [DeviceFamily::B, DeviceFamily::C] {
        for rated in RCBO_RATINGS {
            devices.push(ProtectionDeviceSpec {
                code: format!("RCBO-{}{}", family.letter(), rated),
                kind: DeviceKind::Rcbo,
                family,
                rated_current: rated,
                sensitivity: Some(30.0),
                response_time: INSTANTANEOUS_MS,
                poles: 2,
                breaking_capacity: 6.0,
            });
        }
    }

    devices
}

//! Cable lookups and calculators.

use serde::Serialize;

use super::{normalize_type_code, CableSpec, CableTables, Gauge, InstallationMethod, Insulation};

/// Guards `floor` against products like `39.99999999` for an exact 40 A.
const FLOOR_EPSILON: f64 = 1e-9;

/// Ampacity breakdown for one cable under stated conditions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ampacity {
    pub base: f64,
    pub temp_factor: f64,
    pub group_factor: f64,
    pub derated: f64,
}

/// Conductor impedance per metre (Ω/m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impedance {
    pub resistance: f64,
    pub reactance: f64,
}

/// Inputs of [`CableLibrary::calculate_voltage_drop`].
#[derive(Debug, Clone, Copy)]
pub struct VoltageDropInput<'a> {
    pub gauge: Gauge,
    /// Cable length (m)
    pub distance: f64,
    /// Load current (A)
    pub current: f64,
    pub phase_count: u8,
    /// Nominal voltage (V)
    pub voltage: f64,
    /// cos φ, clamped to `[0, 1]`
    pub power_factor: f64,
    pub cable_type: Option<&'a str>,
}

/// Result of a voltage-drop calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageDrop {
    /// Drop in volts
    pub volts: f64,
    /// Drop as percent of the nominal voltage
    pub percent: f64,
    pub phase_factor: f64,
    /// `R cos φ + X sin φ` (Ω/m)
    pub effective_impedance: f64,
}

/// Read-only cable reference library.
#[derive(Debug, Clone)]
pub struct CableLibrary {
    tables: CableTables,
}

impl Default for CableLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl CableLibrary {
    /// Library with the built-in tables.
    pub fn new() -> Self {
        Self::from_tables(CableTables::standard())
    }

    /// Library backed by substitute tables.
    pub fn from_tables(tables: CableTables) -> Self {
        Self { tables }
    }

    pub fn get_cable(&self, type_code: &str) -> Option<&CableSpec> {
        self.tables.cables.get(&normalize_type_code(type_code))
    }

    pub fn cables(&self) -> impl Iterator<Item = &CableSpec> {
        self.tables.cables.values()
    }

    /// Tabulated ampacity at reference conditions. `None` for an unknown
    /// cable type, a method the cable may not be laid in, or a missing cell.
    pub fn get_base_ampacity(
        &self,
        type_code: &str,
        gauge: Gauge,
        method: InstallationMethod,
    ) -> Option<f64> {
        let cable = self.get_cable(type_code)?;
        if !cable.methods.contains(&method) {
            return None;
        }
        self.tables
            .ampacity
            .get(&(cable.insulation, method))?
            .get(&gauge)
            .copied()
    }

    /// Temperature derating factor, linearly interpolated between table
    /// points and clamped to the first/last point outside the table.
    pub fn temperature_factor(
        &self,
        insulation: Insulation,
        method: InstallationMethod,
        ambient: f64,
    ) -> Option<f64> {
        let points = self.tables.temperature.get(&(insulation, method.environment()))?;
        interpolate(points, ambient)
    }

    /// Grouping factor for `count` bunched cables: the entry for the exact
    /// count, else the nearest lower tabulated count.
    pub fn grouping_factor(&self, count: u32) -> f64 {
        if count <= 1 {
            return 1.0;
        }
        self.tables
            .grouping
            .iter()
            .take_while(|(n, _)| *n <= count)
            .last()
            .map(|(_, factor)| *factor)
            .unwrap_or(1.0)
    }

    /// Derated ampacity `⌊base × f_temp × f_group⌋`.
    pub fn get_ampacity(
        &self,
        type_code: &str,
        gauge: Gauge,
        method: InstallationMethod,
        ambient: f64,
        grouping: u32,
    ) -> Option<Ampacity> {
        let cable = self.get_cable(type_code)?;
        let base = self.get_base_ampacity(type_code, gauge, method)?;
        let temp_factor = self.temperature_factor(cable.insulation, method, ambient)?;
        let group_factor = self.grouping_factor(grouping);
        let derated = (base * temp_factor * group_factor + FLOOR_EPSILON).floor();

        Some(Ampacity {
            base,
            temp_factor,
            group_factor,
            derated,
        })
    }

    /// Smallest standard gauge whose derated ampacity carries `current`.
    pub fn find_minimum_gauge(
        &self,
        type_code: &str,
        current: f64,
        method: InstallationMethod,
        ambient: f64,
        grouping: u32,
    ) -> Option<Gauge> {
        Gauge::ALL.iter().copied().find(|gauge| {
            self.get_ampacity(type_code, *gauge, method, ambient, grouping)
                .map(|a| a.derated >= current)
                .unwrap_or(false)
        })
    }

    /// Impedance per metre. Conductors are copper for every type, so the
    /// type code only has to be known when one is given.
    pub fn get_cable_impedance(&self, type_code: Option<&str>, gauge: Gauge) -> Option<Impedance> {
        if let Some(code) = type_code {
            self.get_cable(code)?;
        }
        let (r_per_km, x_per_km) = self.tables.impedance.get(&gauge)?;
        Some(Impedance {
            resistance: r_per_km / 1000.0,
            reactance: x_per_km / 1000.0,
        })
    }

    /// Voltage drop along the cable:
    /// `ΔU = k × L × I × (R cos φ + X sin φ)`, `k = √3` for three-phase,
    /// `2` for single-phase.
    pub fn calculate_voltage_drop(&self, input: &VoltageDropInput<'_>) -> Option<VoltageDrop> {
        let impedance = self.get_cable_impedance(input.cable_type, input.gauge)?;

        let cos_phi = input.power_factor.clamp(0.0, 1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).sqrt();
        let effective_impedance = impedance.resistance * cos_phi + impedance.reactance * sin_phi;

        let phase_factor = if input.phase_count >= 3 { 3f64.sqrt() } else { 2.0 };
        let volts = phase_factor * input.distance * input.current * effective_impedance;

        Some(VoltageDrop {
            volts,
            percent: volts / input.voltage * 100.0,
            phase_factor,
            effective_impedance,
        })
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> Option<f64> {
    let (first_x, first_y) = *points.first()?;
    let (last_x, last_y) = *points.last()?;

    if x <= first_x {
        return Some(first_y);
    }
    if x >= last_x {
        return Some(last_y);
    }

    points
        .windows(2)
        .find(|w| x >= w[0].0 && x <= w[1].0)
        .map(|w| {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        })
}

//! Built-in cable reference tables.
//!
//! Copper conductors, three loaded conductors. Ampacity columns follow the
//! gauge ladder `1.5 … 120 mm²`.

use std::collections::{BTreeMap, HashMap};

use super::{normalize_type_code, CableSpec, Environment, Gauge, InstallationMethod, Insulation};

/// Base ampacity (A), PVC insulation, ambient 30 °C (20 °C for D).
const PVC_AMPACITY: [(InstallationMethod, [f64; 12]); 7] = [
    (InstallationMethod::A1, [13.5, 18.0, 24.0, 31.0, 42.0, 56.0, 73.0, 89.0, 108.0, 136.0, 164.0, 188.0]),
    (InstallationMethod::A2, [13.0, 17.5, 23.0, 29.0, 39.0, 52.0, 68.0, 83.0, 99.0, 125.0, 150.0, 172.0]),
    (InstallationMethod::B1, [15.5, 21.0, 28.0, 36.0, 50.0, 68.0, 89.0, 110.0, 134.0, 171.0, 207.0, 239.0]),
    (InstallationMethod::B2, [15.0, 20.0, 27.0, 34.0, 46.0, 62.0, 80.0, 99.0, 118.0, 149.0, 179.0, 206.0]),
    (InstallationMethod::C, [17.5, 24.0, 32.0, 41.0, 57.0, 76.0, 96.0, 119.0, 144.0, 184.0, 223.0, 259.0]),
    (InstallationMethod::D, [18.0, 24.0, 31.0, 39.0, 52.0, 67.0, 86.0, 103.0, 122.0, 151.0, 179.0, 203.0]),
    (InstallationMethod::E, [18.5, 25.0, 34.0, 43.0, 60.0, 80.0, 101.0, 126.0, 153.0, 196.0, 238.0, 276.0]),
];

/// Base ampacity (A), XLPE insulation, ambient 30 °C (20 °C for D).
const XLPE_AMPACITY: [(InstallationMethod, [f64; 12]); 7] = [
    (InstallationMethod::A1, [17.0, 23.0, 31.0, 40.0, 54.0, 73.0, 95.0, 117.0, 141.0, 179.0, 216.0, 249.0]),
    (InstallationMethod::A2, [16.5, 22.0, 30.0, 38.0, 51.0, 68.0, 89.0, 109.0, 130.0, 164.0, 197.0, 227.0]),
    (InstallationMethod::B1, [20.0, 28.0, 37.0, 48.0, 66.0, 88.0, 117.0, 144.0, 175.0, 222.0, 269.0, 312.0]),
    (InstallationMethod::B2, [19.5, 26.0, 35.0, 44.0, 60.0, 80.0, 105.0, 128.0, 154.0, 194.0, 233.0, 268.0]),
    (InstallationMethod::C, [22.0, 30.0, 40.0, 52.0, 71.0, 96.0, 119.0, 147.0, 179.0, 229.0, 278.0, 322.0]),
    (InstallationMethod::D, [21.0, 28.0, 36.0, 44.0, 58.0, 75.0, 96.0, 115.0, 135.0, 167.0, 197.0, 223.0]),
    (InstallationMethod::E, [23.0, 31.0, 42.0, 54.0, 75.0, 100.0, 127.0, 158.0, 192.0, 246.0, 298.0, 346.0]),
];

/// Ambient temperature (°C) → derating factor.
const PVC_AIR_TEMPERATURE: [(f64, f64); 11] = [
    (10.0, 1.22), (15.0, 1.17), (20.0, 1.12), (25.0, 1.06), (30.0, 1.00), (35.0, 0.94),
    (40.0, 0.87), (45.0, 0.79), (50.0, 0.71), (55.0, 0.61), (60.0, 0.50),
];

const XLPE_AIR_TEMPERATURE: [(f64, f64); 15] = [
    (10.0, 1.15), (15.0, 1.12), (20.0, 1.08), (25.0, 1.04), (30.0, 1.00), (35.0, 0.96),
    (40.0, 0.91), (45.0, 0.87), (50.0, 0.82), (55.0, 0.76), (60.0, 0.71), (65.0, 0.65),
    (70.0, 0.58), (75.0, 0.50), (80.0, 0.41),
];

const PVC_GROUND_TEMPERATURE: [(f64, f64); 11] = [
    (10.0, 1.10), (15.0, 1.05), (20.0, 1.00), (25.0, 0.95), (30.0, 0.89), (35.0, 0.84),
    (40.0, 0.77), (45.0, 0.71), (50.0, 0.63), (55.0, 0.55), (60.0, 0.45),
];

const XLPE_GROUND_TEMPERATURE: [(f64, f64); 15] = [
    (10.0, 1.07), (15.0, 1.04), (20.0, 1.00), (25.0, 0.96), (30.0, 0.93), (35.0, 0.89),
    (40.0, 0.85), (45.0, 0.80), (50.0, 0.76), (55.0, 0.71), (60.0, 0.65), (65.0, 0.60),
    (70.0, 0.53), (75.0, 0.46), (80.0, 0.38),
];

/// Number of bunched cables → grouping factor.
const GROUPING_FACTORS: [(u32, f64); 12] = [
    (1, 1.00), (2, 0.80), (3, 0.70), (4, 0.65), (5, 0.60), (6, 0.57),
    (7, 0.54), (8, 0.52), (9, 0.50), (12, 0.45), (16, 0.41), (20, 0.38),
];

/// Copper conductor resistance and reactance (Ω/km), 20 °C.
const IMPEDANCE_PER_KM: [(Gauge, f64, f64); 12] = [
    (Gauge::Mm1_5, 12.1, 0.115),
    (Gauge::Mm2_5, 7.41, 0.110),
    (Gauge::Mm4, 4.61, 0.107),
    (Gauge::Mm6, 3.08, 0.100),
    (Gauge::Mm10, 1.83, 0.094),
    (Gauge::Mm16, 1.15, 0.090),
    (Gauge::Mm25, 0.727, 0.086),
    (Gauge::Mm35, 0.524, 0.083),
    (Gauge::Mm50, 0.387, 0.083),
    (Gauge::Mm70, 0.268, 0.082),
    (Gauge::Mm95, 0.193, 0.082),
    (Gauge::Mm120, 0.153, 0.080),
];

/// Tables backing a [`super::CableLibrary`].
#[derive(Debug, Clone, Default)]
pub struct CableTables {
    /// Keyed by normalized type code.
    pub cables: BTreeMap<String, CableSpec>,
    pub ampacity: HashMap<(Insulation, InstallationMethod), BTreeMap<Gauge, f64>>,
    /// Sorted by temperature.
    pub temperature: HashMap<(Insulation, Environment), Vec<(f64, f64)>>,
    /// Sorted by count.
    pub grouping: Vec<(u32, f64)>,
    /// `(R, X)` in Ω/km.
    pub impedance: BTreeMap<Gauge, (f64, f64)>,
}

impl CableTables {
    /// The built-in catalogue and tables.
    pub fn standard() -> Self {
        let mut tables = Self::default();

        for spec in standard_catalogue() {
            tables.insert_cable(spec);
        }

        for (insulation, columns) in [(Insulation::Pvc, &PVC_AMPACITY), (Insulation::Xlpe, &XLPE_AMPACITY)] {
            for (method, values) in columns.iter() {
                let column = Gauge::ALL.iter().copied().zip(values.iter().copied()).collect();
                tables.ampacity.insert((insulation, *method), column);
            }
        }

        tables.temperature.insert((Insulation::Pvc, Environment::Air), PVC_AIR_TEMPERATURE.to_vec());
        tables.temperature.insert((Insulation::Xlpe, Environment::Air), XLPE_AIR_TEMPERATURE.to_vec());
        tables.temperature.insert((Insulation::Pvc, Environment::Ground), PVC_GROUND_TEMPERATURE.to_vec());
        tables.temperature.insert((Insulation::Xlpe, Environment::Ground), XLPE_GROUND_TEMPERATURE.to_vec());

        tables.grouping = GROUPING_FACTORS.to_vec();
        tables.impedance = IMPEDANCE_PER_KM.iter().map(|(g, r, x)| (*g, (*r, *x))).collect();

        tables
    }

    pub fn insert_cable(&mut self, spec: CableSpec) {
        self.cables.insert(normalize_type_code(&spec.code), spec);
    }
}

fn standard_catalogue() -> Vec<CableSpec> {
    use InstallationMethod::*;

    let not_buried = vec![A1, A2, B1, B2, C, E];
    let all = InstallationMethod::ALL.to_vec();

    vec![
        CableSpec {
            code: "NYM".to_string(),
            standard: "DIN VDE 0250-204".to_string(),
            description: "PVC sheathed installation cable 300/500 V".to_string(),
            insulation: Insulation::Pvc,
            rated_voltage: 500.0,
            max_temperature: 70.0,
            bend_radius_factor: 4.0,
            shielded: false,
            armored: false,
            methods: not_buried.clone(),
        },
        CableSpec {
            code: "NYY".to_string(),
            standard: "DIN VDE 0276-603".to_string(),
            description: "PVC power cable 0.6/1 kV".to_string(),
            insulation: Insulation::Pvc,
            rated_voltage: 1000.0,
            max_temperature: 70.0,
            bend_radius_factor: 12.0,
            shielded: false,
            armored: false,
            methods: all.clone(),
        },
        CableSpec {
            code: "NYCWY".to_string(),
            standard: "DIN VDE 0276-603".to_string(),
            description: "PVC power cable with concentric conductor 0.6/1 kV".to_string(),
            insulation: Insulation::Pvc,
            rated_voltage: 1000.0,
            max_temperature: 70.0,
            bend_radius_factor: 15.0,
            shielded: true,
            armored: false,
            methods: all.clone(),
        },
        CableSpec {
            code: "N2XH".to_string(),
            standard: "DIN VDE 0276-604".to_string(),
            description: "XLPE halogen-free power cable 0.6/1 kV".to_string(),
            insulation: Insulation::Xlpe,
            rated_voltage: 1000.0,
            max_temperature: 90.0,
            bend_radius_factor: 12.0,
            shielded: false,
            armored: false,
            methods: all.clone(),
        },
        CableSpec {
            code: "NHXH".to_string(),
            standard: "DIN VDE 0266".to_string(),
            description: "XLPE halogen-free cable with circuit integrity 0.6/1 kV".to_string(),
            insulation: Insulation::Xlpe,
            rated_voltage: 1000.0,
            max_temperature: 90.0,
            bend_radius_factor: 15.0,
            shielded: false,
            armored: true,
            methods: all,
        },
        CableSpec {
            code: "H07V-K".to_string(),
            standard: "DIN EN 50525-2-31".to_string(),
            description: "PVC single core, fine-stranded 450/750 V".to_string(),
            insulation: Insulation::Pvc,
            rated_voltage: 750.0,
            max_temperature: 70.0,
            bend_radius_factor: 4.0,
            shielded: false,
            armored: false,
            methods: vec![A1, B1],
        },
        CableSpec {
            code: "H05VV-F".to_string(),
            standard: "DIN EN 50525-2-11".to_string(),
            description: "PVC flexible cord 300/500 V".to_string(),
            insulation: Insulation::Pvc,
            rated_voltage: 500.0,
            max_temperature: 70.0,
            bend_radius_factor: 4.0,
            shielded: false,
            armored: false,
            methods: not_buried,
        },
    ]
}

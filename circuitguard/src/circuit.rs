//! Circuit record supplied by the caller.
//!
//! A record is usually only partially filled in while the user is still
//! editing it. Every field except the id is optional; each rule declares the
//! fields it needs (see [`TriggerField`]) and is skipped until they are all
//! present.

use serde::{Deserialize, Serialize};

/// One circuit as entered by the caller. Never persisted by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CircuitRecord {
    pub id: String,
    /// Nominal voltage (V). Phase-to-phase for three-phase circuits.
    pub voltage: Option<f64>,
    /// Design current (A).
    pub current: Option<f64>,
    /// Frequency (Hz).
    pub frequency: Option<f64>,
    pub phase_count: Option<u8>,
    /// Cable type code, e.g. `NYM-J` or `NYY`.
    pub cable_type: Option<String>,
    /// Conductor cross-section (mm²).
    pub gauge: Option<f64>,
    /// Cable length (m).
    pub distance: Option<f64>,
    /// Installation reference method (`B2`) or alias (`conduit/tray`).
    pub installation_method: Option<String>,
    /// Ambient temperature (°C).
    pub ambient_temperature: Option<f64>,
    /// Number of cables grouped together, this one included.
    pub grouping_count: Option<u32>,
    /// Protection device code, e.g. `B16`.
    pub protection_device_type: Option<String>,
    /// Rated current of the protection device (A).
    pub protection_current: Option<f64>,
    /// Measured or calculated earth-fault loop impedance (Ω).
    pub loop_impedance: Option<f64>,
    pub load_type: Option<LoadType>,
    /// cos φ
    pub power_factor: Option<f64>,
    pub upstream_device_type: Option<String>,
    pub downstream_device_type: Option<String>,
}

impl CircuitRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Phase count, falling back to the voltage when not given:
    /// circuits at 380 V or above are treated as three-phase.
    pub fn effective_phase_count(&self) -> u8 {
        match self.phase_count {
            Some(n) if n > 0 => n,
            _ => match self.voltage {
                Some(v) if v >= 380.0 => 3,
                _ => 1,
            },
        }
    }

    pub fn is_three_phase(&self) -> bool {
        self.effective_phase_count() >= 3
    }
}

/// Load categories relevant to the voltage-drop ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    Lighting,
    Socket,
    Motor,
    Heating,
    #[default]
    #[serde(other)]
    General,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Lighting => "lighting",
            LoadType::Socket => "socket",
            LoadType::Motor => "motor",
            LoadType::Heating => "heating",
            LoadType::General => "general",
        }
    }
}

/// A field of [`CircuitRecord`] that a rule can be gated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerField {
    Voltage,
    Current,
    Gauge,
    Distance,
    CableType,
    ProtectionCurrent,
    LoopImpedance,
    UpstreamDeviceType,
    DownstreamDeviceType,
}

impl TriggerField {
    /// Field name as it appears in the JSON record.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerField::Voltage => "voltage",
            TriggerField::Current => "current",
            TriggerField::Gauge => "gauge",
            TriggerField::Distance => "distance",
            TriggerField::CableType => "cableType",
            TriggerField::ProtectionCurrent => "protectionCurrent",
            TriggerField::LoopImpedance => "loopImpedance",
            TriggerField::UpstreamDeviceType => "upstreamDeviceType",
            TriggerField::DownstreamDeviceType => "downstreamDeviceType",
        }
    }

    /// True when the field holds a usable value: `Some`, finite for numbers,
    /// non-blank for strings.
    pub fn is_present(&self, record: &CircuitRecord) -> bool {
        match self {
            TriggerField::Voltage => number_present(record.voltage),
            TriggerField::Current => number_present(record.current),
            TriggerField::Gauge => number_present(record.gauge),
            TriggerField::Distance => number_present(record.distance),
            TriggerField::CableType => text_present(&record.cable_type),
            TriggerField::ProtectionCurrent => number_present(record.protection_current),
            TriggerField::LoopImpedance => number_present(record.loop_impedance),
            TriggerField::UpstreamDeviceType => text_present(&record.upstream_device_type),
            TriggerField::DownstreamDeviceType => text_present(&record.downstream_device_type),
        }
    }
}

impl std::fmt::Display for TriggerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn number_present(value: Option<f64>) -> bool {
    value.map(f64::is_finite).unwrap_or(false)
}

fn text_present(value: &Option<String>) -> bool {
    value.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_record() {
        let json = r#"{"id": "SK-1", "voltage": 230, "cableType": "NYM-J", "loadType": "lighting"}"#;
        let record: CircuitRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "SK-1");
        assert_eq!(record.voltage, Some(230.0));
        assert_eq!(record.cable_type.as_deref(), Some("NYM-J"));
        assert_eq!(record.load_type, Some(LoadType::Lighting));
        assert!(record.current.is_none());
    }

    #[test]
    fn test_unknown_load_type_is_general() {
        let record: CircuitRecord =
            serde_json::from_str(r#"{"id": "x", "loadType": "sauna"}"#).unwrap();
        assert_eq!(record.load_type, Some(LoadType::General));
    }

    #[test]
    fn test_trigger_presence() {
        let mut record = CircuitRecord::new("c");
        assert!(!TriggerField::Voltage.is_present(&record));

        record.voltage = Some(f64::NAN);
        assert!(!TriggerField::Voltage.is_present(&record));

        record.voltage = Some(230.0);
        assert!(TriggerField::Voltage.is_present(&record));

        record.cable_type = Some("   ".to_string());
        assert!(!TriggerField::CableType.is_present(&record));
    }

    #[test]
    fn test_effective_phase_count() {
        let mut record = CircuitRecord::new("c");
        record.voltage = Some(400.0);
        assert_eq!(record.effective_phase_count(), 3);

        record.phase_count = Some(1);
        assert_eq!(record.effective_phase_count(), 1);

        record.phase_count = None;
        record.voltage = Some(230.0);
        assert!(!record.is_three_phase());
    }
}

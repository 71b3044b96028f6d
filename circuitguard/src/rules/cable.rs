//! Cable rules: current-carrying capacity and insulation voltage rating.

use crate::cables::{Gauge, InstallationMethod};
use crate::circuit::{CircuitRecord, TriggerField};
use crate::findings::{Remedy, RuleCategory};
use crate::standards::{
    references, Severity, DEFAULT_AMBIENT_TEMPERATURE, DEFAULT_GROUPING_COUNT,
    DEFAULT_INSTALLATION_METHOD,
};

use super::{codes, required, required_text, round, ReferenceData, Rule, RuleError, RuleOutcome};

/// Laying conditions of a cable, defaults applied.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Conditions {
    pub method: InstallationMethod,
    pub ambient: f64,
    pub grouping: u32,
}

impl Conditions {
    /// An unknown installation method is reported as an unrecognized value.
    pub(crate) fn from_record(record: &CircuitRecord) -> Result<Self, RuleOutcome> {
        let method_text = record
            .installation_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_INSTALLATION_METHOD);

        let method = match method_text.parse::<InstallationMethod>() {
            Ok(method) => method,
            Err(_) => {
                return Err(RuleOutcome::unrecognized(
                    "installationMethod",
                    method_text,
                    "is not a known installation method",
                ))
            }
        };

        Ok(Self {
            method,
            ambient: record
                .ambient_temperature
                .filter(|t| t.is_finite())
                .unwrap_or(DEFAULT_AMBIENT_TEMPERATURE),
            grouping: record.grouping_count.unwrap_or(DEFAULT_GROUPING_COUNT).max(1),
        })
    }
}

/// Design current must not exceed the derated ampacity of the cable.
pub struct CableAmpacityRule;

impl Rule for CableAmpacityRule {
    fn code(&self) -> &'static str {
        codes::CABLE_UNDERSIZED_AMPACITY
    }

    fn name(&self) -> &'static str {
        "Cable ampacity"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Cable
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[TriggerField::Current, TriggerField::Gauge, TriggerField::CableType]
    }

    fn normative_reference(&self) -> &'static str {
        references::AMPACITY
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let current = required(record.current, TriggerField::Current)?;
        let gauge_mm2 = required(record.gauge, TriggerField::Gauge)?;
        let cable_type = required_text(&record.cable_type, TriggerField::CableType)?;

        if current < 0.0 {
            return Err(RuleError::InvalidInput {
                field: "current",
                reason: format!("{} A is negative", current),
            });
        }

        let gauge = match Gauge::from_mm2(gauge_mm2) {
            Some(gauge) => gauge,
            None => {
                return Ok(RuleOutcome::unrecognized(
                    TriggerField::Gauge.as_str(),
                    gauge_mm2,
                    "is not a standard conductor cross-section",
                ))
            }
        };
        let cable = match data.cables.get_cable(cable_type) {
            Some(cable) => cable,
            None => {
                return Ok(RuleOutcome::unrecognized(
                    TriggerField::CableType.as_str(),
                    cable_type,
                    "is not in the cable catalogue",
                ))
            }
        };
        let conditions = match Conditions::from_record(record) {
            Ok(conditions) => conditions,
            Err(outcome) => return Ok(outcome),
        };

        let ampacity = match data.cables.get_ampacity(
            &cable.code,
            gauge,
            conditions.method,
            conditions.ambient,
            conditions.grouping,
        ) {
            Some(ampacity) => ampacity,
            None => {
                return Ok(RuleOutcome::unrecognized(
                    "installationMethod",
                    conditions.method.code(),
                    &format!("is not a permitted installation method for {}", cable.code),
                ))
            }
        };

        let compliant = current <= ampacity.derated;
        let message = if compliant {
            format!(
                "{} {} carries {} A, design current {} A",
                cable.code, gauge, ampacity.derated, current
            )
        } else {
            format!(
                "Design current {} A exceeds the derated ampacity {} A of {} {} (method {}, {} °C, {} grouped)",
                current,
                ampacity.derated,
                cable.code,
                gauge,
                conditions.method,
                conditions.ambient,
                conditions.grouping
            )
        };

        Ok(RuleOutcome::measured(current, ampacity.derated, "A", compliant)
            .with_message(message)
            .detail("cableType", cable.code.as_str())
            .detail("gauge", gauge.mm2())
            .detail("installationMethod", conditions.method.code())
            .detail("ambientTemperature", conditions.ambient)
            .detail("groupingCount", conditions.grouping)
            .detail("baseAmpacity", ampacity.base)
            .detail("temperatureFactor", round(ampacity.temp_factor, 3))
            .detail("groupingFactor", ampacity.group_factor)
            .detail("deratedAmpacity", ampacity.derated))
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let mut remedies = Vec::new();

        let cable = outcome.detail_str("cableType");
        let method = outcome
            .detail_str("installationMethod")
            .and_then(|m| m.parse::<InstallationMethod>().ok());
        let gauge = outcome.detail_f64("gauge").and_then(Gauge::from_mm2);
        let ambient = outcome.detail_f64("ambientTemperature");
        let grouping = outcome.detail_f64("groupingCount").map(|g| g as u32);

        let (cable, method, gauge, ambient, grouping, current) =
            match (cable, method, gauge, ambient, grouping, outcome.actual) {
                (Some(c), Some(m), Some(g), Some(a), Some(n), Some(i)) => (c, m, g, a, n, i),
                _ => return remedies,
            };

        match data
            .cables
            .find_minimum_gauge(cable, current, method, ambient, grouping)
        {
            Some(minimum) => remedies.push(
                Remedy::new(
                    "increase_gauge",
                    format!("Use at least {} {} for {} A", cable, minimum, current),
                )
                .with_value(minimum.mm2()),
            ),
            None => remedies.push(Remedy::new(
                "split_circuit",
                format!(
                    "No standard {} gauge carries {} A under these conditions; split the load or run parallel conductors",
                    cable, current
                ),
            )),
        }

        if grouping > 1 {
            remedies.push(Remedy::new(
                "reduce_grouping",
                format!(
                    "Separate the cable from the bundle of {} to raise the grouping factor",
                    grouping
                ),
            ));
        }

        let better_method = InstallationMethod::ALL.iter().copied().find(|m| {
            *m != method
                && data
                    .cables
                    .get_ampacity(cable, gauge, *m, ambient, grouping)
                    .map(|a| a.derated >= current)
                    .unwrap_or(false)
        });
        if let Some(better) = better_method {
            remedies.push(
                Remedy::new(
                    "change_installation_method",
                    format!("Laid as method {} the existing {} carries the load", better, gauge),
                )
                .with_value(better.code()),
            );
        }

        remedies
    }
}

/// Nominal voltage must not exceed the cable's rated voltage.
pub struct CableVoltageRatingRule;

impl Rule for CableVoltageRatingRule {
    fn code(&self) -> &'static str {
        codes::CABLE_VOLTAGE_RATING_EXCEEDED
    }

    fn name(&self) -> &'static str {
        "Cable voltage rating"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Cable
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[TriggerField::Voltage, TriggerField::CableType]
    }

    fn normative_reference(&self) -> &'static str {
        references::CABLE_RATING
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let voltage = required(record.voltage, TriggerField::Voltage)?;
        let cable_type = required_text(&record.cable_type, TriggerField::CableType)?;

        let cable = match data.cables.get_cable(cable_type) {
            Some(cable) => cable,
            None => {
                return Ok(RuleOutcome::unrecognized(
                    TriggerField::CableType.as_str(),
                    cable_type,
                    "is not in the cable catalogue",
                ))
            }
        };

        let compliant = voltage <= cable.rated_voltage;
        let message = if compliant {
            format!("{} is rated {} V", cable.code, cable.rated_voltage)
        } else {
            format!(
                "{} V exceeds the {} V rating of {}",
                voltage, cable.rated_voltage, cable.code
            )
        };

        Ok(RuleOutcome::measured(voltage, cable.rated_voltage, "V", compliant)
            .with_message(message)
            .detail("cableType", cable.code.as_str())
            .detail("ratedVoltage", cable.rated_voltage)
            .detail("maxTemperature", cable.max_temperature))
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let voltage = match outcome.actual {
            Some(voltage) => voltage,
            None => return Vec::new(),
        };

        let replacement = data
            .cables
            .cables()
            .filter(|c| c.rated_voltage >= voltage)
            .min_by(|a, b| a.rated_voltage.total_cmp(&b.rated_voltage));

        match replacement {
            Some(cable) => vec![Remedy::new(
                "select_cable",
                format!("Use {} (rated {} V) or another cable rated for {} V", cable.code, cable.rated_voltage, voltage),
            )
            .with_value(cable.code.as_str())],
            None => vec![Remedy::new(
                "select_cable",
                format!("No catalogue cable is rated for {} V; use a medium-voltage cable", voltage),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(current: f64, gauge: f64, cable: &str) -> CircuitRecord {
        CircuitRecord {
            current: Some(current),
            gauge: Some(gauge),
            cable_type: Some(cable.to_string()),
            installation_method: Some("conduit/tray".to_string()),
            ambient_temperature: Some(30.0),
            grouping_count: Some(1),
            ..CircuitRecord::new("c-1")
        }
    }

    #[test]
    fn test_ampacity_scenario_compliant() {
        let data = ReferenceData::default();
        let outcome = CableAmpacityRule
            .calculate(&record(20.0, 10.0, "NYY"), &data)
            .unwrap();
        assert!(outcome.compliant);
        assert_eq!(outcome.limit, Some(46.0));
        assert_eq!(outcome.unit, "A");
    }

    #[test]
    fn test_ampacity_undersized() {
        let data = ReferenceData::default();
        let outcome = CableAmpacityRule
            .calculate(&record(100.0, 10.0, "NYY"), &data)
            .unwrap();
        assert!(!outcome.compliant);
        assert_eq!(outcome.actual, Some(100.0));
        assert_eq!(outcome.detail_f64("baseAmpacity"), Some(46.0));

        let remedies = CableAmpacityRule.remedy_options(&outcome, &data);
        let increase = remedies.iter().find(|r| r.action == "increase_gauge").unwrap();
        let suggested = increase.suggested_value.as_ref().and_then(Value::as_f64).unwrap();
        let gauge = Gauge::from_mm2(suggested).unwrap();
        let carries = data
            .cables
            .get_ampacity("NYY", gauge, InstallationMethod::B2, 30.0, 1)
            .unwrap();
        assert!(carries.derated >= 100.0);
    }

    #[test]
    fn test_ampacity_defaults_when_conditions_missing() {
        let data = ReferenceData::default();
        let mut r = record(20.0, 10.0, "NYY");
        r.installation_method = None;
        r.ambient_temperature = None;
        r.grouping_count = None;
        let outcome = CableAmpacityRule.calculate(&r, &data).unwrap();
        assert_eq!(outcome.detail_str("installationMethod"), Some("B2"));
        assert_eq!(outcome.detail_f64("ambientTemperature"), Some(30.0));
        assert_eq!(outcome.limit, Some(46.0));
    }

    #[test]
    fn test_ampacity_grouping_remedy() {
        let data = ReferenceData::default();
        let mut r = record(10.0, 2.5, "NYM");
        r.grouping_count = Some(12);
        let outcome = CableAmpacityRule.calculate(&r, &data).unwrap();
        assert!(!outcome.compliant);
        let remedies = CableAmpacityRule.remedy_options(&outcome, &data);
        assert!(remedies.iter().any(|r| r.action == "reduce_grouping"));
    }

    #[test]
    fn test_ampacity_unknown_values_are_findings() {
        let data = ReferenceData::default();

        let outcome = CableAmpacityRule
            .calculate(&record(20.0, 3.0, "NYY"), &data)
            .unwrap();
        assert!(!outcome.compliant);
        assert_eq!(outcome.unrecognized_field(), Some("gauge"));

        let outcome = CableAmpacityRule
            .calculate(&record(20.0, 10.0, "XYZ"), &data)
            .unwrap();
        assert_eq!(outcome.unrecognized_field(), Some("cableType"));

        let mut r = record(20.0, 10.0, "NYY");
        r.installation_method = Some("ceiling".to_string());
        let outcome = CableAmpacityRule.calculate(&r, &data).unwrap();
        assert_eq!(outcome.unrecognized_field(), Some("installationMethod"));
    }

    #[test]
    fn test_ampacity_unpermitted_method() {
        let data = ReferenceData::default();
        let mut r = record(10.0, 2.5, "NYM");
        r.installation_method = Some("buried".to_string());
        let outcome = CableAmpacityRule.calculate(&r, &data).unwrap();
        assert!(!outcome.compliant);
        assert_eq!(outcome.unrecognized_field(), Some("installationMethod"));
        assert_eq!(outcome.detail_str("value"), Some("D"));
    }

    #[test]
    fn test_ampacity_negative_current_is_error() {
        let data = ReferenceData::default();
        let err = CableAmpacityRule
            .calculate(&record(-1.0, 10.0, "NYY"), &data)
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidInput { field: "current", .. }));
    }

    #[test]
    fn test_voltage_rating() {
        let data = ReferenceData::default();
        let mut r = CircuitRecord::new("c-2");
        r.voltage = Some(400.0);
        r.cable_type = Some("NYM-J".to_string());
        assert!(CableVoltageRatingRule.calculate(&r, &data).unwrap().compliant);

        r.voltage = Some(690.0);
        let outcome = CableVoltageRatingRule.calculate(&r, &data).unwrap();
        assert!(!outcome.compliant);
        assert_eq!(outcome.limit, Some(500.0));

        let remedies = CableVoltageRatingRule.remedy_options(&outcome, &data);
        assert_eq!(remedies.len(), 1);
        let code = remedies[0].suggested_value.as_ref().and_then(Value::as_str).unwrap();
        assert!(data.cables.get_cable(code).unwrap().rated_voltage >= 690.0);
    }

    #[test]
    fn test_voltage_rating_beyond_catalogue() {
        let data = ReferenceData::default();
        let mut r = CircuitRecord::new("c-3");
        r.voltage = Some(10_000.0);
        r.cable_type = Some("NYY".to_string());
        let outcome = CableVoltageRatingRule.calculate(&r, &data).unwrap();
        let remedies = CableVoltageRatingRule.remedy_options(&outcome, &data);
        assert!(remedies[0].suggested_value.is_none());
    }
}

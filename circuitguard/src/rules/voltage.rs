//! Voltage rules: drop along the cable and nominal system voltage.

use serde_json::Value;

use crate::cables::{Gauge, VoltageDropInput};
use crate::circuit::{CircuitRecord, TriggerField};
use crate::findings::{Remedy, RuleCategory};
use crate::standards::{references, Severity, DEFAULT_POWER_FACTOR};

use super::{codes, required, round, ReferenceData, Rule, RuleError, RuleOutcome};

/// Voltage drop must stay within the ceiling for the load type.
pub struct VoltageDropRule;

impl Rule for VoltageDropRule {
    fn code(&self) -> &'static str {
        codes::VOLTAGE_DROP_EXCESSIVE
    }

    fn name(&self) -> &'static str {
        "Voltage drop"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Voltage
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[
            TriggerField::Voltage,
            TriggerField::Current,
            TriggerField::Gauge,
            TriggerField::Distance,
        ]
    }

    fn normative_reference(&self) -> &'static str {
        references::VOLTAGE_DROP
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let voltage = required(record.voltage, TriggerField::Voltage)?;
        let current = required(record.current, TriggerField::Current)?;
        let gauge_mm2 = required(record.gauge, TriggerField::Gauge)?;
        let distance = required(record.distance, TriggerField::Distance)?;

        if voltage <= 0.0 {
            return Err(RuleError::InvalidInput {
                field: "voltage",
                reason: format!("{} V cannot express a drop percentage", voltage),
            });
        }
        if distance < 0.0 {
            return Err(RuleError::InvalidInput {
                field: "distance",
                reason: format!("{} m is negative", distance),
            });
        }
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

        let cable_type = record
            .cable_type
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if let Some(code) = cable_type {
            if data.cables.get_cable(code).is_none() {
                return Ok(RuleOutcome::unrecognized(
                    TriggerField::CableType.as_str(),
                    code,
                    "is not in the cable catalogue",
                ));
            }
        }

        let phase_count = record.effective_phase_count();
        let power_factor = record
            .power_factor
            .filter(|pf| pf.is_finite())
            .unwrap_or(DEFAULT_POWER_FACTOR);
        let load_type = record.load_type.unwrap_or_default();

        let drop = data
            .cables
            .calculate_voltage_drop(&VoltageDropInput {
                gauge,
                distance,
                current,
                phase_count,
                voltage,
                power_factor,
                cable_type,
            })
            .ok_or_else(|| RuleError::Calculation(format!("no impedance tabulated for {}", gauge)))?;

        let limit = data.standards.max_voltage_drop_percent(load_type);
        let compliant = drop.percent <= limit;
        let message = if compliant {
            format!("Voltage drop {:.2} % within the {} % limit", drop.percent, limit)
        } else {
            format!(
                "Voltage drop {:.2} % ({:.2} V over {} m) exceeds the {} % limit for {} loads",
                drop.percent,
                drop.volts,
                distance,
                limit,
                load_type.as_str()
            )
        };

        Ok(RuleOutcome::measured(drop.percent, limit, "%", compliant)
            .with_message(message)
            .detail("dropVolts", round(drop.volts, 3))
            .detail("dropPercent", round(drop.percent, 3))
            .detail("phaseFactor", round(drop.phase_factor, 4))
            .detail("phaseCount", phase_count)
            .detail("powerFactor", power_factor)
            .detail("loadType", load_type.as_str())
            .detail("gauge", gauge.mm2())
            .detail("distance", distance)
            .detail("current", current)
            .detail("voltage", voltage)
            .detail("cableType", cable_type))
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let mut remedies = Vec::new();

        let inputs = (
            outcome.detail_f64("gauge").and_then(Gauge::from_mm2),
            outcome.detail_f64("distance"),
            outcome.detail_f64("current"),
            outcome.detail_f64("voltage"),
            outcome.detail_f64("phaseCount"),
            outcome.detail_f64("powerFactor"),
            outcome.actual,
            outcome.limit,
        );
        let (gauge, distance, current, voltage, phase_count, power_factor, percent, limit) =
            match inputs {
                (Some(g), Some(d), Some(i), Some(u), Some(n), Some(pf), Some(p), Some(l)) => {
                    (g, d, i, u, n as u8, pf, p, l)
                }
                _ => return remedies,
            };
        let cable_type = outcome.detail_str("cableType");

        let larger = Gauge::ALL.iter().copied().filter(|g| *g > gauge).find(|g| {
            data.cables
                .calculate_voltage_drop(&VoltageDropInput {
                    gauge: *g,
                    distance,
                    current,
                    phase_count,
                    voltage,
                    power_factor,
                    cable_type,
                })
                .map(|d| d.percent <= limit)
                .unwrap_or(false)
        });
        if let Some(g) = larger {
            remedies.push(
                Remedy::new(
                    "increase_gauge",
                    format!("A {} conductor keeps the drop within {} %", g, limit),
                )
                .with_value(g.mm2()),
            );
        }

        if percent > 0.0 {
            let max_distance = (distance * limit / percent * 10.0).floor() / 10.0;
            remedies.push(
                Remedy::new(
                    "shorten_run",
                    format!("Keep the run at or below {} m with the current gauge", max_distance),
                )
                .with_value(max_distance),
            );
        }

        remedies
    }
}

/// Nominal voltage must be one of the standard system voltages.
pub struct VoltageRangeRule;

impl Rule for VoltageRangeRule {
    fn code(&self) -> &'static str {
        codes::VOLTAGE_OUT_OF_RANGE
    }

    fn name(&self) -> &'static str {
        "Nominal voltage"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Voltage
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[TriggerField::Voltage]
    }

    fn normative_reference(&self) -> &'static str {
        references::NOMINAL_VOLTAGE
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let voltage = required(record.voltage, TriggerField::Voltage)?;
        let standards = &data.standards;

        let nearest = standards
            .nearest_valid_voltage(voltage)
            .ok_or_else(|| RuleError::Calculation("no nominal voltages configured".to_string()))?;
        let compliant = standards.is_valid_voltage(voltage);
        let message = if compliant {
            format!("{} V is a nominal system voltage", voltage)
        } else {
            format!(
                "{} V is not a nominal system voltage; nearest is {} V",
                voltage, nearest
            )
        };

        let mut outcome = RuleOutcome::measured(voltage, nearest, "V", compliant)
            .with_message(message)
            .detail("nearestValidVoltage", nearest)
            .detail("validVoltages", Value::from(standards.valid_voltages.clone()));

        if let Some(frequency) = record.frequency.filter(|f| f.is_finite()) {
            outcome = outcome
                .detail("frequency", frequency)
                .detail("frequencyValid", standards.is_valid_frequency(frequency));
        }

        Ok(outcome)
    }

    fn remedy_options(&self, outcome: &RuleOutcome, _data: &ReferenceData) -> Vec<Remedy> {
        match outcome.detail_f64("nearestValidVoltage") {
            Some(nearest) => vec![Remedy::new(
                "set_nominal_voltage",
                format!("Design for the nominal {} V system", nearest),
            )
            .with_value(nearest)],
            None => Vec::new(),
        }
    }
}

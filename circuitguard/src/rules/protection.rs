//! Protection rules: device sizing, disconnection by loop impedance and
//! upstream/downstream selectivity.

use serde_json::Value;

use crate::circuit::{CircuitRecord, TriggerField};
use crate::findings::{Remedy, RuleCategory};
use crate::protection::{DeviceFamily, DeviceKind, SELECTIVITY_RATIO};
use crate::standards::{references, Severity};

use super::{codes, required, required_text, round, ReferenceData, Rule, RuleError, RuleOutcome};

/// Rated current of the protective device must cover the design current.
pub struct ProtectionSizingRule;

impl Rule for ProtectionSizingRule {
    fn code(&self) -> &'static str {
        codes::PROTECTION_DEVICE_UNDERSIZED
    }

    fn name(&self) -> &'static str {
        "Protection device sizing"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Protection
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[TriggerField::Current, TriggerField::ProtectionCurrent]
    }

    fn normative_reference(&self) -> &'static str {
        references::OVERLOAD_PROTECTION
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        _data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let current = required(record.current, TriggerField::Current)?;
        let rated = required(record.protection_current, TriggerField::ProtectionCurrent)?;

        let compliant = rated >= current;
        let message = if compliant {
            format!("Device rated {} A covers the design current {} A", rated, current)
        } else {
            format!(
                "Device rated {} A is below the design current {} A",
                rated, current
            )
        };

        let device_type = record
            .protection_device_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        Ok(RuleOutcome::measured(rated, current, "A", compliant)
            .with_message(message)
            .detail("designCurrent", current)
            .detail("protectionCurrent", rated)
            .detail("deviceType", device_type))
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let current = match outcome.limit {
            Some(current) => current,
            None => return Vec::new(),
        };

        let family = outcome
            .detail_str("deviceType")
            .and_then(|t| data.protection.get_device(t))
            .map(|d| d.family);

        let mut remedies = Vec::new();
        let suggestion = match family {
            Some(family) => data
                .protection
                .find_minimum_device(family, current)
                .map(|d| (d.code.clone(), Value::from(d.code.as_str()))),
            None => data
                .standards
                .device_ladder
                .iter()
                .find(|size| **size >= current)
                .map(|size| (format!("{} A", size), Value::from(*size))),
        };

        match suggestion {
            Some((label, value)) => remedies.push(
                Remedy::new(
                    "increase_rating",
                    format!("Use a {} device for the {} A design current", label, current),
                )
                .with_value(value),
            ),
            None => remedies.push(Remedy::new(
                "split_circuit",
                format!("No standard device size covers {} A; split the circuit", current),
            )),
        }

        remedies.push(Remedy::new(
            "verify_cable",
            "Confirm the cable's derated ampacity is at least the new device rating",
        ));

        remedies
    }
}

/// Earth-fault loop impedance must allow automatic disconnection.
pub struct LoopImpedanceRule;

impl Rule for LoopImpedanceRule {
    fn code(&self) -> &'static str {
        codes::IMPEDANCE_TOO_HIGH_PROTECTION_INADEQUATE
    }

    fn name(&self) -> &'static str {
        "Earth-fault loop impedance"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Protection
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[
            TriggerField::Voltage,
            TriggerField::ProtectionCurrent,
            TriggerField::LoopImpedance,
        ]
    }

    fn normative_reference(&self) -> &'static str {
        references::DISCONNECTION
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let voltage = required(record.voltage, TriggerField::Voltage)?;
        let rated = required(record.protection_current, TriggerField::ProtectionCurrent)?;
        let impedance = required(record.loop_impedance, TriggerField::LoopImpedance)?;

        if voltage <= 0.0 {
            return Err(RuleError::InvalidInput {
                field: "voltage",
                reason: format!("{} V is not a supply voltage", voltage),
            });
        }
        if rated <= 0.0 {
            return Err(RuleError::InvalidInput {
                field: "protectionCurrent",
                reason: format!("{} A gives no tripping current", rated),
            });
        }
        if impedance < 0.0 {
            return Err(RuleError::InvalidInput {
                field: "loopImpedance",
                reason: format!("{} Ω is negative", impedance),
            });
        }

        let device_type = record
            .protection_device_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let characteristic = match device_type {
            Some(code) => data.protection.get_characteristic(code),
            None => DeviceFamily::MOST_CONSERVATIVE.characteristic(),
        };

        let trip_multiple = characteristic.trip_point.min;
        let trip_current = rated * trip_multiple;
        let u0 = data
            .standards
            .line_to_earth_voltage(voltage, record.is_three_phase());
        let max_impedance = data
            .standards
            .max_loop_impedance(u0, trip_current)
            .ok_or_else(|| {
                RuleError::Calculation(format!("no loop impedance limit for {} A", trip_current))
            })?;

        let compliant = impedance <= max_impedance;
        let message = if compliant {
            format!(
                "Loop impedance {} Ω within Z_max {:.2} Ω ({} {} A)",
                impedance, max_impedance, characteristic.family, rated
            )
        } else {
            format!(
                "Loop impedance {} Ω exceeds Z_max {:.2} Ω; the {} {} A device will not disconnect in time",
                impedance, max_impedance, characteristic.family, rated
            )
        };

        let mut outcome = RuleOutcome::measured(impedance, max_impedance, "Ω", compliant)
            .with_message(message)
            .detail("lineToEarthVoltage", u0)
            .detail("protectionCurrent", rated)
            .detail("family", characteristic.family.letter().to_string())
            .detail("tripMultiple", trip_multiple)
            .detail("tripCurrent", trip_current)
            .detail("maxLoopImpedance", round(max_impedance, 3));

        if impedance > 0.0 {
            let fault_current = u0 / impedance;
            outcome = outcome.detail("prospectiveFaultCurrent", round(fault_current, 1));

            if let Some(code) = device_type {
                if let Some(trip) = data.protection.get_trip_time(code, fault_current, Some(rated)) {
                    outcome = outcome
                        .detail("tripRegion", trip.region.as_str())
                        .detail("tripTimeMs", trip.time_ms);
                    if let Some(energy) =
                        data.protection
                            .calculate_let_through_energy(code, fault_current, trip.time_ms)
                    {
                        outcome = outcome.detail("letThroughEnergy", round(energy.energy, 0));
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let (impedance, max_impedance) = match (outcome.actual, outcome.limit) {
            (Some(z), Some(z_max)) => (z, z_max),
            _ => return Vec::new(),
        };

        let mut remedies = vec![Remedy::new(
            "reduce_loop_impedance",
            format!(
                "Increase the conductor cross-section or shorten the run to bring Z_s to {:.2} Ω or below",
                max_impedance
            ),
        )
        .with_value(round(max_impedance, 2))];

        let current_family = outcome.detail_str("family").and_then(|f| f.chars().next());
        if let (Some(u0), Some(rated)) = (
            outcome.detail_f64("lineToEarthVoltage"),
            outcome.detail_f64("protectionCurrent"),
        ) {
            // Prefer the highest trip multiple that still disconnects
            let family = DeviceFamily::ALL
                .iter()
                .copied()
                .filter(|f| Some(f.letter()) != current_family)
                .filter(|f| {
                    let multiple = f.characteristic().trip_point.min;
                    data.standards
                        .max_loop_impedance(u0, rated * multiple)
                        .map(|z_max| impedance <= z_max)
                        .unwrap_or(false)
                })
                .max_by(|a, b| {
                    a.characteristic()
                        .trip_point
                        .min
                        .total_cmp(&b.characteristic().trip_point.min)
                });

            if let Some(family) = family {
                let value = data
                    .protection
                    .find_minimum_device(family, rated)
                    .map(|d| d.code.clone())
                    .unwrap_or_else(|| family.letter().to_string());
                remedies.push(
                    Remedy::new(
                        "change_characteristic",
                        format!("A family {} device trips at the available fault current", family),
                    )
                    .with_value(value),
                );
            }
        }

        remedies.push(Remedy::new(
            "add_rcd",
            "Add a 30 mA residual current device for fault protection",
        ));

        remedies
    }
}

/// Downstream device must trip before the upstream one.
pub struct SelectivityRule;

impl Rule for SelectivityRule {
    fn code(&self) -> &'static str {
        codes::COORDINATION_NOT_SELECTIVE
    }

    fn name(&self) -> &'static str {
        "Selectivity"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Coordination
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn trigger_fields(&self) -> &'static [TriggerField] {
        &[
            TriggerField::UpstreamDeviceType,
            TriggerField::DownstreamDeviceType,
        ]
    }

    fn normative_reference(&self) -> &'static str {
        references::SELECTIVITY
    }

    fn calculate(
        &self,
        record: &CircuitRecord,
        data: &ReferenceData,
    ) -> Result<RuleOutcome, RuleError> {
        let upstream = required_text(&record.upstream_device_type, TriggerField::UpstreamDeviceType)?;
        let downstream =
            required_text(&record.downstream_device_type, TriggerField::DownstreamDeviceType)?;

        for (field, code) in [
            (TriggerField::UpstreamDeviceType, upstream),
            (TriggerField::DownstreamDeviceType, downstream),
        ] {
            if data.protection.get_device(code).is_none() {
                return Ok(RuleOutcome::unrecognized(
                    field.as_str(),
                    code,
                    "is not in the device catalogue",
                ));
            }
        }

        let loop_impedance = record.loop_impedance.filter(|z| z.is_finite() && *z > 0.0);
        let assessment = data
            .protection
            .is_selective(upstream, downstream, loop_impedance)
            .ok_or_else(|| {
                RuleError::Calculation(format!(
                    "no selectivity assessment for {} over {}",
                    upstream, downstream
                ))
            })?;

        let mut outcome = RuleOutcome::measured(
            assessment.ratio,
            SELECTIVITY_RATIO,
            "×",
            assessment.selective,
        )
        .with_message(assessment.reason.clone())
        .detail("upstream", upstream)
        .detail("downstream", downstream)
        .detail("upstreamRated", assessment.upstream_rated)
        .detail("downstreamRated", assessment.downstream_rated)
        .detail("ratio", round(assessment.ratio, 3))
        .detail("note", assessment.note.clone());

        if let Some(limit) = assessment.selectivity_limit {
            outcome = outcome.detail("selectivityLimit", limit);
        }

        Ok(outcome)
    }

    fn remedy_options(&self, outcome: &RuleOutcome, data: &ReferenceData) -> Vec<Remedy> {
        let up = outcome.detail_str("upstream").and_then(|c| data.protection.get_device(c));
        let down = outcome.detail_str("downstream").and_then(|c| data.protection.get_device(c));
        let (up, down) = match (up, down) {
            (Some(up), Some(down)) => (up, down),
            _ => return Vec::new(),
        };

        let mut remedies = Vec::new();

        let upstream_family = if up.family == DeviceFamily::B && down.family == DeviceFamily::C {
            DeviceFamily::C
        } else {
            up.family
        };
        let target = down.rated_current * SELECTIVITY_RATIO;
        if let Some(device) = data.protection.find_minimum_device(upstream_family, target) {
            remedies.push(
                Remedy::new(
                    "increase_upstream",
                    format!(
                        "Use {} upstream, at least {} × the downstream rating",
                        device.code, SELECTIVITY_RATIO
                    ),
                )
                .with_value(device.code.as_str()),
            );
        }

        let smaller_downstream = data
            .protection
            .devices()
            .filter(|d| d.kind == DeviceKind::Mcb && d.family == down.family)
            .filter(|d| d.rated_current * SELECTIVITY_RATIO <= up.rated_current)
            .max_by(|a, b| a.rated_current.total_cmp(&b.rated_current));
        if let Some(device) = smaller_downstream {
            if !(up.family == DeviceFamily::B && device.family == DeviceFamily::C) {
                remedies.push(
                    Remedy::new(
                        "reduce_downstream",
                        format!("Use {} downstream if the load permits", device.code),
                    )
                    .with_value(device.code.as_str()),
                );
            }
        }

        remedies.push(Remedy::new(
            "consult_selectivity_tables",
            "Confirm the pairing against the manufacturer's selectivity tables",
        ));

        remedies
    }
}

//! ---
//! bms_section: "11-simulation-test-harness"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Cell telemetry readings and alert evaluation."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use bms_common::{Chemistry, Phase, WorkingCondition};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::SimError;

/// Temperature above which a reading is flagged as overheating, in °C.
pub const OVERHEAT_THRESHOLD_C: f64 = 45.0;
/// Voltage below which a reading is flagged as undervoltage, in volts.
pub const UNDERVOLTAGE_THRESHOLD_V: f64 = 2.5;

/// Operator-set configuration for one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellConfig {
    pub chemistry: Chemistry,
    pub working_condition: WorkingCondition,
}

impl CellConfig {
    pub fn new(chemistry: Chemistry, working_condition: WorkingCondition) -> Self {
        Self {
            chemistry,
            working_condition,
        }
    }
}

/// Alert raised on a single reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum AlertKind {
    Overheat,
    Undervoltage,
    Overvoltage,
    /// Cell-level alert carrying the operator-assigned condition.
    Cell(WorkingCondition),
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Overheat => f.write_str("Overheat"),
            AlertKind::Undervoltage => f.write_str("Undervoltage"),
            AlertKind::Overvoltage => f.write_str("Overvoltage"),
            AlertKind::Cell(condition) => write!(f, "Cell {}", condition),
        }
    }
}

impl FromStr for AlertKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "overheat" => return Ok(AlertKind::Overheat),
            "undervoltage" => return Ok(AlertKind::Undervoltage),
            "overvoltage" => return Ok(AlertKind::Overvoltage),
            _ => {}
        }
        trimmed
            .split_once(' ')
            .filter(|(prefix, _)| prefix.eq_ignore_ascii_case("cell"))
            .and_then(|(_, condition)| condition.trim().parse().ok())
            .map(AlertKind::Cell)
            .ok_or_else(|| SimError::UnknownAlert(s.to_owned()))
    }
}

/// Evaluate every alert predicate independently, in a fixed order.
///
/// Overvoltage is strict: a reading exactly at the chemistry ceiling is not an alert.
pub fn evaluate_alerts(
    chemistry: Chemistry,
    condition: WorkingCondition,
    voltage_v: f64,
    temperature_c: f64,
) -> Vec<AlertKind> {
    let mut alerts = Vec::new();
    if temperature_c > OVERHEAT_THRESHOLD_C {
        alerts.push(AlertKind::Overheat);
    }
    if voltage_v < UNDERVOLTAGE_THRESHOLD_V {
        alerts.push(AlertKind::Undervoltage);
    }
    if voltage_v > chemistry.voltage_ceiling() {
        alerts.push(AlertKind::Overvoltage);
    }
    if condition.is_alerting() {
        alerts.push(AlertKind::Cell(condition));
    }
    alerts
}

/// Scalar parameter of a reading that can be compared across records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ParamKind {
    #[strum(to_string = "Voltage", serialize = "voltage_v")]
    Voltage,
    #[strum(to_string = "Current", serialize = "current_a")]
    Current,
    #[strum(to_string = "Temperature", serialize = "temperature_c")]
    Temperature,
    #[strum(to_string = "Capacity", serialize = "capacity_wh")]
    CapacityWh,
    #[strum(to_string = "SoC", serialize = "soc_pct")]
    Soc,
    #[strum(to_string = "SoH", serialize = "soh_pct")]
    Soh,
}

impl ParamKind {
    pub fn unit(&self) -> &'static str {
        match self {
            ParamKind::Voltage => "V",
            ParamKind::Current => "A",
            ParamKind::Temperature => "°C",
            ParamKind::CapacityWh => "Wh",
            ParamKind::Soc | ParamKind::Soh => "%",
        }
    }
}

/// One cell, one tick. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub voltage_v: f64,
    pub current_a: f64,
    pub temperature_c: f64,
    pub capacity_wh: f64,
    pub soc_pct: f64,
    pub soh_pct: f64,
    pub chemistry: Chemistry,
    pub phase: Phase,
    pub working_condition: WorkingCondition,
    #[serde(default)]
    pub alerts: Vec<AlertKind>,
}

impl TelemetryReading {
    /// Scalar value for the requested parameter.
    pub fn value(&self, param: ParamKind) -> f64 {
        match param {
            ParamKind::Voltage => self.voltage_v,
            ParamKind::Current => self.current_a,
            ParamKind::Temperature => self.temperature_c,
            ParamKind::CapacityWh => self.capacity_wh,
            ParamKind::Soc => self.soc_pct,
            ParamKind::Soh => self.soh_pct,
        }
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Alerts joined for display; `None` when the reading is clean.
    pub fn alert_label(&self) -> String {
        if self.alerts.is_empty() {
            return "None".to_owned();
        }
        self.alerts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overvoltage_boundary_is_strict() {
        let at_ceiling = evaluate_alerts(Chemistry::Nmc, WorkingCondition::Normal, 4.2, 30.0);
        assert!(!at_ceiling.contains(&AlertKind::Overvoltage));
        let above = evaluate_alerts(Chemistry::Nmc, WorkingCondition::Normal, 4.2001, 30.0);
        assert_eq!(above, vec![AlertKind::Overvoltage]);
        let lfp = evaluate_alerts(Chemistry::Lfp, WorkingCondition::Normal, 3.6001, 30.0);
        assert_eq!(lfp, vec![AlertKind::Overvoltage]);
    }

    #[test]
    fn alerts_concatenate_without_short_circuit() {
        let alerts = evaluate_alerts(Chemistry::Lfp, WorkingCondition::Faulty, 2.1, 52.0);
        assert_eq!(
            alerts,
            vec![
                AlertKind::Overheat,
                AlertKind::Undervoltage,
                AlertKind::Cell(WorkingCondition::Faulty)
            ]
        );
    }

    #[test]
    fn degraded_cells_do_not_raise_cell_alerts() {
        let alerts = evaluate_alerts(Chemistry::Lfp, WorkingCondition::Degraded, 3.2, 40.0);
        assert!(alerts.is_empty());
        let critical = evaluate_alerts(Chemistry::Lfp, WorkingCondition::Critical, 3.2, 40.0);
        assert_eq!(critical, vec![AlertKind::Cell(WorkingCondition::Critical)]);
    }

    #[test]
    fn alert_labels_roundtrip_through_strings() {
        for alert in [
            AlertKind::Overheat,
            AlertKind::Undervoltage,
            AlertKind::Overvoltage,
            AlertKind::Cell(WorkingCondition::Faulty),
        ] {
            assert_eq!(alert.to_string().parse::<AlertKind>().unwrap(), alert);
        }
        assert_eq!(
            AlertKind::Cell(WorkingCondition::Critical).to_string(),
            "Cell Critical"
        );
        assert!("Cell Happy".parse::<AlertKind>().is_err());
    }

    #[test]
    fn param_kind_accepts_display_and_field_names() {
        assert_eq!("voltage".parse::<ParamKind>().unwrap(), ParamKind::Voltage);
        assert_eq!("soc".parse::<ParamKind>().unwrap(), ParamKind::Soc);
        assert_eq!(
            "capacity_wh".parse::<ParamKind>().unwrap(),
            ParamKind::CapacityWh
        );
        assert_eq!(ParamKind::Soh.to_string(), "SoH");
    }

    #[test]
    fn clean_reading_renders_none_label() {
        let reading = TelemetryReading {
            voltage_v: 3.3,
            current_a: 0.0,
            temperature_c: 30.0,
            capacity_wh: 0.0,
            soc_pct: 75.0,
            soh_pct: 95.0,
            chemistry: Chemistry::Lfp,
            phase: Phase::Idle,
            working_condition: WorkingCondition::Normal,
            alerts: Vec::new(),
        };
        assert_eq!(reading.alert_label(), "None");
        assert_eq!(reading.value(ParamKind::Soc), 75.0);
    }
}

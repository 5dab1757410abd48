//! ---
//! bms_section: "11-simulation-test-harness"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Adapter translating external sensor frames into telemetry readings."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::{round_dp, CellId, Phase};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::model::{evaluate_alerts, CellConfig, TelemetryReading};
use crate::{Result, SimError};

fn default_soh() -> f64 {
    100.0
}

/// Raw per-cell entry as emitted by an external sensor board.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorCell {
    /// Explicit cell identifier; entries without one are matched by position.
    #[serde(default)]
    pub cell: Option<CellId>,
    #[serde(alias = "Voltage (V)")]
    pub voltage: f64,
    #[serde(alias = "Current (A)")]
    pub current: f64,
    #[serde(alias = "Temperature (°C)")]
    pub temperature: f64,
    #[serde(alias = "SoC (%)")]
    pub soc: f64,
    #[serde(default = "default_soh", alias = "SoH (%)")]
    pub soh: f64,
}

/// One sensor line: `{"cells": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SensorFrame {
    pub cells: Vec<SensorCell>,
}

impl SensorCell {
    fn validate(&self, cell: CellId) -> Result<()> {
        let fields = [
            ("voltage", self.voltage),
            ("current", self.current),
            ("temperature", self.temperature),
            ("soc", self.soc),
            ("soh", self.soh),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(SimError::InvalidValue { cell, field });
            }
        }
        Ok(())
    }

    fn into_reading(self, config: &CellConfig, phase: Phase) -> TelemetryReading {
        let voltage_v = round_dp(self.voltage, 3);
        let current_a = round_dp(self.current, 2);
        let temperature_c = round_dp(self.temperature, 1);
        TelemetryReading {
            voltage_v,
            current_a,
            temperature_c,
            capacity_wh: round_dp(voltage_v * current_a.abs(), 2),
            soc_pct: round_dp(self.soc.clamp(0.0, 100.0), 1),
            soh_pct: round_dp(self.soh.clamp(0.0, 100.0), 1),
            chemistry: config.chemistry,
            phase,
            working_condition: config.working_condition,
            alerts: evaluate_alerts(
                config.chemistry,
                config.working_condition,
                voltage_v,
                temperature_c,
            ),
        }
    }
}

/// Translate one sensor JSON line into readings for the configured cells.
///
/// Capacity and alerts are derived exactly as for synthetic readings, using the
/// chemistry and working condition configured for each cell.
pub fn parse_sensor_line(
    line: &str,
    cells: &IndexMap<CellId, CellConfig>,
    phase: Phase,
) -> Result<IndexMap<CellId, TelemetryReading>> {
    let value: Value = serde_json::from_str(line.trim())?;
    if !value.get("cells").is_some_and(Value::is_array) {
        return Err(SimError::MissingCells);
    }
    let frame: SensorFrame = serde_json::from_value(value)?;
    let positional = frame.cells.iter().all(|cell| cell.cell.is_none());
    if positional && frame.cells.len() != cells.len() {
        return Err(SimError::CellCountMismatch {
            expected: cells.len(),
            got: frame.cells.len(),
        });
    }

    let mut readings = IndexMap::with_capacity(frame.cells.len());
    for (position, raw) in frame.cells.into_iter().enumerate() {
        let (id, config) = match raw.cell {
            Some(id) => match cells.get(&id) {
                Some(config) => (id, config),
                None => return Err(SimError::UnknownCell(id)),
            },
            None => match cells.get_index(position) {
                Some((id, config)) => (*id, config),
                None => {
                    return Err(SimError::CellCountMismatch {
                        expected: cells.len(),
                        got: position + 1,
                    })
                }
            },
        };
        if readings.contains_key(&id) {
            return Err(SimError::DuplicateCell(id));
        }
        raw.validate(id)?;
        readings.insert(id, raw.into_reading(config, phase));
    }
    debug!(cells = readings.len(), phase = %phase, "sensor frame adapted");
    Ok(readings)
}

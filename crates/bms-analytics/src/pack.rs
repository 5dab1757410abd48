//! ---
//! bms_section: "05-analytics"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Comparison statistics and pack KPIs."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::round_dp;
use bms_records::Record;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Pack-level indicators derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSummary {
    pub cell_count: usize,
    pub total_voltage_v: f64,
    pub total_current_a: f64,
    /// Total voltage times total current.
    pub total_power_w: f64,
    pub average_temperature_c: f64,
    pub min_cell_voltage_v: f64,
    pub max_cell_voltage_v: f64,
    pub alerting_cells: usize,
}

impl PackSummary {
    /// `None` when the snapshot holds no cells.
    pub fn from_record(record: &Record) -> Option<Self> {
        if record.cells.is_empty() {
            return None;
        }
        let voltages: Vec<f64> = record.cells.values().map(|r| r.voltage_v).collect();
        let temperatures: Vec<f64> = record.cells.values().map(|r| r.temperature_c).collect();
        let total_voltage_v: f64 = voltages.iter().sum();
        let total_current_a: f64 = record.cells.values().map(|r| r.current_a).sum();

        Some(Self {
            cell_count: record.cells.len(),
            total_voltage_v: round_dp(total_voltage_v, 3),
            total_current_a: round_dp(total_current_a, 2),
            total_power_w: round_dp(total_voltage_v * total_current_a, 2),
            average_temperature_c: round_dp(Statistics::mean(&temperatures), 1),
            min_cell_voltage_v: Statistics::min(&voltages),
            max_cell_voltage_v: Statistics::max(&voltages),
            alerting_cells: record.cells.values().filter(|r| r.has_alerts()).count(),
        })
    }
}

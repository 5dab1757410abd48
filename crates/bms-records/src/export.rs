//! ---
//! bms_section: "03-history-records"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Telemetry history, phase log, and export shapes."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::io::Write;

use bms_common::{CellId, Phase};
use bms_sim::{CellConfig, TelemetryReading};
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::{PhaseLogEntry, Record};
use crate::Result;

/// One CSV row: a single cell of a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    /// Cell identifier (`Cell_<n>`).
    pub cell: String,
    /// RFC 3339 timestamp of the snapshot.
    pub timestamp: String,
    /// Phase label.
    pub phase: String,
    /// Chemistry label.
    pub chemistry: String,
    /// Working condition label.
    pub working_condition: String,
    /// Voltage in volts.
    pub voltage_v: f64,
    /// Current in amperes.
    pub current_a: f64,
    /// Temperature in °C.
    pub temperature_c: f64,
    /// Capacity in watt-hours.
    pub capacity_wh: f64,
    /// State of charge in percent.
    pub soc_pct: f64,
    /// State of health in percent.
    pub soh_pct: f64,
    /// Alerts joined for display, `None` when clean.
    pub alert: String,
}

impl CsvRow {
    /// Flatten one reading of a snapshot.
    pub fn from_reading(timestamp: DateTime<Utc>, cell: CellId, reading: &TelemetryReading) -> Self {
        Self {
            cell: cell.to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            phase: reading.phase.to_string(),
            chemistry: reading.chemistry.to_string(),
            working_condition: reading.working_condition.to_string(),
            voltage_v: reading.voltage_v,
            current_a: reading.current_a,
            temperature_c: reading.temperature_c,
            capacity_wh: reading.capacity_wh,
            soc_pct: reading.soc_pct,
            soh_pct: reading.soh_pct,
            alert: reading.alert_label(),
        }
    }

    fn rows(record: &Record) -> impl Iterator<Item = CsvRow> + '_ {
        record
            .cells
            .iter()
            .map(|(cell, reading)| CsvRow::from_reading(record.timestamp, *cell, reading))
    }
}

/// Write one snapshot as CSV, one row per cell in pack order.
pub fn write_csv<W: Write>(record: &Record, writer: W) -> Result<()> {
    write_history_csv(std::iter::once(record), writer)
}

/// Write many snapshots as CSV under a single header, in the given order.
pub fn write_history_csv<'a, I, W>(records: I, writer: W) -> Result<()>
where
    I: IntoIterator<Item = &'a Record>,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        for row in CsvRow::rows(record) {
            writer.serialize(&row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// JSON bundle handed to the presentation layer for download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    /// Latest snapshot, if any has been taken.
    pub snapshot: Option<Record>,
    /// Phase-transition log, oldest first.
    pub logs: Vec<PhaseLogEntry>,
    /// Current per-cell configuration.
    pub cell_conditions: IndexMap<CellId, CellConfig>,
    /// Phase in effect at export time.
    pub phase: Phase,
    /// Time the bundle was assembled.
    pub exported_at: DateTime<Utc>,
}

impl ExportBundle {
    /// Serialize as pretty JSON followed by a newline.
    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

//! ---
//! bms_section: "03-history-records"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Telemetry history, phase log, and export shapes."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::{CellId, Phase};
use bms_sim::TelemetryReading;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Timestamped snapshot of every cell's telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Append ordinal assigned by the store; zero until appended.
    pub sequence: u64,
    /// Time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Workflow phase in effect when the snapshot was taken.
    pub phase: Phase,
    /// Per-cell readings in pack order.
    pub cells: IndexMap<CellId, TelemetryReading>,
}

impl Record {
    /// Build an unsequenced record ready for [`crate::RecordStore::append`].
    pub fn new(
        timestamp: DateTime<Utc>,
        phase: Phase,
        cells: IndexMap<CellId, TelemetryReading>,
    ) -> Self {
        Self {
            sequence: 0,
            timestamp,
            phase,
            cells,
        }
    }

    /// Reading for a single cell, if the snapshot contains it.
    pub fn reading(&self, cell: &CellId) -> Option<&TelemetryReading> {
        self.cells.get(cell)
    }
}

/// Entry in the phase-transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseLogEntry {
    /// Time the transition happened.
    pub timestamp: DateTime<Utc>,
    /// Phase entered by the transition.
    pub phase: Phase,
    /// Human readable description.
    pub message: String,
}

impl PhaseLogEntry {
    /// Construct an entry for `phase` at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, phase: Phase, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            phase,
            message: message.into(),
        }
    }
}

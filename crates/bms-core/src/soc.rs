//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Workflow phase engine and dashboard session."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::time::elapsed_between;
use bms_common::{round_dp, CellId};
use bms_sim::TelemetryReading;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

const SECONDS_PER_HOUR: f64 = 3_600.0;

/// Integrates cell current over time to keep state of charge continuous.
#[derive(Debug, Clone)]
pub struct CoulombCounter {
    capacity_ah: f64,
    initial_soc: f64,
    soc: IndexMap<CellId, f64>,
    last_update: Option<DateTime<Utc>>,
}

impl CoulombCounter {
    pub fn new(capacity_ah: f64, initial_soc: f64) -> Self {
        Self {
            capacity_ah,
            initial_soc: initial_soc.clamp(0.0, 100.0),
            soc: IndexMap::new(),
            last_update: None,
        }
    }

    /// Integrate each reading's current since the previous call and overwrite
    /// its state of charge. The first call only seeds the cells.
    pub fn apply(&mut self, now: DateTime<Utc>, readings: &mut IndexMap<CellId, TelemetryReading>) {
        let hours = self
            .last_update
            .map(|last| elapsed_between(last, now).as_secs_f64() / SECONDS_PER_HOUR)
            .unwrap_or(0.0);
        for (cell, reading) in readings.iter_mut() {
            let soc = self.soc.entry(*cell).or_insert(self.initial_soc);
            let delta_pct = reading.current_a * hours / self.capacity_ah * 100.0;
            *soc = (*soc + delta_pct).clamp(0.0, 100.0);
            reading.soc_pct = round_dp(*soc, 1);
        }
        self.last_update = Some(now);
    }

    /// Integrated state of charge for `cell`, if it has been seen.
    pub fn soc(&self, cell: &CellId) -> Option<f64> {
        self.soc.get(cell).copied()
    }

    /// Forget integrated state; cells restart from the initial charge.
    pub fn reset(&mut self) {
        self.soc.clear();
        self.last_update = None;
    }
}

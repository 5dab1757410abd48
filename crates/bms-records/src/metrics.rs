//! ---
//! bms_section: "03-history-records"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Telemetry history, phase log, and export shapes."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{IntCounter, IntGauge, Opts, Registry};

use crate::Result;

/// Metrics published by the record store.
#[derive(Clone)]
pub struct StoreMetrics {
    records_appended: IntCounter,
    phase_entries: IntCounter,
    clears: IntCounter,
    records_retained: IntGauge,
    #[allow(dead_code)]
    registry: Arc<Registry>,
}

impl StoreMetrics {
    /// Register all store metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let records_appended = IntCounter::with_opts(Opts::new(
            "bms_records_appended_total",
            "Total number of telemetry snapshots appended to the history",
        ))?;
        registry.register(Box::new(records_appended.clone()))?;

        let phase_entries = IntCounter::with_opts(Opts::new(
            "bms_phase_log_entries_total",
            "Total number of phase transitions written to the phase log",
        ))?;
        registry.register(Box::new(phase_entries.clone()))?;

        let clears = IntCounter::with_opts(Opts::new(
            "bms_record_store_clears_total",
            "Total number of bulk clears of the record history",
        ))?;
        registry.register(Box::new(clears.clone()))?;

        let records_retained = IntGauge::with_opts(Opts::new(
            "bms_records_retained",
            "Number of telemetry snapshots currently held in memory",
        ))?;
        registry.register(Box::new(records_retained.clone()))?;

        Ok(Self {
            records_appended,
            phase_entries,
            clears,
            records_retained,
            registry,
        })
    }

    /// Count one appended snapshot.
    pub fn record_append(&self) {
        self.records_appended.inc();
    }

    /// Count one phase-log entry.
    pub fn record_phase_entry(&self) {
        self.phase_entries.inc();
    }

    /// Count one bulk clear.
    pub fn record_clear(&self) {
        self.clears.inc();
    }

    /// Update the retained-records gauge.
    pub fn set_retained(&self, count: usize) {
        self.records_retained.set(count as i64);
    }
}

impl std::fmt::Debug for StoreMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreMetrics").finish_non_exhaustive()
    }
}

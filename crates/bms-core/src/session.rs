//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Workflow phase engine and dashboard session."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use bms_analytics::{summarize, PackSummary, SummaryRow};
use bms_common::{AppConfig, CellId, Phase, SocModel};
use bms_records::{
    should_auto_log, ExportBundle, PhaseLogEntry, Record, RecordFilter, RecordStore, StoreMetrics,
};
use bms_sim::{parse_sensor_line, CellConfig, ParamKind, TelemetryGenerator, TelemetryReading};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use prometheus::Registry;
use tracing::{debug, info, warn};

use crate::soc::CoulombCounter;
use crate::workflow::{PhaseDurations, PhaseScheduler, TickOutcome, WorkflowState};
use crate::{CoreError, Result};

/// Everything one call to [`Session::tick`] did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    /// Phase the readings were generated in, after any transition.
    pub phase: Phase,
    pub outcome: TickOutcome,
    pub readings: IndexMap<CellId, TelemetryReading>,
    /// Sequence of the auto-logged record, `None` when debounced.
    pub appended: Option<u64>,
}

/// Owned dashboard state: cell configuration, scheduler, generator and history.
///
/// Every mutation goes through `&mut self`; wrap it in [`SharedSession`] to
/// share it between callers.
#[derive(Debug)]
pub struct Session {
    cells: IndexMap<CellId, CellConfig>,
    generator: TelemetryGenerator,
    scheduler: PhaseScheduler,
    store: RecordStore,
    coulomb: Option<CoulombCounter>,
    debounce: Duration,
    log_display_window: usize,
}

impl Session {
    /// Build a session from configuration, registering store metrics when a
    /// registry is supplied. The configuration is validated first.
    pub fn from_config(config: &AppConfig, registry: Option<Arc<Registry>>) -> Result<Self> {
        config
            .validate()
            .map_err(|err| CoreError::InvalidConfig(format!("{err:#}")))?;
        let durations = PhaseDurations::from_config(&config.workflow)?;
        let mut store = RecordStore::with_retention(config.store.retain_last);
        if let Some(registry) = registry {
            store = store.with_metrics(StoreMetrics::new(registry)?);
        }

        let cells: IndexMap<CellId, CellConfig> = config
            .cell_ids()
            .into_iter()
            .map(|id| {
                let overrides = config.cells.get(&id);
                let chemistry = overrides
                    .and_then(|o| o.chemistry)
                    .unwrap_or(config.simulation.default_chemistry);
                let condition = overrides.and_then(|o| o.condition).unwrap_or_default();
                (id, CellConfig::new(chemistry, condition))
            })
            .collect();

        let coulomb = match config.simulation.soc_model {
            SocModel::Random => None,
            SocModel::CoulombCounting {
                capacity_ah,
                initial_soc,
            } => Some(CoulombCounter::new(capacity_ah, initial_soc)),
        };

        info!(
            cells = cells.len(),
            seeded = config.simulation.random_seed.is_some(),
            soc_model = ?config.simulation.soc_model,
            retain_last = ?config.store.retain_last,
            "session initialised"
        );
        Ok(Self {
            cells,
            generator: TelemetryGenerator::with_optional_seed(config.simulation.random_seed),
            scheduler: PhaseScheduler::new(durations),
            store,
            coulomb,
            debounce: config.store.debounce,
            log_display_window: config.store.log_display_window,
        })
    }

    /// Advance the scheduler, generate one reading per cell, and auto-log the
    /// snapshot unless the last append is within the debounce interval.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let outcome = self.scheduler.tick(now);
        if let Some(entry) = &outcome.log_entry {
            self.store.log_phase(entry.clone());
        }

        let phase = self.scheduler.phase();
        let mut readings = self.generator.generate_pack(&self.cells, phase);
        if let Some(counter) = self.coulomb.as_mut() {
            counter.apply(now, &mut readings);
        }
        let appended = self.auto_log(now, phase, &readings);

        TickReport {
            timestamp: now,
            phase,
            outcome,
            readings,
            appended,
        }
    }

    /// Adapt an external sensor frame and log it under the same debounce rule
    /// as synthetic ticks.
    pub fn ingest_sensor_line(
        &mut self,
        line: &str,
        now: DateTime<Utc>,
    ) -> Result<(IndexMap<CellId, TelemetryReading>, Option<u64>)> {
        let phase = self.scheduler.phase();
        let readings = parse_sensor_line(line, &self.cells, phase)?;
        let appended = self.auto_log(now, phase, &readings);
        Ok((readings, appended))
    }

    fn auto_log(
        &mut self,
        now: DateTime<Utc>,
        phase: Phase,
        readings: &IndexMap<CellId, TelemetryReading>,
    ) -> Option<u64> {
        if !should_auto_log(self.store.last_timestamp(), now, self.debounce) {
            debug!(phase = %phase, "snapshot debounced");
            return None;
        }
        Some(
            self.store
                .append(Record::new(now, phase, readings.clone())),
        )
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.scheduler.start(now);
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.scheduler.resume(now);
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Reset the workflow and restart integrated state of charge.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        if let Some(counter) = self.coulomb.as_mut() {
            counter.reset();
        }
    }

    pub fn set_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.scheduler.set_phase(phase, now);
    }

    /// Change one cell's configuration; picked up by the next tick.
    pub fn set_cell_config(&mut self, cell: CellId, config: CellConfig) {
        match self.cells.get_mut(&cell) {
            Some(slot) => {
                *slot = config;
                info!(
                    cell = %cell,
                    chemistry = %config.chemistry,
                    condition = %config.working_condition,
                    "cell configuration updated"
                );
            }
            None => {
                debug_assert!(false, "{cell} is not part of the configured pack");
                warn!(cell = %cell, "ignoring configuration for unknown cell");
            }
        }
    }

    /// Configuration of `cell`, falling back to the LFP/Normal default when the
    /// cell is not part of the pack.
    pub fn cell_config(&self, cell: CellId) -> CellConfig {
        match self.cells.get(&cell) {
            Some(config) => *config,
            None => {
                debug_assert!(false, "{cell} is not part of the configured pack");
                warn!(cell = %cell, "missing cell configuration, assuming defaults");
                CellConfig::default()
            }
        }
    }

    pub fn cells(&self) -> &IndexMap<CellId, CellConfig> {
        &self.cells
    }

    pub fn workflow(&self) -> &WorkflowState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn query(&self, filter: &RecordFilter) -> Vec<&Record> {
        self.store.query(filter)
    }

    /// Drop the whole history and phase log.
    pub fn clear_history(&mut self) {
        self.store.clear();
        info!("history cleared");
    }

    /// Phase-log entries inside the configured display window.
    pub fn recent_phase_log(&self) -> Vec<&PhaseLogEntry> {
        self.store.recent_phase_log(self.log_display_window)
    }

    /// Comparison rows over the records selected by `filter`.
    pub fn summarize(
        &self,
        cells: &[CellId],
        parameters: &[ParamKind],
        filter: &RecordFilter,
    ) -> Vec<SummaryRow> {
        let window = self.store.query(filter);
        summarize(cells, parameters, window.iter().copied())
    }

    /// Pack indicators for the most recent record.
    pub fn pack_summary(&self) -> Option<PackSummary> {
        self.store.latest().and_then(PackSummary::from_record)
    }

    pub fn export_bundle(&self, now: DateTime<Utc>) -> ExportBundle {
        ExportBundle {
            snapshot: self.store.latest().cloned(),
            logs: self.store.phase_log().cloned().collect(),
            cell_conditions: self.cells.clone(),
            phase: self.scheduler.phase(),
            exported_at: now,
        }
    }
}

/// [`Session`] behind a single mutex so every operation is one critical section.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.inner.lock();
        f(&mut session)
    }

    pub fn tick(&self, now: DateTime<Utc>) -> TickReport {
        self.with(|session| session.tick(now))
    }

    pub fn workflow(&self) -> WorkflowState {
        self.with(|session| session.workflow().clone())
    }

    /// Owned copies of the records selected by `filter`.
    pub fn query(&self, filter: &RecordFilter) -> Vec<Record> {
        self.with(|session| session.query(filter).into_iter().cloned().collect())
    }

    pub fn summarize(
        &self,
        cells: &[CellId],
        parameters: &[ParamKind],
        filter: &RecordFilter,
    ) -> Vec<SummaryRow> {
        self.with(|session| session.summarize(cells, parameters, filter))
    }

    pub fn export_bundle(&self, now: DateTime<Utc>) -> ExportBundle {
        self.with(|session| session.export_bundle(now))
    }
}

//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Shared primitives and utilities for the dashboard core."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

use crate::cell::{CellId, Chemistry, WorkingCondition, MAX_CELLS};
use crate::logging::{LogFormat, LogStream};

/// Bounds accepted for the auto-log debounce interval, in seconds.
pub const DEBOUNCE_RANGE_SECS: (u64, u64) = (5, 10);

fn default_charge_duration() -> Duration {
    Duration::from_secs(30)
}

fn default_idle_duration() -> Duration {
    Duration::from_secs(10)
}

fn default_discharge_duration() -> Duration {
    Duration::from_secs(30)
}

fn default_debounce() -> Duration {
    Duration::from_secs(5)
}

fn default_log_display_window() -> usize {
    20
}

fn default_cell_count() -> u8 {
    8
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the dashboard core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Per-cell overrides keyed by `Cell_<n>`.
    #[serde(default)]
    pub cells: IndexMap<CellId, CellOverride>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "BMS_CONFIG";

    /// Load configuration from disk, respecting the `BMS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    /// Cell identifiers making up the pack, in display order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        CellId::range(self.simulation.cell_count).collect()
    }

    /// Validate structural invariants.
    ///
    /// Phase durations are validated by the scheduler when it is built from
    /// this configuration, so they are not checked here.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.store.validate()?;
        for cell in self.cells.keys() {
            if cell.number() > self.simulation.cell_count {
                return Err(anyhow!(
                    "override for {} exceeds configured cell_count {}",
                    cell,
                    self.simulation.cell_count
                ));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Per-phase durations of the charge/idle/discharge cycle.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_charge_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub charge_duration: Duration,
    #[serde(default = "default_idle_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub idle_duration: Duration,
    #[serde(default = "default_discharge_duration")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub discharge_duration: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            charge_duration: default_charge_duration(),
            idle_duration: default_idle_duration(),
            discharge_duration: default_discharge_duration(),
        }
    }
}

/// Record store retention and auto-log throttling.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_debounce")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub debounce: Duration,
    /// Maximum number of records (and phase-log entries) kept in memory.
    /// `None` keeps the full history.
    #[serde(default)]
    pub retain_last: Option<usize>,
    #[serde(default = "default_log_display_window")]
    pub log_display_window: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            debounce: default_debounce(),
            retain_last: None,
            log_display_window: default_log_display_window(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        let (min, max) = DEBOUNCE_RANGE_SECS;
        let secs = self.debounce.as_secs();
        if !(min..=max).contains(&secs) {
            return Err(anyhow!(
                "store.debounce must be between {} and {} seconds (got {})",
                min,
                max,
                secs
            ));
        }
        if self.retain_last == Some(0) {
            return Err(anyhow!("store.retain_last must be at least 1 when set"));
        }
        Ok(())
    }
}

/// How state of charge evolves between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SocModel {
    /// Draw a fresh value from `[50, 100]` every tick. Readings are not
    /// continuous between ticks.
    #[default]
    Random,
    /// Integrate current over elapsed time per cell.
    CoulombCounting { capacity_ah: f64, initial_soc: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_cell_count")]
    pub cell_count: u8,
    #[serde(default)]
    pub default_chemistry: Chemistry,
    /// Seed for the telemetry generator; `None` seeds from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub soc_model: SocModel,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cell_count: default_cell_count(),
            default_chemistry: Chemistry::default(),
            random_seed: None,
            soc_model: SocModel::default(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cell_count == 0 || self.cell_count > MAX_CELLS {
            return Err(anyhow!(
                "simulation.cell_count must be between 1 and {} (got {})",
                MAX_CELLS,
                self.cell_count
            ));
        }
        if let SocModel::CoulombCounting {
            capacity_ah,
            initial_soc,
        } = self.soc_model
        {
            if !(capacity_ah.is_finite() && capacity_ah > 0.0) {
                return Err(anyhow!("soc_model.capacity_ah must be positive"));
            }
            if !(0.0..=100.0).contains(&initial_soc) {
                return Err(anyhow!("soc_model.initial_soc must be within 0..=100"));
            }
        }
        Ok(())
    }
}

/// Operator overrides applied to a single cell at session start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellOverride {
    #[serde(default)]
    pub chemistry: Option<Chemistry>,
    #[serde(default)]
    pub condition: Option<WorkingCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub stream: LogStream,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            stream: LogStream::default(),
            file_prefix: None,
        }
    }
}

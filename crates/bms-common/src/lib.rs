//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Shared primitives and utilities for the dashboard core."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
//! Shared primitives for the BMS dashboard workspace.
//! This crate exposes the cell vocabulary (chemistry, working condition,
//! workflow phase, cell identifiers), configuration loading, logging, and
//! clock helpers consumed across the workspace.

pub mod cell;
pub mod config;
pub mod logging;
pub mod numeric;
pub mod time;

pub use cell::{CellId, Chemistry, ParseCellIdError, Phase, WorkingCondition, MAX_CELLS};
pub use config::{
    AppConfig, CellOverride, LoggingConfig, SimulationConfig, SocModel, StoreConfig,
    WorkflowConfig,
};
pub use logging::{init_tracing, LogFormat, LogStream};
pub use numeric::round_dp;

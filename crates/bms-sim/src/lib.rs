//! ---
//! bms_section: "11-simulation"
//! bms_subsection: "01-bootstrap"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Simulation runtime module exports and shared types."
//! bms_version: "v0.1.0"
//! bms_owner: "tbd"
//! ---
//! Cell telemetry model, synthetic generator, and sensor adapters.

pub mod generator;
pub mod model;
pub mod sensor;

pub use generator::{voltage_envelope, Derating, PhaseProfile, TelemetryGenerator};
pub use model::{evaluate_alerts, AlertKind, CellConfig, ParamKind, TelemetryReading};
pub use sensor::{parse_sensor_line, SensorCell, SensorFrame};

/// Result alias used throughout the simulation crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Error type for telemetry parsing and adaptation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("sensor payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sensor payload carries no 'cells' array")]
    MissingCells,
    #[error("sensor reported {got} cells but {expected} are configured")]
    CellCountMismatch { expected: usize, got: usize },
    #[error("sensor frame references unconfigured cell {0}")]
    UnknownCell(bms_common::CellId),
    #[error("sensor frame reports {0} more than once")]
    DuplicateCell(bms_common::CellId),
    #[error("sensor value '{field}' for {cell} is not a finite number")]
    InvalidValue {
        cell: bms_common::CellId,
        field: &'static str,
    },
    #[error("unknown alert label '{0}'")]
    UnknownAlert(String),
}

//! ---
//! bms_section: "03-history-records"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Telemetry history, phase log, and export shapes."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! In-memory history of telemetry snapshots and phase transitions.

/// Result alias used throughout the records crate.
pub type Result<T> = std::result::Result<T, RecordsError>;

/// Error type for the record store and its exports.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    /// Raised when operator-supplied filter input cannot be honoured.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// Wrapper for IO errors encountered while writing exports.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CSV serialization issues.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub mod export;
pub mod metrics;
pub mod record;
pub mod store;

pub use export::{write_csv, write_history_csv, CsvRow, ExportBundle};
pub use metrics::StoreMetrics;
pub use record::{PhaseLogEntry, Record};
pub use store::{should_auto_log, RecordFilter, RecordStore, SortOrder};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_filter_renders_reason() {
        let err = RecordsError::InvalidFilter("limit must not be negative".into());
        assert_eq!(
            format!("{err}"),
            "invalid filter: limit must not be negative"
        );
    }
}

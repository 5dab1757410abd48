//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Workflow phase engine and dashboard session."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
//! Phase scheduler and the session context the presentation layer drives.

use bms_common::Phase;

pub mod session;
pub mod soc;
pub mod workflow;

pub use session::{Session, SharedSession, TickReport};
pub use soc::CoulombCounter;
pub use workflow::{PhaseDurations, PhaseScheduler, TickOutcome, WorkflowState};

/// Result alias used throughout the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error type for session construction and session-level operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{phase} duration of {seconds}s is outside 1..={max}s", max = PhaseDurations::MAX_SECS)]
    InvalidDuration { phase: Phase, seconds: u64 },
    #[error(transparent)]
    Records(#[from] bms_records::RecordsError),
    #[error("sensor frame rejected: {0}")]
    Sensor(#[from] bms_sim::SimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_duration_message_names_phase() {
        let err = CoreError::InvalidDuration {
            phase: Phase::Charging,
            seconds: 0,
        };
        assert_eq!(
            err.to_string(),
            "Charging duration of 0s is outside 1..=86400s"
        );
    }
}

//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Workflow phase engine and dashboard session."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::time::Duration;

use bms_common::time::elapsed_between;
use bms_common::{Phase, WorkflowConfig};
use bms_records::PhaseLogEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::{debug, info};

use crate::{CoreError, Result};

/// Validated per-phase durations of one charge/idle/discharge cycle.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    #[serde_as(as = "DurationSeconds<u64>")]
    charge: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    idle: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    discharge: Duration,
}

impl PhaseDurations {
    /// Longest accepted phase duration, in seconds.
    pub const MAX_SECS: u64 = 86_400;

    pub fn new(charge: Duration, idle: Duration, discharge: Duration) -> Result<Self> {
        for (phase, duration) in [
            (Phase::Charging, charge),
            (Phase::Idle, idle),
            (Phase::Discharging, discharge),
        ] {
            let seconds = duration.as_secs();
            if duration < Duration::from_secs(1) || duration > Duration::from_secs(Self::MAX_SECS) {
                return Err(CoreError::InvalidDuration { phase, seconds });
            }
        }
        Ok(Self {
            charge,
            idle,
            discharge,
        })
    }

    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        Self::new(
            config.charge_duration,
            config.idle_duration,
            config.discharge_duration,
        )
    }

    /// How long `phase` lasts before the scheduler advances.
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Charging => self.charge,
            Phase::Idle => self.idle,
            Phase::Discharging => self.discharge,
        }
    }
}

/// Scheduler state as seen by callers.
///
/// `phase_started_at` is set exactly when `active` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub active: bool,
    pub phase: Phase,
    pub phase_started_at: Option<DateTime<Utc>>,
    pub durations: PhaseDurations,
}

impl WorkflowState {
    fn holds_invariant(&self) -> bool {
        self.phase_started_at.is_none() == !self.active
    }
}

/// Result of a single scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub phase_changed: bool,
    /// Entry describing the transition, present whenever `phase_changed` is set.
    pub log_entry: Option<PhaseLogEntry>,
}

/// Timed charge, idle, discharge state machine.
///
/// Time only advances through [`PhaseScheduler::tick`]; the scheduler never
/// reads the clock itself.
#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    state: WorkflowState,
}

impl PhaseScheduler {
    /// Inactive scheduler resting in `Idle`.
    pub fn new(durations: PhaseDurations) -> Self {
        Self {
            state: WorkflowState {
                active: false,
                phase: Phase::Idle,
                phase_started_at: None,
                durations,
            },
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Time spent in the current phase, `None` while inactive.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.state
            .phase_started_at
            .map(|started| elapsed_between(started, now))
    }

    /// Time left before the next automatic transition, `None` while inactive.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let limit = self.state.durations.for_phase(self.state.phase);
        self.elapsed(now)
            .map(|elapsed| limit.saturating_sub(elapsed))
    }

    /// Advance at most one transition if the current phase has run its course.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let Some(elapsed) = self.elapsed(now).filter(|_| self.state.active) else {
            return TickOutcome::default();
        };
        let phase = self.state.phase;
        if elapsed < self.state.durations.for_phase(phase) {
            return TickOutcome::default();
        }

        let entry = match phase {
            Phase::Charging => {
                self.enter(Phase::Idle, now);
                PhaseLogEntry::new(now, Phase::Idle, "Charging complete, resting in Idle")
            }
            Phase::Idle => {
                self.enter(Phase::Discharging, now);
                PhaseLogEntry::new(now, Phase::Discharging, "Rest complete, Discharging")
            }
            Phase::Discharging => {
                self.state.active = false;
                self.state.phase = Phase::Idle;
                self.state.phase_started_at = None;
                PhaseLogEntry::new(now, Phase::Idle, "Discharging complete, cycle finished")
            }
        };
        debug_assert!(self.state.holds_invariant());
        info!(
            from = %phase,
            to = %self.state.phase,
            active = self.state.active,
            elapsed_secs = elapsed.as_secs(),
            "workflow phase transition"
        );
        TickOutcome {
            phase_changed: true,
            log_entry: Some(entry),
        }
    }

    /// Begin a cycle in `Charging`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.state.active = true;
        self.enter(Phase::Charging, now);
        info!(phase = %self.state.phase, "workflow started");
    }

    /// Stop advancing while keeping the current phase.
    pub fn pause(&mut self) {
        self.state.active = false;
        self.state.phase_started_at = None;
        info!(phase = %self.state.phase, "workflow paused");
    }

    /// Continue from the retained phase. Elapsed time restarts at `now`.
    pub fn resume(&mut self, now: DateTime<Utc>) {
        self.state.active = true;
        self.state.phase_started_at = Some(now);
        info!(phase = %self.state.phase, "workflow resumed");
    }

    pub fn stop(&mut self) {
        self.halt();
        info!("workflow stopped");
    }

    pub fn reset(&mut self) {
        self.halt();
        info!("workflow reset");
    }

    /// Jump straight to `phase`. Durations are only checked on the next tick.
    pub fn set_phase(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.state.phase = phase;
        if self.state.active {
            self.state.phase_started_at = Some(now);
        }
        info!(phase = %phase, active = self.state.active, "workflow phase overridden");
    }

    fn enter(&mut self, phase: Phase, now: DateTime<Utc>) {
        self.state.phase = phase;
        self.state.phase_started_at = Some(now);
        debug!(phase = %phase, started_at = %now, "phase timer reset");
    }

    fn halt(&mut self) {
        self.state.active = false;
        self.state.phase = Phase::Idle;
        self.state.phase_started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn durations() -> PhaseDurations {
        PhaseDurations::new(
            Duration::from_secs(30),
            Duration::from_secs(10),
            Duration::from_secs(30),
        )
        .unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn durations_reject_out_of_range_values() {
        let ok = Duration::from_secs(10);
        assert!(matches!(
            PhaseDurations::new(Duration::ZERO, ok, ok),
            Err(CoreError::InvalidDuration {
                phase: Phase::Charging,
                seconds: 0
            })
        ));
        assert!(matches!(
            PhaseDurations::new(ok, ok, Duration::from_secs(86_401)),
            Err(CoreError::InvalidDuration {
                phase: Phase::Discharging,
                ..
            })
        ));
        assert!(PhaseDurations::new(ok, Duration::from_secs(86_400), ok).is_ok());
    }

    #[test]
    fn full_cycle_produces_three_transitions() {
        let mut scheduler = PhaseScheduler::new(durations());
        scheduler.start(t0());
        let mut entries = Vec::new();
        for secs in 0..=80 {
            if let Some(entry) = scheduler.tick(at(secs)).log_entry {
                entries.push(entry);
            }
            if secs == 30 {
                assert_eq!(entries.len(), 1);
                assert_eq!(scheduler.phase(), Phase::Idle);
            }
        }
        let phases: Vec<_> = entries.iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![Phase::Idle, Phase::Discharging, Phase::Idle]);
        assert!(!scheduler.is_active());
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(scheduler.state().phase_started_at.is_none());
    }

    #[test]
    fn at_most_one_transition_per_tick() {
        let mut scheduler = PhaseScheduler::new(durations());
        scheduler.start(t0());
        let outcome = scheduler.tick(at(3_600));
        assert!(outcome.phase_changed);
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert_eq!(scheduler.state().phase_started_at, Some(at(3_600)));
    }

    #[test]
    fn inactive_scheduler_holds() {
        let mut scheduler = PhaseScheduler::new(durations());
        assert_eq!(scheduler.tick(at(1_000)), TickOutcome::default());
        scheduler.set_phase(Phase::Charging, at(5));
        assert_eq!(scheduler.phase(), Phase::Charging);
        assert!(scheduler.state().phase_started_at.is_none());
        assert!(!scheduler.tick(at(1_000)).phase_changed);
    }

    #[test]
    fn pause_keeps_phase_and_resume_restarts_timer() {
        let mut scheduler = PhaseScheduler::new(durations());
        scheduler.start(t0());
        scheduler.tick(at(30));
        scheduler.pause();
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(scheduler.state().holds_invariant());
        assert!(!scheduler.tick(at(500)).phase_changed);

        scheduler.resume(at(500));
        assert!(!scheduler.tick(at(509)).phase_changed);
        assert!(scheduler.tick(at(510)).phase_changed);
        assert_eq!(scheduler.phase(), Phase::Discharging);
    }

    #[test]
    fn set_phase_while_active_resets_timer() {
        let mut scheduler = PhaseScheduler::new(durations());
        scheduler.start(t0());
        scheduler.set_phase(Phase::Discharging, at(20));
        assert_eq!(scheduler.remaining(at(25)), Some(Duration::from_secs(25)));
        assert!(scheduler.tick(at(50)).phase_changed);
        assert!(!scheduler.is_active());
    }

    #[test]
    fn stop_and_reset_return_to_idle() {
        let mut scheduler = PhaseScheduler::new(durations());
        scheduler.start(t0());
        scheduler.stop();
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(!scheduler.is_active());
        scheduler.set_phase(Phase::Discharging, at(1));
        scheduler.reset();
        assert_eq!(scheduler.phase(), Phase::Idle);
        assert!(scheduler.state().holds_invariant());
    }
}

//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Tick clocks driving the dashboard session."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{anyhow, Result};
use bms_common::time::{to_chrono, wall_now};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

/// Source of tick timestamps for the session loop.
#[derive(Debug)]
pub enum TickClock {
    /// Waits one period between ticks and stamps them with wall time.
    Wall(tokio::time::Interval),
    /// Advances a virtual clock by one period per tick without waiting.
    Simulated {
        next: DateTime<Utc>,
        step: chrono::Duration,
    },
}

impl TickClock {
    pub fn wall(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        TickClock::Wall(interval)
    }

    pub fn simulated(start: DateTime<Utc>, period: Duration) -> Self {
        TickClock::Simulated {
            next: start,
            step: to_chrono(period),
        }
    }

    /// Fails when the simulated clock cannot advance past this tick.
    pub async fn tick(&mut self) -> Result<DateTime<Utc>> {
        match self {
            TickClock::Wall(interval) => {
                interval.tick().await;
                Ok(wall_now())
            }
            TickClock::Simulated { next, step } => {
                let now = *next;
                *next = now
                    .checked_add_signed(*step)
                    .ok_or_else(|| anyhow!("simulated clock overflows after {now}"))?;
                Ok(now)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn simulated_clock_advances_by_period() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut clock = TickClock::simulated(start, Duration::from_secs(5));
        assert_eq!(clock.tick().await.unwrap(), start);
        assert_eq!(
            clock.tick().await.unwrap(),
            start + chrono::Duration::seconds(5)
        );
    }

    #[tokio::test]
    async fn simulated_clock_reports_overflow() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut clock = TickClock::simulated(start, Duration::from_millis(u64::MAX));
        assert!(clock.tick().await.is_err());
    }

    #[tokio::test]
    async fn wall_clock_first_tick_is_immediate() {
        let mut clock = TickClock::wall(Duration::from_millis(10));
        let before = wall_now();
        let stamped = clock.tick().await.unwrap();
        assert!(stamped >= before);
    }
}

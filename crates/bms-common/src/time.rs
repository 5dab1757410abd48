//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Shared primitives and utilities for the dashboard core."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Wall-clock timestamp used for ticks and records.
pub fn wall_now() -> DateTime<Utc> {
    Utc::now()
}

/// Time elapsed between `since` and `now`, saturating at zero when the clock
/// went backwards.
pub fn elapsed_between(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - since).to_std().unwrap_or(Duration::ZERO)
}

/// Convert a std duration to a chrono offset, saturating at the chrono maximum.
pub fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates_on_skew() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(3);
        assert_eq!(elapsed_between(earlier, now), Duration::from_secs(3));
        assert_eq!(elapsed_between(now, earlier), Duration::ZERO);
    }

    #[test]
    fn chrono_conversion_roundtrips_seconds() {
        assert_eq!(
            to_chrono(Duration::from_secs(90)),
            chrono::Duration::seconds(90)
        );
    }
}

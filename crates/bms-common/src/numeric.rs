//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Shared primitives and utilities for the dashboard core."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---

/// Round `value` to `places` decimal places (half away from zero).
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

//! ---
//! bms_section: "05-analytics"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Comparison statistics and pack KPIs."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
//! Statistics computed over windows of recorded telemetry.

pub mod pack;
pub mod summary;

pub use pack::PackSummary;
pub use summary::{summarize, SummaryRow, SUMMARY_DECIMALS};

//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Shared primitives and utilities for the dashboard core."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Upper bound on the number of cells a pack may be configured with.
pub const MAX_CELLS: u8 = 64;

/// Cell chemistry, determining the nominal voltage window.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Chemistry {
    /// Lithium iron phosphate.
    #[default]
    #[strum(serialize = "LFP")]
    Lfp,
    /// Nickel manganese cobalt.
    #[strum(serialize = "NMC")]
    Nmc,
}

impl Chemistry {
    /// Nominal `(min, max)` cell voltage in volts.
    pub fn voltage_bounds(&self) -> (f64, f64) {
        match self {
            Chemistry::Lfp => (3.0, 3.6),
            Chemistry::Nmc => (3.3, 4.2),
        }
    }

    /// Voltage above which a reading is reported as overvoltage.
    pub fn voltage_ceiling(&self) -> f64 {
        self.voltage_bounds().1
    }
}

/// Operator-assigned health flag that derates simulated readings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum WorkingCondition {
    #[default]
    Normal,
    Degraded,
    Critical,
    Faulty,
}

impl WorkingCondition {
    /// Conditions severe enough to raise a cell-level alert on every reading.
    pub fn is_alerting(&self) -> bool {
        matches!(self, WorkingCondition::Critical | WorkingCondition::Faulty)
    }
}

/// Workflow phase driven by the phase scheduler.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Phase {
    #[default]
    Idle,
    Charging,
    Discharging,
}

/// Error returned when a cell identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cell identifier '{0}' (expected Cell_1..Cell_{})", MAX_CELLS)]
pub struct ParseCellIdError(pub String);

/// One-based identifier of a cell in the pack, rendered as `Cell_<n>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct CellId(u8);

impl CellId {
    /// Build an identifier from its one-based position.
    pub fn new(number: u8) -> Result<Self, ParseCellIdError> {
        if (1..=MAX_CELLS).contains(&number) {
            Ok(Self(number))
        } else {
            Err(ParseCellIdError(number.to_string()))
        }
    }

    /// Identifiers `Cell_1..=Cell_count`, clamped to [`MAX_CELLS`].
    pub fn range(count: u8) -> impl Iterator<Item = CellId> {
        (1..=count.min(MAX_CELLS)).map(CellId)
    }

    pub fn number(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell_{}", self.0)
    }
}

impl FromStr for CellId {
    type Err = ParseCellIdError;

    /// Accepts `Cell_3`, `cell 3`, `CELL3` and a bare `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = match trimmed.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("cell") => trimmed[4..]
                .trim_start_matches(|c: char| c == '_' || c == ' ' || c == '-'),
            _ => trimmed,
        };
        let number: u8 = digits
            .parse()
            .map_err(|_| ParseCellIdError(s.to_owned()))?;
        CellId::new(number).map_err(|_| ParseCellIdError(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chemistry_parses_case_insensitively() {
        assert_eq!("lfp".parse::<Chemistry>().unwrap(), Chemistry::Lfp);
        assert_eq!("NMC".parse::<Chemistry>().unwrap(), Chemistry::Nmc);
        assert_eq!(Chemistry::Nmc.to_string(), "NMC");
        assert!("lipo".parse::<Chemistry>().is_err());
    }

    #[test]
    fn phase_parses_case_insensitively() {
        assert_eq!("CHARGING".parse::<Phase>().unwrap(), Phase::Charging);
        assert_eq!("discharging".parse::<Phase>().unwrap(), Phase::Discharging);
        assert!("resting".parse::<Phase>().is_err());
    }

    #[test]
    fn cell_id_accepts_common_spellings() {
        for raw in ["Cell_3", "cell 3", "CELL3", "3", " Cell-3 "] {
            assert_eq!(raw.parse::<CellId>().unwrap().number(), 3, "{raw}");
        }
        assert!("Cell_0".parse::<CellId>().is_err());
        assert!("Cell_65".parse::<CellId>().is_err());
        assert!("battery".parse::<CellId>().is_err());
    }

    #[test]
    fn cell_id_serializes_as_display_string() {
        let id = CellId::new(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Cell_7\"");
        let back: CellId = serde_json::from_str("\"Cell_7\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn range_is_one_based() {
        let ids: Vec<_> = CellId::range(3).map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["Cell_1", "Cell_2", "Cell_3"]);
    }
}

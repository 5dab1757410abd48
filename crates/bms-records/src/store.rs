//! ---
//! bms_section: "03-history-records"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Telemetry history, phase log, and export shapes."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::collections::VecDeque;
use std::time::Duration;

use bms_common::time::to_chrono;
use bms_common::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::StoreMetrics;
use crate::record::{PhaseLogEntry, Record};
use crate::{RecordsError, Result};

/// Ordering applied to query results by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Most recent snapshot first.
    #[default]
    NewestFirst,
    /// Oldest snapshot first.
    OldestFirst,
}

/// Validated query over the record history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Keep only records taken in this phase.
    pub phase: Option<Phase>,
    /// Keep at most this many records after sorting.
    pub limit: Option<usize>,
    /// Timestamp ordering of the result.
    pub order: SortOrder,
}

impl RecordFilter {
    /// Build a filter from raw operator input.
    ///
    /// `phase` is matched case-insensitively; `all` or an empty string means no
    /// phase restriction.
    pub fn parse(phase: Option<&str>, limit: Option<i64>, order: SortOrder) -> Result<Self> {
        let phase = match phase.map(str::trim) {
            None => None,
            Some(raw) if raw.is_empty() || raw.eq_ignore_ascii_case("all") => None,
            Some(raw) => Some(raw.parse::<Phase>().map_err(|_| {
                RecordsError::InvalidFilter(format!("unknown phase '{raw}'"))
            })?),
        };
        let limit = match limit {
            None => None,
            Some(value) => Some(usize::try_from(value).map_err(|_| {
                RecordsError::InvalidFilter(format!("limit must not be negative (got {value})"))
            })?),
        };
        Ok(Self {
            phase,
            limit,
            order,
        })
    }

    fn matches(&self, record: &Record) -> bool {
        self.phase.map_or(true, |phase| record.phase == phase)
    }
}

/// Whether a new snapshot should be appended automatically.
///
/// True when nothing has been logged yet or at least `debounce` has elapsed
/// since the last append.
pub fn should_auto_log(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    debounce: Duration,
) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= to_chrono(debounce),
    }
}

/// Append-only history of snapshots plus the phase-transition log.
///
/// With `retain_last` set, the oldest records and log entries are evicted once
/// that many are held.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: VecDeque<Record>,
    phase_log: VecDeque<PhaseLogEntry>,
    retain_last: Option<usize>,
    next_sequence: u64,
    metrics: Option<StoreMetrics>,
}

impl RecordStore {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store keeping at most `retain_last` records and phase-log entries.
    pub fn with_retention(retain_last: Option<usize>) -> Self {
        Self {
            retain_last: retain_last.map(|n| n.max(1)),
            ..Self::default()
        }
    }

    /// Attach metrics that track store activity.
    pub fn with_metrics(mut self, metrics: StoreMetrics) -> Self {
        metrics.set_retained(self.records.len());
        self.metrics = Some(metrics);
        self
    }

    /// Append a snapshot, assigning its sequence number. Returns the sequence.
    pub fn append(&mut self, mut record: Record) -> u64 {
        self.next_sequence += 1;
        record.sequence = self.next_sequence;
        let sequence = record.sequence;
        debug!(sequence, phase = %record.phase, cells = record.cells.len(), "record appended");
        self.records.push_back(record);
        if let Some(limit) = self.retain_last {
            while self.records.len() > limit {
                self.records.pop_front();
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_append();
            metrics.set_retained(self.records.len());
        }
        sequence
    }

    /// Filter by phase, stable-sort by timestamp, then truncate to the limit.
    ///
    /// Records sharing a timestamp keep their append order in either direction.
    pub fn query(&self, filter: &RecordFilter) -> Vec<&Record> {
        let mut matched: Vec<&Record> = self.records.iter().filter(|r| filter.matches(r)).collect();
        match filter.order {
            SortOrder::OldestFirst => matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
            SortOrder::NewestFirst => matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        }
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        debug!(
            phase = ?filter.phase,
            limit = ?filter.limit,
            order = ?filter.order,
            returned = matched.len(),
            "records queried"
        );
        matched
    }

    /// Drop every record and phase-log entry. Calling it on an empty store is a no-op.
    pub fn clear(&mut self) {
        let dropped = self.records.len();
        self.records.clear();
        self.phase_log.clear();
        if let Some(metrics) = &self.metrics {
            metrics.record_clear();
            metrics.set_retained(0);
        }
        debug!(dropped, "record store cleared");
    }

    /// Append an entry to the phase-transition log.
    pub fn log_phase(&mut self, entry: PhaseLogEntry) {
        self.phase_log.push_back(entry);
        if let Some(limit) = self.retain_last {
            while self.phase_log.len() > limit {
                self.phase_log.pop_front();
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_phase_entry();
        }
    }

    /// Every retained phase-log entry, oldest first.
    pub fn phase_log(&self) -> impl Iterator<Item = &PhaseLogEntry> + '_ {
        self.phase_log.iter()
    }

    /// The last `n` phase-log entries, oldest first.
    pub fn recent_phase_log(&self, n: usize) -> Vec<&PhaseLogEntry> {
        let skip = self.phase_log.len().saturating_sub(n);
        self.phase_log.iter().skip(skip).collect()
    }

    /// Every retained record in append order.
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter()
    }

    /// Most recently appended record.
    pub fn latest(&self) -> Option<&Record> {
        self.records.back()
    }

    /// Timestamp of the most recent append, used for auto-log debouncing.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.back().map(|r| r.timestamp)
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of retained phase-log entries.
    pub fn phase_log_len(&self) -> usize {
        self.phase_log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn record(at: DateTime<Utc>, phase: Phase) -> Record {
        Record::new(at, phase, IndexMap::new())
    }

    #[test]
    fn filter_parse_accepts_known_phases() {
        let filter = RecordFilter::parse(Some("charging"), Some(3), SortOrder::NewestFirst).unwrap();
        assert_eq!(filter.phase, Some(Phase::Charging));
        assert_eq!(filter.limit, Some(3));
        let all = RecordFilter::parse(Some("All"), None, SortOrder::OldestFirst).unwrap();
        assert_eq!(all.phase, None);
    }

    #[test]
    fn filter_parse_rejects_bad_input() {
        assert!(matches!(
            RecordFilter::parse(Some("resting"), None, SortOrder::NewestFirst),
            Err(RecordsError::InvalidFilter(_))
        ));
        assert!(matches!(
            RecordFilter::parse(None, Some(-1), SortOrder::NewestFirst),
            Err(RecordsError::InvalidFilter(_))
        ));
    }

    #[test]
    fn auto_log_debounce() {
        let now = Utc::now();
        let debounce = Duration::from_secs(5);
        assert!(should_auto_log(None, now, debounce));
        assert!(!should_auto_log(
            Some(now - chrono::Duration::seconds(4)),
            now,
            debounce
        ));
        assert!(should_auto_log(
            Some(now - chrono::Duration::seconds(5)),
            now,
            debounce
        ));
    }

    #[test]
    fn sequence_is_assigned_on_append() {
        let mut store = RecordStore::new();
        let now = Utc::now();
        assert_eq!(store.append(record(now, Phase::Idle)), 1);
        assert_eq!(store.append(record(now, Phase::Idle)), 2);
        assert_eq!(store.latest().map(|r| r.sequence), Some(2));
    }

    #[test]
    fn recent_phase_log_returns_tail() {
        let mut store = RecordStore::new();
        let now = Utc::now();
        for phase in [Phase::Charging, Phase::Idle, Phase::Discharging] {
            store.log_phase(PhaseLogEntry::new(now, phase, format!("entered {phase}")));
        }
        let recent: Vec<_> = store.recent_phase_log(2).iter().map(|e| e.phase).collect();
        assert_eq!(recent, vec![Phase::Idle, Phase::Discharging]);
        assert_eq!(store.recent_phase_log(10).len(), 3);
    }
}

//! ---
//! bms_section: "05-analytics"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Comparison statistics and pack KPIs."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::{round_dp, CellId};
use bms_records::Record;
use bms_sim::ParamKind;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

/// Decimal places applied to every reported statistic.
pub const SUMMARY_DECIMALS: i32 = 3;

/// Statistics of one (cell, parameter) series over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub cell: CellId,
    pub parameter: ParamKind,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Value from the record with the greatest timestamp.
    pub latest: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub samples: usize,
}

impl SummaryRow {
    fn from_series(cell: CellId, parameter: ParamKind, values: &[f64]) -> Option<Self> {
        let latest = *values.last()?;
        let round = |value: f64| round_dp(value, SUMMARY_DECIMALS);
        Some(Self {
            cell,
            parameter,
            average: round(Statistics::mean(values)),
            min: round(Statistics::min(values)),
            max: round(Statistics::max(values)),
            latest: round(latest),
            std_dev: round(Statistics::population_std_dev(values)),
            samples: values.len(),
        })
    }
}

/// Summarize every requested (cell, parameter) pair over `window`.
///
/// The window is ordered by timestamp first (stable, so equal timestamps keep
/// their given order) and rows are emitted cell-major in the caller's order.
/// Pairs with no values in the window are omitted; an empty window yields no rows.
pub fn summarize<'a, I>(cells: &[CellId], parameters: &[ParamKind], window: I) -> Vec<SummaryRow>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut ordered: Vec<&Record> = window.into_iter().collect();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    let mut rows = Vec::with_capacity(cells.len() * parameters.len());
    for cell in cells {
        for parameter in parameters {
            let values: Vec<f64> = ordered
                .iter()
                .filter_map(|record| record.reading(cell))
                .map(|reading| reading.value(*parameter))
                .collect();
            if let Some(row) = SummaryRow::from_series(*cell, *parameter, &values) {
                rows.push(row);
            }
        }
    }
    debug!(
        records = ordered.len(),
        rows = rows.len(),
        "comparison summary computed"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use bms_common::{Chemistry, Phase, WorkingCondition};
    use bms_sim::TelemetryReading;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use indexmap::IndexMap;

    fn at(offset: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset)
    }

    fn record(timestamp: DateTime<Utc>, cell: CellId, voltage_v: f64) -> Record {
        let reading = TelemetryReading {
            voltage_v,
            current_a: 1.0,
            temperature_c: 30.0,
            capacity_wh: voltage_v,
            soc_pct: 70.0,
            soh_pct: 95.0,
            chemistry: Chemistry::Lfp,
            phase: Phase::Charging,
            working_condition: WorkingCondition::Normal,
            alerts: Vec::new(),
        };
        let mut cells = IndexMap::new();
        cells.insert(cell, reading);
        Record::new(timestamp, Phase::Charging, cells)
    }

    #[test]
    fn voltage_series_statistics() {
        let cell = CellId::new(1).unwrap();
        let window = vec![
            record(at(0), cell, 3.30),
            record(at(5), cell, 3.35),
            record(at(10), cell, 3.40),
        ];
        let rows = summarize(&[cell], &[ParamKind::Voltage], &window);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.average, 3.35);
        assert_eq!(row.min, 3.30);
        assert_eq!(row.max, 3.40);
        assert_eq!(row.latest, 3.40);
        assert_eq!(row.std_dev, 0.041);
        assert_eq!(row.samples, 3);
    }

    #[test]
    fn latest_follows_timestamp_not_window_order() {
        let cell = CellId::new(2).unwrap();
        let window = vec![
            record(at(10), cell, 3.40),
            record(at(0), cell, 3.30),
            record(at(5), cell, 3.35),
        ];
        let rows = summarize(&[cell], &[ParamKind::Voltage], &window);
        assert_eq!(rows[0].latest, 3.40);
    }

    #[test]
    fn missing_series_are_omitted() {
        let present = CellId::new(1).unwrap();
        let absent = CellId::new(5).unwrap();
        let window = vec![record(at(0), present, 3.3)];
        let rows = summarize(
            &[absent, present],
            &[ParamKind::Voltage, ParamKind::Soc],
            &window,
        );
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.cell == present));
        assert_eq!(rows[1].parameter, ParamKind::Soc);
    }

    #[test]
    fn empty_window_yields_no_rows() {
        let cell = CellId::new(1).unwrap();
        let rows = summarize(&[cell], &[ParamKind::Voltage], &Vec::<Record>::new());
        assert!(rows.is_empty());
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let cell = CellId::new(1).unwrap();
        let rows = summarize(&[cell], &[ParamKind::Voltage], &[record(at(0), cell, 3.2)]);
        assert_eq!(rows[0].std_dev, 0.0);
        assert_eq!(rows[0].average, 3.2);
    }
}

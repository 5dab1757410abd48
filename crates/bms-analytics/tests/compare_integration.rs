//! ---
//! bms_section: "05-analytics"
//! bms_subsection: "tests"
//! bms_type: "source"
//! bms_scope: "test"
//! bms_description: "Comparison engine over generated history."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_analytics::{summarize, PackSummary};
use bms_common::{CellId, Phase};
use bms_records::{Record, RecordFilter, RecordStore, SortOrder};
use bms_sim::{CellConfig, ParamKind, TelemetryGenerator};
use chrono::{Duration, Utc};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

#[test]
fn summary_over_queried_window_is_bounded_by_samples() {
    let cells: IndexMap<_, _> = CellId::range(8)
        .map(|id| (id, CellConfig::default()))
        .collect();
    let mut generator = TelemetryGenerator::new(99);
    let mut store = RecordStore::new();
    let start = Utc::now();
    for i in 0..12 {
        let readings = generator.generate_pack(&cells, Phase::Charging);
        store.append(Record::new(
            start + Duration::seconds(i * 5),
            Phase::Charging,
            readings,
        ));
    }

    let window = store.query(&RecordFilter::parse(None, Some(10), SortOrder::NewestFirst).unwrap());
    let selected = [CellId::new(1).unwrap(), CellId::new(8).unwrap()];
    let parameters: Vec<ParamKind> = ParamKind::iter().collect();
    let rows = summarize(&selected, &parameters, window.iter().copied());

    assert_eq!(rows.len(), selected.len() * parameters.len());
    let newest = store.latest().unwrap();
    for row in &rows {
        assert_eq!(row.samples, 10);
        assert!(row.min <= row.average + 1e-9 && row.average <= row.max + 1e-9);
        assert!(row.std_dev >= 0.0);
        let expected = newest.reading(&row.cell).unwrap().value(row.parameter);
        assert!((row.latest - expected).abs() < 1e-9);
    }
}

#[test]
fn pack_summary_serializes_for_display() {
    let cells: IndexMap<_, _> = CellId::range(8)
        .map(|id| (id, CellConfig::default()))
        .collect();
    let mut generator = TelemetryGenerator::new(7);
    let record = Record::new(
        Utc::now(),
        Phase::Idle,
        generator.generate_pack(&cells, Phase::Idle),
    );
    let summary = PackSummary::from_record(&record).unwrap();
    assert_eq!(summary.cell_count, 8);
    assert!(summary.min_cell_voltage_v <= summary.max_cell_voltage_v);
    let json = serde_json::to_value(&summary).unwrap();
    assert!(json.get("total_power_w").is_some());
}

//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "tests"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Configuration loading integration tests."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use std::io::Write;
use std::time::Duration;

use bms_common::config::{AppConfig, SocModel};
use bms_common::{CellId, Chemistry, LogStream, WorkingCondition};
use tempfile::NamedTempFile;

const SAMPLE: &str = r#"
[workflow]
charge_duration = 45
idle_duration = 15
discharge_duration = 40

[store]
debounce = 7
retain_last = 500

[simulation]
cell_count = 4
default_chemistry = "nmc"
random_seed = 42
soc_model = { kind = "coulomb-counting", capacity_ah = 2.5, initial_soc = 80.0 }

[cells.Cell_3]
condition = "faulty"

[cells.Cell_4]
chemistry = "lfp"
condition = "degraded"
"#;

#[test]
fn parses_full_configuration() {
    let config: AppConfig = SAMPLE.parse().unwrap();
    assert_eq!(config.workflow.charge_duration, Duration::from_secs(45));
    assert_eq!(config.workflow.idle_duration, Duration::from_secs(15));
    assert_eq!(config.store.debounce, Duration::from_secs(7));
    assert_eq!(config.store.retain_last, Some(500));
    assert_eq!(config.simulation.default_chemistry, Chemistry::Nmc);
    assert_eq!(config.simulation.random_seed, Some(42));
    assert_eq!(
        config.simulation.soc_model,
        SocModel::CoulombCounting {
            capacity_ah: 2.5,
            initial_soc: 80.0
        }
    );
    let cell_3 = CellId::new(3).unwrap();
    assert_eq!(
        config.cells[&cell_3].condition,
        Some(WorkingCondition::Faulty)
    );
    assert_eq!(config.cells[&cell_3].chemistry, None);
    assert_eq!(config.cell_ids().len(), 4);
}

#[test]
fn empty_configuration_uses_defaults() {
    let config: AppConfig = "".parse().unwrap();
    assert_eq!(config.simulation.cell_count, 8);
    assert_eq!(config.simulation.soc_model, SocModel::Random);
    assert_eq!(config.store.debounce, Duration::from_secs(5));
    assert_eq!(config.store.retain_last, None);
    assert_eq!(config.workflow.charge_duration, Duration::from_secs(30));
}

#[test]
fn rejects_debounce_outside_window() {
    let err = "[store]\ndebounce = 2\n".parse::<AppConfig>().unwrap_err();
    assert!(err.to_string().contains("debounce"), "{err}");
    assert!("[store]\ndebounce = 11\n".parse::<AppConfig>().is_err());
}

#[test]
fn rejects_override_beyond_cell_count() {
    let content = "[simulation]\ncell_count = 2\n\n[cells.Cell_5]\ncondition = \"critical\"\n";
    assert!(content.parse::<AppConfig>().is_err());
}

#[test]
fn rejects_unknown_cell_key() {
    let content = "[cells.Battery_1]\ncondition = \"critical\"\n";
    assert!(content.parse::<AppConfig>().is_err());
}

#[test]
fn load_prefers_first_existing_candidate() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[simulation]\ncell_count = 3").unwrap();
    file.flush().unwrap();
    let missing = std::path::PathBuf::from("does/not/exist.toml");
    let loaded = AppConfig::load_with_source(&[missing, file.path().to_path_buf()]).unwrap();
    assert_eq!(loaded.config.simulation.cell_count, 3);
    assert_eq!(loaded.source, file.path());
}

#[test]
fn shipped_configuration_is_valid() {
    let config: AppConfig = include_str!("../../../configs/bms.toml").parse().unwrap();
    assert_eq!(config.simulation.cell_count, 8);
    assert_eq!(config.simulation.soc_model, SocModel::Random);
    assert_eq!(
        config.cells[&CellId::new(3).unwrap()].chemistry,
        Some(Chemistry::Nmc)
    );
    assert_eq!(config.logging.stream, LogStream::Stdout);
}

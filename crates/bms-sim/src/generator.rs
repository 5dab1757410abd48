//! ---
//! bms_section: "11-simulation-test-harness"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Synthetic cell telemetry generation."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use bms_common::{round_dp, CellId, Chemistry, Phase, WorkingCondition};
use indexmap::IndexMap;
use rand::prelude::*;

use crate::model::{evaluate_alerts, CellConfig, TelemetryReading};

const CHARGE_VOLTAGE_GAIN: f64 = 1.05;
const DISCHARGE_VOLTAGE_FACTOR: f64 = 0.9;
const SOC_RANGE: (f64, f64) = (50.0, 100.0);
const SOH_RANGE: (f64, f64) = (85.0, 100.0);

/// Current and temperature windows drawn for a workflow phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseProfile {
    pub current_a: (f64, f64),
    pub temperature_c: (f64, f64),
}

impl PhaseProfile {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Charging => Self {
                current_a: (1.0, 5.0),
                temperature_c: (30.0, 50.0),
            },
            Phase::Discharging => Self {
                current_a: (-5.0, -1.0),
                temperature_c: (28.0, 45.0),
            },
            Phase::Idle => Self {
                current_a: (-0.5, 0.5),
                temperature_c: (25.0, 35.0),
            },
        }
    }
}

/// Adjustment applied on top of the phase profile for a working condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derating {
    pub voltage_factor: f64,
    pub temperature_offset_c: f64,
    pub zero_current: bool,
}

impl Derating {
    pub fn for_condition(condition: WorkingCondition) -> Self {
        let (voltage_factor, temperature_offset_c, zero_current) = match condition {
            WorkingCondition::Normal => (1.0, 0.0, false),
            WorkingCondition::Degraded => (0.95, 5.0, false),
            WorkingCondition::Critical => (0.85, 10.0, false),
            WorkingCondition::Faulty => (0.70, 15.0, true),
        };
        Self {
            voltage_factor,
            temperature_offset_c,
            zero_current,
        }
    }
}

fn phase_voltage(chemistry: Chemistry, phase: Phase, base: f64) -> f64 {
    let (_, max) = chemistry.voltage_bounds();
    match phase {
        Phase::Charging => (base * CHARGE_VOLTAGE_GAIN).min(max),
        Phase::Discharging => base * DISCHARGE_VOLTAGE_FACTOR,
        Phase::Idle => base,
    }
}

/// Inclusive `(min, max)` voltage a generated reading can take before rounding.
pub fn voltage_envelope(
    chemistry: Chemistry,
    phase: Phase,
    condition: WorkingCondition,
) -> (f64, f64) {
    let (min, max) = chemistry.voltage_bounds();
    let factor = Derating::for_condition(condition).voltage_factor;
    (
        phase_voltage(chemistry, phase, min) * factor,
        phase_voltage(chemistry, phase, max) * factor,
    )
}

/// Produces synthetic readings from per-cell configuration and the current phase.
///
/// The generator owns nothing but its random source; every reading is a function
/// of the inputs and the next draws from the RNG.
#[derive(Debug, Clone)]
pub struct TelemetryGenerator {
    rng: StdRng,
}

impl TelemetryGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded when `seed` is set, entropy-backed otherwise.
    pub fn with_optional_seed(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::from_entropy)
    }

    pub fn generate(&mut self, config: &CellConfig, phase: Phase) -> TelemetryReading {
        let (min, max) = config.chemistry.voltage_bounds();
        let profile = PhaseProfile::for_phase(phase);
        let derating = Derating::for_condition(config.working_condition);

        let base = self.uniform((min, max));
        let mut current = self.uniform(profile.current_a);
        let temperature = self.uniform(profile.temperature_c) + derating.temperature_offset_c;
        let voltage = phase_voltage(config.chemistry, phase, base) * derating.voltage_factor;
        if derating.zero_current {
            current = 0.0;
        }

        let voltage_v = round_dp(voltage, 3);
        let current_a = round_dp(current, 2);
        let temperature_c = round_dp(temperature, 1);
        let capacity_wh = round_dp(voltage_v * current_a.abs(), 2);
        let soc_pct = round_dp(self.uniform(SOC_RANGE), 1);
        let soh_pct = round_dp(self.uniform(SOH_RANGE), 1);

        TelemetryReading {
            voltage_v,
            current_a,
            temperature_c,
            capacity_wh,
            soc_pct,
            soh_pct,
            chemistry: config.chemistry,
            phase,
            working_condition: config.working_condition,
            alerts: evaluate_alerts(
                config.chemistry,
                config.working_condition,
                voltage_v,
                temperature_c,
            ),
        }
    }

    /// One reading per configured cell, preserving the configuration order.
    pub fn generate_pack(
        &mut self,
        cells: &IndexMap<CellId, CellConfig>,
        phase: Phase,
    ) -> IndexMap<CellId, TelemetryReading> {
        cells
            .iter()
            .map(|(id, config)| (*id, self.generate(config, phase)))
            .collect()
    }

    fn uniform(&mut self, (low, high): (f64, f64)) -> f64 {
        self.rng.gen_range(low..=high)
    }
}

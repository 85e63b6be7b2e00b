//! TOML-based scenario configuration and preset definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chemistry::{ChemistryOverride, ChemistryTable, LEAD_ACID, LI_ION};
use crate::sim::bus::PoolId;
use crate::sim::coordinator::{Deadband, LoadCoordinator};
use crate::sim::engine::Engine;
use crate::sim::profile::BusProfile;
use crate::sim::types::SimConfig;
use crate::storage::filter::DEFAULT_TAU_SECONDS;
use crate::storage::{BatteryUnit, UnitId};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Tick timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Simulated host bus and its production profile.
    #[serde(default)]
    pub bus: BusConfig,
    /// Coordinator thresholds and tuning.
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Battery units attached to the bus, in registration order.
    #[serde(default = "baseline_units")]
    pub units: Vec<UnitConfig>,
    /// Chemistry overrides and additions, keyed by type name. Only the
    /// fields given replace the built-in (or default) values.
    #[serde(default)]
    pub chemistry: BTreeMap<String, ChemistryOverride>,
}

/// Tick timing and global parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Fixed physics tick in seconds (must be > 0).
    pub tick_seconds: f64,
    /// Number of ticks to run.
    pub ticks: usize,
    /// Time-warp multiplier (must be > 0).
    pub warp: f64,
    /// Master random seed.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.02,
            ticks: 3000,
            warp: 1.0,
            seed: 42,
        }
    }
}

/// Simulated host bus parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Bus capacity provided by the host itself (kJ).
    pub base_capacity: f64,
    /// Initial fill fraction (0.0–1.0).
    pub initial_fraction: f64,
    /// Constant host production (kW).
    pub generation: f64,
    /// Mean host consumption (kW).
    pub load: f64,
    /// Consumption cycle period (s).
    pub period_seconds: f64,
    /// Gaussian noise standard deviation (kW).
    pub noise_std: f64,
    /// Consumption phase offset (radians).
    pub phase_rad: f64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            base_capacity: 500.0,
            initial_fraction: 0.5,
            generation: 40.0,
            load: 40.0,
            period_seconds: 20.0,
            noise_std: 2.0,
            phase_rad: 0.0,
        }
    }
}

/// Coordinator thresholds and tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Bus fraction below which units discharge. Defaults to the first
    /// unit's chemistry `low_level`.
    pub low_threshold: Option<f64>,
    /// Bus fraction above which units charge. Defaults to the first unit's
    /// chemistry `high_level`.
    pub high_threshold: Option<f64>,
    /// Status filter time constant (s).
    pub filter_tau_seconds: f64,
    /// Adaptive deadband step per tick; 0 disables adaptation.
    pub adaptive_step: f64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            low_threshold: None,
            high_threshold: None,
            filter_tau_seconds: DEFAULT_TAU_SECONDS,
            adaptive_step: 0.0,
        }
    }
}

/// One battery unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitConfig {
    /// Unit name.
    pub name: String,
    /// Chemistry type key; unknown types fall back to the table default.
    pub chemistry: String,
    /// Battery mass (t).
    pub mass: f64,
    /// Ordering priority; lower drains first.
    pub priority: i32,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Couple the unit to a thermal mass.
    pub thermal: bool,
    /// Initial core temperature (K). Defaults to the chemistry's goal.
    pub initial_temperature: Option<f64>,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: "battery".to_string(),
            chemistry: LEAD_ACID.to_string(),
            mass: 1.0,
            priority: 0,
            initial_soc: 0.5,
            thermal: false,
            initial_temperature: None,
        }
    }
}

fn baseline_units() -> Vec<UnitConfig> {
    vec![
        UnitConfig {
            name: "main".to_string(),
            mass: 0.5,
            initial_soc: 0.8,
            ..UnitConfig::default()
        },
        UnitConfig {
            name: "aux".to_string(),
            chemistry: LI_ION.to_string(),
            mass: 0.1,
            priority: 1,
            ..UnitConfig::default()
        },
    ]
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tick_seconds"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: a lead-acid main bank and a small
    /// Li-ion auxiliary on a lightly loaded bus.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            bus: BusConfig::default(),
            coordinator: CoordinatorConfig::default(),
            units: baseline_units(),
            chemistry: BTreeMap::new(),
        }
    }

    /// Returns the time-warp preset: 1000x warp with thermally coupled
    /// units and adaptive thresholds.
    pub fn time_warp() -> Self {
        Self {
            simulation: SimulationConfig {
                warp: 1000.0,
                ticks: 2000,
                ..SimulationConfig::default()
            },
            bus: BusConfig {
                generation: 30.0,
                load: 35.0,
                period_seconds: 3600.0,
                ..BusConfig::default()
            },
            coordinator: CoordinatorConfig {
                adaptive_step: 0.01,
                ..CoordinatorConfig::default()
            },
            units: baseline_units()
                .into_iter()
                .map(|u| UnitConfig { thermal: true, ..u })
                .collect(),
            chemistry: BTreeMap::new(),
        }
    }

    /// Returns the reserve-priority preset: a reserve bank that only drains
    /// once the primary banks are exhausted.
    pub fn reserve_priority() -> Self {
        Self {
            simulation: SimulationConfig {
                ticks: 5000,
                ..SimulationConfig::default()
            },
            bus: BusConfig {
                generation: 10.0,
                load: 60.0,
                ..BusConfig::default()
            },
            coordinator: CoordinatorConfig {
                low_threshold: Some(0.25),
                high_threshold: Some(0.85),
                ..CoordinatorConfig::default()
            },
            units: vec![
                UnitConfig {
                    name: "primary-a".to_string(),
                    mass: 0.25,
                    initial_soc: 0.3,
                    ..UnitConfig::default()
                },
                UnitConfig {
                    name: "primary-b".to_string(),
                    mass: 0.25,
                    initial_soc: 0.6,
                    ..UnitConfig::default()
                },
                UnitConfig {
                    name: "reserve".to_string(),
                    chemistry: LI_ION.to_string(),
                    mass: 0.2,
                    priority: 10,
                    initial_soc: 1.0,
                    ..UnitConfig::default()
                },
            ],
            chemistry: BTreeMap::new(),
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "time_warp", "reserve_priority"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "time_warp" => Ok(Self::time_warp()),
            "reserve_priority" => Ok(Self::reserve_priority()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let s = &self.simulation;
        if !positive(s.tick_seconds) {
            errors.push(ConfigError::new("simulation.tick_seconds", "must be > 0"));
        }
        if !positive(s.warp) {
            errors.push(ConfigError::new("simulation.warp", "must be > 0"));
        } else if positive(s.tick_seconds) && !(s.tick_seconds * s.warp).is_finite() {
            errors.push(ConfigError::new(
                "simulation.warp",
                "tick_seconds * warp must be finite",
            ));
        }

        let b = &self.bus;
        if !(b.base_capacity.is_finite() && b.base_capacity >= 0.0) {
            errors.push(ConfigError::new("bus.base_capacity", "must be >= 0"));
        }
        if !fraction(b.initial_fraction) {
            errors.push(ConfigError::new("bus.initial_fraction", "must be in [0.0, 1.0]"));
        }
        if !positive(b.period_seconds) {
            errors.push(ConfigError::new("bus.period_seconds", "must be > 0"));
        }
        if !(b.noise_std.is_finite() && b.noise_std >= 0.0) {
            errors.push(ConfigError::new("bus.noise_std", "must be >= 0"));
        }

        let c = &self.coordinator;
        for (field, value) in [
            ("coordinator.low_threshold", c.low_threshold),
            ("coordinator.high_threshold", c.high_threshold),
        ] {
            if value.is_some_and(|v| !fraction(v)) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }
        if !positive(c.filter_tau_seconds) {
            errors.push(ConfigError::new("coordinator.filter_tau_seconds", "must be > 0"));
        }
        if !(c.adaptive_step.is_finite() && (0.0..1.0).contains(&c.adaptive_step)) {
            errors.push(ConfigError::new("coordinator.adaptive_step", "must be in [0.0, 1.0)"));
        }

        for (i, u) in self.units.iter().enumerate() {
            if u.name.trim().is_empty() {
                errors.push(ConfigError::new(format!("units[{i}].name"), "must not be empty"));
            }
            if !positive(u.mass) {
                errors.push(ConfigError::new(format!("units[{i}].mass"), "must be > 0"));
            }
            if !fraction(u.initial_soc) {
                errors.push(ConfigError::new(
                    format!("units[{i}].initial_soc"),
                    "must be in [0.0, 1.0]",
                ));
            }
            if u.initial_temperature.is_some_and(|t| !positive(t)) {
                errors.push(ConfigError::new(
                    format!("units[{i}].initial_temperature"),
                    "must be > 0 K",
                ));
            }
        }

        let table = self.chemistry_table();
        for name in self.chemistry.keys() {
            let Ok(p) = table.lookup(name) else {
                continue;
            };
            let field = |f: &str| format!("chemistry.{name}.{f}");
            for (f, v) in [
                ("charge_efficiency", p.charge_efficiency),
                ("charge_ratio", p.charge_ratio),
                ("high_level", p.high_level),
                ("low_level", p.low_level),
            ] {
                if !fraction(v) {
                    errors.push(ConfigError::new(field(f), "must be in [0.0, 1.0]"));
                }
            }
            if p.low_level > p.high_level {
                errors.push(ConfigError::new(field("low_level"), "must be <= high_level"));
            }
            for (f, v) in [
                ("power_density", p.power_density),
                ("energy_density", p.energy_density),
                ("thermal_losses", p.thermal_losses),
                ("bus_buffer_ratio", p.bus_buffer_ratio),
            ] {
                if !(v.is_finite() && v >= 0.0) {
                    errors.push(ConfigError::new(field(f), "must be >= 0"));
                }
            }
        }

        if let Err(e) = self.deadband(&table) {
            errors.push(e);
        }

        errors
    }

    /// Built-in chemistries with this scenario's overrides applied.
    pub fn chemistry_table(&self) -> ChemistryTable {
        let mut table = ChemistryTable::builtin();
        for (name, overlay) in &self.chemistry {
            table.apply_override(name, overlay);
        }
        table
    }

    /// Resolves the configured deadband, filling gaps from the first unit's
    /// chemistry (or the table default when there are no units).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the resolved thresholds are out of range or
    /// inverted, or the fallback chemistry cannot be found.
    pub fn deadband(&self, table: &ChemistryTable) -> Result<Deadband, ConfigError> {
        let c = &self.coordinator;
        let (low, high) = match (c.low_threshold, c.high_threshold) {
            (Some(low), Some(high)) => (low, high),
            (low, high) => {
                let type_name = self
                    .units
                    .first()
                    .map_or(table.default_type(), |u| u.chemistry.as_str());
                let params = table
                    .lookup(type_name)
                    .map_err(|e| ConfigError::new("coordinator", e.to_string()))?;
                (
                    low.unwrap_or(params.low_level),
                    high.unwrap_or(params.high_level),
                )
            }
        };

        if !fraction(low) || !fraction(high) || low > high {
            return Err(ConfigError::new(
                "coordinator.low_threshold",
                format!("resolved deadband [{low}, {high}] must satisfy 0 <= low <= high <= 1"),
            ));
        }
        Ok(Deadband::new(low, high))
    }

    /// Builds the configured units, ids assigned from 1 in order.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the unit if its chemistry cannot be
    /// resolved or its initial charge is out of range.
    pub fn build_units(&self, table: &ChemistryTable) -> Result<Vec<BatteryUnit>, ConfigError> {
        let tau = self.coordinator.filter_tau_seconds;
        self.units
            .iter()
            .enumerate()
            .map(|(i, u)| {
                let params = table
                    .lookup(&u.chemistry)
                    .map_err(|e| ConfigError::new(format!("units[{i}].chemistry"), e.to_string()))?;
                let id = UnitId(i as u32 + 1);
                let unit = if u.thermal {
                    let temperature = u.initial_temperature.unwrap_or(params.core_temp_goal);
                    params.build_thermal_unit(
                        id,
                        u.name.clone(),
                        u.mass,
                        u.priority,
                        u.initial_soc,
                        temperature,
                    )
                } else {
                    params.build_unit(id, u.name.clone(), u.mass, u.priority, u.initial_soc)
                };
                unit.map(|unit| unit.with_filter_tau(tau))
                    .map_err(|e| ConfigError::new(format!("units[{i}]"), e.to_string()))
            })
            .collect()
    }

    /// Timing parameters for the engine.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if tick length or warp is not positive.
    pub fn sim_config(&self) -> Result<SimConfig, ConfigError> {
        let s = &self.simulation;
        if !positive(s.tick_seconds) || !positive(s.warp) {
            return Err(ConfigError::new(
                "simulation",
                "tick_seconds and warp must be > 0",
            ));
        }
        if !(s.tick_seconds * s.warp).is_finite() {
            return Err(ConfigError::new(
                "simulation.warp",
                "tick_seconds * warp must be finite",
            ));
        }
        Ok(SimConfig::new(s.tick_seconds, s.warp, s.ticks, s.seed))
    }

    /// Assembles a ready-to-run engine from this scenario.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` encountered while building.
    pub fn build_engine(&self) -> Result<Engine, ConfigError> {
        let table = self.chemistry_table();
        let sim = self.sim_config()?;
        let deadband = self.deadband(&table)?;

        let mut coordinator = LoadCoordinator::new(PoolId::BUS, deadband)
            .with_adaptive_step(self.coordinator.adaptive_step);
        coordinator.rebuild_units(self.build_units(&table)?);

        let b = &self.bus;
        let profile = BusProfile::new(
            b.generation,
            b.load,
            b.period_seconds,
            b.phase_rad,
            b.noise_std,
            sim.seed,
        );
        Ok(Engine::new(sim, b.base_capacity, b.initial_fraction, profile, coordinator))
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn fraction(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
tick_seconds = 0.05
ticks = 100
warp = 10.0
seed = 7

[bus]
base_capacity = 200.0
generation = 5.0
load = 10.0

[coordinator]
low_threshold = 0.2
high_threshold = 0.8
adaptive_step = 0.01

[[units]]
name = "bank"
chemistry = "li_ion"
mass = 0.3
priority = 2
initial_soc = 0.4
thermal = true

[chemistry.nickel]
display_name = "Nickel"
power_density = 600.0
energy_density = 60.0
charge_efficiency = 0.85
charge_ratio = 0.5
high_level = 0.95
low_level = 0.05
thermal_losses = 0.05
core_temp_goal = 310.0
bus_buffer_ratio = 1.0
soc_curve = [[0.0, 1.0], [1.0, 0.6]]
temperature_curve = [[250.0, 0.5], [310.0, 1.0]]
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.ticks), Some(100));
        assert_eq!(cfg.as_ref().map(|c| c.units.len()), Some(1));
        assert_eq!(cfg.as_ref().map(|c| c.units[0].thermal), Some(true));
        assert!(cfg.as_ref().is_some_and(|c| c.chemistry_table().contains("nickel")));
        assert!(cfg.as_ref().is_some_and(|c| c.validate().is_empty()));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
ticks = 10
bogus_field = true
"#;
        let result = ScenarioConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("parses");
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.simulation.ticks, 3000);
        assert_eq!(cfg.units.len(), 2);
        assert_eq!(cfg.bus.base_capacity, 500.0);
    }

    #[test]
    fn validation_catches_bad_timing() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.tick_seconds = 0.0;
        cfg.simulation.warp = f64::NAN;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.tick_seconds"));
        assert!(errors.iter().any(|e| e.field == "simulation.warp"));
    }

    #[test]
    fn overflowing_effective_tick_is_rejected() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.tick_seconds = 1e200;
        cfg.simulation.warp = 1e200;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.warp"));
        assert!(cfg.sim_config().is_err());
        assert!(cfg.build_engine().is_err());

        cfg.simulation.tick_seconds = 2.0;
        cfg.simulation.warp = 1e308;
        assert!(cfg.validate().iter().any(|e| e.field == "simulation.warp"));
    }

    #[test]
    fn partial_chemistry_override_keeps_builtin_values() {
        let toml = r#"
[chemistry.li_ion]
charge_ratio = 0.5
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("partial override parses");
        assert!(cfg.validate().is_empty());

        let table = cfg.chemistry_table();
        let li = table.lookup(LI_ION).expect("li-ion exists");
        let builtin = ChemistryTable::builtin();
        let stock = builtin.lookup(LI_ION).expect("li-ion exists");
        assert_eq!(li.charge_ratio, 0.5);
        assert_eq!(li.power_density, stock.power_density);
        assert_eq!(li.energy_density, stock.energy_density);
        assert_eq!(li.charge_efficiency, stock.charge_efficiency);
        assert_eq!(li.soc_curve, stock.soc_curve);
        assert_eq!(li.display_name, "Li Ion");
    }

    #[test]
    fn chemistry_override_rejects_unknown_field() {
        let toml = r#"
[chemistry.li_ion]
charge_rate = 0.5
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_invalid_soc() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.units[1].initial_soc = 1.5;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "units[1].initial_soc"));
    }

    #[test]
    fn validation_catches_inverted_thresholds() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.coordinator.low_threshold = Some(0.95);
        // High falls back to lead-acid's 0.9.
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "coordinator.low_threshold"));
    }

    #[test]
    fn validation_catches_bad_chemistry_override() {
        let mut cfg = ScenarioConfig::baseline();
        let overlay = ChemistryOverride {
            charge_efficiency: Some(1.5),
            ..ChemistryOverride::default()
        };
        cfg.chemistry.insert("broken".to_string(), overlay);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "chemistry.broken.charge_efficiency"));
    }

    #[test]
    fn deadband_falls_back_to_first_unit() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.coordinator.high_threshold = Some(0.7);
        let band = cfg.deadband(&cfg.chemistry_table()).expect("valid");
        assert_eq!(band.low, 0.1);
        assert_eq!(band.high, 0.7);
    }

    #[test]
    fn unknown_chemistry_falls_back_to_default() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.units[0].chemistry = "unobtainium".to_string();
        let units = cfg.build_units(&cfg.chemistry_table()).expect("falls back");
        // Lead-acid: 0.5 t * 20 kWh/t.
        assert_eq!(units[0].capacity(), 10.0);
    }

    #[test]
    fn build_units_assigns_ids_and_thermal() {
        let cfg = ScenarioConfig::time_warp();
        let units = cfg.build_units(&cfg.chemistry_table()).expect("valid");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].id(), UnitId(1));
        assert_eq!(units[1].id(), UnitId(2));
        assert_eq!(units[0].temperature(), Some(320.0));
        assert_eq!(units[1].temperature(), Some(340.0));
    }

    #[test]
    fn build_engine_sizes_bus() {
        let cfg = ScenarioConfig::baseline();
        let engine = cfg.build_engine().expect("valid");
        // 500 base + 0.5 t * 400 + 0.1 t * 1800.
        assert!((engine.bus().max() - 880.0).abs() < 1e-9);
        assert_eq!(engine.coordinator().units().len(), 2);
    }

    #[test]
    fn empty_units_use_default_chemistry_levels() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.units.clear();
        let band = cfg.deadband(&cfg.chemistry_table()).expect("valid");
        assert_eq!((band.low, band.high), (0.1, 0.9));
        assert!(cfg.validate().is_empty());
    }
}

//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use battery_bus_sim::config::ScenarioConfig;
use battery_bus_sim::sim::bus::PoolId;
use battery_bus_sim::sim::coordinator::{Deadband, LoadCoordinator};
use battery_bus_sim::sim::engine::Engine;
use battery_bus_sim::storage::{BatteryUnit, EfficiencyCurve, UnitId, UnitParams};

/// Flat-curve parameters: 100 reserve units, lossless, charge at full rate.
pub fn flat_params(priority: i32, discharge_rate: f64) -> UnitParams {
    UnitParams {
        capacity: 100.0,
        discharge_rate,
        charge_ratio: 1.0,
        charge_efficiency: 1.0,
        thermal_losses: 0.0,
        priority,
        soc_curve: EfficiencyCurve::flat(),
        temperature_curve: EfficiencyCurve::flat(),
        bus_buffer: 0.0,
    }
}

/// A flat-curve unit named `u{id}` filled to `soc`.
pub fn flat_unit(id: u32, priority: i32, soc: f64, discharge_rate: f64) -> BatteryUnit {
    BatteryUnit::new(
        UnitId(id),
        format!("u{id}"),
        flat_params(priority, discharge_rate),
        soc * 100.0,
    )
    .expect("fixture unit should be valid")
}

/// Coordinator on the default pool with a 10%/90% deadband.
pub fn coordinator(units: Vec<BatteryUnit>) -> LoadCoordinator {
    let mut c = LoadCoordinator::new(PoolId::BUS, Deadband::new(0.1, 0.9));
    c.rebuild_units(units);
    c
}

/// Engine for a built-in preset, shortened to `ticks`.
pub fn preset_engine(name: &str, ticks: usize) -> Engine {
    let mut cfg = ScenarioConfig::from_preset(name).expect("preset should exist");
    cfg.simulation.ticks = ticks;
    cfg.build_engine().expect("preset should build")
}

/// Signed delta of the unit with `id` on its last tick.
pub fn last_delta(c: &LoadCoordinator, id: u32) -> f64 {
    c.units()
        .iter()
        .find(|u| u.id() == UnitId(id))
        .map(BatteryUnit::last_delta)
        .expect("unit should be attached")
}

//! Stand-alone simulation engine: a reference host driving one coordinator.

use crate::storage::{BatteryUnit, UnitId};

use super::bus::SimulatedBus;
use super::clock::TickClock;
use super::coordinator::LoadCoordinator;
use super::profile::BusProfile;
use super::types::{SimConfig, StepResult};

/// Owns the simulated bus, its production profile and the coordinator
/// balancing it.
///
/// The bus capacity is the host's own capacity plus whatever buffer the
/// attached units contribute, and is recomputed whenever units are rebuilt.
#[derive(Debug)]
pub struct Engine {
    config: SimConfig,
    bus: SimulatedBus,
    base_capacity: f64,
    profile: BusProfile,
    coordinator: LoadCoordinator,
}

impl Engine {
    /// Creates an engine. The bus is resized to `base_capacity` plus the
    /// coordinator's unit buffer and filled to `initial_fraction` of that.
    pub fn new(
        config: SimConfig,
        base_capacity: f64,
        initial_fraction: f64,
        profile: BusProfile,
        coordinator: LoadCoordinator,
    ) -> Self {
        let base_capacity = if base_capacity.is_finite() { base_capacity.max(0.0) } else { 0.0 };
        let max = base_capacity + coordinator.bus_buffer();
        let bus = SimulatedBus::new(coordinator.pool(), max * initial_fraction.clamp(0.0, 1.0), max);
        Self {
            config,
            bus,
            base_capacity,
            profile,
            coordinator,
        }
    }

    /// Executes one tick starting at `elapsed` seconds and returns its record.
    ///
    /// Host production is applied to the bus first, then the coordinator
    /// balances against the resulting totals.
    pub fn step(&mut self, tick: usize, elapsed: f64) -> StepResult {
        let dt = self.config.dt();

        let host_net = self.bus.apply_net(self.profile.net_energy(elapsed, dt));
        let bus_before = self.bus.amount();

        let report = self.coordinator.tick_host(&mut self.bus, dt);

        let units: Vec<_> = self.coordinator.units().iter().map(BatteryUnit::snapshot).collect();
        let mean_soc = if units.is_empty() {
            0.0
        } else {
            units.iter().map(|u| u.soc).sum::<f64>() / units.len() as f64
        };
        let band = self.coordinator.effective_deadband();

        StepResult {
            tick,
            time_s: elapsed,
            host_net,
            bus_before,
            bus_after: self.bus.amount(),
            bus_max: self.bus.max(),
            mode: report.mode,
            requested: report.requested,
            delivered: report.delivered,
            low_threshold: band.low,
            high_threshold: band.high,
            mean_soc,
            units,
        }
    }

    /// Runs every configured tick and returns the complete record.
    pub fn run(&mut self) -> Vec<StepResult> {
        let mut clock = TickClock::new(self.config.ticks, self.config.tick_seconds, self.config.warp);
        let mut results = Vec::with_capacity(self.config.ticks);
        while let Some((tick, elapsed)) = clock.tick() {
            results.push(self.step(tick, elapsed));
        }
        tracing::info!(
            ticks = results.len(),
            dt = self.config.dt(),
            units = self.coordinator.units().len(),
            "simulation run finished"
        );
        results
    }

    /// Replaces the attached units and resizes the bus to match.
    pub fn rebuild_units(&mut self, units: Vec<BatteryUnit>) -> Vec<BatteryUnit> {
        let old = self.coordinator.rebuild_units(units);
        self.resize_bus();
        old
    }

    /// Attaches one unit and grows the bus by its buffer.
    pub fn attach(&mut self, unit: BatteryUnit) {
        self.coordinator.attach(unit);
        self.resize_bus();
    }

    /// Detaches the unit with `id`, shrinking the bus by its buffer.
    pub fn detach(&mut self, id: UnitId) -> Option<BatteryUnit> {
        let unit = self.coordinator.detach(id);
        self.resize_bus();
        unit
    }

    /// Mutable access to one attached unit, e.g. to change its priority
    /// between ticks. Adding or removing units goes through the engine so the
    /// bus stays sized to match.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BatteryUnit> {
        self.coordinator.unit_mut(id)
    }

    fn resize_bus(&mut self) {
        self.bus.set_max(self.base_capacity + self.coordinator.bus_buffer());
    }

    /// The coordinator balancing this engine's bus.
    pub fn coordinator(&self) -> &LoadCoordinator {
        &self.coordinator
    }

    /// The simulated host bus.
    pub fn bus(&self) -> &SimulatedBus {
        &self.bus
    }

    /// Mutable bus access, e.g. to take the host offline.
    pub fn bus_mut(&mut self) -> &mut SimulatedBus {
        &mut self.bus
    }

    /// Returns a reference to the run configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

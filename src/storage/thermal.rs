//! Thermal coupling between a battery unit and an external heat sink.
//!
//! Thermal coupling is optional. A unit that has a sink scales its transfer
//! rate by its temperature efficiency curve and dumps resistive losses into
//! the sink; a unit without one runs at full temperature efficiency.

use std::fmt;

/// Host-side heat sink a battery unit can be coupled to.
///
/// Temperatures are in kelvin, energy in bus units (kJ).
pub trait ThermalSink: fmt::Debug {
    /// Adds `amount` of heat to the sink.
    fn add_energy(&mut self, amount: f64);

    /// Current core temperature.
    fn current_temperature(&self) -> f64;

    /// Temperature the host regulates the core toward.
    fn temperature_goal(&self) -> f64;

    /// Advances any passive behaviour (cooling, regulation) by `dt` seconds.
    fn tick(&mut self, _dt: f64) {}
}

/// Lumped thermal mass that relaxes toward its goal temperature.
///
/// Heat input raises the temperature by `energy / heat_capacity`. Between
/// inputs the temperature decays toward the goal as
/// `T = goal + (T - goal) * exp(-dt * conductance / heat_capacity)`, which
/// stays stable for arbitrarily long ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalMass {
    /// Core temperature (K).
    pub temperature: f64,
    /// Regulation target (K).
    pub goal: f64,
    /// Heat capacity (kJ/K).
    pub heat_capacity: f64,
    /// Conductance to the regulated environment (kW/K).
    pub conductance: f64,
}

impl ThermalMass {
    /// Creates a thermal mass at `temperature` regulating toward `goal`.
    ///
    /// Non-positive heat capacity is raised to a small positive floor so heat
    /// input never divides by zero.
    pub fn new(temperature: f64, goal: f64, heat_capacity: f64, conductance: f64) -> Self {
        Self {
            temperature,
            goal,
            heat_capacity: heat_capacity.max(1e-6),
            conductance: conductance.max(0.0),
        }
    }

    /// Builds a sink sized for a battery of `mass` tonnes.
    ///
    /// Roughly 1 kJ/K per kilogram with a conductance of 0.05 kW/K per tonne.
    pub fn for_mass(mass: f64, temperature: f64, goal: f64) -> Self {
        let mass = mass.max(0.0);
        Self::new(temperature, goal, mass * 1000.0, mass * 0.05)
    }
}

impl ThermalSink for ThermalMass {
    fn add_energy(&mut self, amount: f64) {
        if amount.is_finite() {
            self.temperature += amount / self.heat_capacity;
        }
    }

    fn current_temperature(&self) -> f64 {
        self.temperature
    }

    fn temperature_goal(&self) -> f64 {
        self.goal
    }

    fn tick(&mut self, dt: f64) {
        if !(dt > 0.0 && dt.is_finite()) {
            return;
        }
        let decay = (-dt * self.conductance / self.heat_capacity).exp();
        self.temperature = self.goal + (self.temperature - self.goal) * decay;
    }
}

//! Core simulation types: run configuration and per-tick records.

use std::fmt;

use serde::Serialize;

use crate::storage::UnitSnapshot;

use super::coordinator::TickMode;

/// Timing parameters for a stand-alone run.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(0.02, 50.0, 100, 42);
/// assert_eq!(cfg.dt(), 1.0);
/// assert_eq!(cfg.ticks, 100);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SimConfig {
    /// Fixed physics tick in seconds, before warp.
    pub tick_seconds: f64,
    /// Time-warp multiplier.
    pub warp: f64,
    /// Number of ticks to run.
    pub ticks: usize,
    /// Master random seed for reproducibility.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new run configuration.
    ///
    /// # Panics
    ///
    /// Panics if `tick_seconds` or `warp` is not positive and finite.
    pub fn new(tick_seconds: f64, warp: f64, ticks: usize, seed: u64) -> Self {
        assert!(
            tick_seconds > 0.0 && tick_seconds.is_finite(),
            "tick_seconds must be > 0"
        );
        assert!(warp > 0.0 && warp.is_finite(), "warp must be > 0");
        Self {
            tick_seconds,
            warp,
            ticks,
            seed,
        }
    }

    /// Effective seconds simulated per tick.
    pub fn dt(&self) -> f64 {
        self.tick_seconds * self.warp
    }
}

/// Complete record of one simulation tick.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Tick index.
    pub tick: usize,
    /// Simulated seconds at the start of the tick.
    pub time_s: f64,
    /// Net host production applied to the bus before balancing.
    pub host_net: f64,
    /// Bus amount the coordinator saw.
    pub bus_before: f64,
    /// Bus amount after balancing.
    pub bus_after: f64,
    /// Bus capacity.
    pub bus_max: f64,
    /// What the coordinator did.
    pub mode: TickMode,
    /// Deficit or surplus the coordinator tried to serve.
    pub requested: f64,
    /// Signed bus delta across all units (positive = charged).
    pub delivered: f64,
    /// Effective low threshold in force after the tick.
    pub low_threshold: f64,
    /// Effective high threshold in force after the tick.
    pub high_threshold: f64,
    /// Mean state of charge across units after the tick.
    pub mean_soc: f64,
    /// Per-unit state after the tick.
    pub units: Vec<UnitSnapshot>,
}

impl StepResult {
    /// Bus fill fraction after balancing, 0 when the bus has no capacity.
    pub fn bus_fraction(&self) -> f64 {
        if self.bus_max > 0.0 {
            self.bus_after / self.bus_max
        } else {
            0.0
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>4} ({:>8.1}s) | bus={:>9.2}/{:<9.2} ({:>5.1}%) | {:<9} \
             req={:>8.2} done={:>8.2} | SoC={:.1}%",
            self.tick,
            self.time_s,
            self.bus_after,
            self.bus_max,
            self.bus_fraction() * 100.0,
            self.mode.as_str(),
            self.requested,
            self.delivered,
            self.mean_soc * 100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> StepResult {
        StepResult {
            tick: 0,
            time_s: 0.0,
            host_net: -3.0,
            bus_before: 5.0,
            bus_after: 8.0,
            bus_max: 100.0,
            mode: TickMode::Discharge,
            requested: 5.0,
            delivered: -3.0,
            low_threshold: 0.1,
            high_threshold: 0.9,
            mean_soc: 0.48,
            units: Vec::new(),
        }
    }

    #[test]
    fn sim_config_basic() {
        let cfg = SimConfig::new(0.5, 4.0, 10, 42);
        assert_eq!(cfg.dt(), 2.0);
        assert_eq!(cfg.seed, 42);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_tick_panics() {
        SimConfig::new(0.0, 1.0, 1, 0);
    }

    #[test]
    #[should_panic]
    fn sim_config_zero_warp_panics() {
        SimConfig::new(1.0, 0.0, 1, 0);
    }

    #[test]
    fn bus_fraction_handles_zero_capacity() {
        let mut r = result();
        assert!((r.bus_fraction() - 0.08).abs() < 1e-12);
        r.bus_max = 0.0;
        assert_eq!(r.bus_fraction(), 0.0);
    }

    #[test]
    fn step_result_display_does_not_panic() {
        let s = format!("{}", result());
        assert!(s.contains("discharge"));
    }
}

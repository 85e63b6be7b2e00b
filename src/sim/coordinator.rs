//! Per-network load coordinator: the per-tick energy allocator.
//!
//! Once per tick the coordinator compares the bus fill level against its
//! deadband, orders its units by priority and state of charge, and hands each
//! unit in turn whatever part of the surplus or deficit is still unserved.
//! It is a single-pass greedy allocator: every unit is called exactly once per
//! tick, and the remaining budget only ever shrinks.

use std::cmp::Ordering;

use serde::Serialize;

use crate::storage::{BatteryUnit, UnitId};

use super::bus::{BusTotals, BusTotalsProvider, EnergyTransfer, PoolId};

/// Bus fill fractions outside of which rebalancing triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deadband {
    /// Discharge when the bus is below `low * max`.
    pub low: f64,
    /// Charge when the bus is above `high * max`.
    pub high: f64,
}

impl Deadband {
    /// Creates a deadband.
    ///
    /// # Panics
    ///
    /// Panics unless `0 <= low <= high <= 1`.
    pub fn new(low: f64, high: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high) && low <= high,
            "deadband must satisfy 0 <= low <= high <= 1 (got {low}, {high})"
        );
        Self { low, high }
    }

    /// Whether `fraction` lies strictly inside the band.
    pub fn contains(&self, fraction: f64) -> bool {
        fraction > self.low && fraction < self.high
    }
}

/// What the coordinator did on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickMode {
    /// Bus totals unavailable, no capacity, or no units: nothing happened.
    #[default]
    Skipped,
    /// Bus inside the deadband; every unit got an idle tick.
    Idle,
    /// Bus below the low threshold; units discharged.
    Discharge,
    /// Bus above the high threshold; units charged.
    Charge,
}

impl TickMode {
    /// Lowercase name used in telemetry output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Idle => "idle",
            Self::Discharge => "discharge",
            Self::Charge => "charge",
        }
    }
}

/// Outcome of one coordinator tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub mode: TickMode,
    /// Unsigned deficit or surplus the pass tried to serve.
    pub requested: f64,
    /// Signed bus delta summed over all units (positive = charged).
    pub delivered: f64,
    /// Budget left unserved after the pass.
    pub remaining: f64,
    /// Units that received a non-idle request.
    pub visited: usize,
}

impl TickReport {
    fn skipped() -> Self {
        Self::default()
    }
}

/// Owns the battery units attached to one power network and balances them
/// against that network's bus every tick.
///
/// The unit list is replaced only through `&mut self` methods, so it can
/// never change while a tick is iterating over it.
///
/// # Examples
///
/// ```
/// use battery_bus_sim::sim::bus::{BusTotals, PoolId, UnlimitedBus};
/// use battery_bus_sim::sim::coordinator::{Deadband, LoadCoordinator, TickMode};
///
/// let mut coordinator = LoadCoordinator::new(PoolId::BUS, Deadband::new(0.1, 0.9));
/// let totals = BusTotals { amount: 50.0, max: 100.0 };
/// let report = coordinator.tick(totals, 1.0, &mut UnlimitedBus);
/// assert_eq!(report.mode, TickMode::Skipped); // no units yet
/// ```
#[derive(Debug)]
pub struct LoadCoordinator {
    pool: PoolId,
    configured: Deadband,
    effective: Deadband,
    adaptive_step: f64,
    units: Vec<BatteryUnit>,
    order: Vec<usize>,
}

impl LoadCoordinator {
    /// Creates a coordinator for `pool` with no units.
    pub fn new(pool: PoolId, deadband: Deadband) -> Self {
        Self {
            pool,
            configured: deadband,
            effective: deadband,
            adaptive_step: 0.0,
            units: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Enables the adaptive deadband, nudging thresholds by `step` per tick.
    ///
    /// A step of zero (or anything non-finite or negative) disables it.
    pub fn with_adaptive_step(mut self, step: f64) -> Self {
        self.adaptive_step = if step.is_finite() { step.max(0.0) } else { 0.0 };
        self
    }

    /// Replaces the unit set after a structural change and returns the old one.
    ///
    /// Returned units keep their reserve state so the host can persist them.
    pub fn rebuild_units(&mut self, units: Vec<BatteryUnit>) -> Vec<BatteryUnit> {
        tracing::info!(
            pool = self.pool.0,
            units = units.len(),
            "rebuilding battery unit list"
        );
        self.order.clear();
        std::mem::replace(&mut self.units, units)
    }

    /// Attaches one unit; it takes part from the next tick on.
    pub fn attach(&mut self, unit: BatteryUnit) {
        tracing::debug!(pool = self.pool.0, unit = unit.name(), "attaching battery unit");
        self.units.push(unit);
    }

    /// Detaches and returns the unit with `id`, if attached.
    pub fn detach(&mut self, id: UnitId) -> Option<BatteryUnit> {
        let index = self.units.iter().position(|u| u.id() == id)?;
        Some(self.units.remove(index))
    }

    /// Reads totals from the host once, then runs [`LoadCoordinator::tick`].
    ///
    /// A host that cannot report totals makes this tick a no-op.
    pub fn tick_host<H>(&mut self, host: &mut H, dt: f64) -> TickReport
    where
        H: BusTotalsProvider + EnergyTransfer,
    {
        match host.totals(self.pool) {
            Some(totals) => self.tick(totals, dt, host),
            None => {
                tracing::debug!(pool = self.pool.0, "bus totals unavailable, skipping tick");
                TickReport::skipped()
            }
        }
    }

    /// Runs one allocation pass against a read-once snapshot of bus totals.
    ///
    /// Unit transfers are routed through `sink`; their granted deltas, never
    /// the snapshot, drive the remaining budget.
    pub fn tick(&mut self, totals: BusTotals, dt: f64, sink: &mut dyn EnergyTransfer) -> TickReport {
        if !(totals.max > 0.0) || !totals.amount.is_finite() || self.units.is_empty() {
            return TickReport::skipped();
        }

        let deficit = totals.max * self.effective.low - totals.amount;
        let surplus = totals.amount - totals.max * self.effective.high;

        let report = if deficit > 0.0 {
            self.sort_units(discharge_order);
            self.pass(TickMode::Discharge, deficit, dt, sink)
        } else if surplus > 0.0 {
            self.sort_units(charge_order);
            self.pass(TickMode::Charge, surplus, dt, sink)
        } else {
            for unit in &mut self.units {
                unit.transfer_with(0.0, dt, self.pool, sink);
            }
            TickReport {
                mode: TickMode::Idle,
                ..TickReport::default()
            }
        };

        if dt > 0.0 && dt.is_finite() {
            self.adapt(&report);
        }

        tracing::debug!(
            pool = self.pool.0,
            mode = ?report.mode,
            requested = report.requested,
            delivered = report.delivered,
            remaining = report.remaining,
            "coordinator tick"
        );
        report
    }

    fn sort_units(&mut self, cmp: fn(&BatteryUnit, &BatteryUnit) -> Ordering) {
        let units = &self.units;
        self.order.clear();
        self.order.extend(0..units.len());
        // Stable: equal keys keep registration order.
        self.order.sort_by(|&a, &b| cmp(&units[a], &units[b]));
    }

    fn pass(
        &mut self,
        mode: TickMode,
        budget: f64,
        dt: f64,
        sink: &mut dyn EnergyTransfer,
    ) -> TickReport {
        let sign = if mode == TickMode::Discharge { -1.0 } else { 1.0 };
        let mut remaining = budget;
        let mut delivered = 0.0;
        let mut visited = 0;

        for &index in &self.order {
            let unit = &mut self.units[index];
            if remaining > 0.0 {
                let delta = unit.transfer_with(sign * remaining, dt, self.pool, sink);
                remaining = (remaining - delta.abs()).max(0.0);
                delivered += delta;
                visited += 1;
            } else {
                unit.transfer_with(0.0, dt, self.pool, sink);
            }
        }

        TickReport {
            mode,
            requested: budget,
            delivered,
            remaining,
            visited,
        }
    }

    /// Nudges the effective thresholds once per tick, inside the configured band.
    fn adapt(&mut self, report: &TickReport) {
        let step = self.adaptive_step;
        if step <= 0.0 {
            return;
        }

        let undershoot = report.remaining > report.requested * 1e-9;
        let configured = self.configured;
        let effective = &mut self.effective;

        match report.mode {
            TickMode::Discharge if undershoot => {
                effective.low = (effective.low + step).min(effective.high);
            }
            TickMode::Charge if undershoot => {
                effective.high = (effective.high - step).max(effective.low);
            }
            TickMode::Skipped => {}
            _ => {
                effective.low = (effective.low - step).max(configured.low);
                effective.high = (effective.high + step).min(configured.high);
            }
        }
    }

    /// Attached units in registration order.
    pub fn units(&self) -> &[BatteryUnit] {
        &self.units
    }

    /// Mutable access to one unit, e.g. to change its priority between ticks.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut BatteryUnit> {
        self.units.iter_mut().find(|u| u.id() == id)
    }

    /// Total bus capacity contributed by attached units.
    pub fn bus_buffer(&self) -> f64 {
        self.units.iter().map(BatteryUnit::bus_buffer).sum()
    }

    /// The configured deadband.
    pub fn deadband(&self) -> Deadband {
        self.configured
    }

    /// The deadband currently in force after adaptive adjustment.
    pub fn effective_deadband(&self) -> Deadband {
        self.effective
    }

    /// The pool this coordinator balances.
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

/// Lowest priority first; among equals, highest SOC drains first.
fn discharge_order(a: &BatteryUnit, b: &BatteryUnit) -> Ordering {
    a.priority()
        .cmp(&b.priority())
        .then_with(|| b.soc().total_cmp(&a.soc()))
}

/// Highest priority first; among equals, lowest SOC fills first.
fn charge_order(a: &BatteryUnit, b: &BatteryUnit) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| a.soc().total_cmp(&b.soc()))
}

//! Shared power bus: the host capability contract and a reference host pool.
//!
//! Sign convention for [`EnergyTransfer::request_delta`]:
//! - Positive amount: draw energy out of the pool (consumption)
//! - Negative amount: deposit energy into the pool (production)
//!
//! The granted amount has the same sign as the request and never a larger
//! magnitude. Callers must treat the grant, not the request, as ground truth.

use serde::{Deserialize, Serialize};

/// Identifies one resource pool on the host. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

impl PoolId {
    /// The conventional id of the shared bus pool.
    pub const BUS: PoolId = PoolId(0);
}

/// Snapshot of a pool's immediately available energy and its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusTotals {
    /// Energy currently in the pool.
    pub amount: f64,
    /// Maximum energy the pool can hold.
    pub max: f64,
}

impl BusTotals {
    /// Fill fraction, or 0 when the pool has no capacity.
    pub fn fraction(&self) -> f64 {
        if self.max > 0.0 {
            self.amount / self.max
        } else {
            0.0
        }
    }
}

/// Provides network-wide bus totals, queried once per tick.
pub trait BusTotalsProvider {
    /// Returns the current totals, or `None` if the host cannot answer
    /// (network unloaded, host unavailable).
    fn totals(&self, pool: PoolId) -> Option<BusTotals>;
}

/// Moves energy into or out of a host pool.
pub trait EnergyTransfer {
    /// Requests a signed `amount` from `pool` and returns what was granted.
    fn request_delta(&mut self, pool: PoolId, amount: f64) -> f64;
}

/// A transfer sink that grants every request in full.
///
/// Used when a battery unit is driven directly, without a host pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnlimitedBus;

impl EnergyTransfer for UnlimitedBus {
    fn request_delta(&mut self, _pool: PoolId, amount: f64) -> f64 {
        if amount.is_finite() { amount } else { 0.0 }
    }
}

/// A single bounded bus pool standing in for the host's resource network.
///
/// Holds `amount` within `[0, max]`. Draws are limited to what is available,
/// deposits to the free space.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedBus {
    pool: PoolId,
    amount: f64,
    max: f64,
    online: bool,
}

impl SimulatedBus {
    /// Creates an online bus pool with `max` capacity, filled to `amount`.
    ///
    /// # Panics
    ///
    /// Panics if `max` is negative or non-finite.
    pub fn new(pool: PoolId, amount: f64, max: f64) -> Self {
        assert!(max >= 0.0 && max.is_finite());
        Self {
            pool,
            amount: amount.clamp(0.0, max),
            max,
            online: true,
        }
    }

    /// Adds signed host production (positive) or consumption (negative).
    ///
    /// Returns the amount actually applied after clamping to `[0, max]`.
    pub fn apply_net(&mut self, energy: f64) -> f64 {
        if !energy.is_finite() {
            return 0.0;
        }
        let before = self.amount;
        self.amount = (self.amount + energy).clamp(0.0, self.max);
        self.amount - before
    }

    /// Grows or shrinks capacity, keeping the stored amount within bounds.
    pub fn set_max(&mut self, max: f64) {
        self.max = if max.is_finite() { max.max(0.0) } else { 0.0 };
        self.amount = self.amount.min(self.max);
    }

    /// Marks the host as reachable or not.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Whether the host currently answers queries.
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Energy currently stored.
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Pool capacity.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// The pool this bus serves.
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

impl BusTotalsProvider for SimulatedBus {
    fn totals(&self, pool: PoolId) -> Option<BusTotals> {
        (self.online && pool == self.pool).then_some(BusTotals {
            amount: self.amount,
            max: self.max,
        })
    }
}

impl EnergyTransfer for SimulatedBus {
    fn request_delta(&mut self, pool: PoolId, amount: f64) -> f64 {
        if !self.online || pool != self.pool || !amount.is_finite() {
            return 0.0;
        }
        let granted = if amount >= 0.0 {
            amount.min(self.amount)
        } else {
            -(-amount).min(self.max - self.amount)
        };
        self.amount = (self.amount - granted).clamp(0.0, self.max);
        granted
    }
}

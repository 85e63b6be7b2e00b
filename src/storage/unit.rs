use serde::Serialize;

use crate::error::BatteryError;
use crate::sim::bus::{EnergyTransfer, PoolId, UnlimitedBus};

use super::curve::EfficiencyCurve;
use super::filter::StatusFilter;
use super::thermal::ThermalSink;

/// Bus energy units per reserve energy unit (1 kWh of reserve = 3600 kJ of bus).
pub const ENERGY_UNIT_RATIO: f64 = 3600.0;

/// Identifies a battery unit within its network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitId(pub u32);

/// What the unit did on its most recent tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Idle,
    Charging,
    Discharging,
}

impl UnitStatus {
    /// Lowercase name used in telemetry output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Charging => "charging",
            Self::Discharging => "discharging",
        }
    }
}

/// Physical parameters of a battery unit, usually derived from a chemistry.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitParams {
    /// Maximum reserve energy (reserve units).
    pub capacity: f64,
    /// Maximum bus energy per second the unit can source or sink.
    pub discharge_rate: f64,
    /// Fraction of `discharge_rate` usable while charging.
    pub charge_ratio: f64,
    /// Fraction of drawn bus energy that reaches the reserve.
    pub charge_efficiency: f64,
    /// Fraction of squared transfer power dumped into the heat sink.
    pub thermal_losses: f64,
    /// Ordering key; lower values are served first when discharging.
    pub priority: i32,
    /// Rate multiplier by state of charge.
    pub soc_curve: EfficiencyCurve,
    /// Rate multiplier by core temperature.
    pub temperature_curve: EfficiencyCurve,
    /// Bus capacity this unit contributes to its network.
    pub bus_buffer: f64,
}

/// A battery: one internal reserve that exchanges energy with the shared bus.
///
/// # Power Flow Convention (Bus)
/// - Positive delta: charging (energy drawn from the bus into the reserve)
/// - Negative delta: discharging (energy pushed from the reserve onto the bus)
///
/// The unit has no knowledge of its peers; ordering and budget sharing are the
/// coordinator's job.
#[derive(Debug)]
pub struct BatteryUnit {
    id: UnitId,
    name: String,
    capacity: f64,
    stored: f64,
    soc: f64,
    discharge_rate: f64,
    charge_ratio: f64,
    charge_efficiency: f64,
    thermal_losses: f64,
    priority: i32,
    soc_curve: EfficiencyCurve,
    temperature_curve: EfficiencyCurve,
    bus_buffer: f64,
    filter: StatusFilter,
    status: UnitStatus,
    last_delta: f64,
    thermal: Option<Box<dyn ThermalSink>>,
}

impl BatteryUnit {
    /// Creates a unit holding `stored` reserve energy.
    ///
    /// Non-finite or negative capacity or discharge rate make the unit
    /// degenerate: it is built, but every transfer returns 0.
    ///
    /// # Errors
    ///
    /// Returns [`BatteryError::InitialChargeOutOfRange`] if `stored` is not
    /// within `[0, capacity]` for a non-degenerate unit.
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        params: UnitParams,
        stored: f64,
    ) -> Result<Self, BatteryError> {
        let name = name.into();
        let capacity = non_negative(params.capacity);
        let discharge_rate = non_negative(params.discharge_rate);

        let stored = if capacity > 0.0 {
            if !(stored.is_finite() && (0.0..=capacity).contains(&stored)) {
                return Err(BatteryError::InitialChargeOutOfRange { stored, capacity });
            }
            stored
        } else {
            0.0
        };

        if capacity <= 0.0 || discharge_rate <= 0.0 {
            tracing::warn!(
                unit = %name,
                capacity = params.capacity,
                discharge_rate = params.discharge_rate,
                "battery unit has no usable capability; transfers will be refused"
            );
        }

        let mut unit = Self {
            id,
            name,
            capacity,
            stored,
            soc: 0.0,
            discharge_rate,
            charge_ratio: non_negative(params.charge_ratio),
            charge_efficiency: non_negative(params.charge_efficiency).min(1.0),
            thermal_losses: non_negative(params.thermal_losses),
            priority: params.priority,
            soc_curve: params.soc_curve,
            temperature_curve: params.temperature_curve,
            bus_buffer: non_negative(params.bus_buffer),
            filter: StatusFilter::default(),
            status: UnitStatus::Idle,
            last_delta: 0.0,
            thermal: None,
        };
        unit.refresh_soc();
        Ok(unit)
    }

    /// Couples the unit to an external heat sink.
    pub fn with_thermal(mut self, sink: Box<dyn ThermalSink>) -> Self {
        self.thermal = Some(sink);
        self
    }

    /// Replaces the status filter with one using time constant `tau` seconds.
    pub fn with_filter_tau(mut self, tau: f64) -> Self {
        self.filter = StatusFilter::new(tau);
        self
    }

    /// Transfers energy against a bus that grants every request.
    ///
    /// See [`BatteryUnit::transfer_with`] for the semantics.
    pub fn transfer(&mut self, requested: f64, dt: f64) -> f64 {
        self.transfer_with(requested, dt, PoolId::BUS, &mut UnlimitedBus)
    }

    /// Exchanges up to `requested` bus energy with `pool` over `dt` seconds.
    ///
    /// Positive `requested` charges the reserve, negative discharges it. The
    /// returned signed bus delta is what the host actually granted, never
    /// larger in magnitude than the request, and always of the same sign or
    /// zero. Every call refreshes SOC, ticks the heat sink, and feeds the
    /// status filter, including idle calls.
    pub fn transfer_with(
        &mut self,
        requested: f64,
        dt: f64,
        pool: PoolId,
        sink: &mut dyn EnergyTransfer,
    ) -> f64 {
        let dt_ok = dt > 0.0 && dt.is_finite();

        let delta = if !dt_ok || !requested.is_finite() || self.is_degenerate() {
            0.0
        } else if requested > 0.0 && self.soc < 1.0 {
            self.charge(requested, dt, pool, sink)
        } else if requested < 0.0 && self.soc > 0.0 {
            self.discharge(-requested, dt, pool, sink)
        } else {
            0.0
        };

        if dt_ok {
            if let Some(thermal) = self.thermal.as_mut() {
                thermal.tick(dt);
            }
            self.filter.update(delta / dt, dt);
        }
        self.refresh_soc();
        self.last_delta = delta;
        self.status = if delta > 0.0 {
            UnitStatus::Charging
        } else if delta < 0.0 {
            UnitStatus::Discharging
        } else {
            UnitStatus::Idle
        };

        tracing::trace!(
            unit = %self.name,
            requested,
            delta,
            soc = self.soc,
            "battery transfer"
        );
        delta
    }

    fn charge(
        &mut self,
        requested: f64,
        dt: f64,
        pool: PoolId,
        sink: &mut dyn EnergyTransfer,
    ) -> f64 {
        if self.charge_efficiency <= 0.0 {
            return 0.0;
        }

        let rate_limit = self.discharge_rate * self.charge_ratio * self.curve_factor() * dt;
        let headroom =
            (self.capacity - self.stored).max(0.0) * ENERGY_UNIT_RATIO / self.charge_efficiency;
        let planned = requested.min(rate_limit).min(headroom);
        if planned <= 0.0 {
            return 0.0;
        }

        let granted = sink.request_delta(pool, planned).clamp(0.0, planned);
        let gain = granted * self.charge_efficiency / ENERGY_UNIT_RATIO;
        self.stored = (self.stored + gain).min(self.capacity);
        self.emit_heat(granted, dt);
        granted
    }

    fn discharge(
        &mut self,
        wanted: f64,
        dt: f64,
        pool: PoolId,
        sink: &mut dyn EnergyTransfer,
    ) -> f64 {
        let rate_limit = self.discharge_rate * self.curve_factor() * dt;
        let available = self.stored * ENERGY_UNIT_RATIO;
        let planned = wanted.min(rate_limit).min(available);
        if planned <= 0.0 {
            return 0.0;
        }

        let granted = (-sink.request_delta(pool, -planned)).clamp(0.0, planned);
        self.stored = (self.stored - granted / ENERGY_UNIT_RATIO).max(0.0);
        self.emit_heat(granted, dt);
        -granted
    }

    /// Combined SOC and temperature rate multiplier.
    fn curve_factor(&self) -> f64 {
        let temperature = self.thermal.as_ref().map_or(1.0, |sink| {
            self.temperature_curve.evaluate(sink.current_temperature())
        });
        (self.soc_curve.evaluate(self.soc) * temperature).clamp(0.0, 1.0)
    }

    fn emit_heat(&mut self, bus_energy: f64, dt: f64) {
        let Some(sink) = self.thermal.as_mut() else {
            return;
        };
        let power = bus_energy / dt;
        let heat = self.thermal_losses * power * power / self.discharge_rate * dt;
        if heat > 0.0 {
            sink.add_energy(heat);
        }
    }

    fn refresh_soc(&mut self) {
        self.soc = if self.capacity > 0.0 {
            (self.stored / self.capacity).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Whether the unit has no usable capacity or rate.
    pub fn is_degenerate(&self) -> bool {
        self.capacity <= 0.0 || self.discharge_rate <= 0.0
    }

    /// Unit identifier.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Human-readable unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserve capacity (reserve units).
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Reserve energy currently held (reserve units).
    pub fn stored_energy(&self) -> f64 {
        self.stored
    }

    /// State of charge, `stored / capacity` (0 when capacity is 0).
    pub fn soc(&self) -> f64 {
        self.soc
    }

    /// Maximum bus energy per second.
    pub fn discharge_rate(&self) -> f64 {
        self.discharge_rate
    }

    /// Fraction of the discharge rate usable while charging.
    pub fn charge_ratio(&self) -> f64 {
        self.charge_ratio
    }

    /// Charging efficiency.
    pub fn charge_efficiency(&self) -> f64 {
        self.charge_efficiency
    }

    /// Ordering priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Changes the ordering priority; takes effect on the next tick.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Smoothed signed transfer power (bus units per second).
    pub fn filtered_power(&self) -> f64 {
        self.filter.value()
    }

    /// Status after the most recent transfer.
    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// Signed bus delta of the most recent transfer.
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }

    /// Bus capacity this unit contributes to its network.
    pub fn bus_buffer(&self) -> f64 {
        self.bus_buffer
    }

    /// Core temperature, if the unit is thermally coupled.
    pub fn temperature(&self) -> Option<f64> {
        self.thermal.as_ref().map(|sink| sink.current_temperature())
    }

    /// Goal temperature, if the unit is thermally coupled.
    pub fn temperature_goal(&self) -> Option<f64> {
        self.thermal.as_ref().map(|sink| sink.temperature_goal())
    }

    /// Captures the unit's externally visible state.
    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            soc: self.soc,
            stored_energy: self.stored,
            last_delta: self.last_delta,
            filtered_power: self.filter.value(),
            status: self.status,
            temperature: self.temperature(),
        }
    }
}

/// Point-in-time view of a battery unit for telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSnapshot {
    pub id: UnitId,
    pub name: String,
    pub priority: i32,
    pub soc: f64,
    pub stored_energy: f64,
    pub last_delta: f64,
    pub filtered_power: f64,
    pub status: UnitStatus,
    pub temperature: Option<f64>,
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

//! Battery storage components: curves, filters, thermal coupling, and the unit itself.

/// Piecewise efficiency curves.
pub mod curve;
/// Low-pass status filter.
pub mod filter;
pub mod thermal;
/// Battery unit and its per-tick transfer.
pub mod unit;

// Re-export the main types for convenience
pub use curve::{EfficiencyCurve, Interpolation};
pub use filter::StatusFilter;
pub use thermal::{ThermalMass, ThermalSink};
pub use unit::{BatteryUnit, ENERGY_UNIT_RATIO, UnitId, UnitParams, UnitSnapshot, UnitStatus};

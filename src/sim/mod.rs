/// Shared bus capability contract and the simulated host pool.
pub mod bus;
/// Simulation clock for fixed ticks with time warp.
pub mod clock;
pub mod coordinator;
pub mod engine;
pub mod kpi;
/// Host production/consumption profile for stand-alone runs.
pub mod profile;
pub mod types;

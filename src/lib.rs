//! Battery units on a shared power bus, balanced once per tick by a
//! priority-ordered load coordinator.

/// REST API over a completed run.
#[cfg(feature = "api")]
pub mod api;
pub mod chemistry;
pub mod config;
pub mod error;
pub mod io;
/// Bus contract, coordinator, and the stand-alone simulation host.
pub mod sim;
pub mod storage;

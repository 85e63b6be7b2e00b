//! API response and query types.
//!
//! Telemetry field names match the CSV export columns.

use serde::{Deserialize, Serialize};

use crate::sim::coordinator::{Deadband, TickMode};
use crate::sim::kpi::KpiReport;
use crate::sim::types::{SimConfig, StepResult};

/// Combined state response: run config, KPIs and latest telemetry record.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    /// Run timing.
    pub config: SimConfig,
    /// Configured coordinator deadband.
    pub deadband: Deadband,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Most recent telemetry record, absent for an empty run.
    pub latest_step: Option<TelemetryRecord>,
}

/// One tick of bus telemetry, without per-unit detail.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord {
    pub tick: usize,
    pub time_s: f64,
    pub host_net: f64,
    pub bus_before: f64,
    pub bus_after: f64,
    pub bus_max: f64,
    pub bus_fraction: f64,
    pub mode: TickMode,
    pub requested: f64,
    pub delivered: f64,
    pub low_threshold: f64,
    pub high_threshold: f64,
    pub mean_soc: f64,
}

impl From<&StepResult> for TelemetryRecord {
    fn from(r: &StepResult) -> Self {
        Self {
            tick: r.tick,
            time_s: r.time_s,
            host_net: r.host_net,
            bus_before: r.bus_before,
            bus_after: r.bus_after,
            bus_max: r.bus_max,
            bus_fraction: r.bus_fraction(),
            mode: r.mode,
            requested: r.requested,
            delivered: r.delivered,
            low_threshold: r.low_threshold,
            high_threshold: r.high_threshold,
            mean_soc: r.mean_soc,
        }
    }
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// First tick (inclusive).
    pub from: Option<usize>,
    /// Last tick (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

//! REST API over a completed simulation run.
//!
//! Provides three GET endpoints:
//! - `/state`: run config, deadband, KPI report and latest tick
//! - `/telemetry`: per-tick bus records with optional range filtering
//! - `/units`: per-unit state after the latest tick

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::sim::coordinator::Deadband;
use crate::sim::kpi::KpiReport;
use crate::sim::types::{SimConfig, StepResult};

pub use types::{ErrorResponse, StateResponse, TelemetryQuery, TelemetryRecord};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the run completes and wrapped in `Arc`; all data
/// is read-only so no locks are needed.
#[derive(Debug)]
pub struct AppState {
    /// Run timing used for this run.
    pub config: SimConfig,
    /// Configured coordinator deadband.
    pub deadband: Deadband,
    /// Aggregate KPI report.
    pub kpi: KpiReport,
    /// Per-tick results.
    pub results: Vec<StepResult>,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/units", get(handlers::get_units))
        .with_state(state)
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}

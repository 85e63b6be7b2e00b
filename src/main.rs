//! Battery bus simulator entry point: CLI wiring and config-driven engine construction.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use battery_bus_sim::config::ScenarioConfig;
use battery_bus_sim::io::export::{export_csv, export_unit_csv};
use battery_bus_sim::sim::kpi::KpiReport;

#[derive(Parser)]
#[command(
    name = "battery-bus-sim",
    about = "Battery units on a shared power bus, balanced per tick"
)]
struct Cli {
    /// Load scenario from a TOML file. Mutually exclusive with --preset.
    #[arg(long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,
    /// Use a built-in preset (baseline, time_warp, reserve_priority).
    #[arg(long)]
    preset: Option<String>,
    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Override the number of ticks.
    #[arg(long)]
    ticks: Option<usize>,
    /// Override the time-warp multiplier.
    #[arg(long)]
    warp: Option<f64>,
    /// Print every Nth tick (0 prints none).
    #[arg(long, default_value_t = 0)]
    print_every: usize,
    /// Export per-tick bus telemetry to CSV.
    #[arg(long)]
    telemetry_out: Option<PathBuf>,
    /// Export per-unit telemetry to CSV.
    #[arg(long)]
    units_out: Option<PathBuf>,
    /// Start the REST API server after the run.
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,
    /// API server port.
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn load_scenario(cli: &Cli) -> Result<ScenarioConfig> {
    // --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(path) = &cli.scenario {
        ScenarioConfig::from_toml_file(path)?
    } else if let Some(name) = &cli.preset {
        ScenarioConfig::from_preset(name)?
    } else {
        ScenarioConfig::baseline()
    };

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        scenario.simulation.ticks = ticks;
    }
    if let Some(warp) = cli.warp {
        scenario.simulation.warp = warp;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            tracing::error!("{e}");
        }
        bail!("scenario has {} configuration error(s)", errors.len());
    }
    Ok(scenario)
}

fn run(cli: Cli) -> Result<()> {
    let scenario = load_scenario(&cli)?;
    let table = scenario.chemistry_table();
    let deadband = scenario.deadband(&table)?;
    let mut engine = scenario.build_engine().context("building simulation engine")?;

    let results = engine.run();
    let kpi = KpiReport::from_results(&results, deadband);

    if cli.print_every > 0 {
        for r in results.iter().step_by(cli.print_every) {
            println!("{r}");
        }
        println!();
    }
    println!("{kpi}");

    if let Some(path) = &cli.telemetry_out {
        export_csv(&results, path)
            .with_context(|| format!("writing telemetry to {}", path.display()))?;
        tracing::info!(path = %path.display(), "telemetry written");
    }
    if let Some(path) = &cli.units_out {
        export_unit_csv(&results, path)
            .with_context(|| format!("writing unit telemetry to {}", path.display()))?;
        tracing::info!(path = %path.display(), "unit telemetry written");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(battery_bus_sim::api::AppState {
            config: engine.config().clone(),
            deadband,
            kpi,
            results,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
        rt.block_on(battery_bus_sim::api::serve(state, addr))
            .with_context(|| format!("serving API on {addr}"))?;
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

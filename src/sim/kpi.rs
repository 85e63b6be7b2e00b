//! Post-hoc KPI computation from simulation results.

use std::fmt;

use serde::Serialize;

use crate::storage::ENERGY_UNIT_RATIO;

use super::coordinator::{Deadband, TickMode};
use super::types::StepResult;

/// Aggregate indicators derived from a complete run.
///
/// Computed post-hoc from `Vec<StepResult>` so step data and reported
/// metrics cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Number of ticks in the run.
    pub ticks: usize,
    /// Ticks the coordinator skipped.
    pub skipped_ticks: usize,
    /// Bus energy drawn into reserves (bus units).
    pub bus_charged: f64,
    /// Bus energy supplied from reserves (bus units).
    pub bus_discharged: f64,
    /// Reserve energy spent on discharging (reserve units).
    pub reserve_delivered: f64,
    /// Deficit the units could not cover, summed over discharge ticks.
    pub unmet_deficit: f64,
    /// Ticks ending with the bus below the configured low threshold.
    pub ticks_below_low: usize,
    /// Ticks ending with the bus above the configured high threshold.
    pub ticks_above_high: usize,
    /// Lowest bus fill fraction seen after balancing.
    pub min_bus_fraction: f64,
    /// Highest bus fill fraction seen after balancing.
    pub max_bus_fraction: f64,
    /// Mean state of charge at the end of the run.
    pub final_mean_soc: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record.
    ///
    /// Threshold counts use the configured `deadband`, not the adaptive one.
    pub fn from_results(results: &[StepResult], deadband: Deadband) -> Self {
        let Some(last) = results.last() else {
            return Self::default();
        };

        let mut report = Self {
            ticks: results.len(),
            min_bus_fraction: f64::INFINITY,
            max_bus_fraction: f64::NEG_INFINITY,
            final_mean_soc: last.mean_soc,
            ..Self::default()
        };

        for r in results {
            if r.mode == TickMode::Skipped {
                report.skipped_ticks += 1;
            }
            if r.delivered > 0.0 {
                report.bus_charged += r.delivered;
            } else {
                report.bus_discharged -= r.delivered;
            }
            if r.mode == TickMode::Discharge {
                report.unmet_deficit += (r.requested + r.delivered).max(0.0);
            }

            let fraction = r.bus_fraction();
            if fraction < deadband.low {
                report.ticks_below_low += 1;
            }
            if fraction > deadband.high {
                report.ticks_above_high += 1;
            }
            report.min_bus_fraction = report.min_bus_fraction.min(fraction);
            report.max_bus_fraction = report.max_bus_fraction.max(fraction);
        }

        report.reserve_delivered = report.bus_discharged / ENERGY_UNIT_RATIO;
        report
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Ticks:                 {} ({} skipped)", self.ticks, self.skipped_ticks)?;
        writeln!(f, "Bus charged:           {:.2} kJ", self.bus_charged)?;
        writeln!(
            f,
            "Bus discharged:        {:.2} kJ ({:.4} kWh from reserves)",
            self.bus_discharged, self.reserve_delivered
        )?;
        writeln!(f, "Unmet deficit:         {:.2} kJ", self.unmet_deficit)?;
        writeln!(
            f,
            "Outside deadband:      {} below, {} above",
            self.ticks_below_low, self.ticks_above_high
        )?;
        writeln!(
            f,
            "Bus fill range:        {:.1}% .. {:.1}%",
            self.min_bus_fraction * 100.0,
            self.max_bus_fraction * 100.0
        )?;
        write!(f, "Final mean SoC:        {:.1}%", self.final_mean_soc * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(mode: TickMode, requested: f64, delivered: f64, bus_after: f64) -> StepResult {
        StepResult {
            tick: 0,
            time_s: 0.0,
            host_net: 0.0,
            bus_before: bus_after,
            bus_after,
            bus_max: 100.0,
            mode,
            requested,
            delivered,
            low_threshold: 0.1,
            high_threshold: 0.9,
            mean_soc: 0.5,
            units: Vec::new(),
        }
    }

    fn band() -> Deadband {
        Deadband::new(0.1, 0.9)
    }

    #[test]
    fn energy_totals() {
        let results = vec![
            make_result(TickMode::Discharge, 10.0, -7.2, 50.0),
            make_result(TickMode::Charge, 4.0, 4.0, 50.0),
            make_result(TickMode::Discharge, 2.0, -2.0, 50.0),
        ];
        let kpi = KpiReport::from_results(&results, band());
        assert!((kpi.bus_discharged - 9.2).abs() < 1e-9);
        assert!((kpi.bus_charged - 4.0).abs() < 1e-9);
        assert!((kpi.unmet_deficit - 2.8).abs() < 1e-9);
        assert!((kpi.reserve_delivered - 9.2 / ENERGY_UNIT_RATIO).abs() < 1e-12);
    }

    #[test]
    fn threshold_counting_and_range() {
        let results = vec![
            make_result(TickMode::Idle, 0.0, 0.0, 5.0),
            make_result(TickMode::Idle, 0.0, 0.0, 50.0),
            make_result(TickMode::Idle, 0.0, 0.0, 95.0),
            make_result(TickMode::Skipped, 0.0, 0.0, 96.0),
        ];
        let kpi = KpiReport::from_results(&results, band());
        assert_eq!(kpi.ticks, 4);
        assert_eq!(kpi.skipped_ticks, 1);
        assert_eq!(kpi.ticks_below_low, 1);
        assert_eq!(kpi.ticks_above_high, 2);
        assert!((kpi.min_bus_fraction - 0.05).abs() < 1e-12);
        assert!((kpi.max_bus_fraction - 0.96).abs() < 1e-12);
    }

    #[test]
    fn empty_results() {
        let kpi = KpiReport::from_results(&[], band());
        assert_eq!(kpi, KpiReport::default());
    }

    #[test]
    fn display_does_not_panic() {
        let results = vec![make_result(TickMode::Idle, 0.0, 0.0, 50.0)];
        let s = KpiReport::from_results(&results, band()).to_string();
        assert!(s.contains("KPI Report"));
    }
}

//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for per-tick bus telemetry.
const HEADER: &str = "tick,time_s,host_net,bus_before,bus_after,bus_max,bus_fraction,\
                      mode,requested,delivered,low_threshold,high_threshold,mean_soc";

/// Column header for per-unit telemetry, one row per unit per tick.
const UNIT_HEADER: &str = "tick,unit_id,name,priority,soc,stored_energy,last_delta,\
                           filtered_power,status,temperature";

/// Exports per-tick bus telemetry to a CSV file at the given path.
///
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_csv(results, io::BufWriter::new(file))
}

/// Writes per-tick bus telemetry as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in results {
        wtr.write_record(&[
            r.tick.to_string(),
            format!("{:.3}", r.time_s),
            format!("{:.4}", r.host_net),
            format!("{:.4}", r.bus_before),
            format!("{:.4}", r.bus_after),
            format!("{:.4}", r.bus_max),
            format!("{:.4}", r.bus_fraction()),
            r.mode.as_str().to_string(),
            format!("{:.4}", r.requested),
            format!("{:.4}", r.delivered),
            format!("{:.4}", r.low_threshold),
            format!("{:.4}", r.high_threshold),
            format!("{:.4}", r.mean_soc),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports per-unit telemetry to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_unit_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_unit_csv(results, io::BufWriter::new(file))
}

/// Writes per-unit telemetry as CSV to any writer.
///
/// Units without thermal coupling leave `temperature` empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_unit_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(UNIT_HEADER.split(',').map(str::trim))?;

    for r in results {
        for u in &r.units {
            wtr.write_record(&[
                r.tick.to_string(),
                u.id.0.to_string(),
                u.name.clone(),
                u.priority.to_string(),
                format!("{:.6}", u.soc),
                format!("{:.6}", u.stored_energy),
                format!("{:.4}", u.last_delta),
                format!("{:.4}", u.filtered_power),
                u.status.as_str().to_string(),
                u.temperature.map(|t| format!("{t:.2}")).unwrap_or_default(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::coordinator::TickMode;
    use crate::storage::{UnitId, UnitSnapshot, UnitStatus};

    fn make_step(t: usize) -> StepResult {
        StepResult {
            tick: t,
            time_s: t as f64 * 0.02,
            host_net: -1.5,
            bus_before: 4.0,
            bus_after: 10.0,
            bus_max: 100.0,
            mode: TickMode::Discharge,
            requested: 6.0,
            delivered: -6.0,
            low_threshold: 0.1,
            high_threshold: 0.9,
            mean_soc: 0.48,
            units: vec![
                UnitSnapshot {
                    id: UnitId(1),
                    name: "main".to_string(),
                    priority: 0,
                    soc: 0.48,
                    stored_energy: 9.6,
                    last_delta: -6.0,
                    filtered_power: -200.0,
                    status: UnitStatus::Discharging,
                    temperature: Some(320.5),
                },
                UnitSnapshot {
                    id: UnitId(2),
                    name: "aux".to_string(),
                    priority: 1,
                    soc: 0.5,
                    stored_energy: 9.0,
                    last_delta: 0.0,
                    filtered_power: 0.0,
                    status: UnitStatus::Idle,
                    temperature: None,
                },
            ],
        }
    }

    fn lines(buf: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(buf).lines().map(str::to_string).collect()
    }

    #[test]
    fn header_matches_schema() {
        let mut buf = Vec::new();
        write_csv(&[make_step(0)], &mut buf).ok();
        assert_eq!(
            lines(&buf)[0],
            "tick,time_s,host_net,bus_before,bus_after,bus_max,bus_fraction,\
             mode,requested,delivered,low_threshold,high_threshold,mean_soc"
        );
    }

    #[test]
    fn row_count_matches_step_count() {
        let results: Vec<StepResult> = (0..24).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &mut buf).ok();
        // 1 header + 24 data rows
        assert_eq!(lines(&buf).len(), 25);
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(make_step).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&results, &mut buf1).ok();
        write_csv(&results, &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn rows_are_parseable() {
        let results: Vec<StepResult> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &mut buf).ok();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().ok();
        assert_eq!(headers.as_ref().map(csv::StringRecord::len), Some(13));

        let mut row_count = 0;
        for record in rdr.records() {
            let rec = record.expect("every row should parse");
            for i in (1..13).filter(|&i| i != 7) {
                assert!(rec[i].parse::<f64>().is_ok(), "column {i} should parse as f64");
            }
            assert_eq!(&rec[7], "discharge");
            row_count += 1;
        }
        assert_eq!(row_count, 3);
    }

    #[test]
    fn unit_rows_one_per_unit_per_tick() {
        let results: Vec<StepResult> = (0..4).map(make_step).collect();
        let mut buf = Vec::new();
        write_unit_csv(&results, &mut buf).ok();
        let out = lines(&buf);
        assert_eq!(out.len(), 1 + 4 * 2);
        assert_eq!(out[1], "0,1,main,0,0.480000,9.600000,-6.0000,-200.0000,discharging,320.50");
        assert!(out[2].ends_with(",idle,"));
    }
}

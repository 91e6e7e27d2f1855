// SORTSWEEP ARTIFACTS
// WRITES WHAT THE REPORT ASSEMBLER PRODUCES, AND READS MEASUREMENTS BACK.
//
//   results.csv        array_size + ONE COLUMN PER VARIANT x DEGREE
//   measurements.csv   LONG FORM, ONE ROW PER COORDINATE (RELOADABLE)
//   metrics.csv        SPEEDUP / EFFICIENCY / OVERHEAD PER COORDINATE
//   summary.md         CONFIG, BEST PERFORMERS, BEST DEGREES, OVERHEAD

use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;
use crate::metrics::MetricDeriver;
use crate::report::{self, FlatTable, EMPTY_CELL};
use crate::stats::Measurement;
use crate::table::{CoordKey, CoordinateStatus, Entry, ParameterPoint, ResultsTable};
use crate::trial::TrialTally;

pub const RESULTS_CSV: &str = "results.csv";
pub const MEASUREMENTS_CSV: &str = "measurements.csv";
pub const METRICS_CSV: &str = "metrics.csv";
pub const SUMMARY_MD: &str = "summary.md";

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub variant: String,
    pub family: String,
    pub array_size: u64,
    pub degree: u32,
    pub status: CoordinateStatus,
    pub mean_ms: Option<f64>,
    pub stddev_ms: Option<f64>,
    pub n_succeeded: u32,
    pub n_attempted: u32,
    pub timed_out: u32,
    pub exit_failures: u32,
    pub parse_failures: u32,
    pub launch_failures: u32,
}

impl MeasurementRecord {
    fn from_entry(key: &CoordKey, family: &str, entry: &Entry) -> Self {
        Self {
            variant: key.variant.clone(),
            family: family.to_string(),
            array_size: key.array_size,
            degree: key.degree,
            status: entry.status,
            mean_ms: entry.measurement.map(|m| m.mean),
            stddev_ms: entry.measurement.map(|m| m.stddev),
            n_succeeded: entry.tally.succeeded,
            n_attempted: entry.tally.attempted,
            timed_out: entry.tally.timed_out,
            exit_failures: entry.tally.exit_failures,
            parse_failures: entry.tally.parse_failures,
            launch_failures: entry.tally.launch_failures,
        }
    }

    fn into_entry(self) -> Result<(CoordKey, Entry)> {
        let measurement = match (self.status, self.mean_ms) {
            (CoordinateStatus::Succeeded, Some(mean)) => Some(Measurement {
                mean,
                stddev: self.stddev_ms.unwrap_or(0.0),
                n_succeeded: self.n_succeeded,
                n_attempted: self.n_attempted,
            }),
            (CoordinateStatus::Succeeded, None) => bail!(
                "{} at n={} p={} is marked succeeded but has no mean",
                self.variant, self.array_size, self.degree
            ),
            _ => None,
        };
        if self.array_size == 0 || self.degree == 0 {
            bail!("{} has a non-positive coordinate", self.variant);
        }
        if self.n_succeeded > self.n_attempted {
            bail!(
                "{} at n={} p={} claims {} successes out of {} attempts",
                self.variant, self.array_size, self.degree, self.n_succeeded, self.n_attempted
            );
        }
        let key = CoordKey::new(self.variant, ParameterPoint::new(self.array_size, self.degree));
        let entry = Entry {
            status: self.status,
            measurement,
            tally: TrialTally {
                attempted: self.n_attempted,
                succeeded: self.n_succeeded,
                timed_out: self.timed_out,
                exit_failures: self.exit_failures,
                parse_failures: self.parse_failures,
                launch_failures: self.launch_failures,
            },
        };
        Ok((key, entry))
    }
}

fn create(path: &Path) -> Result<Writer<File>> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Writer::from_writer(file))
}

pub fn write_results_csv(path: &Path, config: &SweepConfig, table: &ResultsTable) -> Result<()> {
    let flat = FlatTable::build(config, table);
    let mut wtr = create(path)?;
    wtr.write_record(flat.header())?;
    for rec in flat.records() {
        wtr.write_record(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_measurements_csv(path: &Path, config: &SweepConfig, table: &ResultsTable) -> Result<()> {
    let mut wtr = create(path)?;
    // DECLARED ORDER, NOT KEY ORDER, SO THE FILE READS LIKE THE SWEEP RAN
    for size in config.sorted_sizes() {
        for v in &config.variants {
            for degree in v.sorted_degrees() {
                let Some(entry) = table.get(&v.name, size, degree) else {
                    continue;
                };
                let key = CoordKey::new(&v.name, ParameterPoint::new(size, degree));
                wtr.serialize(MeasurementRecord::from_entry(&key, &v.family, entry))?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_measurements_csv(path: &Path) -> Result<ResultsTable> {
    let mut rdr = Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut entries = Vec::new();
    for (i, rec) in rdr.deserialize::<MeasurementRecord>().enumerate() {
        let rec = rec.with_context(|| format!("{}: bad record {}", path.display(), i + 1))?;
        entries.push(rec.into_entry()?);
    }
    Ok(ResultsTable::from_entries(entries))
}

fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => EMPTY_CELL.to_string(),
    }
}

pub fn write_metrics_csv(path: &Path, config: &SweepConfig, table: &ResultsTable) -> Result<()> {
    let deriver = MetricDeriver::new(config, table);
    let mut wtr = create(path)?;
    wtr.write_record(["array_size", "variant", "degree", "speedup", "efficiency_pct", "overhead_pct"])?;
    for row in deriver.rows() {
        let c = row.comparison;
        wtr.write_record([
            row.array_size.to_string(),
            row.variant.clone(),
            row.degree.to_string(),
            opt(c.map(|c| c.speedup), 3),
            opt(c.map(|c| c.efficiency_pct), 1),
            opt(c.and_then(|c| c.overhead_pct), 1),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// MARKDOWN
// ---------------------------------------------------------------------------

pub fn render_summary(config: &SweepConfig, table: &ResultsTable) -> String {
    let deriver = MetricDeriver::new(config, table);
    let mut md = String::new();
    let _ = writeln!(md, "# Parallel Sort Performance Summary\n");

    let _ = writeln!(md, "## Configuration\n");
    let sizes: Vec<String> = config.sorted_sizes().iter().map(|s| s.to_string()).collect();
    let _ = writeln!(md, "- Array sizes: {}", sizes.join(", "));
    let _ = writeln!(md, "- Repetitions per coordinate: {}", config.repetitions);
    let _ = writeln!(md, "- Timeout per trial: {}s", config.timeout_secs);
    for v in &config.variants {
        let degrees: Vec<String> = v.sorted_degrees().iter().map(|d| d.to_string()).collect();
        let _ = writeln!(
            md,
            "- `{}` (family `{}`{}): degrees {}",
            v.name,
            v.family,
            if v.baseline { ", baseline" } else { "" },
            degrees.join(", ")
        );
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Best Performer per Array Size\n");
    let _ = writeln!(md, "| Array Size | Variant | Degree | Time (ms) | Speedup |");
    let _ = writeln!(md, "|------------|---------|--------|-----------|---------|");
    for b in report::best_performers(config, table) {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {:.2} | {} |",
            b.array_size,
            b.variant,
            b.degree,
            b.mean_ms,
            b.speedup.map(|s| format!("{:.2}x", s)).unwrap_or_else(|| "n/a".to_string())
        );
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Best Degree per Variant\n");
    let _ = writeln!(md, "| Variant | Array Size | Best Degree | Time (ms) | Speedup | Efficiency |");
    let _ = writeln!(md, "|---------|------------|-------------|-----------|---------|------------|");
    for b in report::best_degrees(config, table) {
        let eff = config
            .variant(&b.variant)
            .and_then(|v| deriver.compare(v, b.array_size, b.degree))
            .map(|c| format!("{:.1}%", c.efficiency_pct))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(
            md,
            "| {} | {} | {} | {:.2} | {} | {} |",
            b.variant,
            b.array_size,
            b.degree,
            b.mean_ms,
            b.speedup.map(|s| format!("{:.2}x", s)).unwrap_or_else(|| "n/a".to_string()),
            eff
        );
    }
    let _ = writeln!(md);

    let mp: Vec<_> = config.variants.iter().filter(|v| v.is_message_passing()).collect();
    if !mp.is_empty() {
        let _ = writeln!(md, "## Communication Overhead\n");
        let _ = writeln!(md, "| Variant | Array Size | Degree | Ideal (ms) | Actual (ms) | Overhead |");
        let _ = writeln!(md, "|---------|------------|--------|------------|-------------|----------|");
        for v in mp {
            for size in config.sorted_sizes() {
                if let Some(o) = deriver.overhead(v, size) {
                    let _ = writeln!(
                        md,
                        "| {} | {} | {} | {:.2} | {:.2} | {:.1}% |",
                        v.name, size, o.degree, o.ideal_ms, o.actual_ms, o.overhead_pct
                    );
                }
            }
        }
        let _ = writeln!(md);
    }

    let (ok, failed, unavailable) = table.status_counts();
    let _ = writeln!(md, "## Notes\n");
    let _ = writeln!(md, "- Coordinates: {} succeeded, {} failed, {} unavailable", ok, failed, unavailable);
    let _ = writeln!(md, "- Speedup is relative to each family's baseline variant at its lowest degree");
    let _ = writeln!(md, "- Efficiency = speedup / degree x 100%");
    let _ = writeln!(md, "- Overhead = share of the highest measured degree's time not explained by ideal linear scaling");
    md
}

// ---------------------------------------------------------------------------
// CONSOLE
// ---------------------------------------------------------------------------

pub fn render_console(config: &SweepConfig, table: &ResultsTable) -> Vec<String> {
    let deriver = MetricDeriver::new(config, table);
    let sep = "=".repeat(72);
    let mut lines = vec![
        sep.clone(),
        "SORTSWEEP RESULTS".to_string(),
        sep.clone(),
        format!(
            "{:>10} {:<12} {:>6} {:>12} {:>10} {:>9} {:>9} {:>9}",
            "SIZE", "VARIANT", "DEGREE", "MEAN", "STDDEV", "SPEEDUP", "EFFIC", "OVERHEAD"
        ),
        format!(
            "{} {} {} {} {} {} {} {}",
            "-".repeat(10), "-".repeat(12), "-".repeat(6), "-".repeat(12),
            "-".repeat(10), "-".repeat(9), "-".repeat(9), "-".repeat(9),
        ),
    ];
    for row in deriver.rows() {
        let entry = table.get(&row.variant, row.array_size, row.degree);
        let (mean, stddev) = match entry.and_then(|e| e.measurement) {
            Some(m) => (format!("{:.2}ms", m.mean), format!("{:.2}", m.stddev)),
            None => {
                let status = entry.map(|e| e.status.label()).unwrap_or("SKIPPED");
                (status.to_string(), "-".to_string())
            }
        };
        let c = row.comparison;
        lines.push(format!(
            "{:>10} {:<12} {:>6} {:>12} {:>10} {:>9} {:>9} {:>9}",
            row.array_size,
            row.variant,
            row.degree,
            mean,
            stddev,
            c.map(|c| format!("{:.2}x", c.speedup)).unwrap_or_else(|| "-".into()),
            c.map(|c| format!("{:.1}%", c.efficiency_pct)).unwrap_or_else(|| "-".into()),
            c.and_then(|c| c.overhead_pct).map(|o| format!("{:.1}%", o)).unwrap_or_else(|| "-".into()),
        ));
    }
    lines.push(sep);
    lines
}

// ---------------------------------------------------------------------------
// ALL ARTIFACTS
// ---------------------------------------------------------------------------

/// Write every artifact into `dir`, creating it if needed. Returns the paths.
pub fn write_all(dir: &Path, config: &SweepConfig, table: &ResultsTable) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let results = dir.join(RESULTS_CSV);
    let measurements = dir.join(MEASUREMENTS_CSV);
    let metrics = dir.join(METRICS_CSV);
    let summary = dir.join(SUMMARY_MD);

    write_results_csv(&results, config, table)?;
    write_measurements_csv(&measurements, config, table)?;
    write_metrics_csv(&metrics, config, table)?;
    fs::write(&summary, render_summary(config, table))
        .with_context(|| format!("failed to write {}", summary.display()))?;
    Ok(vec![results, measurements, metrics, summary])
}

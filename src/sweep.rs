// SORTSWEEP ORCHESTRATOR
// WALKS ARRAY SIZE x VARIANT x DEGREE, ONE COORDINATE AT A TIME, AND OWNS THE
// RESULTS TABLE WHILE DOING IT.
//
// ORDER: SIZES ASCENDING -> VARIANTS IN DECLARED ORDER -> DEGREES ASCENDING.
// NOTHING RUNS CONCURRENTLY. CANCELLATION IS CHECKED BETWEEN COORDINATES;
// THE TRIAL IN FLIGHT FINISHES (BOUNDED BY ITS TIMEOUT) AND IS REAPED FIRST.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::availability::{self, Availability};
use crate::config::SweepConfig;
use crate::runner::Executor;
use crate::table::{CoordKey, CoordinateStatus, Entry, ParameterPoint, ResultsTable};
use crate::trial;

/// What a sweep hands back: the table plus how the run ended.
#[derive(Clone, Debug, Default)]
pub struct SweepOutcome {
    pub table: ResultsTable,
    pub cancelled: bool,
    // VARIANT NAME -> REASON, FOR EVERY VARIANT THAT FAILED ITS CHECK
    pub unavailable: BTreeMap<String, String>,
}

impl SweepOutcome {
    pub fn coordinates_done(&self) -> usize {
        self.table.len()
    }
}

pub struct Sweep<'a> {
    config: &'a SweepConfig,
    cancel: Arc<AtomicBool>,
    quiet: bool,
}

impl<'a> Sweep<'a> {
    pub fn new(config: &'a SweepConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
            quiet: false,
        }
    }

    /// Share an interrupt flag (set from the Ctrl+C handler).
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    // SUPPRESS STDOUT PROGRESS LINES
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn total_coordinates(&self) -> usize {
        let per_size: usize = self.config.variants.iter().map(|v| v.sorted_degrees().len()).sum();
        per_size * self.config.sorted_sizes().len()
    }

    pub fn run<E: Executor + ?Sized>(&self, exec: &mut E) -> SweepOutcome {
        let cfg = self.config;
        let sizes = cfg.sorted_sizes();
        let mut out = SweepOutcome::default();

        if !self.quiet {
            println!(
                "SWEEP: {} SIZES x {} VARIANTS ({} COORDINATES), {} REPS, {}s TIMEOUT",
                sizes.len(),
                cfg.variants.len(),
                self.total_coordinates(),
                cfg.repetitions,
                cfg.timeout_secs
            );
            println!();
        }

        // ONE CHECK PER VARIANT, BEFORE ANY OF ITS COORDINATES RUN
        let mut ready = Vec::with_capacity(cfg.variants.len());
        for variant in &cfg.variants {
            if self.cancel.load(Ordering::Relaxed) {
                out.cancelled = true;
                return out;
            }
            let availability = availability::check(exec, variant, cfg.build_timeout());
            match &availability {
                Availability::Ready => {
                    if !self.quiet {
                        println!("  {:<12} READY", variant.name);
                    }
                }
                Availability::Unavailable { reason } => {
                    tracing::warn!("{} unavailable: {}", variant.name, reason);
                    if !self.quiet {
                        println!("  {:<12} UNAVAILABLE -- {}", variant.name, reason);
                    }
                    out.unavailable.insert(variant.name.clone(), reason.clone());
                }
            }
            ready.push(availability.is_ready());
        }

        'sweep: for &size in &sizes {
            if !self.quiet {
                println!();
                println!("{}", "-".repeat(48));
                println!("ARRAY SIZE {}", size);
                println!("{}", "-".repeat(48));
            }
            for (variant, &is_ready) in cfg.variants.iter().zip(&ready) {
                let labels = cfg.labels_for(variant);
                for degree in variant.sorted_degrees() {
                    if self.cancel.load(Ordering::Relaxed) {
                        out.cancelled = true;
                        break 'sweep;
                    }
                    let point = ParameterPoint::new(size, degree);
                    let key = CoordKey::new(&variant.name, point);

                    if !is_ready {
                        out.table.record(key, Entry::unavailable());
                        continue;
                    }

                    let set = trial::aggregate(
                        exec,
                        variant,
                        point,
                        labels,
                        cfg.repetitions,
                        cfg.timeout(),
                    );
                    let entry = Entry::from_trials(&set);
                    if !self.quiet {
                        print_coordinate(&variant.name, degree, &entry);
                    }
                    out.table.record(key, entry);
                }
            }
        }

        if out.cancelled && !self.quiet {
            println!();
            println!(
                "SWEEP INTERRUPTED -- {} OF {} COORDINATES COMPLETED",
                out.coordinates_done(),
                self.total_coordinates()
            );
        }
        out
    }
}

fn print_coordinate(name: &str, degree: u32, entry: &Entry) {
    let t = &entry.tally;
    match (&entry.status, &entry.measurement) {
        (CoordinateStatus::Succeeded, Some(m)) => println!(
            "  {:<12} p={:<4} AVG: {:>10.2}ms (+/-{:.2})  {}/{} OK, {} FAILED",
            name, degree, m.mean, m.stddev, m.n_succeeded, m.n_attempted, m.n_failed()
        ),
        _ => println!(
            "  {:<12} p={:<4} FAILED  {} OF {}  (TIMEOUT {}, EXIT {}, PARSE {}, LAUNCH {})",
            name,
            degree,
            t.failed(),
            t.attempted,
            t.timed_out,
            t.exit_failures,
            t.parse_failures,
            t.launch_failures
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Invocation, Outcome};
    use crate::variant::{Parallelism, Variant};
    use std::time::Duration;

    // REPLIES WITH A TIME PROPORTIONAL TO SIZE / DEGREE, NEVER SPAWNS
    struct Ideal {
        calls: usize,
    }

    impl Executor for Ideal {
        fn execute(&mut self, inv: &Invocation, _: Duration) -> Outcome {
            self.calls += 1;
            let size: f64 = inv.args.last().unwrap().parse().unwrap();
            let degree: f64 = inv.env.get("P").map(|p| p.parse().unwrap()).unwrap_or(1.0);
            Outcome::Success {
                stdout: format!("Execution Time: {}ms\n", size / degree),
                stderr: String::new(),
                exit_code: 0,
            }
        }
    }

    fn config() -> SweepConfig {
        SweepConfig {
            array_sizes: vec![2048, 1024],
            repetitions: 2,
            timeout_secs: 1,
            labels: vec!["Execution Time".into()],
            variants: vec![
                Variant::new("serial", "/bin/sh").as_baseline(),
                Variant::new("threads", "/bin/sh")
                    .with_parallelism(Parallelism::Env { var: "P".into() })
                    .with_degrees(&[4, 1, 2]),
            ],
        }
    }

    #[test]
    fn fills_every_coordinate() {
        let cfg = config();
        let mut exec = Ideal { calls: 0 };
        let out = Sweep::new(&cfg).quiet().run(&mut exec);
        assert!(!out.cancelled);
        assert_eq!(out.table.len(), 8);
        assert_eq!(exec.calls, 8 * 2);
        assert_eq!(out.table.measurement("threads", 2048, 4).unwrap().mean, 512.0);
        assert_eq!(out.table.array_sizes(), vec![1024, 2048]);
    }

    #[test]
    fn preset_cancel_runs_nothing() {
        let cfg = config();
        let flag = Arc::new(AtomicBool::new(true));
        let mut exec = Ideal { calls: 0 };
        let out = Sweep::new(&cfg).quiet().with_cancel(flag).run(&mut exec);
        assert!(out.cancelled);
        assert!(out.table.is_empty());
        assert_eq!(exec.calls, 0);
    }

    #[test]
    fn total_coordinates_counts_degrees() {
        let cfg = config();
        assert_eq!(Sweep::new(&cfg).total_coordinates(), 8);
    }
}

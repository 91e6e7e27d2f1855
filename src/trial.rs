// SORTSWEEP TRIAL AGGREGATOR
// RUNS ONE COORDINATE N TIMES, KEEPS ONLY CLEAN TIMINGS, REDUCES THEM.
//
// TRIALS ARE STRICTLY SEQUENTIAL: NO TWO CHILDREN EVER SHARE THE MACHINE.
// A FAILED TRIAL IS COUNTED AND SKIPPED, NEVER RETRIED.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract;
use crate::runner::{Executor, Outcome};
use crate::stats::Measurement;
use crate::table::ParameterPoint;
use crate::variant::Variant;

/// Terminal state of a single execution attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum TrialOutcome {
    Succeeded(f64),
    TimedOut,
    ExitFailure { exit_code: i32, stderr_tail: String },
    // EXIT 0 BUT NO LABEL MATCHED, OR THE VALUE WAS NOT A NON-NEGATIVE NUMBER
    ParseFailure,
    LaunchFailure { message: String },
}

impl TrialOutcome {
    pub fn classify<S: AsRef<str>>(outcome: Outcome, labels: &[S]) -> Self {
        match outcome {
            Outcome::Success { stdout, exit_code: 0, .. } => match extract::extract(&stdout, labels) {
                Some(ms) if ms >= 0.0 => TrialOutcome::Succeeded(ms),
                _ => TrialOutcome::ParseFailure,
            },
            Outcome::Success { stderr, exit_code, .. } => TrialOutcome::ExitFailure {
                exit_code,
                stderr_tail: stderr
                    .lines()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("")
                    .to_string(),
            },
            Outcome::TimedOut => TrialOutcome::TimedOut,
            Outcome::LaunchError { message } => TrialOutcome::LaunchFailure { message },
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            TrialOutcome::Succeeded(ms) => Some(*ms),
            _ => None,
        }
    }
}

/// Per-coordinate bookkeeping of how every attempt ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialTally {
    pub attempted: u32,
    pub succeeded: u32,
    pub timed_out: u32,
    pub exit_failures: u32,
    pub parse_failures: u32,
    pub launch_failures: u32,
}

impl TrialTally {
    pub fn record(&mut self, outcome: &TrialOutcome) {
        self.attempted += 1;
        match outcome {
            TrialOutcome::Succeeded(_) => self.succeeded += 1,
            TrialOutcome::TimedOut => self.timed_out += 1,
            TrialOutcome::ExitFailure { .. } => self.exit_failures += 1,
            TrialOutcome::ParseFailure => self.parse_failures += 1,
            TrialOutcome::LaunchFailure { .. } => self.launch_failures += 1,
        }
    }

    pub fn failed(&self) -> u32 {
        self.attempted.saturating_sub(self.succeeded)
    }
}

/// Every sample that survived plus the tally of every attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialSet {
    pub samples: Vec<f64>,
    pub tally: TrialTally,
}

impl TrialSet {
    pub fn push(&mut self, outcome: &TrialOutcome) {
        self.tally.record(outcome);
        if let Some(ms) = outcome.value() {
            self.samples.push(ms);
        }
    }

    /// `None` when no trial succeeded: the coordinate is FAILED.
    pub fn measurement(&self) -> Option<Measurement> {
        Measurement::from_samples(&self.samples, self.tally.attempted)
    }
}

/// Run `variant` at `point` `repetitions` times, one after another.
pub fn aggregate<E: Executor + ?Sized>(
    exec: &mut E,
    variant: &Variant,
    point: ParameterPoint,
    labels: &[String],
    repetitions: u32,
    timeout: Duration,
) -> TrialSet {
    let invocation = variant.invocation(point.array_size, point.degree);
    let mut set = TrialSet::default();

    for rep in 0..repetitions {
        let outcome = TrialOutcome::classify(exec.execute(&invocation, timeout), labels);
        match &outcome {
            TrialOutcome::Succeeded(ms) => {
                tracing::debug!("{} {} rep {}: {:.3}ms", variant.name, point, rep + 1, ms);
            }
            TrialOutcome::TimedOut => {
                tracing::warn!(
                    "{} {} rep {}: timed out after {:?}",
                    variant.name, point, rep + 1, timeout
                );
            }
            TrialOutcome::ExitFailure { exit_code, stderr_tail } => {
                tracing::warn!(
                    "{} {} rep {}: exit code {}, last line of stderr: {}",
                    variant.name, point, rep + 1, exit_code, stderr_tail
                );
            }
            TrialOutcome::ParseFailure => {
                tracing::warn!(
                    "{} {} rep {}: exited cleanly but no timing matched {:?}",
                    variant.name, point, rep + 1, labels
                );
            }
            TrialOutcome::LaunchFailure { message } => {
                tracing::warn!("{} {} rep {}: {}", variant.name, point, rep + 1, message);
            }
        }
        set.push(&outcome);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [&str; 1] = ["Execution Time"];

    fn ok(stdout: &str) -> Outcome {
        Outcome::Success { stdout: stdout.into(), stderr: String::new(), exit_code: 0 }
    }

    #[test]
    fn classify_clean_run() {
        let t = TrialOutcome::classify(ok("Execution Time: 9.5ms\n"), &LABELS);
        assert_eq!(t, TrialOutcome::Succeeded(9.5));
    }

    #[test]
    fn classify_nonzero_exit_ignores_stdout() {
        let out = Outcome::Success {
            stdout: "Execution Time: 9.5ms\n".into(),
            stderr: "warming up\nsegfault in merge\n\n".into(),
            exit_code: 139,
        };
        match TrialOutcome::classify(out, &LABELS) {
            TrialOutcome::ExitFailure { exit_code, stderr_tail } => {
                assert_eq!(exit_code, 139);
                assert_eq!(stderr_tail, "segfault in merge");
            }
            other => panic!("expected ExitFailure, got {:?}", other),
        }
    }

    #[test]
    fn classify_missing_label_is_parse_failure() {
        let t = TrialOutcome::classify(ok("done\n"), &LABELS);
        assert_eq!(t, TrialOutcome::ParseFailure);
    }

    #[test]
    fn classify_timeout_and_launch_error() {
        assert_eq!(TrialOutcome::classify(Outcome::TimedOut, &LABELS), TrialOutcome::TimedOut);
        let t = TrialOutcome::classify(Outcome::LaunchError { message: "nope".into() }, &LABELS);
        assert_eq!(t, TrialOutcome::LaunchFailure { message: "nope".into() });
    }

    #[test]
    fn set_excludes_failures_from_samples() {
        let mut set = TrialSet::default();
        set.push(&TrialOutcome::Succeeded(10.0));
        set.push(&TrialOutcome::TimedOut);
        set.push(&TrialOutcome::Succeeded(20.0));
        set.push(&TrialOutcome::ParseFailure);
        assert_eq!(set.samples, vec![10.0, 20.0]);
        assert_eq!(set.tally.attempted, 4);
        assert_eq!(set.tally.failed(), 2);
        let m = set.measurement().unwrap();
        assert_eq!(m.mean, 15.0);
        assert_eq!(m.n_attempted, 4);
        assert_eq!(m.n_succeeded, 2);
    }

    #[test]
    fn inconsistent_tally_never_underflows() {
        let t = TrialTally { attempted: 1, succeeded: 3, ..TrialTally::default() };
        assert_eq!(t.failed(), 0);
    }

    #[test]
    fn all_failed_has_no_measurement() {
        let mut set = TrialSet::default();
        for _ in 0..3 {
            set.push(&TrialOutcome::TimedOut);
        }
        assert!(set.measurement().is_none());
        assert_eq!(set.tally.timed_out, 3);
    }
}

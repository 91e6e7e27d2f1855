// SORTSWEEP SUMMARY STATISTICS
// REDUCES THE SUCCESSFUL SAMPLES OF ONE COORDINATE TO MEAN + POPULATION STDDEV.

use serde::{Deserialize, Serialize};

/// Reduction of every trial attempted at one coordinate.
///
/// Only exists when at least one trial succeeded; a coordinate with zero
/// successes has no `Measurement` at all rather than a zeroed one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub mean: f64,
    pub stddev: f64,
    pub n_succeeded: u32,
    pub n_attempted: u32,
}

impl Measurement {
    /// `None` when `samples` is empty. Divides by n (population formulation),
    /// so a single sample reports a stddev of 0.
    pub fn from_samples(samples: &[f64], n_attempted: u32) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            stddev: var.sqrt(),
            n_succeeded: samples.len() as u32,
            n_attempted: n_attempted.max(samples.len() as u32),
        })
    }

    pub fn n_failed(&self) -> u32 {
        self.n_attempted.saturating_sub(self.n_succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_clean_samples() {
        let m = Measurement::from_samples(&[10.0, 12.0, 11.0, 9.0, 13.0], 5).unwrap();
        assert_eq!(m.mean, 11.0);
        assert!((m.stddev - 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(m.n_succeeded, 5);
        assert_eq!(m.n_attempted, 5);
        assert_eq!(m.n_failed(), 0);
    }

    #[test]
    fn n_failed_saturates() {
        let m = Measurement { mean: 1.0, stddev: 0.0, n_succeeded: 4, n_attempted: 2 };
        assert_eq!(m.n_failed(), 0);
    }

    #[test]
    fn single_sample_has_zero_stddev() {
        let m = Measurement::from_samples(&[42.5], 5).unwrap();
        assert_eq!(m.mean, 42.5);
        assert_eq!(m.stddev, 0.0);
        assert_eq!(m.n_failed(), 4);
    }

    #[test]
    fn empty_is_absent() {
        assert!(Measurement::from_samples(&[], 5).is_none());
    }

    #[test]
    fn attempted_never_below_succeeded() {
        let m = Measurement::from_samples(&[1.0, 2.0], 0).unwrap();
        assert_eq!(m.n_attempted, 2);
    }
}

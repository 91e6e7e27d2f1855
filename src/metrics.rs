// SORTSWEEP METRIC DERIVER
// SPEEDUP, PARALLEL EFFICIENCY AND COMMUNICATION OVERHEAD, ANCHORED TO A
// FAMILY BASELINE AT THE SAME ARRAY SIZE.
//
// BASELINE = THE FAMILY'S baseline VARIANT AT ITS LOWEST CONFIGURED DEGREE.
// IF THAT MEASUREMENT IS ABSENT, EVERY COMPARISON IN THE FAMILY AT THAT SIZE
// IS UNDEFINED. NO REBASING ONTO WHATEVER DEGREE HAPPENED TO SUCCEED.
// NOTHING IS CACHED: EVERY CALL READS THE TABLE AFRESH.

use crate::config::SweepConfig;
use crate::stats::Measurement;
use crate::table::ResultsTable;
use crate::variant::Variant;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparison {
    pub speedup: f64,
    pub efficiency_pct: f64,
    // ONLY ON THE HIGHEST MEASURED DEGREE OF A MESSAGE-PASSING VARIANT
    pub overhead_pct: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverheadEstimate {
    pub degree: u32,
    pub ideal_ms: f64,
    pub actual_ms: f64,
    pub overhead_pct: f64,
}

/// One line of the derived-metrics artifact.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricRow {
    pub array_size: u64,
    pub variant: String,
    pub degree: u32,
    pub comparison: Option<Comparison>,
}

// --- PURE FORMULAS ---

/// `baseline / variant`, or `None` when either side is not strictly positive
/// (an absent or zero time must never turn into 0 or infinity).
pub fn speedup(baseline_ms: f64, variant_ms: f64) -> Option<f64> {
    if baseline_ms > 0.0 && variant_ms > 0.0 && baseline_ms.is_finite() && variant_ms.is_finite() {
        Some(baseline_ms / variant_ms)
    } else {
        None
    }
}

pub fn efficiency_pct(speedup: f64, degree: u32) -> f64 {
    speedup / degree as f64 * 100.0
}

/// Share of `actual_ms` not explained by ideal linear scaling of the
/// baseline across `degree` workers, clamped at zero.
pub fn overhead_pct(baseline_ms: f64, degree: u32, actual_ms: f64) -> Option<f64> {
    if !(baseline_ms > 0.0 && actual_ms > 0.0) || degree == 0 {
        return None;
    }
    let ideal = baseline_ms / degree as f64;
    Some(((actual_ms - ideal) / actual_ms * 100.0).max(0.0))
}

// --- TABLE-BACKED DERIVATION ---

pub struct MetricDeriver<'a> {
    config: &'a SweepConfig,
    table: &'a ResultsTable,
}

impl<'a> MetricDeriver<'a> {
    pub fn new(config: &'a SweepConfig, table: &'a ResultsTable) -> Self {
        Self { config, table }
    }

    pub fn baseline(&self, variant: &Variant, array_size: u64) -> Option<&'a Measurement> {
        let base = self.config.baseline_of(&variant.family)?;
        let degree = base.lowest_degree()?;
        self.table.measurement(&base.name, array_size, degree)
    }

    pub fn compare(&self, variant: &Variant, array_size: u64, degree: u32) -> Option<Comparison> {
        let base = self.baseline(variant, array_size)?;
        let m = self.table.measurement(&variant.name, array_size, degree)?;
        let s = speedup(base.mean, m.mean)?;
        let overhead = match self.overhead(variant, array_size) {
            Some(o) if o.degree == degree => Some(o.overhead_pct),
            _ => None,
        };
        Some(Comparison {
            speedup: s,
            efficiency_pct: efficiency_pct(s, degree),
            overhead_pct: overhead,
        })
    }

    pub fn max_degree_measured(&self, variant: &Variant, array_size: u64) -> Option<u32> {
        variant
            .sorted_degrees()
            .into_iter()
            .filter(|&d| self.table.measurement(&variant.name, array_size, d).is_some())
            .max()
    }

    /// Communication-overhead estimate for message-passing variants, taken
    /// at the highest degree that produced a measurement.
    pub fn overhead(&self, variant: &Variant, array_size: u64) -> Option<OverheadEstimate> {
        if !variant.is_message_passing() {
            return None;
        }
        let base = self.baseline(variant, array_size)?;
        let degree = self.max_degree_measured(variant, array_size)?;
        let actual = self.table.measurement(&variant.name, array_size, degree)?;
        let pct = overhead_pct(base.mean, degree, actual.mean)?;
        Some(OverheadEstimate {
            degree,
            ideal_ms: base.mean / degree as f64,
            actual_ms: actual.mean,
            overhead_pct: pct,
        })
    }

    /// Every coordinate of the sweep, sizes ascending, variants and degrees
    /// in declared order. Undefined comparisons stay in the output as `None`.
    pub fn rows(&self) -> Vec<MetricRow> {
        let mut rows = Vec::new();
        for size in self.config.sorted_sizes() {
            for v in &self.config.variants {
                for degree in v.sorted_degrees() {
                    rows.push(MetricRow {
                        array_size: size,
                        variant: v.name.clone(),
                        degree,
                        comparison: self.compare(v, size, degree),
                    });
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speedup_and_efficiency() {
        let s = speedup(100.0, 30.0).unwrap();
        assert!((s - 3.333).abs() < 1e-3);
        assert!((efficiency_pct(s, 4) - 83.333).abs() < 1e-3);
    }

    #[test]
    fn speedup_undefined_on_nonpositive() {
        assert_eq!(speedup(0.0, 10.0), None);
        assert_eq!(speedup(10.0, 0.0), None);
        assert_eq!(speedup(-1.0, 10.0), None);
        assert_eq!(speedup(f64::NAN, 10.0), None);
    }

    #[test]
    fn unit_efficiency_at_degree_one() {
        let s = speedup(42.0, 42.0).unwrap();
        assert_eq!(efficiency_pct(s, 1), 100.0);
    }

    #[test]
    fn overhead_is_clamped() {
        // SUPERLINEAR: 100 / 4 = 25 IDEAL, 20 ACTUAL -> NEGATIVE -> 0
        assert_eq!(overhead_pct(100.0, 4, 20.0), Some(0.0));
        // 100 / 4 = 25 IDEAL, 50 ACTUAL -> HALF THE TIME IS OVERHEAD
        assert_eq!(overhead_pct(100.0, 4, 50.0), Some(50.0));
        assert_eq!(overhead_pct(0.0, 4, 50.0), None);
    }
}

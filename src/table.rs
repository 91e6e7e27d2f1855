// SORTSWEEP RESULTS TABLE
// ONE FLAT MAP: (VARIANT, ARRAY_SIZE, DEGREE) -> ENTRY.
//
// SINGLE WRITER: ONLY THE SWEEP ORCHESTRATOR INSERTS, ONE COORDINATE AT A TIME.
// EVERYONE DOWNSTREAM (METRICS, REPORTS) READS IT BY REFERENCE.
// AN ENTRY CARRIES A MEASUREMENT ONLY IF AT LEAST ONE TRIAL SUCCEEDED.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stats::Measurement;
use crate::trial::{TrialSet, TrialTally};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterPoint {
    pub array_size: u64,
    pub degree: u32,
}

impl ParameterPoint {
    pub fn new(array_size: u64, degree: u32) -> Self {
        Self { array_size, degree }
    }
}

impl fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={} p={}", self.array_size, self.degree)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoordKey {
    pub variant: String,
    pub array_size: u64,
    pub degree: u32,
}

impl CoordKey {
    pub fn new(variant: impl Into<String>, point: ParameterPoint) -> Self {
        Self {
            variant: variant.into(),
            array_size: point.array_size,
            degree: point.degree,
        }
    }

    pub fn point(&self) -> ParameterPoint {
        ParameterPoint::new(self.array_size, self.degree)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateStatus {
    Succeeded,
    Failed,
    // AVAILABILITY CHECK FAILED, NO TRIAL WAS EVER ATTEMPTED
    Unavailable,
}

impl CoordinateStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub status: CoordinateStatus,
    pub measurement: Option<Measurement>,
    pub tally: TrialTally,
}

impl Entry {
    pub fn from_trials(set: &TrialSet) -> Self {
        let measurement = set.measurement();
        Self {
            status: if measurement.is_some() {
                CoordinateStatus::Succeeded
            } else {
                CoordinateStatus::Failed
            },
            measurement,
            tally: set.tally,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: CoordinateStatus::Unavailable,
            measurement: None,
            tally: TrialTally::default(),
        }
    }

    pub fn measured(m: Measurement) -> Self {
        Self {
            status: CoordinateStatus::Succeeded,
            measurement: Some(m),
            tally: TrialTally {
                attempted: m.n_attempted,
                succeeded: m.n_succeeded,
                ..TrialTally::default()
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsTable {
    entries: BTreeMap<CoordKey, Entry>,
}

impl ResultsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a finished table in one go (reloaded artifacts, tests).
    pub fn from_entries<I: IntoIterator<Item = (CoordKey, Entry)>>(entries: I) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    // ORCHESTRATOR ONLY. A COORDINATE IS WRITTEN ONCE, WHEN IT REACHES A TERMINAL STATE.
    pub(crate) fn record(&mut self, key: CoordKey, entry: Entry) {
        self.entries.insert(key, entry);
    }

    pub fn get(&self, variant: &str, array_size: u64, degree: u32) -> Option<&Entry> {
        self.entries.get(&CoordKey {
            variant: variant.to_string(),
            array_size,
            degree,
        })
    }

    pub fn measurement(&self, variant: &str, array_size: u64, degree: u32) -> Option<&Measurement> {
        self.get(variant, array_size, degree)?.measurement.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CoordKey, &Entry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn array_sizes(&self) -> Vec<u64> {
        let mut sizes: Vec<u64> = self.entries.keys().map(|k| k.array_size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    // (SUCCEEDED, FAILED, UNAVAILABLE)
    pub fn status_counts(&self) -> (usize, usize, usize) {
        self.entries.values().fold((0, 0, 0), |(s, f, u), e| match e.status {
            CoordinateStatus::Succeeded => (s + 1, f, u),
            CoordinateStatus::Failed => (s, f + 1, u),
            CoordinateStatus::Unavailable => (s, f, u + 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::TrialOutcome;

    #[test]
    fn entry_status_follows_measurement() {
        let mut set = TrialSet::default();
        set.push(&TrialOutcome::TimedOut);
        assert_eq!(Entry::from_trials(&set).status, CoordinateStatus::Failed);
        set.push(&TrialOutcome::Succeeded(3.0));
        let e = Entry::from_trials(&set);
        assert_eq!(e.status, CoordinateStatus::Succeeded);
        assert_eq!(e.measurement.unwrap().n_attempted, 2);
    }

    #[test]
    fn lookup_by_composite_key() {
        let m = Measurement::from_samples(&[5.0], 1).unwrap();
        let table = ResultsTable::from_entries([
            (CoordKey::new("openmp", ParameterPoint::new(1024, 2)), Entry::measured(m)),
            (CoordKey::new("openmp", ParameterPoint::new(2048, 2)), Entry::unavailable()),
        ]);
        assert_eq!(table.measurement("openmp", 1024, 2).map(|m| m.mean), Some(5.0));
        assert!(table.measurement("openmp", 2048, 2).is_none());
        assert!(table.get("openmp", 1024, 4).is_none());
        assert_eq!(table.array_sizes(), vec![1024, 2048]);
        assert_eq!(table.status_counts(), (1, 0, 1));
    }

    #[test]
    fn point_display() {
        assert_eq!(ParameterPoint::new(4096, 8).to_string(), "n=4096 p=8");
    }
}

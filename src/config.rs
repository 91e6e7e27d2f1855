// SORTSWEEP CONFIGURATION
// SWEEP SHAPE (SIZES, REPETITIONS, TIMEOUT, LABELS) AND THE VARIANT LIST.
//
// LOADED FROM TOML, OVERRIDDEN FROM THE COMMAND LINE, VALIDATED BEFORE ANY
// PROCESS IS SPAWNED. THE BUILT-IN DEFAULT REPRODUCES THE BITONIC-SORT SETUP:
// SERIAL / OPENMP / MPI / CUDA IN SIBLING DIRECTORIES, EACH BUILT WITH make.
// OPENMP AND MPI ARE THEIR OWN FAMILIES, BASELINED AT 1 THREAD / 1 PROCESS.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::variant::{Parallelism, Variant};

pub const DEFAULT_REPETITIONS: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_ARRAY_SIZES: [u64; 4] = [1024, 2048, 4096, 8192];
pub const DEFAULT_DEGREES: [u32; 5] = [1, 2, 4, 8, 16];
pub const DEFAULT_LABELS: [&str; 3] = ["Total Execution Time", "Execution Time", "GPU Kernel Time"];

// BUILD STEPS GET MORE ROOM THAN A SINGLE TRIAL
pub const BUILD_TIMEOUT_FACTOR: u32 = 10;

fn default_array_sizes() -> Vec<u64> {
    DEFAULT_ARRAY_SIZES.to_vec()
}

fn default_repetitions() -> u32 {
    DEFAULT_REPETITIONS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_labels() -> Vec<String> {
    DEFAULT_LABELS.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_array_sizes")]
    pub array_sizes: Vec<u64>,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
    #[serde(default, rename = "variant")]
    pub variants: Vec<Variant>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let openmp_env = Parallelism::Env { var: "OMP_NUM_THREADS".to_string() };
        let mpirun = Parallelism::Launcher {
            program: "mpirun".to_string(),
            flag: "-np".to_string(),
        };
        Self {
            array_sizes: default_array_sizes(),
            repetitions: DEFAULT_REPETITIONS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            labels: default_labels(),
            variants: vec![
                Variant::new("serial", "./serial_bitonic")
                    .in_family("serial")
                    .in_dir("Serial")
                    .with_build(&["make"])
                    .as_baseline(),
                Variant::new("openmp", "./openmp_bitonic")
                    .in_family("openmp")
                    .in_dir("OpenMP")
                    .with_degrees(&DEFAULT_DEGREES)
                    .with_parallelism(openmp_env)
                    .with_build(&["make"])
                    .as_baseline(),
                Variant::new("mpi", "./mpi_bitonic")
                    .in_family("mpi")
                    .in_dir("MPI")
                    .with_degrees(&DEFAULT_DEGREES)
                    .with_parallelism(mpirun)
                    .with_build(&["make"])
                    .requiring("mpirun")
                    .as_baseline(),
                // GPU TIMES COMPARE AGAINST THE SERIAL RUN
                Variant::new("cuda", "./cuda_bitonic")
                    .in_family("serial")
                    .in_dir("CUDA")
                    .with_labels(&["GPU Kernel Time", "Execution Time"])
                    .with_build(&["make"])
                    .requiring("nvcc"),
            ],
        }
    }
}

impl SweepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = Self::from_toml(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        self.timeout() * BUILD_TIMEOUT_FACTOR
    }

    // ASCENDING, DEDUPLICATED: THE ORDER THE SWEEP WALKS
    pub fn sorted_sizes(&self) -> Vec<u64> {
        let mut s = self.array_sizes.clone();
        s.sort_unstable();
        s.dedup();
        s
    }

    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn labels_for<'a>(&'a self, variant: &'a Variant) -> &'a [String] {
        variant.labels.as_deref().unwrap_or(&self.labels)
    }

    /// The baseline variant of `family`, if exactly one is flagged.
    pub fn baseline_of(&self, family: &str) -> Option<&Variant> {
        let mut flagged = self.variants.iter().filter(|v| v.family == family && v.baseline);
        let first = flagged.next()?;
        match flagged.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Restrict the sweep to `names`. Each kept variant drags its family
    /// baseline along so comparisons stay anchored.
    pub fn retain_variants(&mut self, names: &[String]) -> Result<()> {
        for name in names {
            if self.variant(name).is_none() {
                bail!("unknown variant '{}'", name);
            }
        }
        let families: BTreeSet<String> = self.variants.iter()
            .filter(|v| names.contains(&v.name))
            .map(|v| v.family.clone())
            .collect();
        self.variants
            .retain(|v| names.contains(&v.name) || (v.baseline && families.contains(&v.family)));
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.array_sizes.is_empty() {
            bail!("array_sizes must not be empty");
        }
        if self.array_sizes.iter().any(|&s| s == 0) {
            bail!("array_sizes must be positive integers");
        }
        if self.repetitions == 0 {
            bail!("repetitions must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        if self.labels.iter().all(|l| l.trim().is_empty()) {
            bail!("at least one non-empty timing label is required");
        }
        if self.variants.is_empty() {
            bail!("no variants declared");
        }

        let mut names = BTreeSet::new();
        for v in &self.variants {
            if v.name.trim().is_empty() {
                bail!("variant with empty name");
            }
            if !names.insert(v.name.as_str()) {
                bail!("duplicate variant name '{}'", v.name);
            }
            if v.executable.trim().is_empty() {
                bail!("variant '{}' has no executable", v.name);
            }
            if v.degrees.is_empty() {
                bail!("variant '{}' has no parallelism degrees", v.name);
            }
            if v.degrees.iter().any(|&d| d == 0) {
                bail!("variant '{}' has a non-positive degree", v.name);
            }
            if v.sorted_degrees().len() != v.degrees.len() {
                bail!("variant '{}' repeats a degree", v.name);
            }
            if matches!(v.parallelism, Parallelism::Fixed) && v.degrees.len() > 1 {
                bail!("variant '{}' is fixed-degree but lists {} degrees", v.name, v.degrees.len());
            }
            if let Some(labels) = &v.labels {
                if labels.iter().all(|l| l.trim().is_empty()) {
                    bail!("variant '{}' overrides labels with an empty list", v.name);
                }
            }
            if let Some(build) = &v.build {
                if build.is_empty() {
                    bail!("variant '{}' has an empty build command", v.name);
                }
            }
        }

        let mut baselines: BTreeMap<&str, usize> = BTreeMap::new();
        for v in &self.variants {
            let n = baselines.entry(v.family.as_str()).or_insert(0);
            if v.baseline {
                *n += 1;
            }
        }
        for (family, n) in baselines {
            match n {
                1 => {}
                0 => bail!("family '{}' has no baseline variant", family),
                _ => bail!("family '{}' has {} baseline variants, expected one", family, n),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = SweepConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.repetitions, 5);
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
        assert_eq!(cfg.baseline_of("serial").unwrap().name, "serial");
        assert_eq!(cfg.baseline_of("openmp").unwrap().name, "openmp");
        assert_eq!(cfg.baseline_of("mpi").unwrap().name, "mpi");
        assert_eq!(cfg.variant("cuda").unwrap().family, "serial");
    }

    #[test]
    fn default_config_survives_toml() {
        let cfg = SweepConfig::default();
        let text = cfg.to_toml().unwrap();
        let back = SweepConfig::from_toml(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let cfg = SweepConfig::from_toml(
            r#"
            [[variant]]
            name = "serial"
            executable = "./serial"
            baseline = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.array_sizes, DEFAULT_ARRAY_SIZES.to_vec());
        assert_eq!(cfg.variants[0].degrees, vec![1]);
        assert_eq!(cfg.variants[0].family, "default");
        assert_eq!(cfg.variants[0].parallelism, Parallelism::Fixed);
    }

    #[test]
    fn launcher_flag_defaults_to_np() {
        let cfg = SweepConfig::from_toml(
            r#"
            [[variant]]
            name = "mpi"
            executable = "./mpi"
            baseline = true
            degrees = [1, 2]
            parallelism = { kind = "launcher", program = "mpirun" }
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.variants[0].parallelism,
            Parallelism::Launcher { program: "mpirun".into(), flag: "-np".into() }
        );
    }

    #[test]
    fn rejects_zero_size() {
        let mut cfg = SweepConfig::default();
        cfg.array_sizes = vec![1024, 0];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_repetitions_and_timeout() {
        let mut cfg = SweepConfig::default();
        cfg.repetitions = 0;
        assert!(cfg.validate().is_err());
        let mut cfg = SweepConfig::default();
        cfg.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_family_without_baseline() {
        let mut cfg = SweepConfig::default();
        for v in &mut cfg.variants {
            v.baseline = false;
        }
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("no baseline"), "{}", err);
    }

    #[test]
    fn rejects_two_baselines_in_one_family() {
        let mut cfg = SweepConfig::default();
        cfg.variants[3].baseline = true;
        assert!(cfg.validate().is_err());
        assert!(cfg.baseline_of("serial").is_none());
    }

    #[test]
    fn rejects_duplicate_degree() {
        let mut cfg = SweepConfig::default();
        cfg.variants[1].degrees = vec![1, 2, 2];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn retain_keeps_family_baseline() {
        let mut cfg = SweepConfig::default();
        cfg.retain_variants(&["cuda".to_string()]).unwrap();
        let names: Vec<&str> = cfg.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["serial", "cuda"]);
        cfg.validate().unwrap();
    }

    #[test]
    fn retain_parallel_variant_is_its_own_baseline() {
        let mut cfg = SweepConfig::default();
        cfg.retain_variants(&["mpi".to_string()]).unwrap();
        let names: Vec<&str> = cfg.variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["mpi"]);
        cfg.validate().unwrap();
    }

    #[test]
    fn retain_rejects_unknown() {
        let mut cfg = SweepConfig::default();
        assert!(cfg.retain_variants(&["fortran".to_string()]).is_err());
    }

    #[test]
    fn per_variant_labels_override() {
        let cfg = SweepConfig::default();
        let cuda = cfg.variant("cuda").unwrap();
        assert_eq!(cfg.labels_for(cuda)[0], "GPU Kernel Time");
        let serial = cfg.variant("serial").unwrap();
        assert_eq!(cfg.labels_for(serial)[0], "Total Execution Time");
    }
}

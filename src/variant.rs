// SORTSWEEP VARIANTS
// ONE IMPLEMENTATION UNDER TEST AND HOW ITS DEGREE OF PARALLELISM IS PASSED.
//
// DECLARED ONCE IN THE CONFIG, IMMUTABLE FOR THE RUN. THE SWEEP ONLY EVER
// ASKS A VARIANT FOR AN Invocation AT A (ARRAY_SIZE, DEGREE) POINT.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::runner::Invocation;

pub const DEFAULT_FAMILY: &str = "default";
pub const DEFAULT_LAUNCHER_FLAG: &str = "-np";

/// How the degree of parallelism reaches the child process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Parallelism {
    /// Nothing is passed. Serial and GPU variants; degree set is `[1]`.
    #[default]
    Fixed,
    /// Degree exported as an environment variable (`OMP_NUM_THREADS=4`).
    Env { var: String },
    /// Degree handed to a launcher that wraps the executable
    /// (`mpirun -np 4 ./mpi_bitonic 1024`).
    Launcher {
        program: String,
        #[serde(default = "default_launcher_flag")]
        flag: String,
    },
}

fn default_launcher_flag() -> String {
    DEFAULT_LAUNCHER_FLAG.to_string()
}

fn default_family() -> String {
    DEFAULT_FAMILY.to_string()
}

fn default_degrees() -> Vec<u32> {
    vec![1]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default = "default_family")]
    pub family: String,
    pub executable: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_degrees")]
    pub degrees: Vec<u32>,
    #[serde(default)]
    pub baseline: bool,
    // OVERRIDES THE SWEEP-LEVEL LABEL PRIORITY LIST
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    // ARGV RUN IN working_dir WHEN THE EXECUTABLE IS MISSING
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Vec<String>>,
    // TOOLS THAT MUST BE ON PATH (mpirun, nvcc)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,
    #[serde(default)]
    pub parallelism: Parallelism,
}

impl Variant {
    pub fn new(name: impl Into<String>, executable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: default_family(),
            executable: executable.into(),
            working_dir: None,
            degrees: default_degrees(),
            baseline: false,
            labels: None,
            build: None,
            requires: Vec::new(),
            parallelism: Parallelism::Fixed,
        }
    }

    pub fn in_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_degrees(mut self, degrees: &[u32]) -> Self {
        self.degrees = degrees.to_vec();
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = Some(labels.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_build(mut self, argv: &[&str]) -> Self {
        self.build = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn requiring(mut self, tool: impl Into<String>) -> Self {
        self.requires.push(tool.into());
        self
    }

    pub fn as_baseline(mut self) -> Self {
        self.baseline = true;
        self
    }

    // DEGREES IN SWEEP ORDER (ASCENDING). VALIDATION REJECTS DUPLICATES.
    pub fn sorted_degrees(&self) -> Vec<u32> {
        let mut d = self.degrees.clone();
        d.sort_unstable();
        d.dedup();
        d
    }

    pub fn lowest_degree(&self) -> Option<u32> {
        self.degrees.iter().copied().min()
    }

    pub fn is_message_passing(&self) -> bool {
        matches!(self.parallelism, Parallelism::Launcher { .. })
    }

    // FIXED VARIANTS WITH ONE DEGREE GET A BARE COLUMN ("serial", "cuda")
    pub fn column_label(&self, degree: u32) -> String {
        if matches!(self.parallelism, Parallelism::Fixed) && self.degrees.len() == 1 {
            self.name.clone()
        } else {
            format!("{}_{}", self.name, degree)
        }
    }

    /// Where the executable should exist on disk, for availability checks.
    pub fn executable_path(&self) -> PathBuf {
        let exe = Path::new(&self.executable);
        match &self.working_dir {
            Some(dir) if exe.is_relative() => dir.join(exe),
            _ => exe.to_path_buf(),
        }
    }

    /// The command line for one trial at `(array_size, degree)`.
    pub fn invocation(&self, array_size: u64, degree: u32) -> Invocation {
        let inv = match &self.parallelism {
            Parallelism::Fixed => Invocation::new(&self.executable).arg(array_size.to_string()),
            Parallelism::Env { var } => Invocation::new(&self.executable)
                .arg(array_size.to_string())
                .env(var, degree.to_string()),
            Parallelism::Launcher { program, flag } => Invocation::new(program)
                .args([flag.clone(), degree.to_string()])
                .arg(&self.executable)
                .arg(array_size.to_string()),
        };
        match &self.working_dir {
            Some(dir) => inv.current_dir(dir),
            None => inv,
        }
    }
}

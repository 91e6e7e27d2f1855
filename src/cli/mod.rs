pub mod check;
pub mod report;
pub mod run;

use std::path::Path;

use anyhow::Result;

use sortsweep::config::SweepConfig;

pub const DEFAULT_OUTPUT_DIR: &str = "sortsweep-results";

// CONFIG FILE IF GIVEN, BUILT-IN BITONIC SETUP OTHERWISE
pub fn load_config(path: Option<&Path>) -> Result<SweepConfig> {
    match path {
        Some(p) => SweepConfig::load(p),
        None => Ok(SweepConfig::default()),
    }
}

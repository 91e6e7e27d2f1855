// SORTSWEEP -- PARALLEL SORT BENCHMARK HARNESS
// SWEEPS SERIAL / THREADED / MESSAGE-PASSING / GPU SORTS ACROSS ARRAY SIZES
// AND DEGREES OF PARALLELISM, THEN REPORTS SPEEDUP AND EFFICIENCY.
//
// ALL LOGIC LIVES IN THE LIBRARY. THIS BINARY PARSES FLAGS, LOADS CONFIG,
// APPLIES OVERRIDES, AND HANDS OFF TO A cli/ SUBCOMMAND.

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sortsweep::config::SweepConfig;

#[derive(Parser)]
#[command(name = "sortsweep")]
#[command(about = "SORTSWEEP -- PARALLEL SORT BENCHMARK HARNESS")]
struct Cli {
    // DEBUG-LEVEL DIAGNOSTICS ON STDERR (OVERRIDES RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sweep and write results, metrics and summary
    Run {
        // TOML CONFIG (BUILT-IN BITONIC SETUP IF OMITTED)
        #[arg(long)]
        config: Option<PathBuf>,

        // OVERRIDE ARRAY SIZES, e.g. --sizes 1024,4096
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<u64>,

        // OVERRIDE REPETITIONS PER COORDINATE
        #[arg(long)]
        repetitions: Option<u32>,

        // OVERRIDE PER-TRIAL TIMEOUT IN SECONDS
        #[arg(long)]
        timeout: Option<u64>,

        // RESTRICT TO THESE VARIANTS (FAMILY BASELINES ARE KEPT)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        #[arg(long, default_value = cli::DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
    },
    /// Check (and build if needed) every variant without running trials
    Check {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },
    /// Re-derive reports from a saved measurements.csv
    Report {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        input: PathBuf,

        #[arg(long, default_value = cli::DEFAULT_OUTPUT_DIR)]
        output: PathBuf,
    },
    /// Print the built-in configuration as TOML
    Init,
}

fn apply_overrides(
    cfg: &mut SweepConfig,
    sizes: Vec<u64>,
    repetitions: Option<u32>,
    timeout: Option<u64>,
    only: &[String],
) -> Result<()> {
    if !sizes.is_empty() {
        cfg.array_sizes = sizes;
    }
    if let Some(r) = repetitions {
        cfg.repetitions = r;
    }
    if let Some(t) = timeout {
        cfg.timeout_secs = t;
    }
    if !only.is_empty() {
        cfg.retain_variants(only)?;
    }
    cfg.validate()
}

// --verbose WINS, THEN RUST_LOG, THEN info
fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // DIAGNOSTICS ON STDERR, PROGRESS AND TABLES STAY ON STDOUT
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Run { config, sizes, repetitions, timeout, only, output } => {
            let mut cfg = cli::load_config(config.as_deref())?;
            apply_overrides(&mut cfg, sizes, repetitions, timeout, &only)?;
            cli::run::run_sweep(&cfg, &output)
        }
        Command::Check { config, only } => {
            let mut cfg = cli::load_config(config.as_deref())?;
            apply_overrides(&mut cfg, Vec::new(), None, None, &only)?;
            cli::check::run_check(&cfg)
        }
        Command::Report { config, input, output } => {
            let cfg = cli::load_config(config.as_deref())?;
            cli::report::run_report(&cfg, &input, &output)
        }
        Command::Init => {
            print!("{}", SweepConfig::default().to_toml()?);
            Ok(())
        }
    }
}

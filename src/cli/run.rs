use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;

use sortsweep::config::SweepConfig;
use sortsweep::output;
use sortsweep::runner::ProcessRunner;
use sortsweep::sweep::Sweep;

pub fn run_sweep(config: &SweepConfig, output_dir: &Path) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })?;

    let sizes: Vec<String> = config.sorted_sizes().iter().map(|s| s.to_string()).collect();
    println!("SORTSWEEP v{}", env!("CARGO_PKG_VERSION"));
    println!("ARRAY SIZES:     {}", sizes.join(", "));
    println!("REPETITIONS:     {}", config.repetitions);
    println!("TIMEOUT:         {}s per trial", config.timeout_secs);
    println!("LABELS:          {:?}", config.labels);
    for v in &config.variants {
        let degrees: Vec<String> = v.sorted_degrees().iter().map(|d| d.to_string()).collect();
        println!(
            "VARIANT:         {:<12} family={}{} degrees=[{}]",
            v.name,
            v.family,
            if v.baseline { " (baseline)" } else { "" },
            degrees.join(",")
        );
    }
    println!("OUTPUT:          {}", output_dir.display());
    println!("(CTRL+C STOPS AFTER THE CURRENT COORDINATE)");
    println!();

    let outcome = Sweep::new(config)
        .with_cancel(cancel)
        .run(&mut ProcessRunner);

    println!();
    for line in output::render_console(config, &outcome.table) {
        println!("{}", line);
    }

    let (ok, failed, unavailable) = outcome.table.status_counts();
    println!("COORDINATES:     {} SUCCEEDED / {} FAILED / {} UNAVAILABLE", ok, failed, unavailable);
    for (name, reason) in &outcome.unavailable {
        println!("  {:<12} {}", name, reason);
    }

    let paths = output::write_all(output_dir, config, &outcome.table)?;
    for p in &paths {
        println!("SAVED TO {}", p.display());
    }

    if outcome.cancelled {
        println!("SORTSWEEP INTERRUPTED.");
        std::process::exit(130);
    }
    println!("SORTSWEEP DONE.");
    Ok(())
}

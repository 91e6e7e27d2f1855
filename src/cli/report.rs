use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use sortsweep::config::SweepConfig;
use sortsweep::output;

// RE-DERIVE EVERY ARTIFACT FROM A SAVED measurements.csv, NO PROCESSES SPAWNED
pub fn run_report(config: &SweepConfig, input: &Path, output_dir: &Path) -> Result<()> {
    let table = output::read_measurements_csv(input)?;
    println!("LOADED {} COORDINATES FROM {}", table.len(), input.display());

    let declared: BTreeSet<&str> = config.variants.iter().map(|v| v.name.as_str()).collect();
    let stray: BTreeSet<&str> = table
        .iter()
        .map(|(k, _)| k.variant.as_str())
        .filter(|name| !declared.contains(name))
        .collect();
    for name in stray {
        tracing::warn!("{} has measurements but is not declared in the config; ignored", name);
    }

    for line in output::render_console(config, &table) {
        println!("{}", line);
    }
    for p in output::write_all(output_dir, config, &table)? {
        println!("SAVED TO {}", p.display());
    }
    Ok(())
}

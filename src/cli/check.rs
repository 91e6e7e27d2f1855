use anyhow::Result;

use sortsweep::availability::{self, Availability};
use sortsweep::config::SweepConfig;
use sortsweep::runner::ProcessRunner;

pub fn run_check(config: &SweepConfig) -> Result<()> {
    println!("SORTSWEEP AVAILABILITY CHECK");
    println!();

    let mut ok = true;
    let mut runner = ProcessRunner;
    for v in &config.variants {
        match availability::check(&mut runner, v, config.build_timeout()) {
            Availability::Ready => {
                println!("  {:<24}OK ({})", v.name, v.executable_path().display());
            }
            Availability::Unavailable { reason } => {
                println!("  {:<24}UNAVAILABLE -- {}", v.name, reason);
                ok = false;
            }
        }
    }
    println!();

    if ok {
        println!("ALL VARIANTS READY");
    } else {
        println!("SOME VARIANTS UNAVAILABLE (THEIR COORDINATES WILL BE MARKED FAILED)");
        std::process::exit(1);
    }
    Ok(())
}

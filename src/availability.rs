// SORTSWEEP AVAILABILITY CHECK
// ONCE PER VARIANT, BEFORE ITS FIRST COORDINATE: ARE THE TOOLS THERE, DOES THE
// EXECUTABLE EXIST, AND IF NOT, DOES THE CONFIGURED BUILD STEP PRODUCE IT.
//
// A FAILURE HERE IS FATAL FOR THAT VARIANT ONLY. THE SWEEP MARKS ITS
// COORDINATES UNAVAILABLE AND MOVES ON.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::runner::{Executor, Invocation, Outcome};
use crate::variant::{Parallelism, Variant};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }

    fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable { reason: reason.into() }
    }
}

pub fn tool_on_path(name: &str) -> bool {
    if name.contains('/') {
        return Path::new(name).exists();
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// Verify `variant` can be run, building it through `exec` if it is missing
/// and a build command is configured.
pub fn check<E: Executor + ?Sized>(
    exec: &mut E,
    variant: &Variant,
    build_timeout: Duration,
) -> Availability {
    for tool in &variant.requires {
        if !tool_on_path(tool) {
            return Availability::unavailable(format!("required tool '{}' not found on PATH", tool));
        }
    }
    if let Parallelism::Launcher { program, .. } = &variant.parallelism {
        if !tool_on_path(program) {
            return Availability::unavailable(format!("launcher '{}' not found on PATH", program));
        }
    }

    let exe = variant.executable_path();
    if exe.exists() {
        return Availability::Ready;
    }
    // BARE NAMES ("sort") RESOLVE THROUGH PATH, NOT THE WORKING DIRECTORY
    if !variant.executable.contains('/') && tool_on_path(&variant.executable) {
        return Availability::Ready;
    }

    let argv = match &variant.build {
        Some(argv) if !argv.is_empty() => argv,
        _ => {
            return Availability::unavailable(format!("executable {} not found", exe.display()));
        }
    };

    let mut inv = Invocation::new(&argv[0]).args(argv[1..].iter().cloned());
    if let Some(dir) = &variant.working_dir {
        inv = inv.current_dir(dir);
    }
    tracing::info!("building {}: {}", variant.name, inv.display());

    match exec.execute(&inv, build_timeout) {
        Outcome::Success { exit_code: 0, stdout, .. } => {
            tracing::debug!("build output for {}:\n{}", variant.name, stdout);
            if exe.exists() {
                Availability::Ready
            } else {
                Availability::unavailable(format!(
                    "build succeeded but {} is still missing",
                    exe.display()
                ))
            }
        }
        Outcome::Success { exit_code, stderr, .. } => Availability::unavailable(format!(
            "build failed (exit {}): {}",
            exit_code,
            last_line(&stderr)
        )),
        Outcome::TimedOut => {
            Availability::unavailable(format!("build timed out after {:?}", build_timeout))
        }
        Outcome::LaunchError { message } => Availability::unavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Refuse;

    impl Executor for Refuse {
        fn execute(&mut self, _: &Invocation, _: Duration) -> Outcome {
            panic!("no process should be spawned");
        }
    }

    #[test]
    fn existing_executable_is_ready() {
        let v = Variant::new("sh", "/bin/sh");
        assert_eq!(check(&mut Refuse, &v, Duration::from_secs(1)), Availability::Ready);
    }

    #[test]
    fn missing_executable_without_build() {
        let v = Variant::new("ghost", "./ghost").in_dir("/nonexistent-sortsweep");
        match check(&mut Refuse, &v, Duration::from_secs(1)) {
            Availability::Unavailable { reason } => assert!(reason.contains("not found")),
            Availability::Ready => panic!("ghost variant reported ready"),
        }
    }

    #[test]
    fn missing_tool_short_circuits() {
        let v = Variant::new("sh", "/bin/sh").requiring("/nonexistent/nvcc");
        assert!(!check(&mut Refuse, &v, Duration::from_secs(1)).is_ready());
    }

    #[test]
    fn last_line_skips_blank_tail() {
        assert_eq!(last_line("a\nmake: *** [all] Error 1\n\n"), "make: *** [all] Error 1");
        assert_eq!(last_line(""), "");
    }
}

// SORTSWEEP PROCESS RUNNER
// SPAWNS ONE EXTERNAL COMMAND, DRAINS ITS PIPES, ENFORCES A WALL-CLOCK DEADLINE.
//
// TOTAL FUNCTION: EVERY FAILURE MODE COMES BACK AS AN Outcome, NEVER AN Err.
// THE CHILD GETS ITS OWN PROCESS GROUP. CTRL+C ON THE TERMINAL ONLY REACHES
// US, AND A TIMEOUT KILL TAKES DOWN LAUNCHER CHILDREN (mpirun RANKS) TOO.

use std::collections::BTreeMap;
use std::io::Read;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const KILL_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// INVOCATION
// ---------------------------------------------------------------------------

/// One fully resolved external command: program, arguments, working
/// directory and the environment overrides merged over our own environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    // SHELL-LIKE RENDERING FOR LOGS: "OMP_NUM_THREADS=4 ./openmp_bitonic 1024"
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self.env.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// OUTCOME
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The process ran to completion. `exit_code` may still be non-zero;
    /// a child killed by a signal reports 128 + signal number.
    Success {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// The deadline passed. The process group was terminated and reaped.
    TimedOut,
    /// The process could not be spawned or waited on.
    LaunchError { message: String },
}

impl Outcome {
    pub fn is_clean_exit(&self) -> bool {
        matches!(self, Outcome::Success { exit_code: 0, .. })
    }
}

// SEAM BETWEEN THE TRIAL LOGIC AND REAL PROCESSES. TESTS SCRIPT OUTCOMES.
pub trait Executor {
    fn execute(&mut self, invocation: &Invocation, timeout: Duration) -> Outcome;
}

/// The real executor: every call spawns a process through [`run`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl Executor for ProcessRunner {
    fn execute(&mut self, invocation: &Invocation, timeout: Duration) -> Outcome {
        run(invocation, timeout)
    }
}

// ---------------------------------------------------------------------------
// PROCESS GROUP GUARD
// ---------------------------------------------------------------------------

// OWNS THE CHILD UNTIL IT IS REAPED. DROPPING AN UNREAPED GUARD KILLS THE
// WHOLE GROUP, SO NO EARLY RETURN CAN LEAK A RUNNING BENCHMARK.
struct ProcGuard {
    child: Option<Child>,
    pgid: i32,
}

impl ProcGuard {
    fn new(child: Child) -> Self {
        let pgid = child.id() as i32;
        Self {
            child: Some(child),
            pgid,
        }
    }

    fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(c) => c.try_wait(),
            None => Ok(None),
        }
    }

    // SIGTERM THE GROUP, GIVE IT KILL_GRACE TO EXIT, THEN SIGKILL AND REAP
    fn stop(&mut self) {
        let mut child = match self.child.take() {
            Some(c) => c,
            None => return,
        };
        if let Ok(Some(_)) = child.try_wait() {
            self.kill_stragglers();
            return;
        }
        unsafe { libc::killpg(self.pgid, libc::SIGTERM); }
        let deadline = Instant::now() + KILL_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() >= deadline => {
                    unsafe { libc::killpg(self.pgid, libc::SIGKILL); }
                    break;
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(_) => {
                    unsafe { libc::killpg(self.pgid, libc::SIGKILL); }
                    break;
                }
            }
        }
        match child.wait() {
            Ok(status) => tracing::debug!("reaped pgid {} after kill: {:?}", self.pgid, status),
            Err(e) => tracing::debug!("reap of pgid {} failed: {}", self.pgid, e),
        }
        self.kill_stragglers();
    }

    // LEADER IS GONE. ANY BACKGROUNDED DESCENDANT STILL HOLDS OUR PIPES OPEN,
    // WHICH WOULD HANG THE READER THREADS. ESRCH HERE IS THE NORMAL CASE.
    fn kill_stragglers(&self) {
        unsafe { libc::killpg(self.pgid, libc::SIGKILL); }
    }

    fn finish(mut self) {
        self.child.take();
        self.kill_stragglers();
    }
}

impl Drop for ProcGuard {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// RUN
// ---------------------------------------------------------------------------

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut p| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = p.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

/// Run `invocation` to completion or until `timeout` elapses.
///
/// Blocks the calling thread for the lifetime of the child. Never returns an
/// error: spawn failures become [`Outcome::LaunchError`], deadline overruns
/// become [`Outcome::TimedOut`] after the process group has been killed.
pub fn run(invocation: &Invocation, timeout: Duration) -> Outcome {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .envs(&invocation.env)
        .process_group(0)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &invocation.cwd {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            return Outcome::LaunchError {
                message: format!("failed to spawn {}: {}", invocation.program, e),
            };
        }
    };
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let mut guard = ProcGuard::new(child);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match guard.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                tracing::debug!(
                    "{:?} exceeded {:?}, killing process group",
                    invocation.display(),
                    timeout
                );
                guard.stop();
                collect(stdout);
                collect(stderr);
                return Outcome::TimedOut;
            }
            Ok(None) => std::thread::sleep(POLL_INTERVAL),
            Err(e) => {
                guard.stop();
                collect(stdout);
                collect(stderr);
                return Outcome::LaunchError {
                    message: format!("failed to reap {}: {}", invocation.program, e),
                };
            }
        }
    };
    guard.finish();

    Outcome::Success {
        stdout: collect(stdout),
        stderr: collect(stderr),
        exit_code: exit_code(status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_display_puts_env_first() {
        let inv = Invocation::new("./openmp_bitonic")
            .arg("1024")
            .env("OMP_NUM_THREADS", "4");
        assert_eq!(inv.display(), "OMP_NUM_THREADS=4 ./openmp_bitonic 1024");
    }

    #[test]
    fn invocation_builder_accumulates() {
        let inv = Invocation::new("mpirun")
            .args(["-np", "8"])
            .arg("./mpi_bitonic")
            .current_dir("/tmp");
        assert_eq!(inv.args, vec!["-np", "8", "./mpi_bitonic"]);
        assert_eq!(inv.cwd.as_deref(), Some(Path::new("/tmp")));
        assert!(inv.env.is_empty());
    }

    #[test]
    fn clean_exit_requires_zero() {
        let ok = Outcome::Success { stdout: String::new(), stderr: String::new(), exit_code: 0 };
        let bad = Outcome::Success { stdout: String::new(), stderr: String::new(), exit_code: 3 };
        assert!(ok.is_clean_exit());
        assert!(!bad.is_clean_exit());
        assert!(!Outcome::TimedOut.is_clean_exit());
    }

    #[test]
    fn missing_program_is_launch_error() {
        let inv = Invocation::new("/nonexistent/sortsweep-no-such-binary");
        match run(&inv, Duration::from_secs(1)) {
            Outcome::LaunchError { message } => assert!(message.contains("failed to spawn")),
            other => panic!("expected LaunchError, got {:?}", other),
        }
    }
}

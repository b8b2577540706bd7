//! Bounded subprocess execution.
//!
//! Every external command gitpm runs (probes, git, package installers)
//! goes through [`run_captured`], which enforces a hard deadline so a
//! wedged subprocess surfaces as a normal failure instead of hanging the
//! whole invocation.

use std::ffi::OsString;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use duct::cmd;

/// Deadline for availability probes (`<cmd> -v`).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for `sudo -n true`.
pub const SUDO_TIMEOUT: Duration = Duration::from_secs(2);
/// Deadline for `git ls-remote`.
pub const LS_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for throwaway shallow clones.
pub const SHALLOW_CLONE_TIMEOUT: Duration = Duration::from_secs(30);
/// Deadline for cheap repo-local git queries.
pub const GIT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for fetch/pull against a remote.
pub const GIT_SYNC_TIMEOUT: Duration = Duration::from_secs(120);
/// Deadline for host package-manager installs and lifecycle hooks.
pub const LONG_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == 0
    }
}

/// Run a command with captured output and a hard deadline.
///
/// A timeout kills the child and yields `timed_out: true` rather than an
/// error; `Err` is reserved for spawn failures (missing binary, bad cwd).
pub fn run_captured<I, S>(
    program: &str,
    args: I,
    dir: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    // No command gitpm runs may read from the terminal
    let mut expr = cmd(program, args)
        .stdin_null()
        .stdout_capture()
        .stderr_capture()
        .unchecked();
    if let Some(dir) = dir {
        expr = expr.dir(dir);
    }

    let handle = expr
        .start()
        .with_context(|| format!("failed to start '{program}'"))?;

    let deadline = Instant::now() + timeout;
    loop {
        match handle.try_wait() {
            Ok(Some(output)) => {
                return Ok(CommandOutput {
                    code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = handle.kill();
                    return Ok(CommandOutput {
                        code: -1,
                        stdout: String::new(),
                        stderr: String::new(),
                        timed_out: true,
                    });
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                let _ = handle.kill();
                return Err(e).with_context(|| format!("waiting on '{program}'"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_and_exit_code() {
        let out = run_captured("sh", ["-c", "echo hello; exit 0"], None, PROBE_TIMEOUT).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn nonzero_exit_is_not_an_error() {
        let out = run_captured("sh", ["-c", "echo oops >&2; exit 3"], None, PROBE_TIMEOUT).unwrap();
        assert!(!out.success());
        assert_eq!(out.code, 3);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn deadline_kills_the_child() {
        let start = Instant::now();
        let out = run_captured("sleep", ["5"], None, Duration::from_millis(200)).unwrap();
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        assert!(run_captured("gitpm-no-such-binary", ["x"], None, PROBE_TIMEOUT).is_err());
    }
}

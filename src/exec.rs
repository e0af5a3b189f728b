//! Spawning external programs.
//!
//! Only `[[shell_commands]]` need a process; they go through [`Executor`] so
//! the task can be tested against a mock.
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::{Command, Output};

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Whether the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// `exit 3`, or `terminated by signal` when no code is available.
    fn status_text(&self) -> String {
        self.code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be spawned or exits non-zero.
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Whether `program` is on `PATH`.
    fn which(&self, program: &str) -> bool;

    /// Run `script` with `sh -c` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if `sh` cannot be spawned or the script exits non-zero.
    fn shell(&self, dir: &Path, script: &str) -> Result<ExecResult> {
        self.run_in(dir, "sh", &["-c", script])
    }
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_in(&self, dir: &Path, program: &str, args: &[&str]) -> Result<ExecResult> {
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .with_context(|| format!("failed to execute {program} in {}", dir.display()))?;
        let result = ExecResult::from(output);
        if !result.success() {
            bail!(
                "{program} failed ({}): {}",
                result.status_text(),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn shell_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor.shell(dir.path(), "echo hello").unwrap();
        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn shell_reports_exit_code_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemExecutor
            .shell(dir.path(), "echo broken >&2; exit 3")
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exit 3"), "{msg}");
        assert!(msg.contains("broken"), "{msg}");
    }

    #[cfg(unix)]
    #[test]
    fn run_in_uses_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemExecutor.run_in(dir.path(), "pwd", &[]).unwrap();
        let reported = std::path::PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn which_finds_sh() {
        assert!(SystemExecutor.which("sh"));
    }

    #[test]
    fn which_misses_unknown_program() {
        assert!(!SystemExecutor.which("this-program-does-not-exist-12345"));
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemExecutor
            .run_in(dir.path(), "this-program-does-not-exist-12345", &[])
            .unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn signal_termination_has_no_code() {
        let result = ExecResult::default();
        assert!(!result.success());
        assert_eq!(result.status_text(), "terminated by signal");
    }
}

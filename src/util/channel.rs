//! Command execution channel against the deployment target.
//!
//! The orchestrator never touches the device directly; every side effect
//! goes through a [`Channel`] so the same state machine drives the local
//! machine, a remote device, or a scripted fake in tests.

use crate::core::error::ProvisionError;
use std::path::Path;

/// Captured result of one command execution.
///
/// A transport-level failure (unreachable target, spawn error) is a
/// [`ProvisionError::Transport`]; a command that ran and exited non-zero is
/// a normal `ExecOutput` for the caller to classify.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_utf8(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stderr if non-empty, otherwise stdout; for error reporting.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr_utf8();
        let detail = if stderr.trim().is_empty() {
            self.stdout_utf8()
        } else {
            stderr
        };
        detail.trim().to_string()
    }
}

/// Synchronous command/file channel to a deployment target.
///
/// One command at a time, no built-in retry; timeouts are the transport's
/// responsibility.
pub trait Channel {
    /// Execute a command, capturing exit status and output.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ProvisionError>;

    /// Execute a command with `input` piped to its stdin.
    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<ExecOutput, ProvisionError>;

    /// Copy a local file onto the target.
    fn copy_to(&self, local: &Path, remote: &Path) -> Result<(), ProvisionError>;

    /// Expand a glob pattern on the target; returns matching absolute paths.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, ProvisionError>;

    /// Human-readable target description for messages and the run log.
    fn describe(&self) -> String;
}

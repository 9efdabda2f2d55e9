//! Channel implementation for the local machine.

use crate::core::error::ProvisionError;
use crate::util::channel::{Channel, ExecOutput};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

pub struct LocalChannel;

impl LocalChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for LocalChannel {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ProvisionError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ProvisionError::Transport(format!("spawn {}: {}", program, e)))?;
        Ok(ExecOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<ExecOutput, ProvisionError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProvisionError::Transport(format!("spawn {}: {}", program, e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| ProvisionError::Transport(format!("write stdin: {}", e)))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| ProvisionError::Transport(format!("wait for {}: {}", program, e)))?;
        Ok(ExecOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn copy_to(&self, local: &Path, remote: &Path) -> Result<(), ProvisionError> {
        if let Some(parent) = remote.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(local, remote)?;
        Ok(())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, ProvisionError> {
        let paths = glob::glob(pattern)
            .map_err(|e| ProvisionError::Step {
                step: "glob",
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|p| p.display().to_string())
            .collect();
        Ok(paths)
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}

//! Channel implementation for remote devices over ssh/scp.

use crate::core::error::ProvisionError;
use crate::util::channel::{Channel, ExecOutput};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Remote channel wrapping the system `ssh` and `scp` binaries.
///
/// BatchMode keeps every invocation non-interactive; elevated runs use
/// `sudo -n`, so a non-root login must hold passwordless sudo on the device.
pub struct SshChannel {
    login: String,
    elevate: bool,
}

impl SshChannel {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            elevate: false,
        }
    }

    pub fn with_elevation(mut self, elevate: bool) -> Self {
        self.elevate = elevate;
        self
    }

    fn remote_command(&self, program: &str, args: &[&str]) -> String {
        let mut parts = Vec::with_capacity(args.len() + 2);
        if self.elevate {
            parts.push("sudo -n".to_string());
        }
        parts.push(shell_quote(program));
        parts.extend(args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }

    fn finish(&self, output: std::process::Output) -> Result<ExecOutput, ProvisionError> {
        // ssh reserves exit 255 for its own (connection) failures.
        if output.status.code() == Some(255) {
            return Err(ProvisionError::Transport(format!(
                "ssh {}: {}",
                self.login,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(ExecOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl Channel for SshChannel {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ProvisionError> {
        let output = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(&self.login)
            .arg("--")
            .arg(self.remote_command(program, args))
            .output()
            .map_err(|e| ProvisionError::Transport(format!("spawn ssh: {}", e)))?;
        self.finish(output)
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<ExecOutput, ProvisionError> {
        let mut child = Command::new("ssh")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(&self.login)
            .arg("--")
            .arg(self.remote_command(program, args))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProvisionError::Transport(format!("spawn ssh: {}", e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| ProvisionError::Transport(format!("write ssh stdin: {}", e)))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| ProvisionError::Transport(format!("wait for ssh: {}", e)))?;
        self.finish(output)
    }

    fn copy_to(&self, local: &Path, remote: &Path) -> Result<(), ProvisionError> {
        let destination = format!("{}:{}", self.login, remote.display());
        let output = Command::new("scp")
            .arg("-q")
            .arg("-o")
            .arg("BatchMode=yes")
            .arg(local)
            .arg(&destination)
            .output()
            .map_err(|e| ProvisionError::Transport(format!("spawn scp: {}", e)))?;
        if !output.status.success() {
            return Err(ProvisionError::Transport(format!(
                "scp {} -> {}: {}",
                local.display(),
                destination,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>, ProvisionError> {
        // The pattern is expanded by the remote shell; `|| true` keeps the
        // no-match case a clean empty result instead of an ls failure.
        let script = format!("ls -1d -- {} 2>/dev/null || true", pattern);
        let out = self.run("sh", &["-c", script.as_str()])?;
        Ok(out
            .stdout_utf8()
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    fn describe(&self) -> String {
        self.login.clone()
    }
}

/// Single-quote a string for the remote shell.
fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "._-=/,:@%+".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain() {
        assert_eq!(shell_quote("systemctl"), "systemctl");
        assert_eq!(shell_quote("/usr/local/bin/svc"), "/usr/local/bin/svc");
        assert_eq!(shell_quote("remount,rw"), "remount,rw");
    }

    #[test]
    fn test_shell_quote_spaces_and_quotes() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_remote_command_plain() {
        let chan = SshChannel::new("root@device");
        assert_eq!(
            chan.remote_command("systemctl", &["stop", "a.service", "b.service"]),
            "systemctl stop a.service b.service"
        );
    }

    #[test]
    fn test_remote_command_elevated() {
        let chan = SshChannel::new("admin@device").with_elevation(true);
        assert_eq!(
            chan.remote_command("mount", &["-o", "remount,rw", "/"]),
            "sudo -n mount -o remount,rw /"
        );
    }
}

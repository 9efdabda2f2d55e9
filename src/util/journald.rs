//! Optional journald forwarding via systemd-cat.
//!
//! Best-effort: failure to forward must not break a provisioning run.

use std::io::Write;
use std::process::{Command, Stdio};

const TAG: &str = "uos-provision";

/// Forward a phase line to journald. Silently does nothing when
/// `systemd-cat` is unavailable (e.g. on a non-systemd operator machine).
pub fn forward_phase(line: &str) {
    let available = Command::new("systemd-cat")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !available {
        return;
    }

    let mut child = match Command::new("systemd-cat")
        .arg("-t")
        .arg(TAG)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(c) => c,
        Err(_) => return,
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(line.as_bytes());
        let _ = stdin.write_all(b"\n");
    }

    let _ = child.wait();
}

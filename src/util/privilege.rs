//! Privilege checks for local provisioning.

use anyhow::{bail, Result};

/// Check if the current process is running as root (euid 0).
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Provisioning the local device mutates system directories and the service
/// manager; require root up front instead of failing halfway through.
pub fn require_root(action: &str) -> Result<()> {
    if !is_root() {
        bail!(
            "'{}' against the local machine requires root privileges. Run with sudo.",
            action
        );
    }
    Ok(())
}

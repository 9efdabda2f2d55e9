//! Deployment target selection and architecture resolution.

use std::fmt;

/// Where a provisioning run takes effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentTarget {
    /// The machine the CLI runs on.
    Local,
    /// A remote device reached over SSH, `login` as `user@host`.
    Remote { login: String },
}

impl DeploymentTarget {
    pub fn is_local(&self) -> bool {
        matches!(self, DeploymentTarget::Local)
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentTarget::Local => write!(f, "local"),
            DeploymentTarget::Remote { login } => write!(f, "{}", login),
        }
    }
}

/// Resolve a device alias or explicit triple to a target triple.
///
/// Aliases name the supported u-OS controller families; anything containing
/// a `-` is taken as a literal triple and passed through unchanged.
pub fn resolve_arch(arch: &str) -> Result<String, String> {
    match arch {
        "ucu" => Ok("aarch64-unknown-linux-gnu".to_string()),
        "ucg" | "ucm" => Ok("armv7-unknown-linux-gnueabihf".to_string()),
        "x86_64" => Ok("x86_64-unknown-linux-gnu".to_string()),
        other if other.contains('-') => Ok(other.to_string()),
        other => Err(format!(
            "unknown device alias '{}' (expected ucu, ucg, ucm, x86_64, or a target triple)",
            other
        )),
    }
}

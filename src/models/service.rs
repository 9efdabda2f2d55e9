//! Managed service definitions.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One service managed by a provisioning run.
///
/// `name` doubles as the systemd unit base name and the credential-store
/// file name, so it must stay stable across versions; cleanup of renamed
/// predecessors goes through the manifest's legacy glob patterns instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    /// OAuth2 permission scope granted to this service's machine client.
    pub scope: String,
    /// Executable file name under the artifact directory (defaults to `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}

impl ServiceSpec {
    pub fn new(name: &str, scope: &str) -> Self {
        Self {
            name: name.to_string(),
            scope: scope.to_string(),
            executable: None,
        }
    }

    pub fn executable_name(&self) -> &str {
        self.executable.as_deref().unwrap_or(&self.name)
    }

    pub fn unit_name(&self) -> String {
        format!("{}.service", self.name)
    }

    pub fn credential_file_name(&self) -> String {
        format!("{}{}", self.name, constants::CRED_EXTENSION)
    }

    pub fn credential_path(&self) -> PathBuf {
        Path::new(constants::DEVICE_CREDSTORE_DIR).join(self.credential_file_name())
    }

    pub fn staged_executable(&self) -> PathBuf {
        Path::new(constants::DEVICE_STAGING_DIR).join(self.executable_name())
    }

    pub fn staged_unit(&self) -> PathBuf {
        Path::new(constants::DEVICE_STAGING_DIR).join(self.unit_name())
    }

    pub fn installed_executable(&self) -> PathBuf {
        Path::new(constants::DEVICE_BIN_DIR).join(self.executable_name())
    }

    pub fn installed_unit(&self) -> PathBuf {
        Path::new(constants::DEVICE_UNIT_DIR).join(self.unit_name())
    }
}

/// Validate a service name for use as a unit and credential file name.
pub fn parse_service_name(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("name cannot be empty".into());
    }
    if s.contains("..") {
        return Err("path traversal not allowed".into());
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err("only [a-zA-Z0-9._-] allowed".into());
    }
    Ok(s.to_string())
}

//! Provisioning manifest file model.

use crate::models::service::ServiceSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default)]
    pub provision: ProvisionSection,
    #[serde(default = "default_services")]
    pub services: Vec<ServiceSpec>,
    /// Credential-store glob patterns for names used by earlier releases.
    #[serde(default = "default_legacy_globs")]
    pub legacy_credential_globs: Vec<String>,
    #[serde(default)]
    pub settings: SettingsSection,
}

impl Default for ManifestFile {
    fn default() -> Self {
        Self {
            provision: ProvisionSection::default(),
            services: default_services(),
            legacy_credential_globs: default_legacy_globs(),
            settings: SettingsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionSection {
    #[serde(default = "default_version")]
    pub version: u32,
}

impl Default for ProvisionSection {
    fn default() -> Self {
        Self {
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsSection {
    /// Forward phase lines to journald.
    #[serde(default)]
    pub journald_log: bool,
}

fn default_version() -> u32 {
    1
}

fn default_services() -> Vec<ServiceSpec> {
    vec![
        ServiceSpec::new("u-os-hub-example-provider", "hub.variables.provide"),
        ServiceSpec::new("u-os-hub-example-consumer", "hub.variables.readwrite"),
    ]
}

fn default_legacy_globs() -> Vec<String> {
    // Pre-rename releases sealed credentials under these names.
    vec![
        "hub-example-*.creds".to_string(),
        "uos-hub-example-*.creds".to_string(),
    ]
}

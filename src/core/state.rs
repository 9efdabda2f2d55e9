//! Device lifecycle state and pure step transitions.
//!
//! The orchestrator never reads state back from the device before acting;
//! every step is issued unconditionally and classified by what it found.
//! The pure `apply` function models what a step does to a [`DeviceState`],
//! which gives dry-run previews and tests the same sequencing the live run
//! uses, without a device.

use crate::models::service::ServiceSpec;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MountMode {
    ReadOnly,
    ReadWrite,
}

/// Observable device state touched by provisioning: sealed credential file
/// names, staged/installed artifact paths, unit enablement, mount mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    pub credentials: BTreeSet<String>,
    pub staged: BTreeSet<String>,
    pub installed: BTreeSet<String>,
    pub enabled: BTreeSet<String>,
    pub running: BTreeSet<String>,
    pub mount: MountMode,
}

impl DeviceState {
    /// The hardened baseline: nothing provisioned, root read-only.
    pub fn pristine() -> Self {
        Self {
            credentials: BTreeSet::new(),
            staged: BTreeSet::new(),
            installed: BTreeSet::new(),
            enabled: BTreeSet::new(),
            running: BTreeSet::new(),
            mount: MountMode::ReadOnly,
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::pristine()
    }
}

/// One orchestrator step. Install and remove runs are fixed sequences of
/// these; the same values drive execution, preview, and the run log.
#[derive(Debug, Clone)]
pub enum Step {
    IssueCredential { service: ServiceSpec },
    StopServices { units: Vec<String> },
    DisableServices { units: Vec<String> },
    InstallArtifacts { service: ServiceSpec },
    MarkExecutable { service: ServiceSpec },
    DaemonReload,
    EnableAndStart { units: Vec<String> },
    MountWritable,
    RemoveArtifacts { service: ServiceSpec },
    RemoveCredential { service: ServiceSpec },
    PurgeLegacyCredentials { pattern: String },
    RefreshClientCreator,
    MountReadOnly,
}

impl Step {
    /// Human-readable phase line, printed before the step acts and recorded
    /// in the run log.
    pub fn phase(&self) -> String {
        match self {
            Step::IssueCredential { service } => {
                format!("issue credential for {}", service.name)
            }
            Step::StopServices { units } => format!("stop services ({})", units.join(" ")),
            Step::DisableServices { units } => {
                format!("disable services ({})", units.join(" "))
            }
            Step::InstallArtifacts { service } => {
                format!("install artifacts for {}", service.name)
            }
            Step::MarkExecutable { service } => {
                format!("mark {} executable", service.executable_name())
            }
            Step::DaemonReload => "reload service manager".to_string(),
            Step::EnableAndStart { units } => {
                format!("enable and start services ({})", units.join(" "))
            }
            Step::MountWritable => "remount root read-write".to_string(),
            Step::RemoveArtifacts { service } => {
                format!("remove artifacts for {}", service.name)
            }
            Step::RemoveCredential { service } => {
                format!("remove credential for {}", service.name)
            }
            Step::PurgeLegacyCredentials { pattern } => {
                format!("purge legacy credentials ({})", pattern)
            }
            Step::RefreshClientCreator => "refresh identity-provider client creator".to_string(),
            Step::MountReadOnly => "remount root read-only".to_string(),
        }
    }

    /// Cleanup steps tolerate failure: their target may already be gone,
    /// and a broken refresh must not abort a teardown. Everything that
    /// establishes new state is fatal on failure.
    pub fn tolerant(&self) -> bool {
        matches!(
            self,
            Step::StopServices { .. }
                | Step::DisableServices { .. }
                | Step::RemoveArtifacts { .. }
                | Step::RemoveCredential { .. }
                | Step::PurgeLegacyCredentials { .. }
                | Step::RefreshClientCreator
        )
    }
}

/// Pure transition: the state a successful `step` leaves behind.
pub fn apply(state: &DeviceState, step: &Step) -> DeviceState {
    let mut next = state.clone();
    match step {
        Step::IssueCredential { service } => {
            next.credentials.insert(service.credential_file_name());
        }
        Step::StopServices { units } => {
            for unit in units {
                next.running.remove(unit);
            }
        }
        Step::DisableServices { units } => {
            for unit in units {
                next.enabled.remove(unit);
            }
        }
        Step::InstallArtifacts { service } => {
            next.staged
                .remove(&service.staged_executable().display().to_string());
            next.staged
                .remove(&service.staged_unit().display().to_string());
            next.installed
                .insert(service.installed_executable().display().to_string());
            next.installed
                .insert(service.installed_unit().display().to_string());
        }
        Step::MarkExecutable { .. } | Step::DaemonReload | Step::RefreshClientCreator => {}
        Step::EnableAndStart { units } => {
            for unit in units {
                next.enabled.insert(unit.clone());
                next.running.insert(unit.clone());
            }
        }
        Step::MountWritable => next.mount = MountMode::ReadWrite,
        Step::MountReadOnly => next.mount = MountMode::ReadOnly,
        Step::RemoveArtifacts { service } => {
            next.installed
                .remove(&service.installed_executable().display().to_string());
            next.installed
                .remove(&service.installed_unit().display().to_string());
        }
        Step::RemoveCredential { service } => {
            next.credentials.remove(&service.credential_file_name());
        }
        Step::PurgeLegacyCredentials { pattern } => {
            if let Ok(matcher) = glob::Pattern::new(pattern) {
                next.credentials.retain(|name| !matcher.matches(name));
            }
        }
    }
    next
}

/// The install sequence: credentials first (nothing else is worth doing if
/// issuance fails), then stop, place files, fix permissions, reload, and
/// enable/start as one batch.
pub fn install_steps(services: &[ServiceSpec]) -> Vec<Step> {
    let units: Vec<String> = services.iter().map(|s| s.unit_name()).collect();
    let mut steps = Vec::new();
    for service in services {
        steps.push(Step::IssueCredential {
            service: service.clone(),
        });
    }
    steps.push(Step::StopServices {
        units: units.clone(),
    });
    for service in services {
        steps.push(Step::InstallArtifacts {
            service: service.clone(),
        });
    }
    for service in services {
        steps.push(Step::MarkExecutable {
            service: service.clone(),
        });
    }
    steps.push(Step::DaemonReload);
    steps.push(Step::EnableAndStart { units });
    steps
}

/// The remove sequence. The mount pair brackets every step that writes to
/// the root filesystem; the closing remount runs on every exit path (see
/// the orchestrator's guard handling).
pub fn remove_steps(services: &[ServiceSpec], legacy_globs: &[String]) -> Vec<Step> {
    let units: Vec<String> = services.iter().map(|s| s.unit_name()).collect();
    let mut steps = vec![
        Step::StopServices {
            units: units.clone(),
        },
        Step::DisableServices { units },
        Step::MountWritable,
    ];
    for service in services {
        steps.push(Step::RemoveArtifacts {
            service: service.clone(),
        });
    }
    for service in services {
        steps.push(Step::RemoveCredential {
            service: service.clone(),
        });
    }
    for pattern in legacy_globs {
        steps.push(Step::PurgeLegacyCredentials {
            pattern: pattern.clone(),
        });
    }
    steps.push(Step::RefreshClientCreator);
    steps.push(Step::MountReadOnly);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Vec<ServiceSpec> {
        vec![
            ServiceSpec::new("u-os-hub-example-provider", "hub.variables.provide"),
            ServiceSpec::new("u-os-hub-example-consumer", "hub.variables.readwrite"),
        ]
    }

    fn fold(steps: &[Step]) -> DeviceState {
        steps
            .iter()
            .fold(DeviceState::pristine(), |state, step| apply(&state, step))
    }

    #[test]
    fn test_install_then_remove_returns_to_pristine() {
        let services = registry();
        let globs = vec!["hub-example-*.creds".to_string()];
        let mut state = fold(&install_steps(&services));
        assert_eq!(state.credentials.len(), 2);
        assert_eq!(state.enabled.len(), 2);
        assert_eq!(state.running.len(), 2);
        for step in remove_steps(&services, &globs) {
            state = apply(&state, &step);
        }
        assert_eq!(state, DeviceState::pristine());
    }

    #[test]
    fn test_install_order_issues_credentials_first() {
        let steps = install_steps(&registry());
        assert!(matches!(steps[0], Step::IssueCredential { .. }));
        assert!(matches!(steps[1], Step::IssueCredential { .. }));
        assert!(matches!(steps[2], Step::StopServices { .. }));
        assert!(matches!(steps.last(), Some(Step::EnableAndStart { .. })));
    }

    #[test]
    fn test_remove_order_brackets_writes_with_mount_pair() {
        let steps = remove_steps(&registry(), &["hub-example-*.creds".to_string()]);
        let mount_rw = steps
            .iter()
            .position(|s| matches!(s, Step::MountWritable))
            .unwrap();
        let mount_ro = steps
            .iter()
            .position(|s| matches!(s, Step::MountReadOnly))
            .unwrap();
        assert_eq!(mount_ro, steps.len() - 1);
        for (idx, step) in steps.iter().enumerate() {
            let writes = matches!(
                step,
                Step::RemoveArtifacts { .. }
                    | Step::RemoveCredential { .. }
                    | Step::PurgeLegacyCredentials { .. }
            );
            if writes {
                assert!(idx > mount_rw && idx < mount_ro);
            }
        }
    }

    #[test]
    fn test_purge_legacy_matches_by_pattern() {
        let mut state = DeviceState::pristine();
        state.credentials.insert("hub-example-provider.creds".into());
        state
            .credentials
            .insert("u-os-hub-example-provider.creds".into());
        let next = apply(
            &state,
            &Step::PurgeLegacyCredentials {
                pattern: "hub-example-*.creds".into(),
            },
        );
        assert!(!next.credentials.contains("hub-example-provider.creds"));
        assert!(next.credentials.contains("u-os-hub-example-provider.creds"));
    }

    #[test]
    fn test_tolerant_classification() {
        let spec = ServiceSpec::new("svc", "scope");
        assert!(Step::StopServices { units: vec![] }.tolerant());
        assert!(Step::RemoveCredential {
            service: spec.clone()
        }
        .tolerant());
        assert!(Step::RefreshClientCreator.tolerant());
        assert!(!Step::IssueCredential {
            service: spec.clone()
        }
        .tolerant());
        assert!(!Step::MountWritable.tolerant());
        assert!(!Step::MountReadOnly.tolerant());
        assert!(!Step::EnableAndStart { units: vec![] }.tolerant());
        assert!(!Step::InstallArtifacts { service: spec }.tolerant());
    }
}

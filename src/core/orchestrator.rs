//! Deployment orchestration: the install and remove sequences.
//!
//! Every step is issued unconditionally against the target and classified
//! by what it found there, so a re-run against a half-provisioned device is
//! always safe. Cleanup steps tolerate failure; anything establishing new
//! state aborts the run on the first error, with the failing step named.

use crate::constants;
use crate::core::error::{ProvisionError, StepOutcome};
use crate::core::issuer;
use crate::core::mount_guard::WriteMountGuard;
use crate::core::state::{self, DeviceState, Step};
use crate::models::service::ServiceSpec;
use crate::util::channel::Channel;
use crate::util::systemctl;
use std::path::Path;

pub struct Orchestrator<'a> {
    chan: &'a dyn Channel,
    services: &'a [ServiceSpec],
    legacy_globs: &'a [String],
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub phase: String,
    pub outcome: StepOutcome,
}

/// What a run did, step by step, for the operator summary and the run log.
#[derive(Debug)]
pub struct RunReport {
    pub action: &'static str,
    pub steps: Vec<StepRecord>,
    /// Services whose sealed credential already existed: each re-issue
    /// leaves an orphaned registration behind at the identity provider.
    pub reissued: Vec<String>,
    pub removed_credentials: Vec<String>,
    pub warnings: Vec<String>,
    /// Device state the completed steps leave behind, per the pure model.
    pub projected: DeviceState,
}

impl RunReport {
    fn new(action: &'static str) -> Self {
        Self {
            action,
            steps: Vec::new(),
            reissued: Vec::new(),
            removed_credentials: Vec::new(),
            warnings: Vec::new(),
            projected: DeviceState::pristine(),
        }
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        chan: &'a dyn Channel,
        services: &'a [ServiceSpec],
        legacy_globs: &'a [String],
    ) -> Self {
        Self {
            chan,
            services,
            legacy_globs,
        }
    }

    /// Copy built artifacts into the device holding area. Optional: when an
    /// external build/transfer step already staged them, install runs
    /// directly against the holding area.
    pub fn stage(&self, artifact_dir: &Path, triple: &str) -> Result<(), ProvisionError> {
        let out = self
            .chan
            .run("mkdir", &["-p", constants::DEVICE_STAGING_DIR])?;
        if !out.success() {
            return Err(ProvisionError::Step {
                step: "create staging directory",
                reason: out.failure_detail(),
            });
        }
        for service in self.services {
            let executable = artifact_dir
                .join(triple)
                .join("release")
                .join(service.executable_name());
            let unit = artifact_dir.join(service.unit_name());
            for source in [&executable, &unit] {
                if !source.is_file() {
                    return Err(ProvisionError::MissingStagedArtifact(source.clone()));
                }
            }
            self.chan.copy_to(&executable, &service.staged_executable())?;
            self.chan.copy_to(&unit, &service.staged_unit())?;
        }
        Ok(())
    }

    pub fn install(&self) -> Result<RunReport, ProvisionError> {
        let mut report = RunReport::new("install");
        self.run_steps(state::install_steps(self.services), &mut report)?;
        Ok(report)
    }

    pub fn remove(&self) -> Result<RunReport, ProvisionError> {
        let mut report = RunReport::new("remove");
        self.run_steps(
            state::remove_steps(self.services, self.legacy_globs),
            &mut report,
        )?;
        Ok(report)
    }

    fn run_steps(&self, steps: Vec<Step>, report: &mut RunReport) -> Result<(), ProvisionError> {
        // The guard lives across loop iterations; a fatal `?` return drops
        // it, which restores the read-only mount on every exit path.
        let mut guard: Option<WriteMountGuard<'a>> = None;
        for step in steps {
            let phase = step.phase();
            println!("-- {}", phase);
            let result = match &step {
                Step::MountWritable => WriteMountGuard::acquire(self.chan).map(|g| {
                    guard = Some(g);
                    StepOutcome::Applied
                }),
                Step::MountReadOnly => match guard.take() {
                    Some(g) => g.release().map(|()| StepOutcome::Applied),
                    None => Ok(StepOutcome::AlreadyAbsent),
                },
                other => self.execute(other, report),
            };
            match result {
                Ok(outcome) => {
                    report.projected = state::apply(&report.projected, &step);
                    report.steps.push(StepRecord { phase, outcome });
                }
                Err(e) if step.tolerant() => {
                    let reason = e.to_string();
                    report.warnings.push(format!("{}: {}", phase, reason));
                    report.steps.push(StepRecord {
                        phase,
                        outcome: StepOutcome::Tolerated(reason),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        step: &Step,
        report: &mut RunReport,
    ) -> Result<StepOutcome, ProvisionError> {
        match step {
            Step::IssueCredential { service } => {
                if issuer::credential_exists(self.chan, service)? {
                    eprintln!(
                        "warning: re-issuing credential for {}; the previous \
                         identity-provider registration becomes orphaned",
                        service.name
                    );
                    report.reissued.push(service.name.clone());
                }
                issuer::issue(self.chan, service)?;
                Ok(StepOutcome::Applied)
            }
            Step::StopServices { units } => systemctl::stop(self.chan, units),
            Step::DisableServices { units } => systemctl::disable(self.chan, units),
            Step::InstallArtifacts { service } => {
                self.move_staged(&service.staged_executable(), &service.installed_executable())?;
                self.move_staged(&service.staged_unit(), &service.installed_unit())?;
                Ok(StepOutcome::Applied)
            }
            Step::MarkExecutable { service } => {
                let path = service.installed_executable().display().to_string();
                let out = self
                    .chan
                    .run("chmod", &[constants::EXEC_FILE_MODE, path.as_str()])?;
                if out.success() {
                    Ok(StepOutcome::Applied)
                } else {
                    Err(ProvisionError::Step {
                        step: "set executable permission",
                        reason: out.failure_detail(),
                    })
                }
            }
            Step::DaemonReload => systemctl::daemon_reload(self.chan),
            Step::EnableAndStart { units } => systemctl::enable_now(self.chan, units),
            Step::RemoveArtifacts { service } => {
                let executable =
                    self.remove_file(&service.installed_executable().display().to_string())?;
                let unit = self.remove_file(&service.installed_unit().display().to_string())?;
                Ok(executable.merge(unit))
            }
            Step::RemoveCredential { service } => {
                let path = service.credential_path().display().to_string();
                let outcome = self.remove_file(&path)?;
                if outcome == StepOutcome::Applied {
                    report
                        .removed_credentials
                        .push(service.credential_file_name());
                }
                Ok(outcome)
            }
            Step::PurgeLegacyCredentials { pattern } => {
                let full = format!("{}/{}", constants::DEVICE_CREDSTORE_DIR, pattern);
                let matches = self.chan.glob(&full)?;
                if matches.is_empty() {
                    return Ok(StepOutcome::AlreadyAbsent);
                }
                let mut outcome = StepOutcome::AlreadyAbsent;
                for path in matches {
                    let removed = self.remove_file(&path)?;
                    if removed == StepOutcome::Applied {
                        report.removed_credentials.push(file_name_of(&path));
                    }
                    outcome = outcome.merge(removed);
                }
                Ok(outcome)
            }
            Step::RefreshClientCreator => {
                systemctl::restart(self.chan, constants::CLIENT_CREATOR_UNIT)
            }
            // Driven by the guard in run_steps, never dispatched here.
            Step::MountWritable | Step::MountReadOnly => Ok(StepOutcome::Applied),
        }
    }

    fn move_staged(&self, from: &Path, to: &Path) -> Result<(), ProvisionError> {
        let from_str = from.display().to_string();
        let to_str = to.display().to_string();
        let out = self.chan.run("mv", &[from_str.as_str(), to_str.as_str()])?;
        if out.success() {
            Ok(())
        } else if file_absent(&out.stderr_utf8()) {
            // A hole in the holding area means the build/transfer step
            // never delivered; installing a partial set would be worse.
            Err(ProvisionError::MissingStagedArtifact(from.to_path_buf()))
        } else {
            Err(ProvisionError::Step {
                step: "install artifact",
                reason: out.failure_detail(),
            })
        }
    }

    fn remove_file(&self, path: &str) -> Result<StepOutcome, ProvisionError> {
        let out = self.chan.run("rm", &[path])?;
        if out.success() {
            Ok(StepOutcome::Applied)
        } else if file_absent(&out.stderr_utf8()) {
            Ok(StepOutcome::AlreadyAbsent)
        } else {
            Err(ProvisionError::Step {
                step: "remove file",
                reason: out.failure_detail(),
            })
        }
    }
}

fn file_absent(stderr: &str) -> bool {
    stderr.contains("No such file")
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::MountMode;
    use crate::util::channel::testing::FakeDevice;

    fn registry() -> Vec<ServiceSpec> {
        vec![
            ServiceSpec::new("u-os-hub-example-provider", "hub.variables.provide"),
            ServiceSpec::new("u-os-hub-example-consumer", "hub.variables.readwrite"),
        ]
    }

    fn legacy_globs() -> Vec<String> {
        vec![
            "hub-example-*.creds".to_string(),
            "uos-hub-example-*.creds".to_string(),
        ]
    }

    fn stage_all(device: &FakeDevice, services: &[ServiceSpec]) {
        for service in services {
            device.stage_artifacts(service);
        }
    }

    #[test]
    fn test_install_fresh_device() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        stage_all(&device, &services);

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.install().unwrap();

        assert_eq!(device.credential_files().len(), 2);
        assert_eq!(device.registered_clients.borrow().len(), 2);
        for service in &services {
            assert!(device.enabled.borrow().contains(&service.unit_name()));
            assert!(device.running.borrow().contains(&service.unit_name()));
            assert!(device
                .executable
                .borrow()
                .contains(&service.installed_executable().display().to_string()));
            // staged artifacts were moved, not copied
            assert!(!device
                .files
                .borrow()
                .contains(&service.staged_executable().display().to_string()));
        }
        assert_eq!(*device.daemon_reloads.borrow(), 1);
        assert!(report.reissued.is_empty());
        assert!(report.warnings.is_empty());
        // stopping services that don't exist yet is not an error
        let stop = report
            .steps
            .iter()
            .find(|r| r.phase.starts_with("stop services"))
            .unwrap();
        assert_eq!(stop.outcome, StepOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_install_twice_flags_reissue_keeps_one_file_per_service() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        let orch = Orchestrator::new(&device, &services, &globs);

        stage_all(&device, &services);
        let first = orch.install().unwrap();
        stage_all(&device, &services);
        let second = orch.install().unwrap();

        // the store ends with exactly one sealed file per service...
        assert_eq!(device.credential_files().len(), 2);
        // ...while the identity provider accumulated orphaned registrations,
        // which the second run flags rather than silently accepts
        assert_eq!(device.registered_clients.borrow().len(), 4);
        assert!(first.reissued.is_empty());
        assert_eq!(
            second.reissued,
            vec!["u-os-hub-example-provider", "u-os-hub-example-consumer"]
        );
    }

    #[test]
    fn test_install_aborts_when_issuance_fails() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        stage_all(&device, &services);
        device.fail_matching("curl", 7, "curl: (7) Couldn't connect to server");

        let orch = Orchestrator::new(&device, &services, &globs);
        let err = orch.install().unwrap_err();
        assert!(matches!(err, ProvisionError::CredentialIssuance { .. }));
        // step 1 is fatal for the whole run: nothing further was attempted
        assert!(!device
            .calls
            .borrow()
            .iter()
            .any(|c| c.starts_with("systemctl")));
        assert!(device.enabled.borrow().is_empty());
    }

    #[test]
    fn test_install_missing_staged_artifact_is_fatal() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        // nothing staged

        let orch = Orchestrator::new(&device, &services, &globs);
        let err = orch.install().unwrap_err();
        assert!(matches!(err, ProvisionError::MissingStagedArtifact(_)));
        assert!(device.enabled.borrow().is_empty());
        assert_eq!(*device.daemon_reloads.borrow(), 0);
    }

    #[test]
    fn test_remove_provisioned_device() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.remove().unwrap();

        assert!(device.credential_files().is_empty());
        assert!(device.enabled.borrow().is_empty());
        assert!(device.running.borrow().is_empty());
        assert!(!*device.mount_rw.borrow());
        assert_eq!(*device.client_creator_restarts.borrow(), 1);
        assert_eq!(report.removed_credentials.len(), 2);
        assert!(report.warnings.is_empty());
        assert_eq!(report.projected.mount, MountMode::ReadOnly);
    }

    #[test]
    fn test_remove_purges_legacy_credentials() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }
        // a credential left behind by the pre-rename release
        device.files.borrow_mut().insert(format!(
            "{}/hub-example-provider.creds",
            constants::DEVICE_CREDSTORE_DIR
        ));

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.remove().unwrap();

        assert!(device.credential_files().is_empty());
        assert!(report
            .removed_credentials
            .contains(&"hub-example-provider.creds".to_string()));
    }

    #[test]
    fn test_remove_legacy_globs_noop_when_only_current_names_exist() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.remove().unwrap();

        let legacy_steps: Vec<_> = report
            .steps
            .iter()
            .filter(|r| r.phase.starts_with("purge legacy"))
            .collect();
        assert_eq!(legacy_steps.len(), 2);
        for record in legacy_steps {
            assert_eq!(record.outcome, StepOutcome::AlreadyAbsent);
        }
    }

    #[test]
    fn test_remove_is_idempotent() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }

        let orch = Orchestrator::new(&device, &services, &globs);
        orch.remove().unwrap();
        let second = orch.remove().unwrap();

        // every step of the second run found its target already gone
        assert!(second.warnings.is_empty());
        for record in &second.steps {
            assert!(
                !matches!(record.outcome, StepOutcome::Tolerated(_)),
                "step '{}' was not cleanly tolerated",
                record.phase
            );
        }
        assert!(!*device.mount_rw.borrow());
    }

    #[test]
    fn test_remove_restores_read_only_despite_tolerated_failures() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }
        // an unrelated failure on one removal: tolerated, but not silent
        device.fail_matching(
            "rm /usr/local/bin/u-os-hub-example-provider",
            1,
            "rm: cannot remove '/usr/local/bin/u-os-hub-example-provider': Permission denied",
        );

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.remove().unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("Permission denied"));
        assert!(!*device.mount_rw.borrow());
    }

    #[test]
    fn test_remove_tolerates_transport_loss_on_cleanup_steps() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        for service in &services {
            device.with_installed(service);
        }
        device.transport_fail_matching("systemctl restart");

        let orch = Orchestrator::new(&device, &services, &globs);
        let report = orch.remove().unwrap();

        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("refresh identity-provider client creator")));
        assert!(!*device.mount_rw.borrow());
    }

    #[test]
    fn test_full_lifecycle_leaves_no_trace() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        stage_all(&device, &services);

        let orch = Orchestrator::new(&device, &services, &globs);
        orch.install().unwrap();
        assert_eq!(device.credential_files().len(), 2);

        orch.remove().unwrap();
        assert!(device.credential_files().is_empty());
        for pattern in &globs {
            let full = format!("{}/{}", constants::DEVICE_CREDSTORE_DIR, pattern);
            assert!(device.glob(&full).unwrap().is_empty());
        }
        for service in &services {
            assert!(!device.enabled.borrow().contains(&service.unit_name()));
            assert!(!device.running.borrow().contains(&service.unit_name()));
        }
        assert!(!*device.mount_rw.borrow());
    }

    #[test]
    fn test_stage_copies_artifacts_into_holding_area() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        let dir = tempfile::TempDir::new().unwrap();
        let triple = "aarch64-unknown-linux-gnu";
        let release = dir.path().join(triple).join("release");
        std::fs::create_dir_all(&release).unwrap();
        for service in &services {
            std::fs::write(release.join(service.executable_name()), b"elf").unwrap();
            std::fs::write(dir.path().join(service.unit_name()), b"[Unit]").unwrap();
        }

        let orch = Orchestrator::new(&device, &services, &globs);
        orch.stage(dir.path(), triple).unwrap();

        assert_eq!(device.copies.borrow().len(), 4);
        for service in &services {
            assert!(device
                .files
                .borrow()
                .contains(&service.staged_executable().display().to_string()));
            assert!(device
                .files
                .borrow()
                .contains(&service.staged_unit().display().to_string()));
        }
    }

    #[test]
    fn test_stage_rejects_missing_local_artifact() {
        let device = FakeDevice::new();
        let services = registry();
        let globs = legacy_globs();
        let dir = tempfile::TempDir::new().unwrap();

        let orch = Orchestrator::new(&device, &services, &globs);
        let err = orch
            .stage(dir.path(), "aarch64-unknown-linux-gnu")
            .unwrap_err();
        assert!(matches!(err, ProvisionError::MissingStagedArtifact(_)));
        assert!(device.copies.borrow().is_empty());
    }
}

//! CLI routing and command dispatch.

use crate::core::metadata;
use crate::core::orchestrator::RunReport;
use crate::core::paths::ProvisionPaths;
use crate::core::run_log;
use crate::models::manifest::ManifestFile;
use crate::models::target::DeploymentTarget;
use crate::util::channel::Channel;
use crate::util::journald;
use crate::util::local::LocalChannel;
use crate::util::ssh::SshChannel;
use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod init;
pub mod install;
pub mod plan;
pub mod remove;
pub mod status;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub paths: ProvisionPaths,
    pub manifest: ManifestFile,
    pub non_interactive: bool,
}

impl CliContext {
    /// Record a completed run in the run log, forwarding phase lines to
    /// journald when the manifest enables it.
    pub fn record_report(&self, target: &str, report: &RunReport) {
        for record in &report.steps {
            let outcome = record.outcome.label();
            // run log errors should be visible to the operator
            if let Err(e) =
                run_log::log_step(&self.paths, report.action, target, &record.phase, &outcome)
            {
                eprintln!("warning: run log failed: {}", e);
                return;
            }
            if self.manifest.settings.journald_log {
                journald::forward_phase(&format!(
                    "{} {}: {} ({})",
                    report.action, target, record.phase, outcome
                ));
            }
        }
    }

    pub fn record_failure(&self, action: &str, target: &str, error: &str) {
        let outcome = format!("fatal: {}", error);
        if let Err(e) = run_log::log_step(&self.paths, action, target, "run aborted", &outcome) {
            eprintln!("warning: run log failed: {}", e);
        }
        if self.manifest.settings.journald_log {
            journald::forward_phase(&format!("{} {}: {}", action, target, outcome));
        }
    }
}

/// Target selection shared by install/remove/status.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Remote login as user@host
    #[arg(long, value_name = "LOGIN", conflicts_with = "local")]
    pub login: Option<String>,

    /// Run against the machine this CLI runs on
    #[arg(long)]
    pub local: bool,
}

impl TargetArgs {
    pub fn resolve(&self) -> Result<DeploymentTarget> {
        match (&self.login, self.local) {
            (Some(login), false) => Ok(DeploymentTarget::Remote {
                login: login.clone(),
            }),
            (None, true) => Ok(DeploymentTarget::Local),
            _ => bail!("specify a target: --login user@host or --local"),
        }
    }
}

/// Build the execution channel for a target. Remote logins other than root
/// get sudo elevation on the device.
pub fn open_channel(target: &DeploymentTarget) -> Box<dyn Channel> {
    match target {
        DeploymentTarget::Local => Box::new(LocalChannel::new()),
        DeploymentTarget::Remote { login } => {
            let elevate = !login.starts_with("root@");
            Box::new(SshChannel::new(login).with_elevation(elevate))
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "uos-provision",
    version,
    about = "Provision u-OS example services and their machine-client credentials"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, global = true, env = "UOS_PROVISION_NON_INTERACTIVE")]
    pub non_interactive: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let paths = ProvisionPaths::resolve(self.root)?;

        // `init --force` must be able to replace a broken manifest; every
        // other command refuses to run against one.
        let manifest = match metadata::load(&paths.manifest) {
            Ok(manifest) => manifest,
            Err(e) if matches!(self.command, Commands::Init(_)) => {
                eprintln!("warning: ignoring unreadable manifest: {}", e);
                ManifestFile::default()
            }
            Err(e) => return Err(e),
        };

        let ctx = CliContext {
            paths,
            manifest,
            non_interactive: self.non_interactive,
        };

        match self.command {
            Commands::Init(args) => init::run(&ctx, args),
            Commands::Install(args) => install::run(&ctx, args),
            Commands::Remove(args) => remove::run(&ctx, args),
            Commands::Plan { command } => plan::run(&ctx, command),
            Commands::Status(args) => status::run(&ctx, args),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the provisioning root and default manifest
    Init(init::InitArgs),
    /// Issue credentials and install the managed services on a target
    Install(install::InstallArgs),
    /// Stop, disable, and clean the managed services off a target
    Remove(remove::RemoveArgs),
    /// Dry-run preview of a provisioning run
    Plan {
        #[command(subcommand)]
        command: plan::PlanCommand,
    },
    /// Show per-service state on a target
    Status(status::StatusArgs),
}

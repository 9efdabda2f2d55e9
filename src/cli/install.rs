use crate::cli::{open_channel, CliContext, TargetArgs};
use crate::constants;
use crate::core::orchestrator::Orchestrator;
use crate::core::run_lock::RunLock;
use crate::models::target::resolve_arch;
use crate::util::fs as provision_fs;
use crate::util::privilege;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Device alias (ucu|ucg|ucm|x86_64) or explicit target triple
    #[arg(value_parser = resolve_arch)]
    pub arch: String,

    #[command(flatten)]
    pub target: TargetArgs,

    /// Directory holding built artifacts to stage; omit when a prior
    /// transfer step already filled the device holding area
    #[arg(long, value_name = "PATH")]
    pub artifact_dir: Option<PathBuf>,
}

pub fn run(ctx: &CliContext, args: InstallArgs) -> Result<()> {
    let target = args.target.resolve()?;
    if target.is_local() {
        privilege::require_root("install")?;
    }

    provision_fs::ensure_dir(&ctx.paths.root, constants::ROOT_DIR_MODE)?;
    let _lock = RunLock::acquire(&ctx.paths.run_lock)?;

    let chan = open_channel(&target);
    let orch = Orchestrator::new(
        chan.as_ref(),
        &ctx.manifest.services,
        &ctx.manifest.legacy_credential_globs,
    );

    let target_name = target.to_string();
    if let Some(artifact_dir) = &args.artifact_dir {
        println!("-- stage artifacts ({})", args.arch);
        if let Err(e) = orch.stage(artifact_dir, &args.arch) {
            ctx.record_failure("install", &target_name, &e.to_string());
            return Err(e.into());
        }
    }

    match orch.install() {
        Ok(report) => {
            ctx.record_report(&target_name, &report);
            if !report.reissued.is_empty() {
                println!(
                    "re-issued credentials for: {} (previous identity-provider \
                     registrations are now orphaned)",
                    report.reissued.join(", ")
                );
            }
            println!(
                "installed {} services on {}",
                ctx.manifest.services.len(),
                target_name
            );
            Ok(())
        }
        Err(e) => {
            ctx.record_failure("install", &target_name, &e.to_string());
            Err(e.into())
        }
    }
}

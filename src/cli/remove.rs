use crate::cli::{open_channel, CliContext, TargetArgs};
use crate::constants;
use crate::core::orchestrator::Orchestrator;
use crate::core::run_lock::RunLock;
use crate::util::fs as provision_fs;
use crate::util::privilege;
use anyhow::{bail, Result};
use clap::Args;
use dialoguer::Confirm;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub yes: bool,
}

pub fn run(ctx: &CliContext, args: RemoveArgs) -> Result<()> {
    let target = args.target.resolve()?;
    if target.is_local() {
        privilege::require_root("remove")?;
    }

    if !args.yes {
        if ctx.non_interactive {
            bail!("--non-interactive requires --yes for remove");
        }
        let prompt = format!(
            "Remove {} managed services and their credentials from {}?",
            ctx.manifest.services.len(),
            target
        );
        if !Confirm::new().with_prompt(prompt).default(false).interact()? {
            println!("aborted");
            return Ok(());
        }
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
    match orch.remove() {
        Ok(report) => {
            ctx.record_report(&target_name, &report);
            for warning in &report.warnings {
                eprintln!("warning: {}", warning);
            }
            println!(
                "removed {} services from {} ({} credential files deleted)",
                ctx.manifest.services.len(),
                target_name,
                report.removed_credentials.len()
            );
            Ok(())
        }
        Err(e) => {
            ctx.record_failure("remove", &target_name, &e.to_string());
            Err(e.into())
        }
    }
}

//! Dry-run preview of provisioning runs.
//!
//! Built entirely from the pure step transitions; nothing touches a device.

use crate::cli::CliContext;
use crate::core::state::{self, DeviceState, MountMode, Step};
use anyhow::Result;
use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum PlanCommand {
    /// Preview the install sequence
    Install(PlanArgs),
    /// Preview the remove sequence
    Remove(PlanArgs),
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Output format (text|json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run(ctx: &CliContext, cmd: PlanCommand) -> Result<()> {
    let services = &ctx.manifest.services;
    let globs = &ctx.manifest.legacy_credential_globs;
    let (action, steps, args) = match cmd {
        PlanCommand::Install(args) => ("install", state::install_steps(services), args),
        PlanCommand::Remove(args) => ("remove", state::remove_steps(services, globs), args),
    };

    let projected = steps
        .iter()
        .fold(DeviceState::pristine(), |state, step| {
            state::apply(&state, step)
        });

    if args.format == "json" {
        let plan = serde_json::json!({
            "action": action,
            "services": services.iter().map(|s| &s.name).collect::<Vec<_>>(),
            "steps": steps.iter().map(Step::phase).collect::<Vec<_>>(),
            "projected": projected,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Plan: {} ({} services)", action, services.len());
        for step in &steps {
            let marker = if step.tolerant() { "tolerant" } else { "fatal" };
            println!("  step: {} [{}]", step.phase(), marker);
        }
        println!("  projected credentials: {}", projected.credentials.len());
        println!("  projected enabled units: {}", projected.enabled.len());
        println!(
            "  projected mount: {}",
            match projected.mount {
                MountMode::ReadOnly => "read-only",
                MountMode::ReadWrite => "read-write",
            }
        );
        println!("\nNo changes made (dry-run).");
    }

    Ok(())
}

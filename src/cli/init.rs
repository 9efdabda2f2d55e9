use crate::cli::CliContext;
use crate::constants;
use crate::core::metadata;
use crate::models::manifest::ManifestFile;
use crate::util::fs as provision_fs;
use anyhow::Result;
use clap::Args;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Replace an existing manifest with the built-in defaults
    #[arg(long)]
    pub force: bool,
}

pub fn run(ctx: &CliContext, args: InitArgs) -> Result<()> {
    let paths = &ctx.paths;
    provision_fs::ensure_dir(&paths.root, constants::ROOT_DIR_MODE)?;

    let effective = if paths.manifest.exists() && !args.force {
        println!(
            "manifest already present at {} (use --force to replace)",
            paths.manifest.display()
        );
        ctx.manifest.clone()
    } else {
        let manifest = ManifestFile::default();
        metadata::save(&paths.manifest, &manifest)?;
        println!("wrote {}", paths.manifest.display());
        manifest
    };

    println!("provisioning root initialized at {}", paths.root.display());
    for service in &effective.services {
        println!("  service {} (scope {})", service.name, service.scope);
    }
    Ok(())
}

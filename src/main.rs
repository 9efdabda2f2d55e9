use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = uos_provision::cli::Cli::parse();
    cli.run()
}

use crate::cli::{open_channel, CliContext, TargetArgs};
use crate::util::channel::Channel;
use crate::util::systemctl;
use anyhow::Result;
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format: table|json
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Serialize)]
struct ServiceStatus {
    service: String,
    active: bool,
    enabled: bool,
    credential: bool,
}

pub fn run(ctx: &CliContext, args: StatusArgs) -> Result<()> {
    let target = args.target.resolve()?;
    let chan = open_channel(&target);

    let mut rows = Vec::new();
    for service in &ctx.manifest.services {
        let unit = service.unit_name();
        let cred_path = service.credential_path().display().to_string();
        rows.push(ServiceStatus {
            active: systemctl::is_active(chan.as_ref(), &unit)?,
            enabled: systemctl::is_enabled(chan.as_ref(), &unit)?,
            credential: chan.run("test", &["-e", cred_path.as_str()])?.success(),
            service: service.name.clone(),
        });
    }
    let root_mount = root_mount_mode(chan.as_ref())?;

    if args.format == "json" {
        let status = serde_json::json!({
            "target": target.to_string(),
            "root_mount": root_mount,
            "services": rows,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Service", "Active", "Enabled", "Credential"]);
        for row in &rows {
            table.add_row(vec![
                row.service.clone(),
                yes_no(row.active),
                yes_no(row.enabled),
                yes_no(row.credential),
            ]);
        }
        println!("{table}");
        println!("root mount: {}", root_mount);
    }

    Ok(())
}

fn yes_no(value: bool) -> String {
    let s = if value { "yes" } else { "no" };
    s.to_string()
}

fn root_mount_mode(chan: &dyn Channel) -> Result<String> {
    let out = chan.run("findmnt", &["-rn", "-o", "OPTIONS", "/"])?;
    if !out.success() {
        return Ok("unknown".to_string());
    }
    let options = out.stdout_utf8();
    let mode = if options
        .split(',')
        .any(|opt| opt.trim() == "ro")
    {
        "read-only"
    } else {
        "read-write"
    };
    Ok(mode.to_string())
}

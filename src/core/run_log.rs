//! Append-only provisioning run log.
//!
//! One JSON line per step, hash-chained so truncation or edits are
//! detectable. Metadata only: actions, targets, and outcomes, never
//! secret material.

use crate::constants;
use crate::core::paths::ProvisionPaths;
use crate::core::run_lock::RunLock;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    /// "install" or "remove".
    pub action: String,
    pub target: String,
    pub step: String,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_hash: Option<String>,
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Append one step record to the run log.
pub fn log_step(
    paths: &ProvisionPaths,
    action: &str,
    target: &str,
    step: &str,
    outcome: &str,
) -> Result<()> {
    let lock_path = paths.root.join("runs.lock");
    let _lock = RunLock::acquire(&lock_path)?;

    let mut entry = RunEntry {
        timestamp: Utc::now(),
        actor: detect_actor(),
        action: action.to_string(),
        target: target.to_string(),
        step: step.to_string(),
        outcome: outcome.to_string(),
        prev_hash: last_entry_hash(&paths.run_log)?,
        entry_hash: None,
    };
    entry.entry_hash = Some(compute_entry_hash(&entry)?);

    let line = serde_json::to_string(&entry).context("serialize run entry")?;
    append_line(&paths.run_log, &line)
}

/// Verify the hash chain; returns the number of valid entries.
pub fn verify_chain(log_path: &Path) -> Result<usize> {
    if !log_path.exists() {
        return Ok(0);
    }
    let file = std::fs::File::open(log_path)
        .with_context(|| format!("open run log {}", log_path.display()))?;
    let mut expected_prev: Option<String> = None;
    let mut count = 0usize;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: RunEntry = serde_json::from_str(&line)
            .with_context(|| format!("parse run log line {}", idx + 1))?;
        if entry.prev_hash != expected_prev {
            anyhow::bail!("hash chain broken at line {}", idx + 1);
        }
        let recorded = entry
            .entry_hash
            .clone()
            .with_context(|| format!("missing entry_hash at line {}", idx + 1))?;
        if compute_entry_hash(&entry)? != recorded {
            anyhow::bail!("entry hash mismatch at line {}", idx + 1);
        }
        expected_prev = Some(recorded);
        count += 1;
    }
    Ok(count)
}

fn compute_entry_hash(entry: &RunEntry) -> Result<String> {
    let mut unhashed = entry.clone();
    unhashed.entry_hash = None;
    let canonical = serde_json::to_string(&unhashed).context("serialize run entry for hash")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn last_entry_hash(log_path: &Path) -> Result<Option<String>> {
    if !log_path.exists() {
        return Ok(None);
    }
    let file = std::fs::File::open(log_path)
        .with_context(|| format!("open run log {}", log_path.display()))?;
    let mut last: Option<String> = None;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            last = Some(line);
        }
    }
    let Some(line) = last else {
        return Ok(None);
    };
    let entry: RunEntry = serde_json::from_str(&line).context("parse last run log line")?;
    Ok(entry.entry_hash)
}

fn append_line(log_path: &Path, line: &str) -> Result<()> {
    let created = !log_path.exists();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open run log {}", log_path.display()))?;
    writeln!(file, "{}", line).context("append run log line")?;

    #[cfg(unix)]
    if created {
        let perm = std::fs::Permissions::from_mode(constants::RUN_LOG_MODE);
        std::fs::set_permissions(log_path, perm)
            .with_context(|| format!("set permissions on {}", log_path.display()))?;
    }
    Ok(())
}

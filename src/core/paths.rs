//! Operator-side root resolution and derived paths.

use crate::constants;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Where the manifest, run log, and run lock live on the operator machine.
#[derive(Debug, Clone)]
pub struct ProvisionPaths {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub run_log: PathBuf,
    pub run_lock: PathBuf,
}

impl ProvisionPaths {
    /// Resolve the root from CLI arg, env var, or ancestor scan.
    pub fn resolve(root_arg: Option<PathBuf>) -> Result<Self> {
        if let Some(root) = root_arg {
            return Ok(Self::from_root(root));
        }
        if let Ok(root) = env::var("UOS_PROVISION_ROOT") {
            return Ok(Self::from_root(PathBuf::from(root)));
        }
        if let Some(found) = find_root()? {
            return Ok(Self::from_root(found));
        }
        Ok(Self::from_root(PathBuf::from(
            constants::DEFAULT_PROVISION_ROOT,
        )))
    }

    pub fn from_root(root: PathBuf) -> Self {
        let manifest = root.join("provision.toml");
        let run_log = root.join("runs.log");
        let run_lock = root.join("run.lock");
        Self {
            root,
            manifest,
            run_log,
            run_lock,
        }
    }
}

fn find_root() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir().context("resolve current directory")?;
    for ancestor in cwd.ancestors() {
        if looks_like_root(ancestor) {
            return Ok(Some(ancestor.to_path_buf()));
        }
    }
    Ok(None)
}

fn looks_like_root(path: &Path) -> bool {
    path.join("provision.toml").is_file()
}

impl std::fmt::Display for ProvisionPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provision@{}", self.root.display())
    }
}

//! Operator-side filesystem helpers.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Create a directory (and parents) if missing, then pin its mode.
pub fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("create directory {}", path.display()))?;
    }
    set_permissions(path, mode)
}

pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, perm)
            .with_context(|| format!("set permissions {:o} on {}", mode, path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested, 0o755).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("x");
        ensure_dir(&target, 0o700).unwrap();
        ensure_dir(&target, 0o700).unwrap();
        assert!(target.is_dir());
    }
}

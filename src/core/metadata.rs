//! Manifest load/save.

use crate::constants;
use crate::models::manifest::ManifestFile;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Load the manifest, falling back to the built-in registry when the file
/// does not exist. A present-but-malformed manifest is an error: running
/// against the wrong service set is worse than refusing to run.
pub fn load(path: &Path) -> Result<ManifestFile> {
    if !path.exists() {
        return Ok(ManifestFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read manifest {}", path.display()))?;
    let manifest: ManifestFile = toml::from_str(&content)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    Ok(manifest)
}

/// Atomically persist the manifest next to its final location.
pub fn save(path: &Path, manifest: &ManifestFile) -> Result<()> {
    let content = toml::to_string_pretty(manifest).context("serialize manifest")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let mut tmp =
        tempfile::NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))
            .context("create temp manifest")?;
    tmp.write_all(content.as_bytes()).context("write manifest")?;
    tmp.flush().ok();

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(constants::MANIFEST_FILE_MODE);
        tmp.as_file()
            .set_permissions(perm)
            .context("set permissions on temp manifest")?;
    }

    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("persist manifest: {}", err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let manifest = load(&dir.path().join("provision.toml")).unwrap();
        assert_eq!(manifest.services.len(), 2);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provision.toml");
        let manifest = ManifestFile::default();
        save(&path, &manifest).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded.services.len(), manifest.services.len());
        assert_eq!(loaded.services[0].name, manifest.services[0].name);
    }

    #[test]
    fn test_load_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provision.toml");
        std::fs::write(&path, "services = \"nope\"").unwrap();
        assert!(load(&path).is_err());
    }
}

//! One provisioning run at a time.
//!
//! Concurrent runs against the same device would race on the credential
//! store and the read-write/read-only mount toggle, so a run holds an
//! exclusive flock(2) for its whole duration. Fail-fast: a held lock means
//! another run is active, and waiting for it would just replay its work.

use anyhow::{bail, Context, Result};
use fs2::FileExt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Exclusive run lock, released on drop.
#[derive(Debug)]
pub struct RunLock {
    _file: std::fs::File,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("open run lock {}", path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    // fs2 on Linux may report EAGAIN as Other
                    || e.raw_os_error() == Some(11) =>
            {
                bail!(
                    "another provisioning run is active (lock held at {})",
                    path.display()
                );
            }
            Err(e) => {
                return Err(e).with_context(|| format!("acquire run lock {}", path.display()));
            }
        }
        // Leave a hint for an operator inspecting a stuck lock.
        let _ = writeln!(file, "pid {}", std::process::id());
        Ok(Self { _file: file })
    }
}

//! Scoped write access to the device's root filesystem.
//!
//! "Filesystem made writable" is treated as an acquired resource: the guard
//! remounts read-write on acquisition and guarantees a remount read-only on
//! every exit path. A device left writable is a worse outcome than stale
//! files, so the drop path restores the hardened state even when the write
//! phase failed partway.

use crate::core::error::ProvisionError;
use crate::util::channel::Channel;
use crate::util::mountctl;

pub struct WriteMountGuard<'a> {
    chan: &'a dyn Channel,
    armed: bool,
}

impl std::fmt::Debug for WriteMountGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteMountGuard")
            .field("armed", &self.armed)
            .finish_non_exhaustive()
    }
}

impl<'a> WriteMountGuard<'a> {
    /// Remount read-write and grow the filesystem if the device ships the
    /// helper. A growfs failure aborts, but the guard is already armed, so
    /// the drop path still restores read-only.
    pub fn acquire(chan: &'a dyn Channel) -> Result<Self, ProvisionError> {
        mountctl::remount_rw(chan)?;
        let guard = Self { chan, armed: true };
        mountctl::growfs_if_present(chan)?;
        Ok(guard)
    }

    /// Explicit release; failing to restore read-only is a real error on
    /// the success path, not something to swallow.
    pub fn release(mut self) -> Result<(), ProvisionError> {
        self.armed = false;
        mountctl::remount_ro(self.chan)
    }
}

impl Drop for WriteMountGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = mountctl::remount_ro(self.chan) {
                eprintln!("warning: failed to remount root read-only: {}", e);
            }
        }
    }
}

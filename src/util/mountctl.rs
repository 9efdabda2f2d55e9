//! Root filesystem mount control.
//!
//! u-OS devices run with a read-only root; file removal requires a
//! remount,rw / remount,ro pair around the write phase.

use crate::constants;
use crate::core::error::ProvisionError;
use crate::util::channel::Channel;

pub fn remount_rw(chan: &dyn Channel) -> Result<(), ProvisionError> {
    remount(chan, "remount,rw")
}

pub fn remount_ro(chan: &dyn Channel) -> Result<(), ProvisionError> {
    remount(chan, "remount,ro")
}

fn remount(chan: &dyn Channel, options: &str) -> Result<(), ProvisionError> {
    let out = chan.run("mount", &["-o", options, "/"])?;
    if out.success() {
        Ok(())
    } else {
        Err(ProvisionError::Step {
            step: "mount -o remount /",
            reason: format!("{}: {}", options, out.failure_detail()),
        })
    }
}

/// Run the grow-filesystem helper when the image ships it.
///
/// Returns whether it ran. The helper failing while present is fatal: the
/// write phase cannot be trusted on a filesystem that failed to grow.
pub fn growfs_if_present(chan: &dyn Channel) -> Result<bool, ProvisionError> {
    let probe = chan.run("test", &["-x", constants::GROWFS_HELPER])?;
    if !probe.success() {
        return Ok(false);
    }
    let out = chan.run(constants::GROWFS_HELPER, &[])?;
    if out.success() {
        Ok(true)
    } else {
        Err(ProvisionError::Step {
            step: "grow filesystem",
            reason: out.failure_detail(),
        })
    }
}

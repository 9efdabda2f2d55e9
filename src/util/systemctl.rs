//! systemctl operations through a channel, with absence classification.
//!
//! Stop/disable/enable run as one batch over the whole managed name list so
//! the service manager applies dependency ordering itself.

use crate::core::error::{ProvisionError, StepOutcome};
use crate::util::channel::{Channel, ExecOutput};

/// Stop a batch of units. A unit that is not running or not registered at
/// all counts as `AlreadyAbsent`, not a failure.
pub fn stop(chan: &dyn Channel, units: &[String]) -> Result<StepOutcome, ProvisionError> {
    batch(chan, "systemctl stop", &["stop"], units)
}

/// Disable a batch of units; tolerates units that were never installed.
pub fn disable(chan: &dyn Channel, units: &[String]) -> Result<StepOutcome, ProvisionError> {
    batch(chan, "systemctl disable", &["disable"], units)
}

/// Enable and start a batch of units. Always fatal on failure: a unit that
/// cannot be enabled here means the install itself is broken.
pub fn enable_now(chan: &dyn Channel, units: &[String]) -> Result<StepOutcome, ProvisionError> {
    let mut args: Vec<&str> = vec!["enable", "--now"];
    args.extend(units.iter().map(String::as_str));
    let out = chan.run("systemctl", &args)?;
    if out.success() {
        Ok(StepOutcome::Applied)
    } else {
        Err(step_error("systemctl enable --now", &out))
    }
}

pub fn daemon_reload(chan: &dyn Channel) -> Result<StepOutcome, ProvisionError> {
    let out = chan.run("systemctl", &["daemon-reload"])?;
    if out.success() {
        Ok(StepOutcome::Applied)
    } else {
        Err(step_error("systemctl daemon-reload", &out))
    }
}

pub fn restart(chan: &dyn Channel, unit: &str) -> Result<StepOutcome, ProvisionError> {
    let out = chan.run("systemctl", &["restart", unit])?;
    if out.success() {
        Ok(StepOutcome::Applied)
    } else if absence_only(&out.stderr_utf8()) {
        Ok(StepOutcome::AlreadyAbsent)
    } else {
        Err(step_error("systemctl restart", &out))
    }
}

pub fn is_active(chan: &dyn Channel, unit: &str) -> Result<bool, ProvisionError> {
    Ok(chan.run("systemctl", &["is-active", unit])?.success())
}

pub fn is_enabled(chan: &dyn Channel, unit: &str) -> Result<bool, ProvisionError> {
    Ok(chan.run("systemctl", &["is-enabled", unit])?.success())
}

fn batch(
    chan: &dyn Channel,
    step: &'static str,
    action: &[&str],
    units: &[String],
) -> Result<StepOutcome, ProvisionError> {
    if units.is_empty() {
        return Ok(StepOutcome::AlreadyAbsent);
    }
    let mut args: Vec<&str> = action.to_vec();
    args.extend(units.iter().map(String::as_str));
    let out = chan.run("systemctl", &args)?;
    if out.success() {
        Ok(StepOutcome::Applied)
    } else if absence_only(&out.stderr_utf8()) {
        Ok(StepOutcome::AlreadyAbsent)
    } else {
        Err(step_error(step, &out))
    }
}

/// True when every stderr line reports a missing unit rather than a real
/// failure. A batch where some units existed and some did not still lands
/// here; the units that existed were acted on.
fn absence_only(stderr: &str) -> bool {
    let mut lines = stderr.lines().filter(|l| !l.trim().is_empty()).peekable();
    if lines.peek().is_none() {
        return false;
    }
    lines.all(|line| {
        line.contains("not loaded")
            || line.contains("does not exist")
            || line.contains("not found")
            || line.contains("No such file")
    })
}

fn step_error(step: &'static str, out: &ExecOutput) -> ProvisionError {
    ProvisionError::Step {
        step,
        reason: out.failure_detail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::channel::testing::FakeDevice;

    fn units(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_stop_missing_units_is_already_absent() {
        let device = FakeDevice::new();
        let outcome = stop(&device, &units(&["ghost.service"])).unwrap();
        assert_eq!(outcome, StepOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_stop_running_unit_applies() {
        let device = FakeDevice::new();
        device.running.borrow_mut().insert("svc.service".to_string());
        let outcome = stop(&device, &units(&["svc.service"])).unwrap();
        assert_eq!(outcome, StepOutcome::Applied);
        assert!(!device.running.borrow().contains("svc.service"));
    }

    #[test]
    fn test_disable_missing_unit_is_already_absent() {
        let device = FakeDevice::new();
        let outcome = disable(&device, &units(&["ghost.service"])).unwrap();
        assert_eq!(outcome, StepOutcome::AlreadyAbsent);
    }

    #[test]
    fn test_enable_now_missing_unit_file_is_fatal() {
        let device = FakeDevice::new();
        let err = enable_now(&device, &units(&["ghost.service"])).unwrap_err();
        assert!(matches!(err, ProvisionError::Step { .. }));
    }

    #[test]
    fn test_stop_unrelated_failure_is_fatal() {
        let device = FakeDevice::new();
        device.fail_matching("systemctl stop", 1, "Access denied");
        let err = stop(&device, &units(&["svc.service"])).unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let device = FakeDevice::new();
        assert_eq!(stop(&device, &[]).unwrap(), StepOutcome::AlreadyAbsent);
        assert!(device.calls.borrow().is_empty());
    }

    #[test]
    fn test_absence_only_classification() {
        assert!(absence_only("Unit x.service not loaded."));
        assert!(absence_only(
            "Unit file a.service does not exist.\nUnit file b.service does not exist."
        ));
        assert!(!absence_only("Access denied"));
        assert!(!absence_only(""));
        assert!(!absence_only("Unit x not loaded.\nAccess denied"));
    }
}

//! Sealing secrets into the device credential store.
//!
//! Wraps `systemd-creds encrypt` with the plaintext on stdin so it never
//! touches a filesystem. The credential name is passed as the encryption
//! context, binding the sealed blob to its service: a renamed file will not
//! decrypt under another identity.

use crate::core::error::ProvisionError;
use crate::util::channel::Channel;
use std::path::Path;

pub fn seal(
    chan: &dyn Channel,
    name: &str,
    plaintext: &[u8],
    output: &Path,
) -> Result<(), ProvisionError> {
    let name_arg = format!("--name={}", name);
    let output_arg = output.display().to_string();
    let out = chan.run_with_input(
        "systemd-creds",
        &["encrypt", name_arg.as_str(), "-", output_arg.as_str()],
        plaintext,
    )?;
    if out.success() {
        Ok(())
    } else {
        Err(ProvisionError::Step {
            step: "systemd-creds encrypt",
            reason: out.failure_detail(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::channel::testing::FakeDevice;
    use std::path::PathBuf;

    #[test]
    fn test_seal_binds_name_and_writes_output() {
        let device = FakeDevice::new();
        let out = PathBuf::from("/var/lib/uos-identity/credstore/svc.creds");
        seal(&device, "svc", b"CLIENT_ID=a\nCLIENT_SECRET=b", &out).unwrap();
        assert!(device.files.borrow().contains(&out.display().to_string()));
        let sealed = device.sealed.borrow();
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].0, "svc");
        assert_eq!(sealed[0].1, b"CLIENT_ID=a\nCLIENT_SECRET=b");
    }

    #[test]
    fn test_seal_failure_is_step_error() {
        let device = FakeDevice::new();
        device.fail_matching("systemd-creds", 1, "No encryption key");
        let err = seal(&device, "svc", b"x", Path::new("/tmp/x.creds")).unwrap_err();
        assert!(err.to_string().contains("No encryption key"));
    }
}

//! Centralized constants for device paths, units, and modes.

/// Default operator-side root directory (manifest, run log, lock).
pub const DEFAULT_PROVISION_ROOT: &str = "/var/lib/uos-provision";

/// Final location for delivered executables on the device.
pub const DEVICE_BIN_DIR: &str = "/usr/local/bin";

/// Systemd unit directory on the device.
pub const DEVICE_UNIT_DIR: &str = "/etc/systemd/system";

/// Holding area where staged artifacts await installation.
pub const DEVICE_STAGING_DIR: &str = "/tmp/uos-example-services";

/// Encrypted credential store watched by the identity provider.
pub const DEVICE_CREDSTORE_DIR: &str = "/var/lib/uos-identity/credstore";

/// Admin socket of the device-local identity provider.
pub const IDP_ADMIN_SOCKET: &str = "/run/uos-identity/admin.sock";

/// Client registration endpoint behind the admin socket.
pub const IDP_ADMIN_CLIENTS_URL: &str = "http://localhost/admin/clients";

/// Unit that syncs identity-provider clients from the credstore.
pub const CLIENT_CREATOR_UNIT: &str = "uos-client-creator.service";

/// Helper that grows the root filesystem on first writable mount.
pub const GROWFS_HELPER: &str = "/usr/sbin/uos-growfs";

/// File extension for sealed credential files.
pub const CRED_EXTENSION: &str = ".creds";

/// Mode passed to chmod for delivered executables.
pub const EXEC_FILE_MODE: &str = "755";

/// Permission mode for the operator root directory.
pub const ROOT_DIR_MODE: u32 = 0o755;

/// Permission mode for provision.toml.
pub const MANIFEST_FILE_MODE: u32 = 0o640;

/// Permission mode for the run log.
pub const RUN_LOG_MODE: u32 = 0o640;

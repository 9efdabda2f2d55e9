pub mod error;
pub mod issuer;
pub mod metadata;
pub mod mount_guard;
pub mod orchestrator;
pub mod paths;
pub mod run_lock;
pub mod run_log;
pub mod state;

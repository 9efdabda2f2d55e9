//! Provisioning CLI for u-OS example services.
//!
//! Mints OAuth2 machine-client credentials against the device-local identity
//! provider, delivers executables and systemd units, and drives the managed
//! services through an install/remove lifecycle that tolerates partial prior
//! state (interrupted runs, already-stopped units, credentials left behind by
//! renamed services).
//!
//! ## Modules
//! - `cli` — Command-line handlers
//! - `core` — Orchestration logic (issuer, state machine, mount guard, run log)
//! - `models` — Data structures (service registry, manifest, target)
//! - `util` — Execution channels and system-tool wrappers

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod util;

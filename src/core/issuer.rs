//! Machine-client credential issuance.
//!
//! The identity provider's admin API is reachable only over a socket local
//! to the device, so the registration request runs on the device itself,
//! through the channel. The returned secret is formatted as an env file and
//! sealed straight into the credential store; it never persists anywhere
//! else and never crosses back to the operator.

use crate::constants;
use crate::core::error::ProvisionError;
use crate::models::service::ServiceSpec;
use crate::util::channel::Channel;
use crate::util::sealer;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

#[derive(Serialize)]
struct AdminClientRequest<'a> {
    client_name: &'a str,
    grant_types: [&'a str; 1],
    owner: &'a str,
    scope: &'a str,
    token_endpoint_auth_method: &'a str,
}

#[derive(Deserialize)]
struct AdminClientResponse {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
}

/// Register a client-credentials OAuth2 client for `service` and seal the
/// result into the device credential store.
///
/// Each call creates a fresh registration; the admin API offers no
/// lookup-by-name, so idempotency is handled one level up by reporting
/// re-issues instead of deduplicating here.
pub fn issue(chan: &dyn Channel, service: &ServiceSpec) -> Result<(), ProvisionError> {
    let request = AdminClientRequest {
        client_name: &service.name,
        grant_types: ["client_credentials"],
        owner: "System",
        scope: &service.scope,
        token_endpoint_auth_method: "client_secret_basic",
    };
    let payload = serde_json::to_vec(&request).map_err(|e| issuance(service, e.to_string()))?;

    let out = chan.run_with_input(
        "curl",
        &[
            "-sS",
            "--fail-with-body",
            "--unix-socket",
            constants::IDP_ADMIN_SOCKET,
            "-H",
            "Content-Type: application/json",
            "--data-binary",
            "@-",
            constants::IDP_ADMIN_CLIENTS_URL,
        ],
        &payload,
    )?;
    if !out.success() {
        return Err(issuance(
            service,
            format!("identity provider request failed: {}", out.failure_detail()),
        ));
    }

    let response: AdminClientResponse = serde_json::from_slice(&out.stdout).map_err(|e| {
        issuance(
            service,
            format!(
                "malformed registration response: {} (body was: {})",
                e,
                out.stdout_utf8().trim()
            ),
        )
    })?;
    if response.client_id.is_empty() || response.client_secret.is_empty() {
        return Err(issuance(
            service,
            "registration response missing client_id or client_secret".to_string(),
        ));
    }

    let blob = Zeroizing::new(
        format!(
            "CLIENT_ID={}\nCLIENT_SECRET={}",
            response.client_id, response.client_secret
        )
        .into_bytes(),
    );
    sealer::seal(chan, &service.name, &blob, &service.credential_path()).map_err(|e| match e {
        ProvisionError::Transport(_) => e,
        other => issuance(service, other.to_string()),
    })
}

/// Whether a sealed credential for `service` already exists on the device.
pub fn credential_exists(
    chan: &dyn Channel,
    service: &ServiceSpec,
) -> Result<bool, ProvisionError> {
    let path = service.credential_path().display().to_string();
    Ok(chan.run("test", &["-e", &path])?.success())
}

fn issuance(service: &ServiceSpec, reason: String) -> ProvisionError {
    ProvisionError::CredentialIssuance {
        service: service.name.clone(),
        reason,
    }
}

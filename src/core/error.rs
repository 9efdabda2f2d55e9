//! Error taxonomy and per-step outcome classification.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal provisioning failures. Steps whose purpose is cleanup of something
/// that may already be gone never surface these; everything that establishes
/// new state aborts the run on the first one.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("credential issuance failed for '{service}': {reason}")]
    CredentialIssuance { service: String, reason: String },

    #[error("staged artifact missing: {} (did the build/transfer step run?)", .0.display())]
    MissingStagedArtifact(PathBuf),

    #[error("{step} failed: {reason}")]
    Step {
        step: &'static str,
        reason: String,
    },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What actually happened when a step ran.
///
/// `AlreadyAbsent` is distinct from `Applied` so tests and the run log can
/// tell "nothing to do" apart from real work; `Tolerated` records a failure
/// that a cleanup step swallowed rather than aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    AlreadyAbsent,
    Tolerated(String),
}

impl StepOutcome {
    /// Combine outcomes of sub-operations within one step.
    pub fn merge(self, other: StepOutcome) -> StepOutcome {
        match (self, other) {
            (StepOutcome::Tolerated(a), _) => StepOutcome::Tolerated(a),
            (_, StepOutcome::Tolerated(b)) => StepOutcome::Tolerated(b),
            (StepOutcome::Applied, _) | (_, StepOutcome::Applied) => StepOutcome::Applied,
            _ => StepOutcome::AlreadyAbsent,
        }
    }

    pub fn label(&self) -> String {
        match self {
            StepOutcome::Applied => "applied".to_string(),
            StepOutcome::AlreadyAbsent => "already-absent".to_string(),
            StepOutcome::Tolerated(reason) => format!("tolerated: {}", reason),
        }
    }
}

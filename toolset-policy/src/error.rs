//! Errors raised when a policy refuses an activation.

use thiserror::Error;
use toolset_primitives::LayerId;

/// Errors surfaced by policy checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A layer may not coexist with one that is already active.
    #[error("layer `{layer}` cannot coexist with active layer `{conflicting}`")]
    ExclusivityConflict {
        /// Layer that was being activated.
        layer: LayerId,
        /// Active layer it conflicts with.
        conflicting: LayerId,
    },

    /// A required external credential is not configured.
    #[error("credential `{key}` is not configured")]
    MissingCredential {
        /// Credential identifier.
        key: String,
    },
}

/// Result alias for policy checks.
pub type PolicyResult<T> = Result<T, PolicyError>;

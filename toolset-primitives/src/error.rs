//! Shared error definitions for toolset primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the toolset runtime.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating toolset primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided session identifier could not be parsed.
    #[error("invalid session id: {source}")]
    InvalidSessionId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// Tool name failed validation.
    #[error("invalid tool name `{name}`: {reason}")]
    InvalidToolName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Category identifier is not part of the closed category set.
    #[error("unknown category `{id}`")]
    UnknownCategory {
        /// The identifier that failed to parse.
        id: String,
    },
}

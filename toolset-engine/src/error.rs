//! Engine error taxonomy.

use thiserror::Error;
use toolset_catalog::CatalogError;
use toolset_primitives::{LayerId, ToolName};
use toolset_store::{StoreError, ToolError};

use crate::lifecycle::LifecycleError;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a request or a session build without mutation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateName {
        /// Name of the offending tool.
        name: ToolName,
    },

    /// Referenced tool is not registered.
    #[error("tool `{name}` is not registered")]
    UnknownTool {
        /// The unknown name.
        name: String,
    },

    /// Referenced category or subcategory is not configured.
    #[error("unknown category `{id}`")]
    UnknownCategory {
        /// The unknown identifier.
        id: String,
    },

    /// Dependency edges form a cycle.
    #[error("dependency cycle through {}", format_cycle(cycle))]
    CyclicDependency {
        /// Tools on the cycle, sorted by name.
        cycle: Vec<ToolName>,
    },

    /// Tool exists but is not in the active set.
    #[error("tool `{name}` is not active; activate its toolset first")]
    ToolInactive {
        /// Name of the inactive tool.
        name: ToolName,
    },

    /// The startup active set exceeds the configured bound.
    #[error("initial active set has {size} tools, above the limit of {limit}")]
    InitialSetTooLarge {
        /// Size of the computed initial set.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Tool metadata is inconsistent with the configuration.
    #[error("invalid metadata for `{name}`: {reason}")]
    InvalidMetadata {
        /// Name of the offending tool.
        name: ToolName,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Discovery-tool arguments could not be decoded.
    #[error("invalid arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A default tool cannot coexist with the rest of the default set.
    #[error("default tool `{name}` conflicts with layer `{conflicting}`")]
    DefaultConflict {
        /// Name of the refused default tool.
        name: ToolName,
        /// Layer it conflicts with.
        conflicting: LayerId,
    },

    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] CatalogError),

    /// Layer lifecycle rejected a transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// A host tool failed.
    #[error("tool `{name}` failed: {source}")]
    Tool {
        /// Name of the failing tool.
        name: ToolName,
        /// Executor error.
        #[source]
        source: ToolError,
    },
}

impl EngineError {
    /// Stable error code used in structured error payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateName { .. } => "DuplicateNameError",
            Self::UnknownTool { .. } => "UnknownToolError",
            Self::UnknownCategory { .. } => "UnknownCategoryError",
            Self::CyclicDependency { .. } => "CyclicDependencyError",
            Self::ToolInactive { .. } => "ToolInactiveError",
            Self::InitialSetTooLarge { .. } => "InitialSetTooLargeError",
            Self::DefaultConflict { .. } => "DefaultConflictError",
            Self::InvalidMetadata { .. } => "InvalidMetadataError",
            Self::InvalidArguments { .. } => "InvalidArgumentsError",
            Self::Config(_) => "ConfigurationError",
            Self::Lifecycle(_) => "LifecycleError",
            Self::Tool { .. } => "ToolExecutionError",
        }
    }

    /// Builds an argument error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateName { name } => Self::DuplicateName { name },
            StoreError::NotFound { name } => Self::UnknownTool { name },
            StoreError::UnknownCategory { category } => Self::UnknownCategory {
                id: category.to_string(),
            },
            StoreError::InvalidMetadata { name, reason } => Self::InvalidMetadata { name, reason },
        }
    }
}

fn format_cycle(cycle: &[ToolName]) -> String {
    cycle
        .iter()
        .map(ToolName::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolset_primitives::Category;

    #[test]
    fn store_errors_map_to_engine_codes() {
        let err = EngineError::from(StoreError::NotFound {
            name: "ghost".into(),
        });
        assert_eq!(err.kind(), "UnknownToolError");

        let err = EngineError::from(StoreError::UnknownCategory {
            category: Category::Maintenance,
        });
        assert!(matches!(&err, EngineError::UnknownCategory { id } if id == "maintenance"));
        assert_eq!(err.kind(), "UnknownCategoryError");
    }

    #[test]
    fn cycle_message_lists_members() {
        let err = EngineError::CyclicDependency {
            cycle: vec![ToolName::from_static("a"), ToolName::from_static("b")],
        };
        assert_eq!(err.to_string(), "dependency cycle through a -> b");
        assert_eq!(err.kind(), "CyclicDependencyError");
    }
}

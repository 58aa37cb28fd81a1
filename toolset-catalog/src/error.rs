//! Error types for the metadata catalog.

use serde_json::Error as SerdeError;
use thiserror::Error;
use toolset_primitives::Category;

/// Errors emitted while building or validating catalog data.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The provided configuration was invalid.
    #[error("invalid toolset configuration: {0}")]
    InvalidConfig(&'static str),
    /// A category was declared more than once.
    #[error("category `{category}` is declared more than once")]
    DuplicateCategory {
        /// Offending category.
        category: Category,
    },
    /// A subcategory name was declared more than once within a category.
    #[error("subcategory `{name}` is declared more than once in `{category}`")]
    DuplicateSubcategory {
        /// Owning category.
        category: Category,
        /// Offending subcategory name.
        name: String,
    },
    /// Tool metadata failed validation.
    #[error("invalid tool metadata: {reason}")]
    InvalidMetadata {
        /// Human-readable reason for rejection.
        reason: String,
    },
    /// Primitive validation failed (tool names, category ids).
    #[error(transparent)]
    Primitive(#[from] toolset_primitives::Error),
    /// Serialization or deserialization error.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
}

impl CatalogError {
    /// Helper to construct metadata errors from string-like values.
    #[must_use]
    pub fn invalid_metadata(reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            reason: reason.into(),
        }
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

//! Core shared types for layered toolsets.

#![warn(missing_docs, clippy::pedantic)]

mod category;
mod error;
mod ids;
mod layer;
mod name;
mod pressure;

/// Closed set of tool categories.
pub use category::Category;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Identifier of the session owning a registry instance.
pub use ids::SessionId;
/// Activation layers, their states, and coexistence policies.
pub use layer::{ExclusivityPolicy, LayerId, LayerState};
/// Validated tool names.
pub use name::ToolName;
/// Context pressure levels.
pub use pressure::ContextPressure;

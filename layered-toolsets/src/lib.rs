//! Layered capability registry for MCP-style agents.
//!
//! Bundles the toolset crates behind feature flags. Most hosts only need
//! [`ToolsetSession`]: build it from a [`catalog::ToolsetConfig`], register
//! handlers, and route `tools/list` and `tools/call` through it.

#![warn(missing_docs, clippy::pedantic)]

/// Shared identifiers and closed enums.
pub use toolset_primitives as primitives;

/// Typed configuration, tool metadata, and the built-in catalog.
pub use toolset_catalog as catalog;

/// Tool trait, handlers, and the tool store.
pub use toolset_store as store;

/// Coexistence rules and credential providers (enabled by `policy` feature).
#[cfg(feature = "policy")]
pub use toolset_policy as policy;

/// Context budget tracking (enabled by `budget` feature).
#[cfg(feature = "budget")]
pub use toolset_budget as budget;

/// Activation engine and session (enabled by `engine` feature).
#[cfg(feature = "engine")]
pub use toolset_engine as engine;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use toolset_telemetry as telemetry;

#[cfg(feature = "engine")]
pub use toolset_engine::{ActivationRequest, ActivationResult, EngineError, SearchCriteria, ToolsetSession};

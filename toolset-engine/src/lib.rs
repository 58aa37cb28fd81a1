//! Layered activation engine.
//!
//! This crate turns the static catalog into a running, per-session registry:
//! dependency resolution, coexistence enforcement, per-layer lifecycle, budget
//! accounting, discovery queries, and the JSON handlers behind the four
//! always-available discovery tools.

#![warn(missing_docs, clippy::pedantic)]

pub mod activation;
pub mod discovery;
pub mod dispatch;
mod error;
pub mod lifecycle;
pub mod resolver;
mod session;
pub mod state;

pub use activation::{
    ActivationRequest, ActivationResult, Rejection, RejectionReason, Transition, plan_activation,
    plan_deactivation, plan_reset,
};
pub use discovery::{CategorySummary, SearchCriteria, SubcategorySummary, ToolSummary};
pub use dispatch::{DiscoveryTool, dispatch, error_payload};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{LayerEvent, LayerLifecycle, LifecycleError, LifecycleResult};
pub use resolver::DependencyResolver;
pub use session::{ToolsetSession, ToolsetSessionBuilder};
pub use state::{RegistryState, SUGGESTED_EVICTIONS};

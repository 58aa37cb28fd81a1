//! Policy checks applied while planning an activation.
//!
//! Two concerns live here: which layers may be active together, and whether
//! the credentials a tool needs are configured.

#![warn(missing_docs, clippy::pedantic)]

pub mod credentials;
pub mod decision;
pub mod error;
pub mod exclusivity;

pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials, require};
pub use decision::{CoexistenceDecision, EvictionCause};
pub use error::{PolicyError, PolicyResult};
pub use exclusivity::{CoexistencePlan, ExclusivityEnforcer, LayerProfile, conflicts};

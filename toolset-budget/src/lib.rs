//! Context budget tracking.
//!
//! Keeps the running cost of the active set, derives a pressure level from
//! it, and ranks active tools for eviction when the budget runs short.

#![warn(missing_docs, clippy::pedantic)]

pub mod eviction;
pub mod tracker;

pub use eviction::{EvictionCandidate, suggest_eviction};
pub use tracker::{BudgetSnapshot, BudgetTracker, BudgetWarning};

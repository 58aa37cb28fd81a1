//! Static metadata catalog and typed configuration.
//!
//! Everything here is immutable description: which categories exist, how
//! their layers coexist, what each tool costs and depends on, and how large
//! the context budget is. Runtime state lives in `toolset-store` and
//! `toolset-engine`.

#![warn(missing_docs, clippy::pedantic)]

pub mod budget;
pub mod builtin;
pub mod category;
pub mod config;
pub mod error;
pub mod tool;

pub use budget::{BudgetConfig, PressureThresholds};
pub use category::{CategoryConfig, SubcategoryConfig};
pub use config::{ActivationMode, ToolsetConfig};
pub use error::{CatalogError, CatalogResult};
pub use tool::{ToolDefinition, ToolDescriptor, ToolMetadata};

//! Tool registration and lookup.
//!
//! The store maps tool names to their descriptor, metadata, invocation handle,
//! and usage counters, and indexes them by activation layer. It knows nothing
//! about which tools are active.

#![warn(missing_docs, clippy::pedantic)]

pub mod store;
pub mod tool;

pub use store::{StoreError, StoreResult, ToolEntry, ToolStore, Tools, UsageStats};
pub use tool::{Tool, ToolError, ToolHandler, ToolResult};

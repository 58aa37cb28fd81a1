//! Invocation handles for registered tools.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Result alias for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Trait implemented by tool executors supplied by the host.
///
/// The registry treats implementations as opaque: it never inspects the
/// arguments or the output.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON input, returning JSON output.
    async fn invoke(&self, input: Value) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<Value> {
        (self)(input).await
    }
}

/// How a registered tool is executed.
#[derive(Clone)]
pub enum ToolHandler {
    /// Served by the registry itself (the discovery operations).
    Builtin,
    /// Delegated to a host-supplied executor.
    External(Arc<dyn Tool>),
}

impl ToolHandler {
    /// Wraps a host executor.
    #[must_use]
    pub fn external<T>(tool: T) -> Self
    where
        T: Tool + 'static,
    {
        Self::External(Arc::new(tool))
    }

    /// Returns `true` for registry-served tools.
    #[must_use]
    pub const fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin => f.write_str("Builtin"),
            Self::External(_) => f.write_str("External(dyn Tool)"),
        }
    }
}

/// Errors produced by tool executors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments could not be understood by the executor.
    #[error("invalid tool arguments: {reason}")]
    InvalidArguments {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Tool execution failed.
    #[error("tool execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates an argument error from the supplied reason.
    #[must_use]
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }
}

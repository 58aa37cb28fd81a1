//! JSON handlers for the four registry-served discovery tools.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use toolset_catalog::builtin;
use tracing::debug;

use crate::activation::ActivationRequest;
use crate::discovery::SearchCriteria;
use crate::error::{EngineError, EngineResult};
use crate::session::ToolsetSession;

/// Tools answered by the session itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryTool {
    /// Category summaries and the budget.
    DiscoverCapabilities,
    /// Activation and deactivation.
    ActivateToolset,
    /// Catalog search.
    SearchTools,
    /// Active tools and the budget.
    GetActiveTools,
}

impl DiscoveryTool {
    /// All discovery tools.
    pub const ALL: [Self; 4] = [
        Self::DiscoverCapabilities,
        Self::ActivateToolset,
        Self::SearchTools,
        Self::GetActiveTools,
    ];

    /// Looks up a discovery tool by its registered name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Registered tool name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DiscoverCapabilities => builtin::DISCOVER_CAPABILITIES,
            Self::ActivateToolset => builtin::ACTIVATE_TOOLSET,
            Self::SearchTools => builtin::SEARCH_TOOLS,
            Self::GetActiveTools => builtin::GET_ACTIVE_TOOLS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ActivateArgs {
    #[serde(flatten)]
    request: ActivationRequest,
    #[serde(default)]
    deactivate: Vec<String>,
}

/// Runs a discovery tool.
///
/// Never fails: request errors are returned as
/// `{"error": {"kind", "message"}}` so the agent can adjust and retry.
pub fn dispatch(session: &ToolsetSession, tool: DiscoveryTool, args: Value) -> Value {
    let args = if args.is_null() { json!({}) } else { args };
    match run(session, tool, args) {
        Ok(output) => output,
        Err(err) => {
            debug!(tool = tool.name(), kind = err.kind(), %err, "discovery request failed");
            error_payload(&err)
        }
    }
}

/// Structured error body returned inside a successful tool response.
#[must_use]
pub fn error_payload(err: &EngineError) -> Value {
    json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    })
}

fn run(session: &ToolsetSession, tool: DiscoveryTool, args: Value) -> EngineResult<Value> {
    match tool {
        DiscoveryTool::DiscoverCapabilities => Ok(json!({
            "categories": session.list_categories(),
            "budget": session.budget(),
        })),
        DiscoveryTool::ActivateToolset => {
            let ActivateArgs {
                request,
                deactivate,
            } = parse(args)?;
            if request.is_empty() && deactivate.is_empty() {
                return Err(EngineError::invalid_arguments(
                    "name at least one category, tool, or deactivation target",
                ));
            }
            let result = session.apply(&request, &deactivate)?;
            Ok(json!(result))
        }
        DiscoveryTool::SearchTools => {
            let criteria: SearchCriteria = parse(args)?;
            let tools = session.search(&criteria);
            Ok(json!({
                "total": tools.len(),
                "tools": tools,
            }))
        }
        DiscoveryTool::GetActiveTools => Ok(json!({
            "tools": session.list_active(),
            "budget": session.budget(),
        })),
    }
}

fn parse<T>(args: Value) -> EngineResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(args).map_err(|err| EngineError::invalid_arguments(err.to_string()))
}

//! Static per-tool descriptors and metadata.

use std::collections::BTreeSet;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolset_primitives::{Category, ExclusivityPolicy, ToolName};

use crate::error::{CatalogError, CatalogResult};

/// Agent-facing description of a tool: name, prose, and argument schema.
///
/// Serialized in the shape MCP `tools/list` responses use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    name: ToolName,
    description: String,
    #[serde(rename = "inputSchema", default = "empty_schema")]
    input_schema: Value,
}

fn empty_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl ToolDescriptor {
    /// Creates a descriptor with an empty object schema.
    #[must_use]
    pub fn new(name: ToolName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            input_schema: empty_schema(),
        }
    }

    /// Replaces the opaque argument schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        &self.name
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the argument schema. The registry never interprets it.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

/// Cost and relationship metadata attached 1:1 to a tool.
///
/// Usage counters are runtime state and live in the tool store, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,
    #[serde(default)]
    load_by_default: bool,
    #[serde(default)]
    priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<ToolName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requires_api_key: Option<String>,
    estimated_tokens: NonZeroU32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exclusivity: Option<ExclusivityPolicy>,
}

impl ToolMetadata {
    /// Creates metadata for a tool in `category` costing `estimated_tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMetadata`] if the estimate is zero.
    pub fn new(category: Category, estimated_tokens: u32) -> CatalogResult<Self> {
        let estimated_tokens = NonZeroU32::new(estimated_tokens)
            .ok_or_else(|| CatalogError::invalid_metadata("estimated tokens must be positive"))?;

        Ok(Self {
            category,
            subcategory: None,
            tags: BTreeSet::new(),
            load_by_default: false,
            priority: 0,
            dependencies: Vec::new(),
            requires_api_key: None,
            estimated_tokens,
            exclusivity: None,
        })
    }

    /// Assigns the tool to a named subcategory of its category.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidMetadata`] if the name is empty or
    /// contains `/`.
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> CatalogResult<Self> {
        let subcategory = subcategory.into();
        if subcategory.trim().is_empty() || subcategory.contains('/') {
            return Err(CatalogError::invalid_metadata(format!(
                "invalid subcategory name `{subcategory}`"
            )));
        }
        self.subcategory = Some(subcategory);
        Ok(self)
    }

    /// Adds search tags, ignoring empty or whitespace-only strings.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !tag.trim().is_empty() {
                self.tags.insert(tag);
            }
        }
        self
    }

    /// Marks the tool as part of the initial active set.
    #[must_use]
    pub fn load_by_default(mut self) -> Self {
        self.load_by_default = true;
        self
    }

    /// Sets the display priority. Lower sorts first.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declares tools that must be active whenever this tool is active.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<ToolName>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Names the external credential this tool cannot run without.
    #[must_use]
    pub fn requires_api_key(mut self, key: impl Into<String>) -> Self {
        self.requires_api_key = Some(key.into());
        self
    }

    /// Overrides the exclusivity policy inherited from the tool's layer.
    #[must_use]
    pub fn with_exclusivity(mut self, policy: ExclusivityPolicy) -> Self {
        self.exclusivity = Some(policy);
        self
    }

    /// Returns the owning category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the optional subcategory name.
    #[must_use]
    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    /// Returns the search tags.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns `true` when the tool itself asks to be loaded at startup.
    #[must_use]
    pub const fn is_load_by_default(&self) -> bool {
        self.load_by_default
    }

    /// Returns the display priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the declared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &[ToolName] {
        &self.dependencies
    }

    /// Returns the required credential key, if any.
    #[must_use]
    pub fn required_api_key(&self) -> Option<&str> {
        self.requires_api_key.as_deref()
    }

    /// Returns the estimated context cost in tokens.
    #[must_use]
    pub const fn estimated_tokens(&self) -> u32 {
        self.estimated_tokens.get()
    }

    /// Returns the per-tool exclusivity override, if any.
    #[must_use]
    pub const fn exclusivity_override(&self) -> Option<ExclusivityPolicy> {
        self.exclusivity
    }
}

/// A descriptor paired with its metadata, ready for registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Agent-facing descriptor.
    #[serde(flatten)]
    pub descriptor: ToolDescriptor,
    /// Registry metadata.
    pub metadata: ToolMetadata,
}

impl ToolDefinition {
    /// Pairs a descriptor with metadata.
    #[must_use]
    pub fn new(descriptor: ToolDescriptor, metadata: ToolMetadata) -> Self {
        Self {
            descriptor,
            metadata,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        self.descriptor.name()
    }
}

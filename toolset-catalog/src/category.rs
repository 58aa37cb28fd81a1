//! Category and subcategory definitions supplied at startup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use toolset_primitives::{Category, ExclusivityPolicy, ToolName};

/// Static definition of one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    /// Category identifier from the closed set.
    pub id: Category,
    /// Human-readable name shown by discovery.
    pub display_name: String,
    /// Short explanation of what the category offers.
    #[serde(default)]
    pub description: String,
    /// Loads every tool of the category at startup.
    #[serde(default)]
    pub load_by_default: bool,
    /// External credentials the category's tools rely on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_api_keys: Vec<String>,
    /// Coexistence policy for the category layer and its subcategories.
    #[serde(default)]
    pub exclusivity: ExclusivityPolicy,
    /// Categories a `selective` layer of this category may coexist with.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub coexists_with: BTreeSet<Category>,
    /// Named groupings within the category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<SubcategoryConfig>,
}

impl CategoryConfig {
    /// Creates a category definition with no policy, credentials, or
    /// subcategories.
    #[must_use]
    pub fn new(id: Category, display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            description: description.into(),
            load_by_default: false,
            required_api_keys: Vec::new(),
            exclusivity: ExclusivityPolicy::None,
            coexists_with: BTreeSet::new(),
            subcategories: Vec::new(),
        }
    }

    /// Marks the category as part of the initial active set.
    #[must_use]
    pub fn load_by_default(mut self) -> Self {
        self.load_by_default = true;
        self
    }

    /// Sets the coexistence policy.
    #[must_use]
    pub fn with_exclusivity(mut self, policy: ExclusivityPolicy) -> Self {
        self.exclusivity = policy;
        self
    }

    /// Whitelists categories a selective layer may coexist with.
    #[must_use]
    pub fn coexists_with<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.coexists_with.extend(categories);
        self
    }

    /// Declares an external credential used by the category.
    #[must_use]
    pub fn requires_api_key(mut self, key: impl Into<String>) -> Self {
        self.required_api_keys.push(key.into());
        self
    }

    /// Adds a subcategory.
    #[must_use]
    pub fn with_subcategory(mut self, subcategory: SubcategoryConfig) -> Self {
        self.subcategories.push(subcategory);
        self
    }

    /// Looks up a subcategory by name.
    #[must_use]
    pub fn subcategory(&self, name: &str) -> Option<&SubcategoryConfig> {
        self.subcategories.iter().find(|sub| sub.name == name)
    }
}

/// Named grouping within a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryConfig {
    /// Name, unique within the owning category.
    pub name: String,
    /// Short explanation shown by discovery.
    #[serde(default)]
    pub description: String,
    /// Activating this subcategory evicts every other non-permanent tool.
    #[serde(default)]
    pub exclusive: bool,
    /// Tools that must accompany any member of this subcategory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_load: Vec<ToolName>,
}

impl SubcategoryConfig {
    /// Creates a non-exclusive subcategory without companions.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            exclusive: false,
            auto_load: Vec::new(),
        }
    }

    /// Marks the subcategory exclusive.
    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Sets the companion tools loaded alongside any member.
    #[must_use]
    pub fn with_auto_load(mut self, tools: Vec<ToolName>) -> Self {
        self.auto_load = tools;
        self
    }
}

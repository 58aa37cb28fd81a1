//! Read-only queries over the catalog and the active set.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use toolset_primitives::{Category, ExclusivityPolicy, LayerId, LayerState, ToolName};
use toolset_policy::CredentialProvider;
use toolset_store::ToolEntry;

use crate::state::RegistryState;

/// Filters for [`search`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Case-insensitive substring matched against name, description, and tags.
    pub query: Option<String>,
    /// Restrict to these categories. Empty means all.
    pub categories: Vec<Category>,
    /// Tools must carry every one of these tags.
    pub tags: Vec<String>,
    /// `true` keeps tools that can run with the configured credentials;
    /// `false` keeps only tools whose credential is missing.
    pub has_api_key: Option<bool>,
    /// Maximum number of results. `None` means no truncation.
    pub limit: Option<usize>,
}

impl SearchCriteria {
    /// Matches everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the free-text query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Restricts to the given categories.
    #[must_use]
    pub fn with_categories<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.categories.extend(categories);
        self
    }

    /// Requires the given tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Filters on credential availability.
    #[must_use]
    pub fn with_api_key(mut self, available: bool) -> Self {
        self.has_api_key = Some(available);
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entry: &ToolEntry, credential_available: bool) -> bool {
        let metadata = entry.metadata();
        if !self.categories.is_empty() && !self.categories.contains(&metadata.category()) {
            return false;
        }
        if !self.tags.iter().all(|tag| metadata.tags().contains(tag)) {
            return false;
        }
        if let Some(wanted) = self.has_api_key {
            if wanted != credential_available {
                return false;
            }
        }
        let Some(query) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let query = query.to_lowercase();
        entry.name().as_str().contains(&query)
            || entry.descriptor().description().to_lowercase().contains(&query)
            || metadata
                .tags()
                .iter()
                .any(|tag| tag.to_lowercase().contains(&query))
    }
}

/// Discovery view of one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSummary {
    /// Tool name.
    pub name: ToolName,
    /// Free-form description.
    pub description: String,
    /// Owning category.
    pub category: Category,
    /// Subcategory, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    /// Search tags.
    pub tags: Vec<String>,
    /// Display priority.
    pub priority: i32,
    /// Estimated context cost.
    pub estimated_tokens: u32,
    /// Tools that must be active alongside.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ToolName>,
    /// Credential the tool needs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_api_key: Option<String>,
    /// The tool can run with the configured credentials.
    pub has_api_key: bool,
    /// Effective coexistence policy.
    pub exclusivity: ExclusivityPolicy,
    /// The tool is in the active set.
    pub active: bool,
}

impl ToolSummary {
    fn new(entry: &ToolEntry, active: bool, credentials: &dyn CredentialProvider) -> Self {
        let metadata = entry.metadata();
        Self {
            name: entry.name().clone(),
            description: entry.descriptor().description().to_owned(),
            category: metadata.category(),
            subcategory: metadata.subcategory().map(str::to_owned),
            tags: metadata.tags().iter().cloned().collect(),
            priority: metadata.priority(),
            estimated_tokens: metadata.estimated_tokens(),
            dependencies: metadata.dependencies().to_vec(),
            requires_api_key: metadata.required_api_key().map(str::to_owned),
            has_api_key: credential_available(entry, credentials),
            exclusivity: entry.policy(),
            active,
        }
    }
}

/// Discovery view of one subcategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubcategorySummary {
    /// Subcategory name.
    pub name: String,
    /// Short explanation.
    pub description: String,
    /// Activating it evicts every other non-permanent tool.
    pub exclusive: bool,
    /// Companion tools loaded with any member.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_load: Vec<ToolName>,
    /// Registered members.
    pub tool_count: usize,
    /// Active members.
    pub active_count: usize,
    /// Lifecycle state.
    pub state: LayerState,
}

/// Discovery view of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Category identifier.
    pub id: Category,
    /// Human-readable name.
    pub display_name: String,
    /// Short explanation.
    pub description: String,
    /// Registered tools across the category and its subcategories.
    pub tool_count: usize,
    /// Active tools across the category and its subcategories.
    pub active_count: usize,
    /// Aggregate estimated cost of every tool.
    pub estimated_tokens: u64,
    /// Credentials the category relies on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_api_keys: Vec<String>,
    /// Every required credential is configured.
    pub has_api_keys: bool,
    /// Loads at startup.
    pub load_by_default: bool,
    /// Coexistence policy.
    pub exclusivity: ExclusivityPolicy,
    /// Lifecycle state of the category layer.
    pub state: LayerState,
    /// Named groupings.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<SubcategorySummary>,
}

/// Summaries of every configured category, in declaration order of
/// [`Category`].
#[must_use]
pub fn list_categories(state: &RegistryState, credentials: &dyn CredentialProvider) -> Vec<CategorySummary> {
    let store = state.store();
    store
        .categories()
        .map(|config| {
            let members: Vec<&ToolName> = store.category_members(config.id).collect();
            let subcategories = config
                .subcategories
                .iter()
                .map(|sub| {
                    let layer = LayerId::subcategory(config.id, sub.name.clone());
                    let members: Vec<&ToolName> = store.layer_members(&layer).collect();
                    SubcategorySummary {
                        name: sub.name.clone(),
                        description: sub.description.clone(),
                        exclusive: sub.exclusive,
                        auto_load: sub.auto_load.clone(),
                        tool_count: members.len(),
                        active_count: members.iter().filter(|name| state.is_active(name)).count(),
                        state: state.layer_state(&layer),
                    }
                })
                .collect();

            CategorySummary {
                id: config.id,
                display_name: config.display_name.clone(),
                description: config.description.clone(),
                tool_count: members.len(),
                active_count: members.iter().filter(|name| state.is_active(name)).count(),
                estimated_tokens: store.category_tokens(config.id),
                required_api_keys: config.required_api_keys.clone(),
                has_api_keys: config
                    .required_api_keys
                    .iter()
                    .all(|key| credentials.has_credential(key)),
                load_by_default: config.load_by_default,
                exclusivity: config.exclusivity,
                state: state.layer_state(&LayerId::category(config.id)),
                subcategories,
            }
        })
        .collect()
}

/// Active tools in display order.
#[must_use]
pub fn list_active(state: &RegistryState, credentials: &dyn CredentialProvider) -> Vec<ToolSummary> {
    let mut entries: Vec<&ToolEntry> = state
        .active()
        .iter()
        .filter_map(|name| state.store().get(name.as_str()).ok())
        .collect();
    entries.sort_by(|a, b| display_order(a, b));
    entries
        .into_iter()
        .map(|entry| ToolSummary::new(entry, true, credentials))
        .collect()
}

/// Searches the full catalog, not just the active set.
#[must_use]
pub fn search(
    state: &RegistryState,
    credentials: &dyn CredentialProvider,
    criteria: &SearchCriteria,
) -> Vec<ToolSummary> {
    let mut entries: Vec<&ToolEntry> = state
        .store()
        .all()
        .filter(|entry| criteria.matches(entry, credential_available(entry, credentials)))
        .collect();
    entries.sort_by(|a, b| display_order(a, b));
    if let Some(limit) = criteria.limit {
        entries.truncate(limit);
    }
    entries
        .into_iter()
        .map(|entry| ToolSummary::new(entry, state.is_active(entry.name()), credentials))
        .collect()
}

/// Orders tools by ascending priority, then name.
pub(crate) fn display_order(a: &ToolEntry, b: &ToolEntry) -> Ordering {
    a.metadata()
        .priority()
        .cmp(&b.metadata().priority())
        .then_with(|| a.name().cmp(b.name()))
}

fn credential_available(entry: &ToolEntry, credentials: &dyn CredentialProvider) -> bool {
    entry
        .metadata()
        .required_api_key()
        .is_none_or(|key| credentials.has_credential(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_deserialize_with_defaults() {
        let criteria: SearchCriteria = serde_json::from_value(serde_json::json!({
            "query": "render",
            "categories": ["video-creation"],
            "limit": 3
        }))
        .unwrap();

        assert_eq!(
            criteria,
            SearchCriteria::new()
                .with_query("render")
                .with_categories([Category::VideoCreation])
                .with_limit(3)
        );
        assert!(criteria.tags.is_empty());
        assert!(criteria.has_api_key.is_none());
    }
}

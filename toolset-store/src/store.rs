//! Runtime map of registered tools and their category index.

use std::collections::{BTreeMap, BTreeSet, btree_map};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use toolset_catalog::{CategoryConfig, ToolDefinition, ToolDescriptor, ToolMetadata};
use toolset_primitives::{Category, ExclusivityPolicy, LayerId, ToolName};
use tracing::debug;

use crate::tool::ToolHandler;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by tool registration and lookup.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Tool name collided with an existing registration.
    #[error("tool `{name}` is already registered")]
    DuplicateName {
        /// Name of the offending tool.
        name: ToolName,
    },

    /// Requested tool does not exist.
    #[error("tool `{name}` is not registered")]
    NotFound {
        /// Name of the missing tool.
        name: String,
    },

    /// Tool metadata names a category the store was not configured with.
    #[error("category `{category}` is not configured")]
    UnknownCategory {
        /// The unconfigured category.
        category: Category,
    },

    /// Tool metadata is inconsistent with the category configuration.
    #[error("invalid metadata for `{name}`: {reason}")]
    InvalidMetadata {
        /// Name of the offending tool.
        name: ToolName,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

/// Mutable usage counters kept per tool.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Number of successful invocations.
    pub usage_frequency: u64,
    /// Time of the most recent successful invocation.
    pub last_activation: Option<DateTime<Utc>>,
}

/// A registered tool with its resolved layer and policy.
#[derive(Clone, Debug)]
pub struct ToolEntry {
    descriptor: ToolDescriptor,
    metadata: ToolMetadata,
    handler: ToolHandler,
    layer: LayerId,
    policy: ExclusivityPolicy,
    load_by_default: bool,
    usage: UsageStats,
}

impl ToolEntry {
    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        self.descriptor.name()
    }

    /// Returns the agent-facing descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Returns the registry metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Returns the invocation handle.
    #[must_use]
    pub fn handler(&self) -> &ToolHandler {
        &self.handler
    }

    /// Returns the layer the tool activates with: its subcategory when it has
    /// one, its category otherwise.
    #[must_use]
    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    /// Returns the effective exclusivity policy.
    #[must_use]
    pub const fn policy(&self) -> ExclusivityPolicy {
        self.policy
    }

    /// Returns `true` when the tool can never leave the active set.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        self.policy.is_permanent()
    }

    /// Returns `true` when the tool or its category loads at startup.
    #[must_use]
    pub const fn is_load_by_default(&self) -> bool {
        self.load_by_default
    }

    /// Returns the usage counters.
    #[must_use]
    pub fn usage(&self) -> &UsageStats {
        &self.usage
    }
}

/// Lazy, finite iterator over registered tools in name order.
///
/// Calling [`ToolStore::all`] again, or cloning, restarts the sequence.
#[derive(Clone, Debug)]
pub struct Tools<'a> {
    inner: btree_map::Values<'a, ToolName, ToolEntry>,
}

impl<'a> Iterator for Tools<'a> {
    type Item = &'a ToolEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Tools<'_> {}

/// Source of truth for which tools exist.
///
/// The store holds no active-set state; the engine owns that. Cloning is
/// cheap enough to stage a registration before committing it.
#[derive(Clone, Debug, Default)]
pub struct ToolStore {
    categories: BTreeMap<Category, CategoryConfig>,
    tools: BTreeMap<ToolName, ToolEntry>,
    index: BTreeMap<LayerId, BTreeSet<ToolName>>,
    category_tokens: BTreeMap<Category, u64>,
}

impl ToolStore {
    /// Creates an empty store for the supplied category definitions.
    #[must_use]
    pub fn new<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = CategoryConfig>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|config| (config.id, config))
                .collect(),
            ..Self::default()
        }
    }

    /// Registers a tool.
    ///
    /// Updates the layer index and recalculates the category's aggregate
    /// cost. Activation is the engine's concern.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateName`] if the name is already present,
    /// [`StoreError::UnknownCategory`] for an unconfigured category, and
    /// [`StoreError::InvalidMetadata`] for an undeclared subcategory.
    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: ToolHandler,
    ) -> StoreResult<&ToolEntry> {
        let ToolDefinition {
            descriptor,
            metadata,
        } = definition;
        let name = descriptor.name().clone();
        if self.tools.contains_key(&name) {
            return Err(StoreError::DuplicateName { name });
        }

        let category = metadata.category();
        let config = self
            .categories
            .get(&category)
            .ok_or(StoreError::UnknownCategory { category })?;

        let (layer, inherited) = match metadata.subcategory() {
            Some(sub) => {
                let sub_config =
                    config
                        .subcategory(sub)
                        .ok_or_else(|| StoreError::InvalidMetadata {
                            name: name.clone(),
                            reason: format!("subcategory `{sub}` is not declared in `{category}`"),
                        })?;
                let policy = if sub_config.exclusive {
                    ExclusivityPolicy::Exclusive
                } else {
                    config.exclusivity
                };
                (LayerId::subcategory(category, sub), policy)
            }
            None => (LayerId::category(category), config.exclusivity),
        };
        let policy = metadata.exclusivity_override().unwrap_or(inherited);
        let load_by_default = metadata.is_load_by_default() || config.load_by_default;

        self.index
            .entry(layer.clone())
            .or_default()
            .insert(name.clone());
        let entry = ToolEntry {
            descriptor,
            metadata,
            handler,
            layer,
            policy,
            load_by_default,
            usage: UsageStats::default(),
        };
        self.tools.insert(name.clone(), entry);
        self.recalculate_category_tokens(category);

        debug!(tool = %name, %category, ?policy, "tool registered");
        self.get(name.as_str())
    }

    /// Returns the tool registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such tool exists.
    pub fn get(&self, name: &str) -> StoreResult<&ToolEntry> {
        self.tools.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_owned(),
        })
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Iterates over every registered tool in name order.
    #[must_use]
    pub fn all(&self) -> Tools<'_> {
        Tools {
            inner: self.tools.values(),
        }
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the configuration of `category`.
    #[must_use]
    pub fn category(&self, category: Category) -> Option<&CategoryConfig> {
        self.categories.get(&category)
    }

    /// Iterates over configured categories in declaration order of
    /// [`Category`].
    pub fn categories(&self) -> impl Iterator<Item = &CategoryConfig> {
        self.categories.values()
    }

    /// Returns `true` when `layer` is a configured category or a declared
    /// subcategory.
    #[must_use]
    pub fn has_layer(&self, layer: &LayerId) -> bool {
        match layer {
            LayerId::Category { category } => self.categories.contains_key(category),
            LayerId::Subcategory { category, name } => self
                .categories
                .get(category)
                .is_some_and(|config| config.subcategory(name).is_some()),
        }
    }

    /// Tools registered directly in `layer`.
    pub fn layer_members(&self, layer: &LayerId) -> impl Iterator<Item = &ToolName> {
        self.index.get(layer).into_iter().flatten()
    }

    /// Every tool of `category`, across its category layer and subcategories.
    pub fn category_members(&self, category: Category) -> impl Iterator<Item = &ToolName> {
        self.index
            .iter()
            .filter(move |(layer, _)| layer.owner() == category)
            .flat_map(|(_, names)| names)
    }

    /// Coexistence policy of a layer, before per-tool overrides.
    #[must_use]
    pub fn layer_policy(&self, layer: &LayerId) -> ExclusivityPolicy {
        let Some(config) = self.categories.get(&layer.owner()) else {
            return ExclusivityPolicy::None;
        };
        match layer {
            LayerId::Subcategory { name, .. }
                if config.subcategory(name).is_some_and(|sub| sub.exclusive) =>
            {
                ExclusivityPolicy::Exclusive
            }
            _ => config.exclusivity,
        }
    }

    /// Categories a selective layer may coexist with.
    #[must_use]
    pub fn layer_whitelist(&self, layer: &LayerId) -> BTreeSet<Category> {
        self.categories
            .get(&layer.owner())
            .map(|config| config.coexists_with.clone())
            .unwrap_or_default()
    }

    /// Companion tools that must accompany any member of `layer`.
    #[must_use]
    pub fn auto_load(&self, layer: &LayerId) -> &[ToolName] {
        match layer {
            LayerId::Subcategory { category, name } => self
                .categories
                .get(category)
                .and_then(|config| config.subcategory(name))
                .map_or(&[], |sub| sub.auto_load.as_slice()),
            LayerId::Category { .. } => &[],
        }
    }

    /// Aggregate estimated cost of every tool in `category`.
    #[must_use]
    pub fn category_tokens(&self, category: Category) -> u64 {
        self.category_tokens.get(&category).copied().unwrap_or(0)
    }

    /// Records a successful invocation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such tool exists.
    pub fn record_invocation(&mut self, name: &str, at: DateTime<Utc>) -> StoreResult<()> {
        let entry = self
            .tools
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound {
                name: name.to_owned(),
            })?;
        entry.usage.usage_frequency += 1;
        entry.usage.last_activation = Some(at);
        Ok(())
    }

    fn recalculate_category_tokens(&mut self, category: Category) {
        let total = self
            .category_members(category)
            .filter_map(|name| self.tools.get(name))
            .map(|entry| u64::from(entry.metadata.estimated_tokens()))
            .sum();
        self.category_tokens.insert(category, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use toolset_catalog::SubcategoryConfig;

    fn categories() -> Vec<CategoryConfig> {
        vec![
            CategoryConfig::new(Category::Discovery, "Discovery", "")
                .load_by_default()
                .with_exclusivity(ExclusivityPolicy::Permanent),
            CategoryConfig::new(Category::AssetGeneration, "Assets", "").with_subcategory(
                SubcategoryConfig::new("images", "")
                    .exclusive()
                    .with_auto_load(vec![ToolName::from_static("list-assets")]),
            ),
        ]
    }

    fn definition(name: &str, category: Category, tokens: u32) -> ToolDefinition {
        ToolDefinition::new(
            ToolDescriptor::new(ToolName::new(name).unwrap(), format!("{name} tool")),
            ToolMetadata::new(category, tokens).unwrap(),
        )
    }

    #[test]
    fn register_and_get() {
        let mut store = ToolStore::new(categories());
        store
            .register(
                definition("search-tools", Category::Discovery, 300),
                ToolHandler::Builtin,
            )
            .unwrap();

        let entry = store.get("search-tools").unwrap();
        assert!(entry.is_permanent());
        assert!(entry.is_load_by_default());
        assert_eq!(entry.layer(), &LayerId::category(Category::Discovery));
        assert!(entry.handler().is_builtin());
    }

    #[test]
    fn duplicate_registration_errors() {
        let mut store = ToolStore::new(categories());
        store
            .register(
                definition("list-assets", Category::AssetGeneration, 100),
                ToolHandler::Builtin,
            )
            .unwrap();

        let err = store
            .register(
                definition("list-assets", Category::AssetGeneration, 999),
                ToolHandler::Builtin,
            )
            .expect_err("duplicate registration should fail");

        assert!(matches!(err, StoreError::DuplicateName { name } if name.as_str() == "list-assets"));
        assert_eq!(store.get("list-assets").unwrap().metadata().estimated_tokens(), 100);
    }

    #[test]
    fn unknown_tool_errors() {
        let store = ToolStore::new(categories());
        let err = store.get("missing").expect_err("unknown tool should error");
        assert!(matches!(err, StoreError::NotFound { name } if name == "missing"));
    }

    #[test]
    fn unconfigured_category_rejected() {
        let mut store = ToolStore::new(categories());
        let err = store
            .register(definition("render-video", Category::VideoCreation, 10), ToolHandler::Builtin)
            .expect_err("unconfigured");
        assert!(matches!(err, StoreError::UnknownCategory { category: Category::VideoCreation }));
    }

    #[test]
    fn subcategory_membership_and_policy() {
        let mut store = ToolStore::new(categories());
        let mut image = definition("generate-image", Category::AssetGeneration, 400);
        image.metadata = image.metadata.with_subcategory("images").unwrap();
        store.register(image, ToolHandler::Builtin).unwrap();

        let entry = store.get("generate-image").unwrap();
        let layer = LayerId::subcategory(Category::AssetGeneration, "images");
        assert_eq!(entry.layer(), &layer);
        assert_eq!(entry.policy(), ExclusivityPolicy::Exclusive);
        assert_eq!(store.layer_policy(&layer), ExclusivityPolicy::Exclusive);
        assert_eq!(store.auto_load(&layer)[0].as_str(), "list-assets");
        assert_eq!(store.layer_members(&layer).count(), 1);

        let mut stray = definition("sketch", Category::AssetGeneration, 10);
        stray.metadata = stray.metadata.with_subcategory("sketches").unwrap();
        let err = store.register(stray, ToolHandler::Builtin).expect_err("undeclared");
        assert!(matches!(err, StoreError::InvalidMetadata { .. }));
    }

    #[test]
    fn category_cost_is_recalculated() {
        let mut store = ToolStore::new(categories());
        store
            .register(definition("list-assets", Category::AssetGeneration, 200), ToolHandler::Builtin)
            .unwrap();
        assert_eq!(store.category_tokens(Category::AssetGeneration), 200);

        let mut image = definition("generate-image", Category::AssetGeneration, 450);
        image.metadata = image.metadata.with_subcategory("images").unwrap();
        store.register(image, ToolHandler::Builtin).unwrap();
        assert_eq!(store.category_tokens(Category::AssetGeneration), 650);
        assert_eq!(store.category_members(Category::AssetGeneration).count(), 2);
    }

    #[test]
    fn all_is_restartable() {
        let mut store = ToolStore::new(categories());
        for name in ["b-tool", "a-tool", "c-tool"] {
            store
                .register(definition(name, Category::AssetGeneration, 10), ToolHandler::Builtin)
                .unwrap();
        }

        let first: Vec<_> = store.all().map(|e| e.name().as_str()).collect();
        let second: Vec<_> = store.all().map(|e| e.name().as_str()).collect();
        assert_eq!(first, ["a-tool", "b-tool", "c-tool"]);
        assert_eq!(first, second);
        assert_eq!(store.all().len(), 3);
    }

    #[test]
    fn invocations_update_usage() {
        let mut store = ToolStore::new(categories());
        store
            .register(definition("list-assets", Category::AssetGeneration, 10), ToolHandler::Builtin)
            .unwrap();

        let now = Utc::now();
        store.record_invocation("list-assets", now).unwrap();
        store.record_invocation("list-assets", now).unwrap();

        let usage = store.get("list-assets").unwrap().usage();
        assert_eq!(usage.usage_frequency, 2);
        assert_eq!(usage.last_activation, Some(now));
    }
}

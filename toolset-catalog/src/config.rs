//! Top-level toolset configuration and its loaders.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::budget::BudgetConfig;
use crate::builtin;
use crate::category::CategoryConfig;
use crate::error::{CatalogError, CatalogResult};

/// How the initial active set is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Start with defaults and permanent tools; the agent expands on demand.
    #[default]
    Layered,
    /// Activate every category at startup and lift the initial-size limit.
    Legacy,
}

/// Startup configuration for one registry session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsetConfig {
    /// Category and subcategory definitions.
    pub categories: Vec<CategoryConfig>,
    /// Context budget.
    pub budget: BudgetConfig,
    /// Upper bound on the initial active set in layered mode. `None` means
    /// unbounded.
    pub max_initial_tools: Option<usize>,
    /// Initial activation mode.
    pub mode: ActivationMode,
}

impl Default for ToolsetConfig {
    fn default() -> Self {
        Self {
            categories: builtin::categories(),
            budget: BudgetConfig::default(),
            max_initial_tools: Some(12),
            mode: ActivationMode::Layered,
        }
    }
}

impl ToolsetConfig {
    /// Parses a JSON document. Missing fields fall back to the built-in
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Serialization`] for malformed JSON and any
    /// validation error from [`ToolsetConfig::validate`].
    pub fn from_json_str(json: &str) -> CatalogResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, parsed, or validated; the error
    /// carries the offending path.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading toolset config {}", path.display()))?;
        let config = Self::from_json_str(&raw)
            .with_context(|| format!("loading toolset config {}", path.display()))?;
        debug!(path = %path.display(), categories = config.categories.len(), "loaded toolset config");
        Ok(config)
    }

    /// Returns the definition of `category`, if configured.
    #[must_use]
    pub fn category(&self, category: toolset_primitives::Category) -> Option<&CategoryConfig> {
        self.categories.iter().find(|config| config.id == category)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateCategory`] or
    /// [`CatalogError::DuplicateSubcategory`] for repeated declarations,
    /// [`CatalogError::InvalidConfig`] for empty catalogs, invalid subcategory
    /// names, or an invalid budget.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.categories.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "at least one category must be configured",
            ));
        }

        let mut seen = BTreeSet::new();
        for category in &self.categories {
            if !seen.insert(category.id) {
                return Err(CatalogError::DuplicateCategory {
                    category: category.id,
                });
            }

            let mut names = BTreeSet::new();
            for sub in &category.subcategories {
                if sub.name.trim().is_empty() || sub.name.contains('/') {
                    return Err(CatalogError::InvalidConfig(
                        "subcategory names must be non-empty and cannot contain `/`",
                    ));
                }
                if !names.insert(sub.name.as_str()) {
                    return Err(CatalogError::DuplicateSubcategory {
                        category: category.id,
                        name: sub.name.clone(),
                    });
                }
            }
        }

        self.budget.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SubcategoryConfig;
    use toolset_primitives::Category;

    #[test]
    fn default_config_is_valid() {
        let config = ToolsetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.categories.len(), Category::ALL.len());
        assert_eq!(config.mode, ActivationMode::Layered);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            ToolsetConfig::from_json_str(r#"{ "budget": { "max_tokens": 4000 }, "mode": "legacy" }"#)
                .unwrap();

        assert_eq!(config.budget.max_tokens, 4000);
        assert!((config.budget.thresholds.high - 0.70).abs() < f64::EPSILON);
        assert_eq!(config.mode, ActivationMode::Legacy);
        assert_eq!(config.categories.len(), Category::ALL.len());
    }

    #[test]
    fn duplicate_categories_rejected() {
        let mut config = ToolsetConfig::default();
        config.categories.push(CategoryConfig::new(
            Category::Maintenance,
            "Maintenance again",
            "",
        ));

        let err = config.validate().expect_err("duplicate");
        assert!(matches!(
            err,
            CatalogError::DuplicateCategory { category: Category::Maintenance }
        ));
    }

    #[test]
    fn duplicate_subcategories_rejected() {
        let config = ToolsetConfig {
            categories: vec![
                CategoryConfig::new(Category::Maintenance, "Maintenance", "")
                    .with_subcategory(SubcategoryConfig::new("cleanup", ""))
                    .with_subcategory(SubcategoryConfig::new("cleanup", "")),
            ],
            ..ToolsetConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(CatalogError::DuplicateSubcategory { .. })
        ));
    }

    #[test]
    fn unknown_category_in_json_fails() {
        let err = ToolsetConfig::from_json_str(
            r#"{ "categories": [ { "id": "teleportation", "display_name": "x" } ] }"#,
        )
        .expect_err("unknown category");
        assert!(matches!(err, CatalogError::Serialization { .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ToolsetConfig::from_path("/nonexistent/toolsets.json").expect_err("missing");
        assert!(format!("{err:#}").contains("/nonexistent/toolsets.json"));
    }
}

//! Context budget configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Fractions of the budget at which pressure escalates.
///
/// A running weight below `medium` is low pressure; at or above `critical` it
/// is critical.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureThresholds {
    /// Lower bound of medium pressure.
    pub medium: f64,
    /// Lower bound of high pressure.
    pub high: f64,
    /// Lower bound of critical pressure.
    pub critical: f64,
}

impl Default for PressureThresholds {
    fn default() -> Self {
        Self {
            medium: 0.40,
            high: 0.70,
            critical: 0.90,
        }
    }
}

impl PressureThresholds {
    /// Validates that thresholds are strictly increasing fractions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] when a threshold falls outside
    /// `(0, 1]` or the ordering is not strictly increasing.
    pub fn validate(self) -> CatalogResult<()> {
        let in_range = |value: f64| value > 0.0 && value <= 1.0;
        if !(in_range(self.medium) && in_range(self.high) && in_range(self.critical)) {
            return Err(CatalogError::InvalidConfig(
                "pressure thresholds must lie in (0, 1]",
            ));
        }
        if !(self.medium < self.high && self.high < self.critical) {
            return Err(CatalogError::InvalidConfig(
                "pressure thresholds must be strictly increasing",
            ));
        }
        Ok(())
    }
}

/// Maximum context cost the active set may consume before pressure escalates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Budget in estimated tokens.
    pub max_tokens: u64,
    /// Pressure escalation points.
    pub thresholds: PressureThresholds,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: 12_000,
            thresholds: PressureThresholds::default(),
        }
    }
}

impl BudgetConfig {
    /// Validates the budget.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfig`] for a zero budget or invalid
    /// thresholds.
    pub fn validate(self) -> CatalogResult<()> {
        if self.max_tokens == 0 {
            return Err(CatalogError::InvalidConfig(
                "context budget must be greater than zero",
            ));
        }
        self.thresholds.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BudgetConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let config = BudgetConfig {
            thresholds: PressureThresholds {
                medium: 0.8,
                high: 0.7,
                critical: 0.9,
            },
            ..BudgetConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CatalogError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_budget() {
        let config = BudgetConfig {
            max_tokens: 0,
            ..BudgetConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

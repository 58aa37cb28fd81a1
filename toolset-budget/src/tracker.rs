//! Running weight of the active set and the pressure it implies.

use serde::Serialize;
use toolset_catalog::BudgetConfig;
use toolset_primitives::{ContextPressure, ToolName};
use tracing::debug;

/// Point-in-time view of the budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetSnapshot {
    /// Sum of estimated tokens over the active set.
    pub running_weight: u64,
    /// Configured budget.
    pub max_tokens: u64,
    /// Derived pressure level.
    pub pressure: ContextPressure,
}

/// Non-fatal notice that the active set is at or over its budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetWarning {
    /// Always `BudgetExceededWarning`.
    pub kind: &'static str,
    /// Human-readable summary.
    pub message: String,
    /// Active tools that could be dropped, least used first.
    pub suggested_evictions: Vec<ToolName>,
}

/// Tracks the running cost of the active set.
///
/// The weight is always replaced from a full recount, never adjusted
/// incrementally.
#[derive(Clone, Debug)]
pub struct BudgetTracker {
    config: BudgetConfig,
    running_weight: u64,
}

impl BudgetTracker {
    /// Creates a tracker with a zero running weight.
    #[must_use]
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            running_weight: 0,
        }
    }

    /// Replaces the running weight with the sum of `weights`.
    pub fn recompute<I>(&mut self, weights: I) -> ContextPressure
    where
        I: IntoIterator<Item = u32>,
    {
        self.running_weight = weights.into_iter().map(u64::from).sum();
        let pressure = self.pressure();
        debug!(running_weight = self.running_weight, %pressure, "budget recomputed");
        pressure
    }

    /// Current running weight.
    #[must_use]
    pub const fn running_weight(&self) -> u64 {
        self.running_weight
    }

    /// Configured budget.
    #[must_use]
    pub const fn max_tokens(&self) -> u64 {
        self.config.max_tokens
    }

    /// Pressure at the current running weight.
    #[must_use]
    pub fn pressure(&self) -> ContextPressure {
        self.pressure_for(self.running_weight)
    }

    /// Pressure a given weight would produce.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pressure_for(&self, weight: u64) -> ContextPressure {
        if self.config.max_tokens == 0 {
            return ContextPressure::Critical;
        }
        let ratio = weight as f64 / self.config.max_tokens as f64;
        let thresholds = self.config.thresholds;
        if ratio >= thresholds.critical {
            ContextPressure::Critical
        } else if ratio >= thresholds.high {
            ContextPressure::High
        } else if ratio >= thresholds.medium {
            ContextPressure::Medium
        } else {
            ContextPressure::Low
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            running_weight: self.running_weight,
            max_tokens: self.config.max_tokens,
            pressure: self.pressure(),
        }
    }

    /// Builds a warning when pressure is critical.
    #[must_use]
    pub fn warning(&self, suggested_evictions: Vec<ToolName>) -> Option<BudgetWarning> {
        (self.pressure() == ContextPressure::Critical).then(|| BudgetWarning {
            kind: "BudgetExceededWarning",
            message: format!(
                "active tools use {} of {} budgeted tokens",
                self.running_weight, self.config.max_tokens
            ),
            suggested_evictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(max_tokens: u64) -> BudgetTracker {
        BudgetTracker::new(BudgetConfig {
            max_tokens,
            ..BudgetConfig::default()
        })
    }

    #[test]
    fn pressure_bands_follow_thresholds() {
        let tracker = tracker(1000);
        assert_eq!(tracker.pressure_for(0), ContextPressure::Low);
        assert_eq!(tracker.pressure_for(399), ContextPressure::Low);
        assert_eq!(tracker.pressure_for(400), ContextPressure::Medium);
        assert_eq!(tracker.pressure_for(699), ContextPressure::Medium);
        assert_eq!(tracker.pressure_for(700), ContextPressure::High);
        assert_eq!(tracker.pressure_for(899), ContextPressure::High);
        assert_eq!(tracker.pressure_for(900), ContextPressure::Critical);
        assert_eq!(tracker.pressure_for(5000), ContextPressure::Critical);
    }

    #[test]
    fn recompute_replaces_weight() {
        let mut tracker = tracker(1000);
        assert_eq!(tracker.recompute([100, 200, 150]), ContextPressure::Medium);
        assert_eq!(tracker.running_weight(), 450);

        tracker.recompute([50]);
        assert_eq!(tracker.running_weight(), 50);
        assert_eq!(tracker.snapshot().pressure, ContextPressure::Low);
    }

    #[test]
    fn warning_only_when_critical() {
        let mut tracker = tracker(1000);
        tracker.recompute([800]);
        assert!(tracker.warning(Vec::new()).is_none());

        tracker.recompute([950]);
        let warning = tracker
            .warning(vec![ToolName::from_static("list-renders")])
            .expect("critical pressure warns");
        assert_eq!(warning.kind, "BudgetExceededWarning");
        assert_eq!(warning.suggested_evictions.len(), 1);
    }

    #[test]
    fn snapshot_serializes() {
        let mut tracker = tracker(12_000);
        tracker.recompute([3110]);
        let json = serde_json::to_value(tracker.snapshot()).unwrap();
        assert_eq!(json["running_weight"], 3110);
        assert_eq!(json["pressure"], "low");
    }
}

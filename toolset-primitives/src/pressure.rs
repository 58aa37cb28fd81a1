//! Context pressure levels.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Alert level describing how close the active set is to the context budget.
///
/// Ordered from least to most severe.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextPressure {
    /// Plenty of headroom.
    Low,
    /// Noticeable but comfortable usage.
    Medium,
    /// Consider deactivating unused tools.
    High,
    /// At or near the budget.
    Critical,
}

impl ContextPressure {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl Display for ContextPressure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

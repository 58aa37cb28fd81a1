//! Activation layers, their states, and coexistence policies.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Category, Error};

/// Unit of activation: a whole category or one named subcategory.
///
/// The textual form is `category` or `category/subcategory`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerId {
    /// Every tool of a category that is not assigned to a subcategory.
    Category {
        /// Owning category.
        category: Category,
    },
    /// Named grouping within a category.
    Subcategory {
        /// Owning category.
        category: Category,
        /// Subcategory name, unique within its category.
        name: String,
    },
}

impl LayerId {
    /// Layer for the supplied category.
    #[must_use]
    pub const fn category(category: Category) -> Self {
        Self::Category { category }
    }

    /// Layer for a subcategory of the supplied category.
    #[must_use]
    pub fn subcategory(category: Category, name: impl Into<String>) -> Self {
        Self::Subcategory {
            category,
            name: name.into(),
        }
    }

    /// Returns the owning category.
    #[must_use]
    pub const fn owner(&self) -> Category {
        match self {
            Self::Category { category } | Self::Subcategory { category, .. } => *category,
        }
    }
}

impl Display for LayerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category { category } => write!(f, "{category}"),
            Self::Subcategory { category, name } => write!(f, "{category}/{name}"),
        }
    }
}

impl FromStr for LayerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((category, name)) if !name.trim().is_empty() => {
                let category = category.parse::<Category>().map_err(|_| Error::UnknownCategory {
                    id: s.to_owned(),
                })?;
                Ok(Self::subcategory(category, name))
            }
            Some(_) => Err(Error::UnknownCategory { id: s.to_owned() }),
            None => s.parse::<Category>().map(Self::category),
        }
    }
}

/// Rule governing whether a layer may coexist with other active layers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusivityPolicy {
    /// No constraint of its own.
    #[default]
    None,
    /// Coexists only with whitelisted layers.
    Selective,
    /// Evicts every other non-permanent tool when activated.
    Exclusive,
    /// Always active; cannot be deactivated.
    Permanent,
}

impl ExclusivityPolicy {
    /// Returns `true` for [`ExclusivityPolicy::Permanent`].
    #[must_use]
    pub const fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

/// Settled or transitional state of an activation layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerState {
    /// No member tool is active.
    #[default]
    Inactive,
    /// An activation transaction is being planned.
    Activating,
    /// At least one member tool is active.
    Active,
    /// A deactivation transaction is being planned.
    Deactivating,
    /// The last transaction failed and is being rolled back.
    Error,
}

impl LayerState {
    /// Returns `true` for states that only exist while a transaction holds the
    /// registry lock.
    #[must_use]
    pub const fn is_transitional(self) -> bool {
        matches!(self, Self::Activating | Self::Deactivating | Self::Error)
    }
}

//! Coexistence decisions returned by the exclusivity enforcer.

use std::collections::BTreeSet;

use serde::Serialize;
use toolset_primitives::LayerId;

use crate::error::{PolicyError, PolicyResult};

/// Why active layers are being evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionCause {
    /// The candidate layer is exclusive.
    Exclusive,
    /// The request allowed conflicts to be resolved by eviction.
    Override,
}

/// Outcome of checking one candidate layer against the active layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CoexistenceDecision {
    /// The layer may join without disturbing anything.
    Admit,
    /// The layer may join once the listed layers are deactivated.
    Evict {
        /// Active layers to deactivate first.
        layers: BTreeSet<LayerId>,
        /// Reason for the eviction.
        cause: EvictionCause,
    },
    /// The layer is refused.
    Conflict {
        /// First conflicting layer in sorted order.
        conflicting: LayerId,
    },
}

impl CoexistenceDecision {
    /// Returns `true` unless the decision is a conflict.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Self::Conflict { .. })
    }

    /// Layers the decision evicts, if any.
    #[must_use]
    pub fn evicted(&self) -> Option<&BTreeSet<LayerId>> {
        match self {
            Self::Evict { layers, .. } => Some(layers),
            Self::Admit | Self::Conflict { .. } => None,
        }
    }

    /// Converts the decision for `layer` into a result.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ExclusivityConflict`] for a conflict.
    pub fn into_result(self, layer: &LayerId) -> PolicyResult<BTreeSet<LayerId>> {
        match self {
            Self::Admit => Ok(BTreeSet::new()),
            Self::Evict { layers, .. } => Ok(layers),
            Self::Conflict { conflicting } => Err(PolicyError::ExclusivityConflict {
                layer: layer.clone(),
                conflicting,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolset_primitives::Category;

    #[test]
    fn decision_helpers_work() {
        let studio = LayerId::category(Category::StudioManagement);
        let video = LayerId::category(Category::VideoCreation);

        assert!(CoexistenceDecision::Admit.is_admitted());
        assert!(CoexistenceDecision::Admit.evicted().is_none());

        let evict = CoexistenceDecision::Evict {
            layers: BTreeSet::from([video.clone()]),
            cause: EvictionCause::Override,
        };
        assert!(evict.is_admitted());
        assert_eq!(evict.clone().into_result(&studio).unwrap(), BTreeSet::from([video.clone()]));

        let conflict = CoexistenceDecision::Conflict {
            conflicting: video.clone(),
        };
        assert!(!conflict.is_admitted());
        assert_eq!(
            conflict.into_result(&studio).unwrap_err(),
            PolicyError::ExclusivityConflict {
                layer: studio,
                conflicting: video,
            }
        );
    }

    #[test]
    fn decisions_serialize_with_tag() {
        let json = serde_json::to_value(CoexistenceDecision::Admit).unwrap();
        assert_eq!(json["decision"], "admit");
    }
}

//! Coexistence rules between activation layers.

use std::collections::{BTreeMap, BTreeSet};

use toolset_primitives::{Category, ExclusivityPolicy, LayerId};
use tracing::debug;

use crate::decision::{CoexistenceDecision, EvictionCause};
use crate::error::PolicyError;

/// A layer together with the policy it is checked under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerProfile {
    /// Layer identifier.
    pub layer: LayerId,
    /// Effective coexistence policy.
    pub policy: ExclusivityPolicy,
    /// Categories a selective layer admits.
    pub coexists_with: BTreeSet<Category>,
}

impl LayerProfile {
    /// Creates a profile with an empty whitelist.
    #[must_use]
    pub fn new(layer: LayerId, policy: ExclusivityPolicy) -> Self {
        Self {
            layer,
            policy,
            coexists_with: BTreeSet::new(),
        }
    }

    /// Sets the whitelist consulted by selective layers.
    #[must_use]
    pub fn with_coexists<I>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        self.coexists_with.extend(categories);
        self
    }

    /// Returns `true` when this layer tolerates `guest` alongside it.
    #[must_use]
    pub fn admits(&self, guest: &Self) -> bool {
        match self.policy {
            ExclusivityPolicy::Selective => self.coexists_with.contains(&guest.layer.owner()),
            ExclusivityPolicy::Exclusive => false,
            ExclusivityPolicy::None | ExclusivityPolicy::Permanent => true,
        }
    }
}

/// Returns `true` when `a` and `b` may not be active together.
///
/// Symmetric. Permanent layers never conflict. Layers of the same category
/// only conflict when exactly one of them is exclusive, so an exclusive
/// category and the subcategories inheriting its policy activate together.
#[must_use]
pub fn conflicts(a: &LayerProfile, b: &LayerProfile) -> bool {
    if a.layer == b.layer || a.policy.is_permanent() || b.policy.is_permanent() {
        return false;
    }
    let a_exclusive = a.policy == ExclusivityPolicy::Exclusive;
    let b_exclusive = b.policy == ExclusivityPolicy::Exclusive;
    if a.layer.owner() == b.layer.owner() {
        return a_exclusive != b_exclusive;
    }
    a_exclusive || b_exclusive || !(a.admits(b) && b.admits(a))
}

/// Combined outcome for every candidate layer of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoexistencePlan {
    /// Candidate layers allowed to activate.
    pub admitted: BTreeSet<LayerId>,
    /// Active layers that must be deactivated first.
    pub evicted: BTreeSet<LayerId>,
    /// Refused candidate layers.
    pub refused: BTreeMap<LayerId, PolicyError>,
}

/// Applies coexistence rules to activation requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusivityEnforcer {
    allow_override: bool,
}

impl ExclusivityEnforcer {
    /// Creates an enforcer that refuses conflicting candidates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets conflicts evict the active side instead of refusing the candidate.
    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Checks a single candidate against the resident layers.
    pub fn evaluate<'a, I>(&self, candidate: &LayerProfile, residents: I) -> CoexistenceDecision
    where
        I: IntoIterator<Item = &'a LayerProfile>,
    {
        if candidate.policy.is_permanent() {
            return CoexistenceDecision::Admit;
        }
        let residents: Vec<&LayerProfile> = residents
            .into_iter()
            .filter(|resident| resident.layer != candidate.layer && !resident.policy.is_permanent())
            .collect();

        if candidate.policy == ExclusivityPolicy::Exclusive {
            let layers: BTreeSet<LayerId> = residents
                .iter()
                .filter(|resident| conflicts(candidate, resident))
                .map(|resident| resident.layer.clone())
                .collect();
            return if layers.is_empty() {
                CoexistenceDecision::Admit
            } else {
                CoexistenceDecision::Evict {
                    layers,
                    cause: EvictionCause::Exclusive,
                }
            };
        }

        let conflicting: BTreeSet<LayerId> = residents
            .iter()
            .filter(|resident| conflicts(candidate, resident))
            .map(|resident| resident.layer.clone())
            .collect();

        match conflicting.first() {
            None => CoexistenceDecision::Admit,
            Some(_) if self.allow_override => CoexistenceDecision::Evict {
                layers: conflicting,
                cause: EvictionCause::Override,
            },
            Some(first) => CoexistenceDecision::Conflict {
                conflicting: first.clone(),
            },
        }
    }

    /// Checks every candidate of a request against the active layers.
    ///
    /// Exclusive candidates are considered first. Candidates never evict one
    /// another: a candidate that conflicts with an already admitted candidate
    /// is refused.
    #[must_use]
    pub fn plan(&self, candidates: &[LayerProfile], active: &[LayerProfile]) -> CoexistencePlan {
        let mut ordered: Vec<&LayerProfile> = candidates.iter().collect();
        ordered.sort_by(|a, b| {
            let a_rank = a.policy != ExclusivityPolicy::Exclusive;
            let b_rank = b.policy != ExclusivityPolicy::Exclusive;
            a_rank.cmp(&b_rank).then_with(|| a.layer.cmp(&b.layer))
        });
        ordered.dedup_by(|a, b| a.layer == b.layer);

        let mut plan = CoexistencePlan::default();
        let mut admitted: Vec<&LayerProfile> = Vec::new();

        for candidate in ordered {
            if let Some(rival) = admitted.iter().find(|rival| conflicts(candidate, rival)) {
                plan.refused.insert(
                    candidate.layer.clone(),
                    PolicyError::ExclusivityConflict {
                        layer: candidate.layer.clone(),
                        conflicting: rival.layer.clone(),
                    },
                );
                continue;
            }

            let residents = active
                .iter()
                .filter(|resident| !plan.evicted.contains(&resident.layer));
            let decision = self.evaluate(candidate, residents);
            debug!(layer = %candidate.layer, ?decision, "coexistence evaluated");

            match decision.into_result(&candidate.layer) {
                Ok(evicted) => {
                    plan.evicted.extend(evicted);
                    plan.admitted.insert(candidate.layer.clone());
                    admitted.push(candidate);
                }
                Err(err) => {
                    plan.refused.insert(candidate.layer.clone(), err);
                }
            }
        }

        // An admitted layer is never also evicted by a later candidate.
        plan.evicted.retain(|layer| !plan.admitted.contains(layer));
        plan
    }
}

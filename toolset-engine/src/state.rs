//! The running registry snapshot owned by one session.

use std::collections::{BTreeMap, BTreeSet};

use toolset_budget::{BudgetTracker, EvictionCandidate, suggest_eviction};
use toolset_catalog::BudgetConfig;
use toolset_primitives::{LayerId, LayerState, ToolName};
use toolset_store::ToolStore;
use tracing::{info, warn};

use crate::activation::{ActivationResult, Transition, layer_tools, layers_of};
use crate::error::EngineResult;
use crate::lifecycle::{LayerEvent, LayerLifecycle};
use crate::resolver::DependencyResolver;

/// Number of eviction candidates attached to a budget warning.
pub const SUGGESTED_EVICTIONS: usize = 5;

/// Every tool, the active set, per-layer lifecycle, and the running budget.
///
/// Committed state is only ever replaced as a whole.
#[derive(Debug, Clone)]
pub struct RegistryState {
    store: ToolStore,
    active: BTreeSet<ToolName>,
    layers: BTreeMap<LayerId, LayerLifecycle>,
    budget: BudgetTracker,
    initial: BTreeSet<ToolName>,
}

impl RegistryState {
    /// Creates a state with nothing active.
    #[must_use]
    pub fn new(store: ToolStore, budget: BudgetConfig) -> Self {
        Self {
            store,
            active: BTreeSet::new(),
            layers: BTreeMap::new(),
            budget: BudgetTracker::new(budget),
            initial: BTreeSet::new(),
        }
    }

    /// Returns the tool store.
    #[must_use]
    pub fn store(&self) -> &ToolStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut ToolStore {
        &mut self.store
    }

    /// Returns the active set.
    #[must_use]
    pub fn active(&self) -> &BTreeSet<ToolName> {
        &self.active
    }

    /// Returns `true` when `name` is active.
    #[must_use]
    pub fn is_active(&self, name: &ToolName) -> bool {
        self.active.contains(name)
    }

    /// Returns the budget tracker.
    #[must_use]
    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }

    /// The set [`crate::ToolsetSession::reset`] returns to.
    #[must_use]
    pub fn initial(&self) -> &BTreeSet<ToolName> {
        &self.initial
    }

    pub(crate) fn mark_initial(&mut self) {
        self.initial = self.active.clone();
    }

    pub(crate) fn extend_initial<I>(&mut self, names: I)
    where
        I: IntoIterator<Item = ToolName>,
    {
        self.initial.extend(names);
    }

    /// Settled or transitional state of `layer`.
    #[must_use]
    pub fn layer_state(&self, layer: &LayerId) -> LayerState {
        self.layers
            .get(layer)
            .map_or(LayerState::Inactive, LayerLifecycle::state)
    }

    /// Permanent tools and everything they need. These never leave the
    /// active set.
    #[must_use]
    pub fn pinned(&self) -> BTreeSet<ToolName> {
        let permanent: BTreeSet<ToolName> = self
            .store
            .all()
            .filter(|entry| entry.is_permanent())
            .map(|entry| entry.name().clone())
            .collect();
        DependencyResolver::new(&self.store)
            .closure(&permanent)
            .unwrap_or(permanent)
    }

    /// Applies a planned transition.
    ///
    /// Layer lifecycles are advanced on a copy first, so a lifecycle error
    /// leaves the state untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Lifecycle`] when a layer cannot make the
    /// required transition.
    pub fn commit(&mut self, transition: Transition) -> EngineResult<ActivationResult> {
        let Transition {
            next,
            rejected,
            requested,
            activating,
            deactivating,
        } = transition;

        let added: Vec<ToolName> = next.difference(&self.active).cloned().collect();
        let removed: Vec<ToolName> = self.active.difference(&next).cloned().collect();

        let mut growing = activating;
        growing.extend(layers_of(&self.store, &added));
        growing.extend(owners(&growing));
        let mut shrinking = deactivating;
        shrinking.extend(layers_of(&self.store, &removed));
        shrinking.extend(owners(&shrinking));

        let mut layers = self.layers.clone();
        for layer in &growing {
            let committed = self.layer_has_active(layer, &next);
            let lifecycle = layers
                .entry(layer.clone())
                .or_insert_with(|| LayerLifecycle::new(layer.clone()));
            if !committed && shrinking.contains(layer) && lifecycle.state() == LayerState::Active {
                lifecycle.run(LayerEvent::Deactivate, true)?;
            } else {
                lifecycle.run(LayerEvent::Activate, committed)?;
            }
        }
        for layer in shrinking.difference(&growing) {
            let lifecycle = layers
                .entry(layer.clone())
                .or_insert_with(|| LayerLifecycle::new(layer.clone()));
            if lifecycle.state() == LayerState::Active {
                let committed = !self.layer_has_active(layer, &next);
                lifecycle.run(LayerEvent::Deactivate, committed)?;
            }
        }

        self.layers = layers;
        self.active = next;
        let weights: Vec<u32> = self
            .active
            .iter()
            .filter_map(|name| self.store.get(name.as_str()).ok())
            .map(|entry| entry.metadata().estimated_tokens())
            .collect();
        let pressure = self.budget.recompute(weights);

        for rejection in &rejected {
            warn!(tool = %rejection.name, reason = ?rejection.reason, "tool rejected");
        }
        info!(
            added = added.len(),
            removed = removed.len(),
            rejected = rejected.len(),
            active = self.active.len(),
            running_weight = self.budget.running_weight(),
            %pressure,
            "active set committed"
        );

        let warning = self.budget.warning(self.suggest_eviction(&requested, SUGGESTED_EVICTIONS));
        if let Some(warning) = &warning {
            warn!(message = %warning.message, suggested = ?warning.suggested_evictions, "context budget exceeded");
        }

        Ok(ActivationResult {
            added,
            removed,
            rejected,
            pressure,
            warning,
        })
    }

    /// Up to `n` active tools to evict first, skipping pinned tools and
    /// `requested`.
    #[must_use]
    pub fn suggest_eviction(&self, requested: &BTreeSet<ToolName>, n: usize) -> Vec<ToolName> {
        let pinned = self.pinned();
        let candidates = self
            .active
            .iter()
            .filter_map(|name| self.store.get(name.as_str()).ok())
            .map(|entry| EvictionCandidate {
                name: entry.name().clone(),
                usage_frequency: entry.usage().usage_frequency,
                priority: entry.metadata().priority(),
                pinned: pinned.contains(entry.name()),
            });
        suggest_eviction(candidates, requested, n)
    }

    fn layer_has_active(&self, layer: &LayerId, active: &BTreeSet<ToolName>) -> bool {
        layer_tools(&self.store, layer)
            .into_iter()
            .any(|name| active.contains(name))
    }
}

/// Category layers owning subcategory layers in `layers`.
fn owners(layers: &BTreeSet<LayerId>) -> Vec<LayerId> {
    layers
        .iter()
        .filter(|layer| matches!(layer, LayerId::Subcategory { .. }))
        .map(|layer| LayerId::category(layer.owner()))
        .collect()
}

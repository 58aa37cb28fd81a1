//! Per-layer activation state machine.

use thiserror::Error;
use toolset_primitives::{LayerId, LayerState};
use tracing::debug;

/// Events that drive a layer through an activation transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerEvent {
    /// A request wants tools of this layer active.
    Activate,
    /// A request wants tools of this layer removed.
    Deactivate,
    /// The transaction committed.
    Commit,
    /// The transaction failed validation or left the layer unchanged.
    Fail,
    /// Roll back to the state held before the transaction.
    Recover,
}

/// Lifecycle of one activation layer.
#[derive(Debug, Clone)]
pub struct LayerLifecycle {
    layer: LayerId,
    state: LayerState,
    settled: LayerState,
}

impl LayerLifecycle {
    /// Creates an inactive layer.
    #[must_use]
    pub fn new(layer: LayerId) -> Self {
        Self {
            layer,
            state: LayerState::Inactive,
            settled: LayerState::Inactive,
        }
    }

    /// Returns the layer identifier.
    #[must_use]
    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LayerState {
        self.state
    }

    /// Applies an event, returning the resulting state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the event is not
    /// allowed from the current state.
    pub fn transition(&mut self, event: LayerEvent) -> LifecycleResult<LayerState> {
        let next = match (self.state, event) {
            (LayerState::Inactive | LayerState::Active, LayerEvent::Activate) => {
                Some(LayerState::Activating)
            }
            (LayerState::Active, LayerEvent::Deactivate) => Some(LayerState::Deactivating),
            (LayerState::Activating, LayerEvent::Commit) => Some(LayerState::Active),
            (LayerState::Deactivating, LayerEvent::Commit) => Some(LayerState::Inactive),
            (LayerState::Activating | LayerState::Deactivating, LayerEvent::Fail) => {
                Some(LayerState::Error)
            }
            (LayerState::Error, LayerEvent::Recover) => Some(self.settled),
            _ => None,
        };

        let Some(next_state) = next else {
            return Err(LifecycleError::InvalidTransition {
                layer: self.layer.clone(),
                from: self.state,
                event,
            });
        };

        if !self.state.is_transitional() && self.state != LayerState::Error {
            self.settled = self.state;
        }
        debug!(layer = %self.layer, from = ?self.state, to = ?next_state, ?event, "layer transition");
        self.state = next_state;
        if !next_state.is_transitional() && next_state != LayerState::Error {
            self.settled = next_state;
        }

        Ok(self.state)
    }

    /// Runs a full transaction: `start`, then commit when `committed` is
    /// `true`, otherwise fail and recover.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when `start` is not
    /// allowed from the current state.
    pub fn run(&mut self, start: LayerEvent, committed: bool) -> LifecycleResult<LayerState> {
        self.transition(start)?;
        if committed {
            self.transition(LayerEvent::Commit)
        } else {
            self.transition(LayerEvent::Fail)?;
            self.transition(LayerEvent::Recover)
        }
    }
}

/// Errors emitted by the layer lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Transition was not permitted from the current state.
    #[error("invalid transition of layer `{layer}` from {from:?} via {event:?}")]
    InvalidTransition {
        /// Layer whose transition failed.
        layer: LayerId,
        /// State prior to the attempted transition.
        from: LayerState,
        /// Event that triggered the failure.
        event: LayerEvent,
    },
}

/// Result alias used for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

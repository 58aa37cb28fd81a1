//! Activation requests, results, and transaction planning.
//!
//! Planning never mutates: it reads a [`RegistryState`] and produces a
//! [`Transition`] describing the next active set. Only
//! [`RegistryState::commit`] applies it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use toolset_budget::BudgetWarning;
use toolset_primitives::{Category, ContextPressure, ExclusivityPolicy, LayerId, ToolName};
use toolset_policy::{CredentialProvider, ExclusivityEnforcer, LayerProfile, PolicyError, credentials};
use toolset_store::{ToolEntry, ToolStore};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::resolver::DependencyResolver;
use crate::state::RegistryState;

/// Request to grow the active set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationRequest {
    /// Categories (`video-creation`) or subcategories
    /// (`asset-generation/images`) to activate in full.
    pub categories: Vec<String>,
    /// Individual tools to activate.
    pub tools: Vec<String>,
    /// Treat the resolved set as the entire desired active set, apart from
    /// permanent tools.
    pub exclusive: bool,
    /// Resolve coexistence conflicts by evicting the active side.
    pub allow_override: bool,
}

impl ActivationRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds category or subcategory targets.
    #[must_use]
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    /// Adds tool targets.
    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Sets the exclusive flag.
    #[must_use]
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Sets the override flag.
    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    /// Returns `true` when the request names nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.tools.is_empty()
    }
}

/// Why a tool was left out of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason")]
pub enum RejectionReason {
    /// The tool's credential is not configured.
    #[serde(rename = "MissingApiKeyError")]
    MissingApiKey {
        /// Missing credential.
        key: String,
    },
    /// Permanent tools cannot be deactivated.
    #[serde(rename = "permanent")]
    Permanent,
    /// The tool's layer cannot coexist with an active layer.
    #[serde(rename = "ExclusivityConflictError")]
    ExclusivityConflict {
        /// The tool's layer.
        layer: LayerId,
        /// The layer it conflicts with.
        conflicting: LayerId,
    },
    /// A dependency could not be activated.
    #[serde(rename = "dependency-unavailable")]
    DependencyUnavailable {
        /// The unavailable dependency.
        dependency: ToolName,
    },
    /// Deactivation named a tool that is not active.
    #[serde(rename = "not-active")]
    NotActive,
    /// A permanent tool depends on this tool.
    #[serde(rename = "permanent-dependency")]
    PermanentDependency,
}

/// A tool omitted from a transaction and the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Tool name.
    pub name: ToolName,
    /// Reason code and details.
    #[serde(flatten)]
    pub reason: RejectionReason,
}

impl Rejection {
    /// Pairs a tool with a reason.
    #[must_use]
    pub fn new(name: ToolName, reason: RejectionReason) -> Self {
        Self { name, reason }
    }
}

/// Outcome of an activation, deactivation, or reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationResult {
    /// Tools that joined the active set, by name.
    pub added: Vec<ToolName>,
    /// Tools that left the active set, by name.
    pub removed: Vec<ToolName>,
    /// Tools that were left out, with reasons.
    pub rejected: Vec<Rejection>,
    /// Pressure after the transaction.
    pub pressure: ContextPressure,
    /// Present when the active set is at or over budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<BudgetWarning>,
}

impl ActivationResult {
    /// A result that changed nothing.
    #[must_use]
    pub fn unchanged(pressure: ContextPressure) -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            rejected: Vec::new(),
            pressure,
            warning: None,
        }
    }

    /// Returns `true` when `name` was rejected.
    #[must_use]
    pub fn is_rejected(&self, name: &str) -> bool {
        self.rejected.iter().any(|rejection| rejection.name.as_str() == name)
    }

    /// Folds a later transaction into this one, reporting the net change.
    #[must_use]
    pub fn absorb(self, later: Self) -> Self {
        let added_first: BTreeSet<ToolName> = self.added.into_iter().collect();
        let removed_first: BTreeSet<ToolName> = self.removed.into_iter().collect();
        let added_later: BTreeSet<ToolName> = later.added.into_iter().collect();
        let removed_later: BTreeSet<ToolName> = later.removed.into_iter().collect();

        let added = added_first
            .difference(&removed_later)
            .chain(added_later.difference(&removed_first))
            .cloned()
            .collect::<BTreeSet<_>>();
        let removed = removed_first
            .difference(&added_later)
            .chain(removed_later.difference(&added_first))
            .cloned()
            .collect::<BTreeSet<_>>();

        let mut rejected = self.rejected;
        rejected.extend(later.rejected);
        Self {
            added: added.into_iter().collect(),
            removed: removed.into_iter().collect(),
            rejected,
            pressure: later.pressure,
            warning: later.warning,
        }
    }
}

/// A validated, not yet applied change to the active set.
#[derive(Debug, Clone)]
pub struct Transition {
    pub(crate) next: BTreeSet<ToolName>,
    pub(crate) rejected: Vec<Rejection>,
    pub(crate) requested: BTreeSet<ToolName>,
    pub(crate) activating: BTreeSet<LayerId>,
    pub(crate) deactivating: BTreeSet<LayerId>,
}

impl Transition {
    /// Active set the transition would commit.
    #[must_use]
    pub fn next(&self) -> &BTreeSet<ToolName> {
        &self.next
    }

    /// Tools left out.
    #[must_use]
    pub fn rejected(&self) -> &[Rejection] {
        &self.rejected
    }
}

/// Plans an activation.
///
/// With `enforce_coexistence` off, layer policies are not consulted; startup
/// in legacy mode uses this.
///
/// # Errors
///
/// Returns [`EngineError::UnknownCategory`], [`EngineError::UnknownTool`], or
/// [`EngineError::CyclicDependency`] for structural problems. Nothing is
/// mutated in any case.
pub fn plan_activation(
    state: &RegistryState,
    credential_provider: &dyn CredentialProvider,
    request: &ActivationRequest,
    enforce_coexistence: bool,
) -> EngineResult<Transition> {
    let store = state.store();
    let resolver = DependencyResolver::new(store);

    let mut activating = BTreeSet::new();
    let mut primary = BTreeSet::new();
    for id in &request.categories {
        let layer = resolve_layer(store, id)?;
        primary.extend(layer_tools(store, &layer).into_iter().cloned());
        activating.insert(layer);
    }
    for name in &request.tools {
        let entry = store.get(name)?;
        primary.insert(entry.name().clone());
        activating.insert(entry.layer().clone());
    }

    let closure = resolver.closure(&primary)?;
    let order = resolver.order(&closure)?;
    debug!(requested = primary.len(), closure = closure.len(), "activation resolved");

    let mut rejected = Vec::new();
    let mut available = BTreeSet::new();
    for name in order {
        let entry = store.get(name.as_str())?;
        if state.is_active(&name) {
            available.insert(name);
            continue;
        }
        if let Some(key) = entry.metadata().required_api_key() {
            if let Err(PolicyError::MissingCredential { key }) =
                credentials::require(credential_provider, key)
            {
                rejected.push(Rejection::new(name, RejectionReason::MissingApiKey { key }));
                continue;
            }
        }
        if let Some(dependency) = entry
            .metadata()
            .dependencies()
            .iter()
            .find(|dep| !available.contains(*dep))
        {
            rejected.push(Rejection::new(
                name,
                RejectionReason::DependencyUnavailable {
                    dependency: dependency.clone(),
                },
            ));
            continue;
        }
        available.insert(name);
    }

    // Companions are not ordered ahead of their layer's members.
    loop {
        let stranded: Vec<(ToolName, ToolName)> = available
            .iter()
            .filter(|name| !state.is_active(name))
            .filter_map(|name| {
                let entry = store.get(name.as_str()).ok()?;
                let missing = store
                    .auto_load(entry.layer())
                    .iter()
                    .chain(entry.metadata().dependencies())
                    .find(|support| *support != name && !available.contains(*support))?;
                Some((name.clone(), missing.clone()))
            })
            .collect();
        if stranded.is_empty() {
            break;
        }
        for (name, dependency) in stranded {
            available.remove(&name);
            rejected.push(Rejection::new(
                name,
                RejectionReason::DependencyUnavailable { dependency },
            ));
        }
    }

    let pinned = state.pinned();
    let mut refused: BTreeSet<LayerId> = BTreeSet::new();
    let mut evicted_layers: BTreeSet<LayerId> = BTreeSet::new();

    if enforce_coexistence {
        let candidate_tools = group_by_layer(
            store,
            primary
                .iter()
                .filter(|name| available.contains(*name) && !state.is_active(name)),
        );
        let candidates: Vec<LayerProfile> = candidate_tools
            .iter()
            .map(|(layer, entries)| profile(store, layer, entries))
            .collect();
        let residents: Vec<LayerProfile> = if request.exclusive {
            Vec::new()
        } else {
            group_by_layer(
                store,
                state.active().iter().filter(|name| !pinned.contains(*name)),
            )
            .iter()
            .map(|(layer, entries)| profile(store, layer, entries))
            .collect()
        };

        let plan = ExclusivityEnforcer::new()
            .allow_override(request.allow_override)
            .plan(&candidates, &residents);

        for (layer, err) in plan.refused {
            let PolicyError::ExclusivityConflict { conflicting, .. } = err else {
                continue;
            };
            for entry in candidate_tools.get(&layer).into_iter().flatten() {
                rejected.push(Rejection::new(
                    entry.name().clone(),
                    RejectionReason::ExclusivityConflict {
                        layer: layer.clone(),
                        conflicting: conflicting.clone(),
                    },
                ));
            }
            refused.insert(layer);
        }
        evicted_layers = plan.evicted;
    }

    let accepted: BTreeSet<ToolName> = primary
        .iter()
        .filter(|name| available.contains(*name))
        .filter(|name| {
            state.is_active(name)
                || store
                    .get(name.as_str())
                    .is_ok_and(|entry| entry.is_permanent() || !refused.contains(entry.layer()))
        })
        .cloned()
        .collect();
    let needed = resolver.closure_where(&accepted, |name| available.contains(name))?;

    let keep = |name: &&ToolName| pinned.contains(*name) || needed.contains(*name);
    // An exclusive request that gains nothing leaves the active set alone.
    let mut evicted: BTreeSet<ToolName> = if request.exclusive && !accepted.is_empty() {
        state.active().iter().filter(|name| !keep(name)).cloned().collect()
    } else {
        state
            .active()
            .iter()
            .filter(|name| !keep(name))
            .filter(|name| {
                store
                    .get(name.as_str())
                    .is_ok_and(|entry| evicted_layers.contains(entry.layer()))
            })
            .cloned()
            .collect()
    };
    evicted.extend(resolver.dependents(&evicted, state.active()));

    let mut next: BTreeSet<ToolName> = state.active().difference(&evicted).cloned().collect();
    next.extend(needed);

    Ok(Transition {
        next,
        rejected,
        requested: primary,
        activating,
        deactivating: evicted_layers,
    })
}

/// Plans a deactivation of tools, categories, or subcategories.
///
/// # Errors
///
/// Returns [`EngineError::UnknownTool`] or [`EngineError::UnknownCategory`]
/// for targets that name nothing.
pub fn plan_deactivation<S>(state: &RegistryState, targets: &[S]) -> EngineResult<Transition>
where
    S: AsRef<str>,
{
    let store = state.store();
    let mut deactivating = BTreeSet::new();
    let mut explicit = BTreeSet::new();
    let mut expanded = BTreeSet::new();

    for target in targets {
        let target = target.as_ref();
        if let Ok(entry) = store.get(target) {
            explicit.insert(entry.name().clone());
            deactivating.insert(entry.layer().clone());
            continue;
        }
        let layer = resolve_layer(store, target).map_err(|err| {
            if target.contains('/') || target.parse::<Category>().is_ok() {
                err
            } else {
                EngineError::UnknownTool {
                    name: target.to_owned(),
                }
            }
        })?;
        expanded.extend(layer_tools(store, &layer).into_iter().cloned());
        deactivating.insert(layer);
    }

    let pinned = state.pinned();
    let mut rejected: BTreeMap<ToolName, RejectionReason> = BTreeMap::new();
    let mut removed = BTreeSet::new();
    for name in explicit.iter().chain(expanded.iter()) {
        let entry = store.get(name.as_str())?;
        if entry.is_permanent() {
            rejected.insert(name.clone(), RejectionReason::Permanent);
        } else if !state.is_active(name) {
            if explicit.contains(name) {
                rejected.insert(name.clone(), RejectionReason::NotActive);
            }
        } else if pinned.contains(name) {
            rejected.insert(name.clone(), RejectionReason::PermanentDependency);
        } else {
            removed.insert(name.clone());
        }
    }

    let resolver = DependencyResolver::new(store);
    removed.extend(resolver.dependents(&removed, state.active()));

    Ok(Transition {
        next: state.active().difference(&removed).cloned().collect(),
        rejected: rejected
            .into_iter()
            .map(|(name, reason)| Rejection::new(name, reason))
            .collect(),
        requested: BTreeSet::new(),
        activating: BTreeSet::new(),
        deactivating,
    })
}

/// Plans a return to the initial active set.
#[must_use]
pub fn plan_reset(state: &RegistryState) -> Transition {
    let store = state.store();
    let initial = state.initial().clone();
    let activating = layers_of(store, initial.iter());
    let deactivating = layers_of(store, state.active().difference(&initial));

    Transition {
        next: initial,
        rejected: Vec::new(),
        requested: BTreeSet::new(),
        activating,
        deactivating,
    }
}

/// Parses `id` as a layer and checks that it is configured.
pub(crate) fn resolve_layer(store: &ToolStore, id: &str) -> EngineResult<LayerId> {
    let unknown = || EngineError::UnknownCategory { id: id.to_owned() };
    let layer: LayerId = id.parse().map_err(|_| unknown())?;
    if store.has_layer(&layer) {
        Ok(layer)
    } else {
        Err(unknown())
    }
}

/// Tools a layer target expands to: a category covers its subcategories.
pub(crate) fn layer_tools<'s>(store: &'s ToolStore, layer: &LayerId) -> Vec<&'s ToolName> {
    match layer {
        LayerId::Category { category } => store.category_members(*category).collect(),
        LayerId::Subcategory { .. } => store.layer_members(layer).collect(),
    }
}

/// Layers the named tools belong to.
pub(crate) fn layers_of<'n, I>(store: &ToolStore, names: I) -> BTreeSet<LayerId>
where
    I: IntoIterator<Item = &'n ToolName>,
{
    names
        .into_iter()
        .filter_map(|name| store.get(name.as_str()).ok())
        .map(|entry| entry.layer().clone())
        .collect()
}

fn group_by_layer<'s, 'n, I>(store: &'s ToolStore, names: I) -> BTreeMap<LayerId, Vec<&'s ToolEntry>>
where
    I: Iterator<Item = &'n ToolName>,
{
    let mut grouped: BTreeMap<LayerId, Vec<&ToolEntry>> = BTreeMap::new();
    for entry in names.filter_map(|name| store.get(name.as_str()).ok()) {
        if !entry.is_permanent() {
            grouped.entry(entry.layer().clone()).or_default().push(entry);
        }
    }
    grouped
}

/// Builds the coexistence profile of a layer from its participating tools,
/// honouring per-tool overrides.
fn profile(store: &ToolStore, layer: &LayerId, entries: &[&ToolEntry]) -> LayerProfile {
    let has = |policy| entries.iter().any(|entry| entry.policy() == policy);
    let policy = if has(ExclusivityPolicy::Exclusive) {
        ExclusivityPolicy::Exclusive
    } else if has(ExclusivityPolicy::Selective) {
        ExclusivityPolicy::Selective
    } else {
        store.layer_policy(layer)
    };
    LayerProfile::new(layer.clone(), policy).with_coexists(store.layer_whitelist(layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ActivationRequest =
            serde_json::from_value(serde_json::json!({ "categories": ["maintenance"] })).unwrap();
        assert_eq!(request, ActivationRequest::new().with_categories(["maintenance"]));
        assert!(!request.exclusive);
    }

    #[test]
    fn rejection_reason_codes() {
        let rejection = Rejection::new(
            ToolName::from_static("generate-voiceover"),
            RejectionReason::MissingApiKey {
                key: "elevenlabs".into(),
            },
        );
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["name"], "generate-voiceover");
        assert_eq!(json["reason"], "MissingApiKeyError");
        assert_eq!(json["key"], "elevenlabs");

        let json = serde_json::to_value(Rejection::new(
            ToolName::from_static("search-tools"),
            RejectionReason::Permanent,
        ))
        .unwrap();
        assert_eq!(json["reason"], "permanent");
    }

    #[test]
    fn absorb_reports_net_change() {
        let name = ToolName::from_static;
        let first = ActivationResult {
            added: vec![name("a")],
            removed: vec![name("b"), name("c")],
            ..ActivationResult::unchanged(ContextPressure::Low)
        };
        let later = ActivationResult {
            added: vec![name("c"), name("d")],
            removed: vec![name("a")],
            ..ActivationResult::unchanged(ContextPressure::Medium)
        };

        let net = first.absorb(later);
        assert_eq!(net.added, [name("d")]);
        assert_eq!(net.removed, [name("b")]);
        assert_eq!(net.pressure, ContextPressure::Medium);
    }
}

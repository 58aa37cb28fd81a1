//! Per-session registry facade.
//!
//! A [`ToolsetSession`] owns one [`RegistryState`] behind a lock. Every
//! mutation plans against the current state and commits a whole new active
//! set; readers never observe a half-applied request.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::Value;
use toolset_budget::BudgetSnapshot;
use toolset_catalog::{ActivationMode, ToolDefinition, ToolDescriptor, ToolsetConfig, builtin};
use toolset_policy::{CredentialProvider, EnvCredentials};
use toolset_primitives::{LayerState, SessionId, ToolName};
use toolset_store::{ToolEntry, ToolHandler, ToolStore, UsageStats};
use tracing::{debug, info, warn};

use crate::activation::{
    ActivationRequest, ActivationResult, RejectionReason, Transition, plan_activation, plan_deactivation,
    plan_reset, resolve_layer,
};
use crate::discovery::{self, CategorySummary, SearchCriteria, ToolSummary, display_order};
use crate::dispatch::{self, DiscoveryTool};
use crate::error::{EngineError, EngineResult};
use crate::resolver::DependencyResolver;
use crate::state::RegistryState;

/// Builder for [`ToolsetSession`].
#[must_use]
pub struct ToolsetSessionBuilder {
    config: ToolsetConfig,
    id: Option<SessionId>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    tools: Vec<(ToolDefinition, ToolHandler)>,
}

impl ToolsetSessionBuilder {
    fn new(config: ToolsetConfig) -> Self {
        Self {
            config,
            id: None,
            credentials: None,
            tools: Vec::new(),
        }
    }

    /// Uses an explicit session identifier instead of a random one.
    pub fn id(mut self, id: SessionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the credential provider. Defaults to [`EnvCredentials`].
    pub fn credentials<C>(mut self, credentials: C) -> Self
    where
        C: CredentialProvider + 'static,
    {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Registers a host tool.
    pub fn tool(mut self, definition: ToolDefinition, handler: ToolHandler) -> Self {
        self.tools.push((definition, handler));
        self
    }

    /// Registers several host tools.
    pub fn tools<I>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = (ToolDefinition, ToolHandler)>,
    {
        self.tools.extend(tools);
        self
    }

    /// Validates the catalog and activates the initial set.
    ///
    /// In layered mode the initial set is every default and permanent tool
    /// plus their dependencies. In legacy mode every category is activated
    /// without coexistence checks and the initial-size limit does not apply.
    /// Default tools whose credential is missing are left inactive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for an invalid configuration,
    /// [`EngineError::DuplicateName`], [`EngineError::UnknownCategory`], or
    /// [`EngineError::InvalidMetadata`] for bad registrations,
    /// [`EngineError::UnknownTool`] and [`EngineError::CyclicDependency`] for a
    /// broken dependency graph, [`EngineError::DefaultConflict`] when two
    /// default layers cannot coexist, and [`EngineError::InitialSetTooLarge`]
    /// when the layered initial set exceeds `max_initial_tools`.
    pub fn build(self) -> EngineResult<ToolsetSession> {
        let Self {
            config,
            id,
            credentials,
            tools,
        } = self;
        config.validate()?;
        let credentials = credentials.unwrap_or_else(|| Arc::new(EnvCredentials::new()));

        let mut store = ToolStore::new(config.categories.iter().cloned());
        for definition in builtin::discovery_tools()? {
            store.register(definition, ToolHandler::Builtin)?;
        }
        for (definition, handler) in tools {
            store.register(definition, handler)?;
        }
        DependencyResolver::new(&store).validate_catalog()?;

        let mut state = RegistryState::new(store, config.budget);
        let (request, enforce) = match config.mode {
            ActivationMode::Layered => {
                let defaults: Vec<String> = state
                    .store()
                    .all()
                    .filter(|entry| entry.is_load_by_default() || entry.is_permanent())
                    .map(|entry| entry.name().to_string())
                    .collect();
                (ActivationRequest::new().with_tools(defaults), true)
            }
            ActivationMode::Legacy => {
                let everything: Vec<String> = state
                    .store()
                    .categories()
                    .map(|category| category.id.to_string())
                    .collect();
                (ActivationRequest::new().with_categories(everything), false)
            }
        };

        let transition = plan_activation(&state, credentials.as_ref(), &request, enforce)?;
        if config.mode == ActivationMode::Layered {
            ensure_defaults_coexist(&transition)?;
            if let Some(limit) = config.max_initial_tools {
                let size = transition.next().len();
                if size > limit {
                    return Err(EngineError::InitialSetTooLarge { size, limit });
                }
            }
        }
        for rejection in transition.rejected() {
            warn!(tool = %rejection.name, reason = ?rejection.reason, "default tool left inactive");
        }
        state.commit(transition)?;
        state.mark_initial();

        let id = id.unwrap_or_else(SessionId::random);
        info!(
            session = %id,
            mode = ?config.mode,
            registered = state.store().len(),
            active = state.active().len(),
            "toolset session ready"
        );
        Ok(ToolsetSession {
            id,
            credentials,
            state: RwLock::new(state),
        })
    }
}

impl fmt::Debug for ToolsetSessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolsetSessionBuilder")
            .field("mode", &self.config.mode)
            .field("id", &self.id)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

/// One agent conversation's view of the tool catalog.
pub struct ToolsetSession {
    id: SessionId,
    credentials: Arc<dyn CredentialProvider>,
    state: RwLock<RegistryState>,
}

impl fmt::Debug for ToolsetSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolsetSession")
            .field("id", &self.id)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl ToolsetSession {
    /// Starts building a session from `config`.
    pub fn builder(config: ToolsetConfig) -> ToolsetSessionBuilder {
        ToolsetSessionBuilder::new(config)
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Returns the credential provider in use.
    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialProvider {
        self.credentials.as_ref()
    }

    // Committed state is replaced wholesale, so a poisoned lock still guards a
    // consistent snapshot.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Descriptors of the active tools, ordered by priority then name.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let state = self.read();
        let mut entries: Vec<&ToolEntry> = state
            .active()
            .iter()
            .filter_map(|name| state.store().get(name.as_str()).ok())
            .collect();
        entries.sort_by(|a, b| display_order(a, b));
        entries
            .into_iter()
            .map(|entry| entry.descriptor().clone())
            .collect()
    }

    /// Active tools with their metadata.
    #[must_use]
    pub fn list_active(&self) -> Vec<ToolSummary> {
        discovery::list_active(&self.read(), self.credentials())
    }

    /// Category summaries.
    #[must_use]
    pub fn list_categories(&self) -> Vec<CategorySummary> {
        discovery::list_categories(&self.read(), self.credentials())
    }

    /// Searches every registered tool.
    #[must_use]
    pub fn search(&self, criteria: &SearchCriteria) -> Vec<ToolSummary> {
        discovery::search(&self.read(), self.credentials(), criteria)
    }

    /// Returns `true` when `name` is in the active set.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.read().active().iter().any(|active| active.as_str() == name)
    }

    /// Names of the active tools.
    #[must_use]
    pub fn active_names(&self) -> Vec<ToolName> {
        self.read().active().iter().cloned().collect()
    }

    /// Current running weight, budget, and pressure.
    #[must_use]
    pub fn budget(&self) -> BudgetSnapshot {
        self.read().budget().snapshot()
    }

    /// Up to `n` active tools to drop first: least used, then lowest
    /// priority. Permanent tools and their dependencies are never suggested.
    #[must_use]
    pub fn suggest_eviction(&self, n: usize) -> Vec<ToolName> {
        self.read().suggest_eviction(&BTreeSet::new(), n)
    }

    /// Lifecycle state of a category (`maintenance`) or subcategory
    /// (`maintenance/cleanup`) layer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCategory`] when `layer` names nothing.
    pub fn layer_state(&self, layer: &str) -> EngineResult<LayerState> {
        let state = self.read();
        let layer = resolve_layer(state.store(), layer)?;
        Ok(state.layer_state(&layer))
    }

    /// Invocation statistics of a tool.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] for unregistered names.
    pub fn usage(&self, name: &str) -> EngineResult<UsageStats> {
        Ok(self.read().store().get(name)?.usage().clone())
    }

    /// Grows the active set.
    ///
    /// # Errors
    ///
    /// Structural problems abort the request with no change; see
    /// [`plan_activation`].
    pub fn activate(&self, request: &ActivationRequest) -> EngineResult<ActivationResult> {
        let mut state = self.write();
        debug!(session = %self.id, ?request, "activation requested");
        let transition = plan_activation(&state, self.credentials(), request, true)?;
        state.commit(transition)
    }

    /// Shrinks the active set. Permanent tools stay and are reported as
    /// rejected; tools depending on removed tools are removed too.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] or [`EngineError::UnknownCategory`]
    /// for targets that name nothing, with no change.
    pub fn deactivate<S>(&self, targets: &[S]) -> EngineResult<ActivationResult>
    where
        S: AsRef<str>,
    {
        let mut state = self.write();
        let transition = plan_deactivation(&state, targets)?;
        state.commit(transition)
    }

    /// Deactivates `deactivate`, then applies `request`, as one transaction.
    ///
    /// Both steps run on a staged copy; the session only sees the combined
    /// outcome, or nothing when either step fails.
    ///
    /// # Errors
    ///
    /// Propagates structural errors from either step.
    pub fn apply<S>(&self, request: &ActivationRequest, deactivate: &[S]) -> EngineResult<ActivationResult>
    where
        S: AsRef<str>,
    {
        let mut state = self.write();
        let mut staged = state.clone();

        let mut result = ActivationResult::unchanged(staged.budget().pressure());
        if !deactivate.is_empty() {
            let transition = plan_deactivation(&staged, deactivate)?;
            result = staged.commit(transition)?;
        }
        if !request.is_empty() {
            let transition = plan_activation(&staged, self.credentials(), request, true)?;
            result = result.absorb(staged.commit(transition)?);
        }

        *state = staged;
        Ok(result)
    }

    /// Returns to the initial active set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Lifecycle`] if a layer cannot transition.
    pub fn reset(&self) -> EngineResult<ActivationResult> {
        let mut state = self.write();
        let transition = plan_reset(&state);
        state.commit(transition)
    }

    /// Registers a tool after startup.
    ///
    /// A default or permanent tool is activated immediately, along with its
    /// dependencies, and joins the reset set. The registration is staged and
    /// rolled back entirely on any error, including a default tool that
    /// cannot coexist with the active set.
    ///
    /// # Errors
    ///
    /// Returns the same registration and dependency errors as
    /// [`ToolsetSessionBuilder::build`], and [`EngineError::DefaultConflict`]
    /// for a default tool refused by a coexistence check.
    pub fn register(&self, definition: ToolDefinition, handler: ToolHandler) -> EngineResult<ActivationResult> {
        let mut state = self.write();
        let mut staged = state.clone();

        let entry = staged.store_mut().register(definition, handler)?;
        let name = entry.name().clone();
        let immediate = entry.is_load_by_default() || entry.is_permanent();
        DependencyResolver::new(staged.store()).validate_catalog()?;

        let result = if immediate {
            let request = ActivationRequest::new().with_tools([name.as_str()]);
            let transition = plan_activation(&staged, self.credentials(), &request, true)?;
            ensure_defaults_coexist(&transition)?;
            let result = staged.commit(transition)?;
            staged.extend_initial(result.added.iter().cloned());
            result
        } else {
            ActivationResult::unchanged(staged.budget().pressure())
        };

        info!(session = %self.id, tool = %name, activated = immediate, "tool registered at runtime");
        *state = staged;
        Ok(result)
    }

    /// Invokes an active tool.
    ///
    /// The lock is released before the handler runs. Usage statistics are
    /// updated only after a successful call. Discovery tools never fail at
    /// this level: their errors come back as an `error` payload.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTool`] for unregistered names,
    /// [`EngineError::ToolInactive`] when the tool is not active, and
    /// [`EngineError::Tool`] when the host handler fails.
    pub async fn call_tool(&self, name: &str, args: Value) -> EngineResult<Value> {
        let (name, handler) = {
            let state = self.read();
            let entry = state.store().get(name)?;
            if !state.is_active(entry.name()) {
                return Err(EngineError::ToolInactive {
                    name: entry.name().clone(),
                });
            }
            (entry.name().clone(), entry.handler().clone())
        };

        let output = match handler {
            ToolHandler::Builtin => {
                let tool = DiscoveryTool::from_name(name.as_str()).ok_or_else(|| EngineError::UnknownTool {
                    name: name.to_string(),
                })?;
                dispatch::dispatch(self, tool, args)
            }
            ToolHandler::External(tool) => tool.invoke(args).await.map_err(|source| EngineError::Tool {
                name: name.clone(),
                source,
            })?,
        };

        if let Err(err) = self.write().store_mut().record_invocation(name.as_str(), Utc::now()) {
            debug!(tool = %name, %err, "usage not recorded");
        }
        Ok(output)
    }
}

/// Default tools may be left out for a missing credential, never for a
/// coexistence conflict.
fn ensure_defaults_coexist(transition: &Transition) -> EngineResult<()> {
    let conflict = transition.rejected().iter().find_map(|rejection| match &rejection.reason {
        RejectionReason::ExclusivityConflict { conflicting, .. } => Some((rejection, conflicting)),
        _ => None,
    });
    match conflict {
        Some((rejection, conflicting)) => Err(EngineError::DefaultConflict {
            name: rejection.name.clone(),
            conflicting: conflicting.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde_json::json;
    use toolset_catalog::{ToolMetadata, builtin::ELEVENLABS_KEY};
    use toolset_policy::StaticCredentials;
    use toolset_primitives::{Category, ContextPressure};
    use toolset_store::ToolError;

    use super::*;
    use crate::activation::RejectionReason;

    fn echo() -> ToolHandler {
        ToolHandler::external(|input: Value| async move { Ok::<_, ToolError>(json!({ "echo": input })) })
    }

    fn media() -> Vec<(ToolDefinition, ToolHandler)> {
        builtin::media_tools()
            .unwrap()
            .into_iter()
            .map(|definition| (definition, echo()))
            .collect()
    }

    fn session_with(credentials: StaticCredentials) -> ToolsetSession {
        ToolsetSession::builder(ToolsetConfig::default())
            .credentials(credentials)
            .tools(media())
            .build()
            .unwrap()
    }

    fn session() -> ToolsetSession {
        session_with(StaticCredentials::none())
    }

    fn names(list: &[ToolName]) -> BTreeSet<&str> {
        list.iter().map(ToolName::as_str).collect()
    }

    #[test]
    fn starts_with_the_default_layers() {
        let session = session();
        let tools = session.list_tools();
        assert_eq!(tools.len(), 9);
        assert_eq!(tools[0].name().as_str(), builtin::DISCOVER_CAPABILITIES);
        assert_eq!(session.layer_state("video-creation").unwrap(), LayerState::Active);
        assert_eq!(session.layer_state("maintenance").unwrap(), LayerState::Inactive);
    }

    #[test]
    fn initial_limit_is_enforced_in_layered_mode() {
        let config = ToolsetConfig {
            max_initial_tools: Some(5),
            ..ToolsetConfig::default()
        };
        let err = ToolsetSession::builder(config).tools(media()).build().expect_err("too many");
        assert!(matches!(err, EngineError::InitialSetTooLarge { size: 9, limit: 5 }));

        let legacy = ToolsetConfig {
            max_initial_tools: Some(5),
            mode: ActivationMode::Legacy,
            ..ToolsetConfig::default()
        };
        let session = ToolsetSession::builder(legacy)
            .credentials(StaticCredentials::none())
            .tools(media())
            .build()
            .unwrap();
        // Voice tools stay out without a credential.
        assert_eq!(session.list_tools().len(), 36);
    }

    #[test]
    fn duplicate_registration_fails_the_build() {
        let mut tools = media();
        tools.push(media().remove(0));
        let err = ToolsetSession::builder(ToolsetConfig::default())
            .tools(tools)
            .build()
            .expect_err("duplicate");
        assert_eq!(err.kind(), "DuplicateNameError");
    }

    #[test]
    fn activation_brings_dependencies_and_companions() {
        let session = session();
        let result = session
            .activate(&ActivationRequest::new().with_tools(["studio-restart"]))
            .unwrap();

        assert_eq!(
            names(&result.added),
            BTreeSet::from([
                "studio-launch",
                "studio-list-instances",
                "studio-restart",
                "studio-stop"
            ])
        );
        assert!(result.rejected.is_empty());
        assert_eq!(session.layer_state("studio-management/process").unwrap(), LayerState::Active);
    }

    #[test]
    fn structural_errors_change_nothing() {
        let session = session();
        let before = session.active_names();

        let err = session
            .activate(&ActivationRequest::new().with_categories(["teleportation"]))
            .expect_err("unknown category");
        assert_eq!(err.kind(), "UnknownCategoryError");

        let err = session
            .activate(&ActivationRequest::new().with_tools(["clean-temp-files", "no-such-tool"]))
            .expect_err("unknown tool");
        assert_eq!(err.kind(), "UnknownToolError");

        assert_eq!(session.active_names(), before);
    }

    #[test]
    fn missing_credentials_are_soft_failures() {
        let session = session();
        let result = session
            .activate(&ActivationRequest::new().with_categories(["voice-generation", "maintenance"]))
            .unwrap();

        assert!(result.added.iter().all(|name| !name.as_str().contains("voice")));
        assert_eq!(result.added.len(), 9);
        assert!(result.is_rejected("generate-voiceover"));
        assert!(result.rejected.iter().all(|rejection| matches!(
            &rejection.reason,
            RejectionReason::MissingApiKey { key } if key == ELEVENLABS_KEY
        )));

        let with_key = session_with(StaticCredentials::none().with_key(ELEVENLABS_KEY));
        let result = with_key
            .activate(&ActivationRequest::new().with_categories(["voice-generation"]))
            .unwrap();
        assert_eq!(result.added.len(), 5);
    }

    #[test]
    fn selective_conflict_rejects_without_override() {
        let session = session();
        session
            .activate(&ActivationRequest::new().with_categories(["maintenance"]))
            .unwrap();

        let result = session
            .activate(&ActivationRequest::new().with_tools(["studio-logs"]))
            .unwrap();
        assert!(result.added.is_empty());
        assert!(matches!(
            &result.rejected[0].reason,
            RejectionReason::ExclusivityConflict { conflicting, .. }
                if conflicting.to_string().starts_with("maintenance")
        ));

        let result = session
            .activate(
                &ActivationRequest::new()
                    .with_tools(["studio-logs"])
                    .allow_override(true),
            )
            .unwrap();
        assert_eq!(names(&result.added), BTreeSet::from(["studio-logs"]));
        assert!(result.removed.iter().any(|name| name.as_str() == "clean-temp-files"));
        assert!(session.is_active("create-video"));
    }

    #[test]
    fn permanent_tools_survive_everything() {
        let session = session();
        let result = session
            .deactivate(&["discovery", "get-active-tools"])
            .unwrap();
        assert!(result.removed.is_empty());
        assert!(result
            .rejected
            .iter()
            .all(|rejection| rejection.reason == RejectionReason::Permanent));

        session
            .activate(&ActivationRequest::new().with_categories(["maintenance"]).exclusive(true))
            .unwrap();
        for name in [
            builtin::DISCOVER_CAPABILITIES,
            builtin::ACTIVATE_TOOLSET,
            builtin::SEARCH_TOOLS,
            builtin::GET_ACTIVE_TOOLS,
        ] {
            assert!(session.is_active(name), "{name} left the active set");
        }
        assert!(!session.is_active("create-video"));
    }

    #[test]
    fn deactivation_cascades_to_dependents() {
        let session = session();
        let result = session.deactivate(&["create-video"]).unwrap();
        assert_eq!(
            names(&result.removed),
            BTreeSet::from([
                "create-video",
                "get-render-status",
                "preview-composition",
                "render-video"
            ])
        );
        assert_eq!(session.layer_state("video-creation").unwrap(), LayerState::Inactive);

        let result = session.deactivate(&["create-video"]).unwrap();
        assert_eq!(result.rejected[0].reason, RejectionReason::NotActive);
    }

    #[test]
    fn apply_is_one_transaction() {
        let session = session();
        let before = session.active_names();

        let err = session
            .apply(
                &ActivationRequest::new().with_tools(["no-such-tool"]),
                &["video-creation"],
            )
            .expect_err("unknown tool");
        assert_eq!(err.kind(), "UnknownToolError");
        assert_eq!(session.active_names(), before);

        let result = session
            .apply(
                &ActivationRequest::new().with_categories(["maintenance"]),
                &["video-creation"],
            )
            .unwrap();
        assert_eq!(result.removed.len(), 4);
        assert!(result.added.iter().any(|name| name.as_str() == "clean-temp-files"));
    }

    #[test]
    fn reset_restores_the_initial_set() {
        let session = session();
        let initial = session.active_names();
        session
            .apply(
                &ActivationRequest::new().with_categories(["maintenance"]),
                &["video-creation"],
            )
            .unwrap();
        assert_ne!(session.active_names(), initial);

        let result = session.reset().unwrap();
        assert_eq!(result.added.len(), 4);
        assert_eq!(result.removed.len(), 9);
        assert_eq!(session.active_names(), initial);
    }

    #[test]
    fn runtime_registration() {
        let session = session();
        let metadata = ToolMetadata::new(Category::Maintenance, 150)
            .unwrap()
            .load_by_default()
            .with_dependencies(vec![ToolName::from_static("list-renders")]);
        let definition = ToolDefinition::new(
            ToolDescriptor::new(ToolName::from_static("prune-renders"), "Prune stale renders"),
            metadata,
        );

        let result = session.register(definition.clone(), echo()).unwrap();
        assert_eq!(
            names(&result.added),
            BTreeSet::from(["list-renders", "prune-renders"])
        );
        session.deactivate(&["prune-renders"]).unwrap();
        session.reset().unwrap();
        assert!(session.is_active("prune-renders"));

        let err = session.register(definition, echo()).expect_err("duplicate");
        assert_eq!(err.kind(), "DuplicateNameError");
    }

    #[test]
    fn runtime_registration_rolls_back_on_unknown_dependency() {
        let session = session();
        let metadata = ToolMetadata::new(Category::Maintenance, 100)
            .unwrap()
            .with_dependencies(vec![ToolName::from_static("not-registered")]);
        let definition = ToolDefinition::new(
            ToolDescriptor::new(ToolName::from_static("orphan"), ""),
            metadata,
        );

        assert!(session.register(definition, echo()).is_err());
        assert!(session.usage("orphan").is_err());
    }

    #[test]
    fn conflicting_default_layers_abort_startup() {
        let mut config = ToolsetConfig {
            max_initial_tools: None,
            ..ToolsetConfig::default()
        };
        for category in &mut config.categories {
            if matches!(category.id, Category::Maintenance | Category::StudioManagement) {
                category.load_by_default = true;
            }
        }

        let err = ToolsetSession::builder(config)
            .credentials(StaticCredentials::none())
            .tools(media())
            .build()
            .expect_err("maintenance and studio defaults cannot coexist");
        assert_eq!(err.kind(), "DefaultConflictError");
        assert!(matches!(
            &err,
            EngineError::DefaultConflict { conflicting, .. }
                if matches!(conflicting.owner(), Category::Maintenance | Category::StudioManagement)
        ));
    }

    #[test]
    fn runtime_default_that_conflicts_is_rolled_back() {
        let session = session();
        session
            .activate(&ActivationRequest::new().with_categories(["studio-management"]))
            .unwrap();
        let before = session.active_names();

        let metadata = ToolMetadata::new(Category::Maintenance, 120).unwrap().load_by_default();
        let definition = ToolDefinition::new(
            ToolDescriptor::new(ToolName::from_static("vacuum-logs"), "Trim old log files"),
            metadata,
        );
        let err = session.register(definition, echo()).expect_err("conflicts with studio");
        assert!(matches!(
            &err,
            EngineError::DefaultConflict { name, conflicting }
                if name.as_str() == "vacuum-logs" && conflicting.owner() == Category::StudioManagement
        ));
        assert_eq!(session.active_names(), before);
        assert!(session.usage("vacuum-logs").is_err());
    }

    #[test]
    fn rejected_companion_keeps_its_layer_member_out() {
        let session = session();
        let metadata = ToolMetadata::new(Category::VoiceGeneration, 90)
            .unwrap()
            .with_subcategory("speech")
            .unwrap();
        let definition = ToolDefinition::new(
            ToolDescriptor::new(ToolName::from_static("speak-lite"), "Offline speech preview"),
            metadata,
        );
        session.register(definition, echo()).unwrap();

        let result = session
            .activate(&ActivationRequest::new().with_tools(["speak-lite"]))
            .unwrap();
        assert!(result.added.is_empty());
        assert!(!session.is_active("speak-lite"));
        assert!(result.rejected.iter().any(|rejection| {
            rejection.name.as_str() == "speak-lite"
                && matches!(
                    &rejection.reason,
                    RejectionReason::DependencyUnavailable { dependency } if dependency.as_str() == "list-voices"
                )
        }));
        assert!(result.is_rejected("list-voices"));
        assert_eq!(session.layer_state("voice-generation/speech").unwrap(), LayerState::Inactive);
    }

    #[test]
    fn exclusive_request_that_gains_nothing_evicts_nothing() {
        let session = session();
        let before = session.active_names();
        let result = session
            .activate(
                &ActivationRequest::new()
                    .with_categories(["voice-generation"])
                    .exclusive(true),
            )
            .unwrap();
        assert!(result.added.is_empty());
        assert!(result.removed.is_empty());
        assert!(!result.rejected.is_empty());
        assert_eq!(session.active_names(), before);
    }

    #[test]
    fn eviction_suggestions_skip_permanent_tools() {
        let session = session();
        let suggested = session.suggest_eviction(3);
        assert_eq!(suggested.len(), 3);
        for name in &suggested {
            assert!(session.is_active(name.as_str()));
            assert!(![
                builtin::DISCOVER_CAPABILITIES,
                builtin::ACTIVATE_TOOLSET,
                builtin::SEARCH_TOOLS,
                builtin::GET_ACTIVE_TOOLS,
            ]
            .contains(&name.as_str()));
        }
        assert!(session.suggest_eviction(0).is_empty());
    }

    #[test]
    fn subcategory_activity_moves_the_owning_category() {
        let session = session();
        session
            .activate(&ActivationRequest::new().with_tools(["clean-temp-files"]))
            .unwrap();
        assert_eq!(session.layer_state("maintenance/cleanup").unwrap(), LayerState::Active);
        assert_eq!(session.layer_state("maintenance").unwrap(), LayerState::Active);

        session.deactivate(&["clean-temp-files"]).unwrap();
        assert_eq!(session.layer_state("maintenance/cleanup").unwrap(), LayerState::Inactive);
        assert_eq!(session.layer_state("maintenance").unwrap(), LayerState::Inactive);
    }

    #[tokio::test]
    async fn calling_tools_tracks_usage() {
        let session = session();
        let output = session
            .call_tool("create-video", json!({ "title": "intro" }))
            .await
            .unwrap();
        assert_eq!(output["echo"]["title"], "intro");

        let usage = session.usage("create-video").unwrap();
        assert_eq!(usage.usage_frequency, 1);
        assert!(usage.last_activation.is_some());

        let err = session
            .call_tool("clean-temp-files", Value::Null)
            .await
            .expect_err("inactive");
        assert!(matches!(&err, EngineError::ToolInactive { name } if name.as_str() == "clean-temp-files"));
        assert_eq!(err.kind(), "ToolInactiveError");
        assert_eq!(session.usage("clean-temp-files").unwrap().usage_frequency, 0);
    }

    #[tokio::test]
    async fn failing_handlers_do_not_count() {
        let failing = ToolHandler::external(|_input: Value| async move {
            Err::<Value, _>(ToolError::execution("render farm offline"))
        });
        let metadata = ToolMetadata::new(Category::CoreOperations, 50).unwrap();
        let session = ToolsetSession::builder(ToolsetConfig::default())
            .credentials(StaticCredentials::none())
            .tools(media())
            .tool(
                ToolDefinition::new(ToolDescriptor::new(ToolName::from_static("flaky"), ""), metadata),
                failing,
            )
            .build()
            .unwrap();

        let err = session.call_tool("flaky", Value::Null).await.expect_err("fails");
        assert_eq!(err.kind(), "ToolExecutionError");
        assert_eq!(session.usage("flaky").unwrap().usage_frequency, 0);
    }

    #[tokio::test]
    async fn concurrent_activations_are_linearized() {
        let session = Arc::new(session());
        let tasks: Vec<_> = ["maintenance", "asset-generation", "studio-management", "maintenance"]
            .into_iter()
            .map(|category| {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.activate(&ActivationRequest::new().with_categories([category]))
                })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let weight: u64 = session
            .list_active()
            .iter()
            .map(|tool| u64::from(tool.estimated_tokens))
            .sum();
        assert_eq!(session.budget().running_weight, weight);
        assert!(session.is_active(builtin::SEARCH_TOOLS));
    }

    #[test]
    fn budget_warning_at_critical_pressure() {
        let mut config = ToolsetConfig::default();
        config.budget.max_tokens = 4000;
        let session = ToolsetSession::builder(config)
            .credentials(StaticCredentials::none())
            .tools(media())
            .build()
            .unwrap();

        let result = session
            .activate(&ActivationRequest::new().with_categories(["asset-generation"]))
            .unwrap();
        assert_eq!(result.pressure, ContextPressure::Critical);
        let warning = result.warning.expect("warning at critical pressure");
        assert_eq!(warning.kind, "BudgetExceededWarning");
        assert!(!warning.suggested_evictions.is_empty());
        assert!(warning
            .suggested_evictions
            .iter()
            .all(|name| !name.as_str().contains("image") && session.is_active(name.as_str())));
    }
}

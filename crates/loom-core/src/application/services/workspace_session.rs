//! Workspace Session - one open workspace and everything that edits it.
//!
//! The session owns the artifact tree, the operation executor with its
//! history, and the clipboard. All edits go through operations so that they
//! can be undone.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{
    application::{
        ApplicationError,
        clipboard::{ClipboardKind, ClipboardPayload, ClipboardService},
        history::{HistoryConfig, UndoRedoManager},
        operations::{
            AddEntity, AddEntityParams, AddScope, AddScopeParams, ApplyGeneration,
            ApplyGenerationParams, EditProperties, EditPropertiesParams, ImportSubtree,
            ImportSubtreeParams, Operation, OperationExecutor, OperationResult, Paste, PasteParams,
            RemoveArtifact, RemoveParams, RenameArtifact, RenameParams,
        },
        plugins::PluginRegistry,
        ports::{DatasourceProvider, WorkspaceStore},
        services::generation_service::GenerationOutcome,
    },
    bus::SubscriptionToken,
    domain::{
        ArtifactId, ArtifactTree, IdPolicy, PersistedNode, TreeValidator, TypeRegistry, Value,
        WorkspaceModel,
    },
    error::LoomResult,
};

pub struct WorkspaceSession {
    tree: ArtifactTree,
    model: WorkspaceModel,
    executor: OperationExecutor,
    clipboard: ClipboardService,
    registry: Arc<TypeRegistry>,
    subscriptions: Vec<SubscriptionToken>,
}

impl WorkspaceSession {
    /// Start an empty workspace.
    pub fn create(
        name: impl Into<String>,
        registry: Arc<TypeRegistry>,
        history: HistoryConfig,
    ) -> LoomResult<Self> {
        let mut tree = ArtifactTree::new();
        let model = WorkspaceModel::create(&mut tree, name)?;
        Ok(Self::assemble(tree, model, registry, history))
    }

    /// Rebuild a saved workspace, keeping its ids.
    pub fn from_document(
        document: &PersistedNode,
        registry: Arc<TypeRegistry>,
        history: HistoryConfig,
    ) -> LoomResult<Self> {
        let mut tree = ArtifactTree::new();
        let root = tree.restore(document, &registry, IdPolicy::Preserve)?;
        TreeValidator::validate(&tree, root)?;
        let model = WorkspaceModel::locate(&tree, root)?;
        debug!(nodes = tree.len(), "Workspace restored");
        Ok(Self::assemble(tree, model, registry, history))
    }

    #[instrument(skip_all, fields(location = %location.display()))]
    pub fn open(
        store: &dyn WorkspaceStore,
        location: &Path,
        registry: Arc<TypeRegistry>,
        history: HistoryConfig,
    ) -> LoomResult<Self> {
        if !store.exists(location) {
            return Err(ApplicationError::WorkspaceNotFound {
                path: location.to_path_buf(),
            }
            .into());
        }
        let document = store.load(location)?;
        let session = Self::from_document(&document, registry, history)?;
        info!(workspace = %session.name(), "Workspace opened");
        Ok(session)
    }

    fn assemble(
        tree: ArtifactTree,
        model: WorkspaceModel,
        registry: Arc<TypeRegistry>,
        history: HistoryConfig,
    ) -> Self {
        Self {
            tree,
            model,
            executor: OperationExecutor::new(history),
            clipboard: ClipboardService::new(),
            registry,
            subscriptions: Vec::new(),
        }
    }

    /// Persist the linked workspace. Detached artifacts kept alive for undo
    /// are not part of the document.
    #[instrument(skip_all, fields(location = %location.display()))]
    pub fn save(&mut self, store: &dyn WorkspaceStore, location: &Path) -> LoomResult<()> {
        let document = self.document()?;
        store.save(location, &document)?;
        for id in self.tree.descendants(self.model.root) {
            if let Some(node) = self.tree.get_mut(id) {
                node.properties_mut().mark_clean();
            }
        }
        info!(nodes = document.count(), "Workspace saved");
        Ok(())
    }

    pub fn document(&self) -> LoomResult<PersistedNode> {
        Ok(self.tree.capture(self.model.root)?)
    }

    /// `true` when any linked artifact changed since load or save.
    pub fn is_dirty(&self) -> bool {
        self.tree
            .descendants(self.model.root)
            .into_iter()
            .filter_map(|id| self.tree.get(id))
            .any(|node| node.properties().is_dirty())
    }

    /// Hook every registered workspace subscriber onto this workspace.
    pub fn attach_subscribers(&mut self, plugins: &PluginRegistry) {
        for subscriber in plugins.workspace_subscribers() {
            let tokens = subscriber.subscribe(self.tree.events_mut());
            debug!(plugin = %subscriber.manifest(), handlers = tokens.len(), "Subscriber attached");
            self.subscriptions.extend(tokens);
        }
    }

    /// Drop every subscription made through [`Self::attach_subscribers`].
    pub fn detach_subscribers(&mut self) {
        for token in self.subscriptions.drain(..) {
            self.tree.events_mut().unsubscribe(token);
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn tree(&self) -> &ArtifactTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ArtifactTree {
        &mut self.tree
    }

    pub fn model(&self) -> &WorkspaceModel {
        &self.model
    }

    pub fn root(&self) -> ArtifactId {
        self.model.root
    }

    pub fn name(&self) -> String {
        self.model.name(&self.tree)
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn history(&self) -> &UndoRedoManager {
        self.executor.history()
    }

    pub fn clipboard(&self) -> &ClipboardService {
        &self.clipboard
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.model
            .scopes(&self.tree)
            .iter()
            .filter_map(|id| self.tree.get(*id))
            .map(|scope| scope.name())
            .collect()
    }

    pub fn find_scope(&self, name: &str) -> Option<ArtifactId> {
        self.model.find_scope(&self.tree, name)
    }

    // ── operations ────────────────────────────────────────────────────────

    pub fn execute<O: Operation>(
        &mut self,
        operation: O,
        params: O::Params,
    ) -> LoomResult<OperationResult> {
        self.executor.execute(&mut self.tree, operation, params)
    }

    pub fn undo(&mut self) -> LoomResult<String> {
        self.executor.undo(&mut self.tree)
    }

    pub fn redo(&mut self) -> LoomResult<String> {
        self.executor.redo(&mut self.tree)
    }

    pub fn add_scope(&mut self, name: &str) -> LoomResult<ArtifactId> {
        let root = self.model.root;
        self.execute(AddScope, AddScopeParams::new(root, name))?;
        self.model
            .find_scope(&self.tree, name)
            .ok_or_else(|| missing("add scope", name))
    }

    /// `table` overrides the table name derived from the entity name.
    pub fn add_entity(
        &mut self,
        scope: ArtifactId,
        name: &str,
        table: Option<&str>,
    ) -> LoomResult<ArtifactId> {
        let mut params = AddEntityParams::new(scope, name);
        if let Some(table) = table {
            params = params.with_table(table);
        }
        self.execute(AddEntity, params)?;
        self.tree
            .find_child_by_name(scope, name)
            .ok_or_else(|| missing("add entity", name))
    }

    pub fn rename(&mut self, target: ArtifactId, new_name: &str) -> LoomResult<OperationResult> {
        self.execute(RenameArtifact, RenameParams::new(target, new_name))
    }

    pub fn remove(&mut self, target: ArtifactId) -> LoomResult<OperationResult> {
        let result = self.execute(RemoveArtifact, RemoveParams::new(target))?;
        if self.clipboard.clear_if_contains(target) {
            debug!(%target, "Removed artifact dropped from clipboard");
        }
        Ok(result)
    }

    pub fn edit_properties(
        &mut self,
        target: ArtifactId,
        changes: impl IntoIterator<Item = (String, Value)>,
    ) -> LoomResult<OperationResult> {
        let params = changes
            .into_iter()
            .fold(EditPropertiesParams::new(target), |params, (name, value)| {
                params.set(name, value)
            });
        self.execute(EditProperties, params)
    }

    // ── clipboard ─────────────────────────────────────────────────────────

    pub fn copy(&mut self, id: ArtifactId) -> LoomResult<&ClipboardPayload> {
        Ok(self.clipboard.copy(&self.tree, id)?)
    }

    pub fn cut(&mut self, id: ArtifactId) -> LoomResult<&ClipboardPayload> {
        Ok(self.clipboard.cut(&self.tree, id)?)
    }

    /// Paste the clipboard under `target` and return the pasted artifact.
    ///
    /// A cut is consumed by its paste; a copy can be pasted again.
    pub fn paste(&mut self, target: ArtifactId) -> LoomResult<ArtifactId> {
        let params = match (self.clipboard.get_artifact(&self.tree), self.clipboard.payload()) {
            (Some(_), Some(payload)) => PasteParams::from_payload(payload, target),
            (None, Some(payload)) => {
                debug!(source = %payload.artifact, "Clipboard source left the workspace");
                return Err(ApplicationError::ClipboardEmpty.into());
            }
            _ => return Err(ApplicationError::ClipboardEmpty.into()),
        };
        let kind = params.kind;
        let source = params.source;

        self.execute(Paste::new(Arc::clone(&self.registry)), params)?;

        match kind {
            ClipboardKind::Cut => {
                self.clipboard.clear();
                Ok(source)
            }
            ClipboardKind::Copy => self
                .tree
                .children(target)
                .last()
                .copied()
                .ok_or_else(|| missing("paste", "copy")),
        }
    }

    // ── import and generation ─────────────────────────────────────────────

    /// Link a persisted subtree under `parent` with fresh ids.
    pub fn import(&mut self, parent: ArtifactId, document: PersistedNode) -> LoomResult<ArtifactId> {
        self.execute(
            ImportSubtree::new(Arc::clone(&self.registry)),
            ImportSubtreeParams::new(parent, document),
        )?;
        self.last_child(parent, "import")
    }

    /// Load a document through a datasource provider and import it.
    pub async fn import_from(
        &mut self,
        provider: &dyn DatasourceProvider,
        source: &str,
        parent: ArtifactId,
        cancel: &CancellationToken,
    ) -> LoomResult<ArtifactId> {
        let document = provider.load(source, cancel).await?;
        if cancel.is_cancelled() {
            return Err(ApplicationError::Cancelled.into());
        }
        info!(provider = %provider.manifest(), source, nodes = document.count(), "Datasource loaded");
        self.import(parent, document)
    }

    /// Link a finished generation run under `outputs` as one undoable step.
    pub fn apply_generation(&mut self, outcome: GenerationOutcome) -> LoomResult<ArtifactId> {
        let outputs = self.model.outputs;
        let params = ApplyGenerationParams::new(outcome.staging, outcome.root, outputs);
        self.execute(ApplyGeneration, params)?;
        self.last_child(outputs, "apply generation")
    }

    fn last_child(&self, parent: ArtifactId, operation: &str) -> LoomResult<ArtifactId> {
        self.tree
            .children(parent)
            .last()
            .copied()
            .ok_or_else(|| missing(operation, "child"))
    }
}

fn missing(operation: &str, what: &str) -> crate::error::LoomError {
    crate::error::LoomError::Internal {
        message: format!("{operation} succeeded but '{what}' is not linked"),
    }
}

impl std::fmt::Debug for WorkspaceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("root", &self.model.root)
            .field("nodes", &self.tree.len())
            .field("history", self.executor.history())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

//! Adding and removing artifacts.
//!
//! Undo unlinks instead of discarding, so the same artifact (same id, same
//! decorators) comes back on redo.

use tracing::debug;

use crate::{
    application::operations::{Operation, OperationResult, Placement, check_name},
    domain::{
        Artifact, ArtifactId, ArtifactTree, DomainResult, TableDecorator, WorkspaceModel, kinds,
        model,
    },
    error::LoomResult,
};

fn stashed(placement: Option<Placement>, operation: &str) -> LoomResult<Placement> {
    placement.ok_or_else(|| crate::error::LoomError::Internal {
        message: format!("{operation} was recorded without being executed"),
    })
}

/// Insert `artifact` and link it under `parent` at the end.
fn link_new(tree: &mut ArtifactTree, parent: ArtifactId, artifact: Artifact) -> DomainResult<Placement> {
    let index = tree.require(parent)?.children().len();
    let child = tree.insert(artifact)?;
    if let Err(err) = tree.insert_child(parent, index, child) {
        tree.discard(child)?;
        return Err(err);
    }
    Ok(Placement {
        parent,
        child,
        index,
    })
}

// ============================================================================
// AddScope
// ============================================================================

/// Add a named scope under a workspace's `scopes` container.
pub struct AddScope;

#[derive(Debug, Clone)]
pub struct AddScopeParams {
    pub workspace: ArtifactId,
    pub name: String,
    placement: Option<Placement>,
}

impl AddScopeParams {
    pub fn new(workspace: ArtifactId, name: impl Into<String>) -> Self {
        Self {
            workspace,
            name: name.into(),
            placement: None,
        }
    }

    /// Id of the created scope once executed.
    pub fn created(&self) -> Option<ArtifactId> {
        self.placement.map(|p| p.child)
    }
}

impl Operation for AddScope {
    type Params = AddScopeParams;

    fn name(&self) -> &'static str {
        "add-scope"
    }

    fn describe(&self, params: &AddScopeParams) -> String {
        format!("Add scope '{}'", params.name)
    }

    fn validate(&self, tree: &ArtifactTree, params: &AddScopeParams) -> Option<String> {
        if let Some(reason) = check_name(&params.name) {
            return Some(reason);
        }
        let model = match WorkspaceModel::locate(tree, params.workspace) {
            Ok(model) => model,
            Err(e) => return Some(e.to_string()),
        };
        model
            .find_scope(tree, &params.name)
            .map(|_| format!("scope '{}' already exists", params.name))
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut AddScopeParams) -> OperationResult {
        let outcome = WorkspaceModel::locate(tree, params.workspace)
            .and_then(|model| link_new(tree, model.scopes, model::scope(params.name.as_str())));
        match outcome {
            Ok(placement) => {
                debug!(scope = %placement.child, "Scope added");
                params.placement = Some(placement);
                OperationResult::ok()
            }
            Err(e) => OperationResult::failed(e.to_string()),
        }
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut AddScopeParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.unlink(tree)
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut AddScopeParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.relink(tree)
    }

    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut AddScopeParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.placement {
            Some(placement) if !applied => placement.release(tree),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// AddEntity
// ============================================================================

/// Add an entity to a scope, optionally mapped to a table.
pub struct AddEntity;

#[derive(Debug, Clone)]
pub struct AddEntityParams {
    pub scope: ArtifactId,
    pub name: String,
    pub table: Option<String>,
    placement: Option<Placement>,
}

impl AddEntityParams {
    pub fn new(scope: ArtifactId, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
            table: None,
            placement: None,
        }
    }

    /// Attach a `table` decorator; an empty name keeps the derived default.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn created(&self) -> Option<ArtifactId> {
        self.placement.map(|p| p.child)
    }
}

impl Operation for AddEntity {
    type Params = AddEntityParams;

    fn name(&self) -> &'static str {
        "add-entity"
    }

    fn describe(&self, params: &AddEntityParams) -> String {
        format!("Add entity '{}'", params.name)
    }

    fn validate(&self, tree: &ArtifactTree, params: &AddEntityParams) -> Option<String> {
        if let Some(reason) = check_name(&params.name) {
            return Some(reason);
        }
        let Some(scope) = tree.get(params.scope) else {
            return Some(format!("scope {} not found", params.scope));
        };
        if scope.kind() != kinds::SCOPE {
            return Some(format!("entities belong to scopes, not '{}'", scope.kind()));
        }
        tree.find_child_by_name(params.scope, &params.name)
            .map(|_| format!("'{}' already has an entity '{}'", scope.name(), params.name))
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut AddEntityParams) -> OperationResult {
        let mut entity = model::entity(params.name.as_str());
        if let Some(table) = &params.table {
            let decorator = match table.trim() {
                "" => TableDecorator::new(),
                name => TableDecorator::new().with_table_name(name),
            };
            if let Err(e) = entity.add_decorator(Box::new(decorator)) {
                return OperationResult::failed(e.to_string());
            }
        }

        match link_new(tree, params.scope, entity) {
            Ok(placement) => {
                params.placement = Some(placement);
                OperationResult::ok()
            }
            Err(e) => OperationResult::failed(e.to_string()),
        }
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut AddEntityParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.unlink(tree)
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut AddEntityParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.relink(tree)
    }

    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut AddEntityParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.placement {
            Some(placement) if !applied => placement.release(tree),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// RemoveArtifact
// ============================================================================

/// Unlink an artifact from its parent. The subtree stays restorable.
pub struct RemoveArtifact;

#[derive(Debug, Clone)]
pub struct RemoveParams {
    pub target: ArtifactId,
    placement: Option<Placement>,
}

impl RemoveParams {
    pub fn new(target: ArtifactId) -> Self {
        Self {
            target,
            placement: None,
        }
    }
}

/// Kinds that form the fixed skeleton of a workspace.
const FIXED_KINDS: [&str; 3] = [
    kinds::WORKSPACE,
    kinds::SCOPE_COLLECTION,
    kinds::OUTPUT_COLLECTION,
];

impl Operation for RemoveArtifact {
    type Params = RemoveParams;

    fn name(&self) -> &'static str {
        "remove"
    }

    fn describe(&self, params: &RemoveParams) -> String {
        format!("Remove {}", params.target)
    }

    fn validate(&self, tree: &ArtifactTree, params: &RemoveParams) -> Option<String> {
        let Some(target) = tree.get(params.target) else {
            return Some(format!("artifact {} not found", params.target));
        };
        if FIXED_KINDS.contains(&target.kind()) {
            return Some(format!("a '{}' cannot be removed", target.kind()));
        }
        target
            .parent()
            .is_none()
            .then(|| format!("'{}' is not linked into the workspace", target.name()))
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut RemoveParams) -> OperationResult {
        match tree.detach(params.target) {
            Ok(Some((parent, index))) => {
                params.placement = Some(Placement {
                    parent,
                    child: params.target,
                    index,
                });
                OperationResult::ok()
            }
            Ok(None) => OperationResult::failed("artifact has no parent"),
            Err(e) => OperationResult::failed(e.to_string()),
        }
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut RemoveParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.relink(tree)
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut RemoveParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.unlink(tree)
    }

    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut RemoveParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.placement {
            Some(placement) if applied => placement.release(tree),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::operations::OperationExecutor;
    use crate::application::ApplicationError;
    use crate::error::LoomError;

    fn workspace() -> (ArtifactTree, WorkspaceModel, OperationExecutor) {
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        (tree, ws, OperationExecutor::default())
    }

    #[test]
    fn duplicate_scope_name_is_rejected() {
        let (mut tree, ws, mut executor) = workspace();
        executor
            .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, "Sales"))
            .unwrap();

        let err = executor
            .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, "Sales"))
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::Application(ApplicationError::ValidationFailed(_))
        ));
        assert_eq!(ws.scopes(&tree).len(), 1);
        assert_eq!(executor.history().undo_len(), 1);
    }

    #[test]
    fn entity_gets_its_table_decorator() {
        let (mut tree, ws, mut executor) = workspace();
        executor
            .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, "Sales"))
            .unwrap();
        let sales = ws.find_scope(&tree, "Sales").unwrap();

        executor
            .execute(
                &mut tree,
                AddEntity,
                AddEntityParams::new(sales, "OrderLine").with_table(""),
            )
            .unwrap();
        let line = tree.find_child_by_name(sales, "OrderLine").unwrap();
        let table = tree.get(line).unwrap().decorator::<TableDecorator>().unwrap();
        assert_eq!(table.table_name(), "order_line");
    }

    #[test]
    fn entity_needs_a_scope_parent() {
        let (mut tree, ws, mut executor) = workspace();
        assert!(
            executor
                .execute(&mut tree, AddEntity, AddEntityParams::new(ws.outputs, "X"))
                .is_err()
        );
    }

    #[test]
    fn remove_then_undo_restores_position() {
        let (mut tree, ws, mut executor) = workspace();
        for name in ["A", "B", "C"] {
            executor
                .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, name))
                .unwrap();
        }
        let b = ws.find_scope(&tree, "B").unwrap();

        executor
            .execute(&mut tree, RemoveArtifact, RemoveParams::new(b))
            .unwrap();
        assert_eq!(ws.scopes(&tree).len(), 2);
        assert!(tree.contains(b));

        executor.undo(&mut tree).unwrap();
        assert_eq!(ws.scopes(&tree)[1], b);

        executor.redo(&mut tree).unwrap();
        assert!(!ws.scopes(&tree).contains(&b));
    }

    #[test]
    fn workspace_skeleton_cannot_be_removed() {
        let (mut tree, ws, mut executor) = workspace();
        assert!(
            executor
                .execute(&mut tree, RemoveArtifact, RemoveParams::new(ws.scopes))
                .is_err()
        );
        assert_eq!(tree.parent(ws.scopes), Some(ws.root));
    }

    #[test]
    fn execute_undo_redo_gives_equal_documents() {
        let (mut tree, ws, mut executor) = workspace();
        executor
            .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, "Sales"))
            .unwrap();
        let after = tree.capture(ws.root).unwrap();

        executor.undo(&mut tree).unwrap();
        executor.redo(&mut tree).unwrap();
        assert_eq!(tree.capture(ws.root).unwrap(), after);
    }
}

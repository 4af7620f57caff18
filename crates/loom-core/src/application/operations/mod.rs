// ============================================================================
// application/operations - UNDOABLE WORKSPACE EDITS
// ============================================================================

//! Undoable operations and the executor that records them.
//!
//! An [`Operation`] is stateless; everything it needs to reverse itself is
//! stashed in its `Params` during `execute` (created ids, former parents,
//! snapshots). The executor pairs the two into a [`RecordedOperation`] and
//! hands it to the [`UndoRedoManager`].

mod graft;
mod paste;
mod properties;
mod structure;

use tracing::{info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        history::{HistoryConfig, UndoRedoManager, UndoableAction},
    },
    domain::{ArtifactId, ArtifactTree},
    error::LoomResult,
};

pub use graft::{ApplyGeneration, ApplyGenerationParams, ImportSubtree, ImportSubtreeParams};
pub use paste::{Paste, PasteParams};
pub use properties::{EditProperties, EditPropertiesParams, RenameArtifact, RenameParams};
pub use structure::{
    AddEntity, AddEntityParams, AddScope, AddScopeParams, RemoveArtifact, RemoveParams,
};

/// Outcome of [`Operation::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub success: bool,
    pub message: Option<String>,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// Map a fallible step onto a result, keeping the error text.
    pub fn from_outcome<E: std::fmt::Display>(outcome: Result<(), E>) -> Self {
        match outcome {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Where an artifact sat under its parent, kept so it can be relinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub parent: ArtifactId,
    pub child: ArtifactId,
    pub index: usize,
}

impl Placement {
    pub fn unlink(&self, tree: &mut ArtifactTree) -> LoomResult<()> {
        tree.remove_child(self.parent, self.child)?;
        Ok(())
    }

    pub fn relink(&self, tree: &mut ArtifactTree) -> LoomResult<()> {
        tree.insert_child(self.parent, self.index, self.child)?;
        Ok(())
    }

    /// Free the child if it is still detached. Linked or already freed
    /// children are left alone.
    pub fn release(&self, tree: &mut ArtifactTree) -> LoomResult<()> {
        match tree.get(self.child) {
            Some(artifact) if artifact.parent().is_none() => {
                tree.discard(self.child)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Rollback failed after `failure`: log it and report both.
pub(crate) fn rollback_failed(
    failure: impl std::fmt::Display,
    rollback: impl std::fmt::Display,
) -> OperationResult {
    warn!(%failure, %rollback, "Rollback failed, tree may be partially modified");
    OperationResult::failed(format!("{failure} (rollback failed: {rollback})"))
}

/// Shared check for user supplied names.
pub(crate) fn check_name(name: &str) -> Option<String> {
    name.trim()
        .is_empty()
        .then(|| "name must not be empty".to_string())
}

/// A reversible edit of the workspace tree.
pub trait Operation: Send + Sync + 'static {
    type Params: Send + 'static;

    fn name(&self) -> &'static str;

    /// History label for a completed execution.
    fn describe(&self, _params: &Self::Params) -> String {
        self.name().to_string()
    }

    /// `Some(reason)` rejects the parameters before anything is touched.
    fn validate(&self, tree: &ArtifactTree, params: &Self::Params) -> Option<String>;

    /// Apply the edit, stashing whatever `undo` and `redo` need in `params`.
    fn execute(&self, tree: &mut ArtifactTree, params: &mut Self::Params) -> OperationResult;

    fn undo(&self, tree: &mut ArtifactTree, params: &mut Self::Params) -> LoomResult<()>;

    /// Re-apply a previously undone execution.
    fn redo(&self, tree: &mut ArtifactTree, params: &mut Self::Params) -> LoomResult<()>;

    /// Free whatever only this execution could relink once it leaves
    /// history. `applied` says whether its effect is in the tree.
    fn release(
        &self,
        _tree: &mut ArtifactTree,
        _params: &mut Self::Params,
        _applied: bool,
    ) -> LoomResult<()> {
        Ok(())
    }
}

/// An executed operation together with its filled-in parameters.
pub struct RecordedOperation<O: Operation> {
    operation: O,
    params: O::Params,
    description: String,
}

impl<O: Operation> RecordedOperation<O> {
    pub fn new(operation: O, params: O::Params) -> Self {
        let description = operation.describe(&params);
        Self {
            operation,
            params,
            description,
        }
    }

    pub fn params(&self) -> &O::Params {
        &self.params
    }
}

impl<O: Operation> UndoableAction for RecordedOperation<O> {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn undo(&mut self, tree: &mut ArtifactTree) -> LoomResult<()> {
        self.operation.undo(tree, &mut self.params)
    }

    fn redo(&mut self, tree: &mut ArtifactTree) -> LoomResult<()> {
        self.operation.redo(tree, &mut self.params)
    }

    fn release(&mut self, tree: &mut ArtifactTree, applied: bool) -> LoomResult<()> {
        self.operation.release(tree, &mut self.params, applied)
    }
}

// ============================================================================
// Executor
// ============================================================================

/// Runs operations and records the successful ones.
#[derive(Debug, Default)]
pub struct OperationExecutor {
    history: UndoRedoManager,
}

impl OperationExecutor {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            history: UndoRedoManager::new(config),
        }
    }

    /// Validate, execute and, only on success, record.
    #[instrument(skip_all, fields(operation = operation.name()))]
    pub fn execute<O: Operation>(
        &mut self,
        tree: &mut ArtifactTree,
        operation: O,
        mut params: O::Params,
    ) -> LoomResult<OperationResult> {
        if let Some(reason) = operation.validate(tree, &params) {
            warn!(%reason, "Operation rejected");
            return Err(ApplicationError::ValidationFailed(reason).into());
        }

        let result = operation.execute(tree, &mut params);
        if !result.success {
            let message = result.message.unwrap_or_else(|| "unknown failure".into());
            warn!(%message, "Operation failed");
            return Err(ApplicationError::OperationFailed {
                operation: operation.name().to_string(),
                message,
            }
            .into());
        }

        let recorded = RecordedOperation::new(operation, params);
        info!(action = %recorded.description, "Operation executed");
        self.history.record_action(tree, Box::new(recorded));
        Ok(result)
    }

    pub fn undo(&mut self, tree: &mut ArtifactTree) -> LoomResult<String> {
        self.history.undo(tree)
    }

    pub fn redo(&mut self, tree: &mut ArtifactTree) -> LoomResult<String> {
        self.history.redo(tree)
    }

    pub fn history(&self) -> &UndoRedoManager {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WorkspaceModel, model};
    use crate::error::LoomError;

    /// Sets `count` to the given value; fails on negative input.
    struct SetCount;

    struct SetCountParams {
        target: ArtifactId,
        value: i64,
        previous: i64,
    }

    impl Operation for SetCount {
        type Params = SetCountParams;

        fn name(&self) -> &'static str {
            "set-count"
        }

        fn validate(&self, tree: &ArtifactTree, params: &SetCountParams) -> Option<String> {
            (!tree.contains(params.target)).then(|| "unknown target".to_string())
        }

        fn execute(&self, tree: &mut ArtifactTree, params: &mut SetCountParams) -> OperationResult {
            if params.value < 0 {
                return OperationResult::failed("negative");
            }
            params.previous = tree
                .get(params.target)
                .map(|a| a.get_value("count", 0i64))
                .unwrap_or_default();
            match tree.set_value(params.target, "count", params.value) {
                Ok(_) => OperationResult::ok(),
                Err(e) => OperationResult::failed(e.to_string()),
            }
        }

        fn undo(&self, tree: &mut ArtifactTree, params: &mut SetCountParams) -> LoomResult<()> {
            tree.set_value(params.target, "count", params.previous)?;
            Ok(())
        }

        fn redo(&self, tree: &mut ArtifactTree, params: &mut SetCountParams) -> LoomResult<()> {
            tree.set_value(params.target, "count", params.value)?;
            Ok(())
        }
    }

    fn params(target: ArtifactId, value: i64) -> SetCountParams {
        SetCountParams {
            target,
            value,
            previous: 0,
        }
    }

    #[test]
    fn failed_execution_is_not_recorded() {
        let mut tree = ArtifactTree::new();
        let id = tree.insert(model::scope("S")).unwrap();
        let mut executor = OperationExecutor::default();

        let err = executor
            .execute(&mut tree, SetCount, params(id, -1))
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::Application(ApplicationError::OperationFailed { .. })
        ));
        assert_eq!(executor.history().undo_len(), 0);
    }

    #[test]
    fn rejected_parameters_leave_everything_untouched() {
        let mut tree = ArtifactTree::new();
        let mut executor = OperationExecutor::default();

        let err = executor
            .execute(&mut tree, SetCount, params(ArtifactId::new(), 3))
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::Application(ApplicationError::ValidationFailed(_))
        ));
        assert!(tree.is_empty());
        assert_eq!(executor.history().undo_len(), 0);
    }

    #[test]
    fn success_records_once_and_clears_redo() {
        let mut tree = ArtifactTree::new();
        let id = tree.insert(model::scope("S")).unwrap();
        let mut executor = OperationExecutor::default();

        executor.execute(&mut tree, SetCount, params(id, 1)).unwrap();
        executor.undo(&mut tree).unwrap();
        assert_eq!(executor.history().redo_len(), 1);

        executor.execute(&mut tree, SetCount, params(id, 2)).unwrap();
        assert_eq!(executor.history().undo_len(), 1);
        assert_eq!(executor.history().redo_len(), 0);
        assert_eq!(tree.get(id).unwrap().get_value("count", 0i64), 2);
    }

    #[test]
    fn redo_replays_the_first_run() {
        let mut tree = ArtifactTree::new();
        let id = tree.insert(model::scope("S")).unwrap();
        tree.set_value(id, "count", 4i64).unwrap();
        let mut executor = OperationExecutor::default();

        executor.execute(&mut tree, SetCount, params(id, 7)).unwrap();
        executor.undo(&mut tree).unwrap();
        assert_eq!(tree.get(id).unwrap().get_value("count", 0i64), 4);

        executor.redo(&mut tree).unwrap();
        assert_eq!(tree.get(id).unwrap().get_value("count", 0i64), 7);
        assert_eq!(executor.history().undo_len(), 1);
        assert_eq!(executor.history().redo_len(), 0);
    }

    /// Links `child` under `target`; on failure discards `child`, which only
    /// works when it was never linked.
    struct LinkUnder;

    struct LinkUnderParams {
        child: ArtifactId,
        target: ArtifactId,
    }

    impl Operation for LinkUnder {
        type Params = LinkUnderParams;

        fn name(&self) -> &'static str {
            "link-under"
        }

        fn validate(&self, _tree: &ArtifactTree, _params: &LinkUnderParams) -> Option<String> {
            None
        }

        fn execute(&self, tree: &mut ArtifactTree, params: &mut LinkUnderParams) -> OperationResult {
            match tree.insert_child(params.target, 0, params.child) {
                Ok(()) => OperationResult::ok(),
                Err(e) => match tree.discard(params.child) {
                    Ok(_) => OperationResult::failed(e.to_string()),
                    Err(rollback) => rollback_failed(e, rollback),
                },
            }
        }

        fn undo(&self, _tree: &mut ArtifactTree, _params: &mut LinkUnderParams) -> LoomResult<()> {
            Ok(())
        }

        fn redo(&self, _tree: &mut ArtifactTree, _params: &mut LinkUnderParams) -> LoomResult<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_rollback_is_reported_with_the_failure() {
        let mut tree = ArtifactTree::new();
        let scope = tree.insert(model::scope("S")).unwrap();
        let entity = tree.insert(model::entity("E")).unwrap();
        tree.add_child(scope, entity).unwrap();
        let mut executor = OperationExecutor::default();

        let err = executor
            .execute(
                &mut tree,
                LinkUnder,
                LinkUnderParams {
                    child: entity,
                    target: ArtifactId::new(),
                },
            )
            .unwrap_err();
        let message = match err {
            LoomError::Application(ApplicationError::OperationFailed { message, .. }) => message,
            other => panic!("expected an operation failure, got {other:?}"),
        };
        assert!(message.contains("(rollback failed: "), "{message}");
        assert_eq!(tree.parent(entity), Some(scope));
        assert_eq!(executor.history().undo_len(), 0);
    }

    #[test]
    fn add_scope_undo_redo_keeps_identity() {
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        let mut executor = OperationExecutor::default();

        executor
            .execute(&mut tree, AddScope, AddScopeParams::new(ws.root, "Infrastructure"))
            .unwrap();
        let added = ws.find_scope(&tree, "Infrastructure").unwrap();
        assert_eq!(tree.parent(added), Some(ws.scopes));

        executor.undo(&mut tree).unwrap();
        assert!(ws.find_scope(&tree, "Infrastructure").is_none());
        assert!(tree.parent(added).is_none());

        executor.redo(&mut tree).unwrap();
        assert_eq!(ws.find_scope(&tree, "Infrastructure"), Some(added));
        assert_eq!(tree.parent(added), Some(ws.scopes));
    }
}

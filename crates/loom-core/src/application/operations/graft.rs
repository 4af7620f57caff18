//! Bringing whole subtrees into the workspace: imported documents and the
//! output of a generation run.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::operations::{Operation, OperationResult, Placement, rollback_failed},
    domain::{ArtifactId, ArtifactTree, IdPolicy, PersistedNode, TypeRegistry},
    error::{LoomError, LoomResult},
};

fn stashed(placement: Option<Placement>, operation: &str) -> LoomResult<Placement> {
    placement.ok_or_else(|| LoomError::Internal {
        message: format!("{operation} was recorded without being executed"),
    })
}

// ============================================================================
// ImportSubtree
// ============================================================================

/// Reconstruct a document under `parent` with fresh ids.
pub struct ImportSubtree {
    registry: Arc<TypeRegistry>,
}

impl ImportSubtree {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Debug, Clone)]
pub struct ImportSubtreeParams {
    pub parent: ArtifactId,
    pub document: PersistedNode,
    placement: Option<Placement>,
}

impl ImportSubtreeParams {
    pub fn new(parent: ArtifactId, document: PersistedNode) -> Self {
        Self {
            parent,
            document,
            placement: None,
        }
    }

    pub fn imported(&self) -> Option<ArtifactId> {
        self.placement.map(|p| p.child)
    }
}

impl Operation for ImportSubtree {
    type Params = ImportSubtreeParams;

    fn name(&self) -> &'static str {
        "import"
    }

    fn describe(&self, params: &ImportSubtreeParams) -> String {
        format!(
            "Import '{}' ({} nodes)",
            params.document.name().unwrap_or("unnamed"),
            params.document.count()
        )
    }

    fn validate(&self, tree: &ArtifactTree, params: &ImportSubtreeParams) -> Option<String> {
        if !tree.contains(params.parent) {
            return Some(format!("import target {} not found", params.parent));
        }
        if let Some(name) = params.document.name() {
            if tree.find_child_by_name(params.parent, name).is_some() {
                return Some(format!("'{name}' already exists under the import target"));
            }
        }
        (!self.registry.knows(&params.document.type_discriminator)).then(|| {
            format!(
                "unknown artifact type '{}'",
                params.document.type_discriminator
            )
        })
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut ImportSubtreeParams) -> OperationResult {
        let root = match tree.restore(&params.document, &self.registry, IdPolicy::Fresh) {
            Ok(root) => root,
            Err(e) => return OperationResult::failed(e.to_string()),
        };
        let index = tree.children(params.parent).len();
        if let Err(e) = tree.insert_child(params.parent, index, root) {
            if let Err(rollback) = tree.discard(root) {
                return rollback_failed(e, rollback);
            }
            return OperationResult::failed(e.to_string());
        }
        info!(%root, nodes = params.document.count(), "Subtree imported");
        params.placement = Some(Placement {
            parent: params.parent,
            child: root,
            index,
        });
        OperationResult::ok()
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut ImportSubtreeParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.unlink(tree)
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut ImportSubtreeParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.relink(tree)
    }

    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut ImportSubtreeParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.placement {
            Some(placement) if !applied => placement.release(tree),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// ApplyGeneration
// ============================================================================

/// Move a finished staging subtree into the workspace in one step.
pub struct ApplyGeneration;

#[derive(Debug)]
pub struct ApplyGenerationParams {
    pub staging: ArtifactTree,
    pub root: ArtifactId,
    pub parent: ArtifactId,
    label: String,
    placement: Option<Placement>,
}

impl ApplyGenerationParams {
    pub fn new(staging: ArtifactTree, root: ArtifactId, parent: ArtifactId) -> Self {
        let label = staging
            .get(root)
            .map(|a| a.name())
            .unwrap_or_else(|| root.to_string());
        Self {
            staging,
            root,
            parent,
            label,
            placement: None,
        }
    }
}

impl Operation for ApplyGeneration {
    type Params = ApplyGenerationParams;

    fn name(&self) -> &'static str {
        "apply-generation"
    }

    fn describe(&self, params: &ApplyGenerationParams) -> String {
        format!("Apply generated '{}'", params.label)
    }

    fn validate(&self, tree: &ArtifactTree, params: &ApplyGenerationParams) -> Option<String> {
        if !tree.contains(params.parent) {
            return Some(format!("output container {} not found", params.parent));
        }
        match params.staging.get(params.root) {
            None => Some("generated subtree is missing from staging".into()),
            Some(root) if root.parent().is_some() => {
                Some("generated root is still linked inside staging".into())
            }
            Some(_) => None,
        }
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut ApplyGenerationParams) -> OperationResult {
        let index = tree.children(params.parent).len();
        let nodes = params.staging.descendants(params.root).len();
        if let Err(e) = tree.graft(&mut params.staging, params.root, params.parent) {
            return OperationResult::failed(e.to_string());
        }
        info!(root = %params.root, nodes, "Generated subtree applied");
        params.placement = Some(Placement {
            parent: params.parent,
            child: params.root,
            index,
        });
        OperationResult::ok_with(format!("{nodes} artifacts added"))
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut ApplyGenerationParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.unlink(tree)
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut ApplyGenerationParams) -> LoomResult<()> {
        stashed(params.placement, self.name())?.relink(tree)
    }

    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut ApplyGenerationParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.placement {
            Some(placement) if !applied => placement.release(tree),
            _ => Ok(()),
        }
    }
}

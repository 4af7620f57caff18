//! Paste from the clipboard.
//!
//! A cut moves the original artifact, keeping its identity. A copy is
//! duplicated through capture and reconstruction with fresh ids, so links
//! inside the copied subtree point at the copies.

use std::sync::Arc;

use tracing::debug;

use crate::{
    application::{
        clipboard::{ClipboardKind, ClipboardPayload},
        operations::{Operation, OperationResult, Placement, rollback_failed},
    },
    domain::{ArtifactId, ArtifactTree, DomainResult, IdPolicy, TypeRegistry, kinds},
    error::{LoomError, LoomResult},
};

pub struct Paste {
    registry: Arc<TypeRegistry>,
}

impl Paste {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    fn duplicate(&self, tree: &mut ArtifactTree, source: ArtifactId) -> DomainResult<ArtifactId> {
        let document = tree.capture(source)?;
        tree.restore(&document, &self.registry, IdPolicy::Fresh)
    }
}

#[derive(Debug, Clone)]
pub struct PasteParams {
    pub source: ArtifactId,
    pub kind: ClipboardKind,
    pub target: ArtifactId,
    pasted: Option<Placement>,
    /// Where a cut artifact was taken from.
    origin: Option<Placement>,
}

impl PasteParams {
    pub fn new(source: ArtifactId, kind: ClipboardKind, target: ArtifactId) -> Self {
        Self {
            source,
            kind,
            target,
            pasted: None,
            origin: None,
        }
    }

    pub fn from_payload(payload: &ClipboardPayload, target: ArtifactId) -> Self {
        Self::new(payload.artifact, payload.kind, target)
    }

    /// The artifact now linked under the target.
    pub fn pasted(&self) -> Option<ArtifactId> {
        self.pasted.map(|p| p.child)
    }
}

fn stashed(placement: Option<Placement>) -> LoomResult<Placement> {
    placement.ok_or_else(|| LoomError::Internal {
        message: "paste was recorded without being executed".into(),
    })
}

impl Operation for Paste {
    type Params = PasteParams;

    fn name(&self) -> &'static str {
        "paste"
    }

    fn describe(&self, params: &PasteParams) -> String {
        match params.kind {
            ClipboardKind::Copy => format!("Paste copy of {}", params.source),
            ClipboardKind::Cut => format!("Move {}", params.source),
        }
    }

    fn validate(&self, tree: &ArtifactTree, params: &PasteParams) -> Option<String> {
        let linked = tree
            .get(params.source)
            .is_some_and(|a| a.parent().is_some() || a.kind() == kinds::WORKSPACE);
        if !linked {
            return Some("the clipboard artifact is no longer in the workspace".into());
        }
        if !tree.contains(params.target) {
            return Some(format!("paste target {} not found", params.target));
        }
        (params.kind == ClipboardKind::Cut && tree.is_ancestor(params.source, params.target))
            .then(|| "cannot move an artifact into itself".to_string())
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut PasteParams) -> OperationResult {
        let index = tree.children(params.target).len();
        let mut rollback_error = None;

        let outcome = match params.kind {
            ClipboardKind::Cut => tree.detach(params.source).and_then(|origin| {
                params.origin = origin.map(|(parent, index)| Placement {
                    parent,
                    child: params.source,
                    index,
                });
                let index = tree.children(params.target).len();
                match tree.insert_child(params.target, index, params.source) {
                    Ok(()) => Ok((params.source, index)),
                    Err(err) => {
                        // back where it came from
                        if let Some(origin) = params.origin.take() {
                            rollback_error = tree
                                .insert_child(origin.parent, origin.index, origin.child)
                                .err();
                        }
                        Err(err)
                    }
                }
            }),
            ClipboardKind::Copy => self.duplicate(tree, params.source).and_then(|copy| {
                match tree.insert_child(params.target, index, copy) {
                    Ok(()) => Ok((copy, index)),
                    Err(err) => {
                        rollback_error = tree.discard(copy).err();
                        Err(err)
                    }
                }
            }),
        };

        match outcome {
            Ok((child, index)) => {
                debug!(%child, target = %params.target, kind = %params.kind, "Pasted");
                params.pasted = Some(Placement {
                    parent: params.target,
                    child,
                    index,
                });
                OperationResult::ok()
            }
            Err(e) => match rollback_error {
                Some(rollback) => rollback_failed(e, rollback),
                None => OperationResult::failed(e.to_string()),
            },
        }
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut PasteParams) -> LoomResult<()> {
        stashed(params.pasted)?.unlink(tree)?;
        if let Some(origin) = params.origin {
            origin.relink(tree)?;
        }
        Ok(())
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut PasteParams) -> LoomResult<()> {
        if let Some(origin) = params.origin {
            origin.unlink(tree)?;
        }
        stashed(params.pasted)?.relink(tree)
    }

    /// Only an undone copy owns nodes nothing else refers to. A cut artifact
    /// is the original and goes back to its origin.
    fn release(
        &self,
        tree: &mut ArtifactTree,
        params: &mut PasteParams,
        applied: bool,
    ) -> LoomResult<()> {
        match params.pasted {
            Some(placement) if !applied && params.kind == ClipboardKind::Copy => {
                placement.release(tree)
            }
            _ => Ok(()),
        }
    }
}

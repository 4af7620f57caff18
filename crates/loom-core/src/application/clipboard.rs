//! Single-slot clipboard holding a non-owning reference to an artifact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Artifact, ArtifactId, ArtifactTree, DomainResult, kinds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardKind {
    /// Paste duplicates the subtree with fresh ids.
    Copy,
    /// Paste moves the original artifact.
    Cut,
}

impl fmt::Display for ClipboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy => write!(f, "copy"),
            Self::Cut => write!(f, "cut"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipboardPayload {
    pub artifact: ArtifactId,
    pub type_name: String,
    pub kind: ClipboardKind,
    pub timestamp: DateTime<Utc>,
}

/// Holds at most one payload. The referenced artifact is never kept alive
/// by the clipboard: resolution goes through the tree every time.
#[derive(Debug, Default)]
pub struct ClipboardService {
    payload: Option<ClipboardPayload>,
}

impl ClipboardService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, tree: &ArtifactTree, id: ArtifactId) -> DomainResult<&ClipboardPayload> {
        self.put(tree, id, ClipboardKind::Copy)
    }

    pub fn cut(&mut self, tree: &ArtifactTree, id: ArtifactId) -> DomainResult<&ClipboardPayload> {
        self.put(tree, id, ClipboardKind::Cut)
    }

    fn put(
        &mut self,
        tree: &ArtifactTree,
        id: ArtifactId,
        kind: ClipboardKind,
    ) -> DomainResult<&ClipboardPayload> {
        let artifact = tree.require(id)?;
        debug!(%id, %kind, "Clipboard set");
        Ok(self.payload.insert(ClipboardPayload {
            artifact: id,
            type_name: artifact.kind().to_string(),
            kind,
            timestamp: Utc::now(),
        }))
    }

    pub fn payload(&self) -> Option<&ClipboardPayload> {
        self.payload.as_ref()
    }

    /// The clipboard artifact while it is still linked into a workspace.
    ///
    /// Detached artifacts stay in the arena for undo but no longer resolve.
    pub fn get_artifact<'t>(&self, tree: &'t ArtifactTree) -> Option<&'t Artifact> {
        self.payload
            .as_ref()
            .and_then(|p| tree.get(p.artifact))
            .filter(|a| a.parent().is_some() || a.kind() == kinds::WORKSPACE)
    }

    /// Clear when the payload points at `id`. Returns whether it did.
    pub fn clear_if_contains(&mut self, id: ArtifactId) -> bool {
        if self.payload.as_ref().is_some_and(|p| p.artifact == id) {
            self.payload = None;
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.payload = None;
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}

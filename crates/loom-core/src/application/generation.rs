//! Generation-content events and the state shared by one generation run.
//!
//! ```text
//! ArtifactCreating ──► (not vetoed) insert into staging ──► ArtifactCreated
//! RootArtifactCreated           once, after the output root exists
//! PlaceholderContentRequested   per templated file; subscribers fill `contents`
//! ```
//!
//! Handlers receive the [`GenerationContext`] next to the event. They read
//! the workspace snapshot from it, queue new artifacts with
//! [`GenerationContext::request`] and report problems into the
//! [`GenerationResult`] instead of failing the run.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    bus::{BusScope, Message},
    domain::{Artifact, ArtifactId, ArtifactTree, PersistedNode, kinds},
};

/// Scope of the generation bus.
#[derive(Debug)]
pub struct GenerationScope;

impl BusScope for GenerationScope {
    const NAME: &'static str = "generation";
    type Context = GenerationContext;
}

// ============================================================================
// Result
// ============================================================================

/// Accumulated over one run, inspected once the run is over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Relative paths of rendered files.
    pub files: Vec<String>,
    /// Names of generated project roots.
    pub projects: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub success: bool,
}

impl GenerationResult {
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finish(&mut self) {
        self.success = self.errors.is_empty();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Name of the output artifact created for a run.
    pub output_name: String,
    /// Upper bound on queued artifacts per run.
    pub max_artifacts: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            output_name: "generated".into(),
            max_artifacts: 10_000,
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// An artifact a generator asked for, created by the run loop.
#[derive(Debug)]
pub struct PendingArtifact {
    pub parent: ArtifactId,
    pub artifact: Artifact,
    pub requested_by: String,
}

/// Shared mutable state of one generation run.
#[derive(Debug)]
pub struct GenerationContext {
    /// Snapshot of the workspace taken when the run started.
    pub model: PersistedNode,
    /// Artifacts built during this run. Grafted into the workspace only
    /// after the run succeeds.
    pub staging: ArtifactTree,
    pub root: Option<ArtifactId>,
    pub result: GenerationResult,
    pub cancel: CancellationToken,
    pending: VecDeque<PendingArtifact>,
}

impl GenerationContext {
    pub fn new(model: PersistedNode, cancel: CancellationToken) -> Self {
        Self {
            model,
            staging: ArtifactTree::new(),
            root: None,
            result: GenerationResult::default(),
            cancel,
            pending: VecDeque::new(),
        }
    }

    /// Queue `artifact` to be created under `parent` (a staging id).
    pub fn request(
        &mut self,
        parent: ArtifactId,
        artifact: Artifact,
        requested_by: impl Into<String>,
    ) {
        self.pending.push_back(PendingArtifact {
            parent,
            artifact,
            requested_by: requested_by.into(),
        });
    }

    pub(crate) fn next_pending(&mut self) -> Option<PendingArtifact> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Workspace name from the snapshot.
    pub fn workspace_name(&self) -> &str {
        self.model.name().unwrap_or_default()
    }

    /// Scope nodes of the snapshot, in workspace order.
    pub fn scopes(&self) -> impl Iterator<Item = &PersistedNode> {
        self.model
            .children
            .iter()
            .filter(|c| c.type_discriminator == kinds::SCOPE_COLLECTION)
            .flat_map(|c| c.children.iter())
            .filter(|c| c.type_discriminator == kinds::SCOPE)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Raised before a requested artifact enters the staging tree.
/// Setting `cancel` drops the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCreating {
    pub parent: Option<ArtifactId>,
    pub kind: String,
    pub name: String,
    pub requested_by: String,
    pub cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCreated {
    pub artifact: ArtifactId,
    pub parent: Option<ArtifactId>,
    pub kind: String,
    pub name: String,
}

/// The output root of the run exists; generators queue their artifacts here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootArtifactCreated {
    pub root: ArtifactId,
    pub workspace: String,
}

/// Scatter, then gather: every subscriber adds the placeholders it can fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderContentRequested {
    pub artifact: ArtifactId,
    pub path: String,
    pub placeholders: Vec<String>,
    pub contents: BTreeMap<String, String>,
}

impl PlaceholderContentRequested {
    pub fn wants(&self, placeholder: &str) -> bool {
        self.placeholders.iter().any(|p| p == placeholder)
    }

    /// Append to a placeholder, separating contributions by a newline.
    pub fn contribute(&mut self, placeholder: &str, content: impl AsRef<str>) {
        let entry = self.contents.entry(placeholder.to_string()).or_default();
        if !entry.is_empty() {
            entry.push('\n');
        }
        entry.push_str(content.as_ref());
    }
}

impl Message<GenerationScope> for ArtifactCreating {}
impl Message<GenerationScope> for ArtifactCreated {}
impl Message<GenerationScope> for RootArtifactCreated {}
impl Message<GenerationScope> for PlaceholderContentRequested {}

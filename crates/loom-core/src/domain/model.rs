//! Workspace model built on top of the artifact tree.
//!
//! ```text
//! workspace W
//! ├── scope-collection "scopes"
//! │   └── scope ── entity, entity, …
//! └── output-collection "outputs"
//!     └── output ── generated-file, …
//! ```

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    error::{DomainError, DomainResult},
    registry::TypeRegistry,
    tree::ArtifactTree,
};

pub mod kinds {
    pub const WORKSPACE: &str = "workspace";
    pub const SCOPE_COLLECTION: &str = "scope-collection";
    pub const SCOPE: &str = "scope";
    pub const ENTITY: &str = "entity";
    pub const OUTPUT_COLLECTION: &str = "output-collection";
    pub const OUTPUT: &str = "output";
    pub const GENERATED_FILE: &str = "generated-file";

    pub const ALL: [&str; 7] = [
        WORKSPACE,
        SCOPE_COLLECTION,
        SCOPE,
        ENTITY,
        OUTPUT_COLLECTION,
        OUTPUT,
        GENERATED_FILE,
    ];
}

pub const SCOPES: &str = "scopes";
pub const OUTPUTS: &str = "outputs";

pub fn register_kinds(registry: &mut TypeRegistry) -> DomainResult<()> {
    for kind in kinds::ALL {
        registry.register_artifact_kind(kind)?;
    }
    Ok(())
}

pub fn scope(name: impl Into<String>) -> Artifact {
    Artifact::new(kinds::SCOPE, name)
}

pub fn entity(name: impl Into<String>) -> Artifact {
    Artifact::new(kinds::ENTITY, name)
}

pub fn output(name: impl Into<String>) -> Artifact {
    Artifact::new(kinds::OUTPUT, name)
}

/// A file produced by generation. `path` is relative to the output directory.
pub fn generated_file(path: impl Into<String>, content: impl Into<String>) -> Artifact {
    let path = path.into();
    let mut file = Artifact::new(kinds::GENERATED_FILE, path.clone());
    file.set_value("path", path);
    file.set_value("content", content.into());
    file.properties_mut().mark_clean();
    file
}

/// Ids of the workspace root and its two fixed containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceModel {
    pub root: ArtifactId,
    pub scopes: ArtifactId,
    pub outputs: ArtifactId,
}

impl WorkspaceModel {
    /// Build a fresh workspace `W` with empty `scopes` and `outputs`.
    pub fn create(tree: &mut ArtifactTree, name: impl Into<String>) -> DomainResult<Self> {
        let root = tree.insert(Artifact::new(kinds::WORKSPACE, name))?;
        let scopes = tree.insert(Artifact::new(kinds::SCOPE_COLLECTION, SCOPES))?;
        let outputs = tree.insert(Artifact::new(kinds::OUTPUT_COLLECTION, OUTPUTS))?;
        tree.add_child(root, scopes)?;
        tree.add_child(root, outputs)?;
        Ok(Self {
            root,
            scopes,
            outputs,
        })
    }

    /// Find the containers of an existing workspace root.
    pub fn locate(tree: &ArtifactTree, root: ArtifactId) -> DomainResult<Self> {
        let node = tree.require(root)?;
        if node.kind() != kinds::WORKSPACE {
            return Err(DomainError::InvalidStructure {
                reason: format!("{root} is a '{}', not a workspace", node.kind()),
            });
        }
        let container = |kind: &str| {
            tree.children(root)
                .iter()
                .copied()
                .find(|c| tree.get(*c).is_some_and(|a| a.kind() == kind))
                .ok_or_else(|| DomainError::InvalidStructure {
                    reason: format!("workspace {root} has no '{kind}' container"),
                })
        };
        Ok(Self {
            root,
            scopes: container(kinds::SCOPE_COLLECTION)?,
            outputs: container(kinds::OUTPUT_COLLECTION)?,
        })
    }

    pub fn scopes<'t>(&self, tree: &'t ArtifactTree) -> &'t [ArtifactId] {
        tree.children(self.scopes)
    }

    pub fn find_scope(&self, tree: &ArtifactTree, name: &str) -> Option<ArtifactId> {
        tree.find_child_by_name(self.scopes, name)
    }

    pub fn outputs<'t>(&self, tree: &'t ArtifactTree) -> &'t [ArtifactId] {
        tree.children(self.outputs)
    }

    pub fn name(&self, tree: &ArtifactTree) -> String {
        tree.get(self.root).map(Artifact::name).unwrap_or_default()
    }
}

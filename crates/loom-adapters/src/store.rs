//! JSON workspace documents stored through a [`Filesystem`].

use std::path::Path;

use tracing::{debug, instrument};

use loom_core::{
    application::{
        ApplicationError,
        ports::{Filesystem, WorkspaceStore},
    },
    domain::PersistedNode,
    error::LoomResult,
};

/// Saves workspaces as pretty-printed JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonWorkspaceStore<F> {
    filesystem: F,
}

impl<F: Filesystem> JsonWorkspaceStore<F> {
    pub fn new(filesystem: F) -> Self {
        Self { filesystem }
    }

    pub fn filesystem(&self) -> &F {
        &self.filesystem
    }
}

impl<F: Filesystem> WorkspaceStore for JsonWorkspaceStore<F> {
    #[instrument(skip_all, fields(location = %location.display()))]
    fn save(&self, location: &Path, document: &PersistedNode) -> LoomResult<()> {
        let json = document.to_json()?;
        if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.filesystem.create_dir_all(parent)?;
        }
        self.filesystem.write_file(location, &json)?;
        debug!(bytes = json.len(), "Workspace document written");
        Ok(())
    }

    #[instrument(skip_all, fields(location = %location.display()))]
    fn load(&self, location: &Path) -> LoomResult<PersistedNode> {
        if !self.filesystem.exists(location) {
            return Err(ApplicationError::WorkspaceNotFound {
                path: location.to_path_buf(),
            }
            .into());
        }
        let raw = self.filesystem.read_file(location)?;
        PersistedNode::from_json(&raw).map_err(|e| {
            ApplicationError::Serialization {
                reason: format!("{}: {e}", location.display()),
            }
            .into()
        })
    }

    fn exists(&self, location: &Path) -> bool {
        self.filesystem.exists(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::{LocalFilesystem, MemoryFilesystem};
    use loom_core::domain::{ArtifactTree, WorkspaceModel, model};
    use loom_core::error::LoomError;

    fn document() -> PersistedNode {
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        let sales = tree.insert(model::scope("Sales")).unwrap();
        tree.add_child(ws.scopes, sales).unwrap();
        tree.capture(ws.root).unwrap()
    }

    #[test]
    fn round_trips_through_memory() {
        let store = JsonWorkspaceStore::new(MemoryFilesystem::new());
        let doc = document();
        let at = Path::new("/work/shop.loom.json");

        store.save(at, &doc).unwrap();
        assert!(store.exists(at));
        assert_eq!(store.load(at).unwrap(), doc);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonWorkspaceStore::new(LocalFilesystem::new());
        let at = dir.path().join("nested/shop.loom.json");

        store.save(&at, &document()).unwrap();
        let raw = std::fs::read_to_string(&at).unwrap();
        assert!(raw.contains("\"typeDiscriminator\": \"workspace\""));
        assert_eq!(store.load(&at).unwrap().name(), Some("Shop"));
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/w")).unwrap();
        fs.write_file(Path::new("/w/bad.json"), "{ nope").unwrap();

        let err = JsonWorkspaceStore::new(fs)
            .load(Path::new("/w/bad.json"))
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::Application(ApplicationError::Serialization { .. })
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let err = JsonWorkspaceStore::new(MemoryFilesystem::new())
            .load(Path::new("/w/none.json"))
            .unwrap_err();
        assert!(matches!(
            err,
            LoomError::Application(ApplicationError::WorkspaceNotFound { .. })
        ));
    }
}

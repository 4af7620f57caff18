//! Opening, resolving and saving workspace files for command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use loom_adapters::{JsonWorkspaceStore, LocalFilesystem};
use loom_core::{
    application::ports::WorkspaceStore,
    error::LoomError,
    prelude::{ArtifactId, PluginRegistry, TypeRegistry, WorkspaceSession},
};

use crate::{
    config::AppConfig,
    error::{CliError, CliResult},
};

/// A workspace session bound to the file it came from.
pub struct Workspace {
    pub session: WorkspaceSession,
    path: PathBuf,
    store: JsonWorkspaceStore<LocalFilesystem>,
}

impl Workspace {
    /// Start a new workspace that will be saved to `path`.
    pub fn create(path: &Path, name: &str, config: &AppConfig, force: bool) -> CliResult<Self> {
        let store = JsonWorkspaceStore::new(LocalFilesystem::new());
        if store.exists(path) && !force {
            return Err(CliError::WorkspaceExists {
                path: path.to_path_buf(),
            });
        }
        let session = WorkspaceSession::create(name, type_registry()?, config.history.clone())?;
        Ok(Self {
            session,
            path: path.to_path_buf(),
            store,
        })
    }

    /// Load `path` and hook the plugin subscribers onto its tree.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path, config: &AppConfig, plugins: &PluginRegistry) -> CliResult<Self> {
        let store = JsonWorkspaceStore::new(LocalFilesystem::new());
        let mut session =
            WorkspaceSession::open(&store, path, type_registry()?, config.history.clone())?;
        session.attach_subscribers(plugins);
        Ok(Self {
            session,
            path: path.to_path_buf(),
            store,
        })
    }

    pub fn save(&mut self) -> CliResult<()> {
        self.session.save(&self.store, &self.path)?;
        debug!(path = %self.path.display(), "Workspace saved");
        Ok(())
    }

    /// Write the subtree under `id` as a standalone document.
    pub fn export(&self, id: ArtifactId, out: &Path) -> CliResult<usize> {
        let document = self
            .session
            .tree()
            .capture(id)
            .map_err(LoomError::from)?;
        self.store.save(out, &document)?;
        Ok(document.count())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scope(&self, name: &str) -> CliResult<ArtifactId> {
        self.session
            .find_scope(name)
            .ok_or_else(|| CliError::ScopeNotFound {
                name: name.to_string(),
                available: self.session.scope_names(),
            })
    }

    pub fn entity(&self, scope: &str, name: &str) -> CliResult<ArtifactId> {
        let scope_id = self.scope(scope)?;
        self.session
            .tree()
            .find_child_by_name(scope_id, name)
            .ok_or_else(|| CliError::EntityNotFound {
                scope: scope.to_string(),
                name: name.to_string(),
            })
    }

    /// Resolve `Scope` or `Scope/Entity`.
    pub fn resolve(&self, path: &str) -> CliResult<ArtifactId> {
        match path.split_once('/') {
            Some((scope, entity)) => self.entity(scope, entity),
            None => self.scope(path),
        }
    }
}

pub fn type_registry() -> CliResult<Arc<TypeRegistry>> {
    let registry = TypeRegistry::with_builtins().map_err(LoomError::from)?;
    Ok(Arc::new(registry))
}

pub fn plugins() -> CliResult<Arc<PluginRegistry>> {
    Ok(Arc::new(loom_adapters::builtin_plugins()?))
}

/// Workspace name for a file like `shop.loom.json`: `shop`.
pub fn default_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_name_strips_every_extension() {
        assert_eq!(default_name(Path::new("dir/shop.loom.json")).as_deref(), Some("shop"));
        assert_eq!(default_name(Path::new("shop")).as_deref(), Some("shop"));
        assert_eq!(default_name(Path::new(".hidden")), None);
    }

    #[test]
    fn create_refuses_existing_file_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shop.json");
        std::fs::write(&path, "{}").unwrap();

        let err = Workspace::create(&path, "Shop", &AppConfig::default(), false)
            .err()
            .unwrap();
        assert!(matches!(err, CliError::WorkspaceExists { .. }));
        assert!(Workspace::create(&path, "Shop", &AppConfig::default(), true).is_ok());
    }

    #[test]
    fn saved_workspace_resolves_paths_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shop.json");
        let config = AppConfig::default();

        let mut ws = Workspace::create(&path, "Shop", &config, false).unwrap();
        let sales = ws.session.add_scope("Sales").unwrap();
        ws.session.add_entity(sales, "Order", None).unwrap();
        ws.save().unwrap();

        let plugins = plugins().unwrap();
        let reopened = Workspace::open(&path, &config, &plugins).unwrap();
        assert_eq!(reopened.resolve("Sales").unwrap(), sales);
        assert!(reopened.resolve("Sales/Order").is_ok());
        assert!(matches!(
            reopened.resolve("Sales/Invoice"),
            Err(CliError::EntityNotFound { .. })
        ));
        assert!(matches!(
            reopened.resolve("Billing"),
            Err(CliError::ScopeNotFound { ref available, .. }) if available == &["Sales"]
        ));
    }
}

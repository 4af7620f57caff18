//! Driven (output) ports - implemented by infrastructure and plugins.
//!
//! The `loom-adapters` crate provides the builtin implementations.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    application::{generation::GenerationScope, plugins::PluginManifest},
    bus::{MessageBus, SubscriptionToken, WorkspaceScope},
    domain::PersistedNode,
    error::LoomResult,
};

/// Port for filesystem operations.
///
/// Implemented by:
/// - `loom_adapters::filesystem::LocalFilesystem` (production)
/// - `loom_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> LoomResult<()>;

    /// Write content to a file.
    fn write_file(&self, path: &Path, content: &str) -> LoomResult<()>;

    fn read_file(&self, path: &Path) -> LoomResult<String>;

    /// Set file permissions.
    fn set_permissions(&self, path: &Path, executable: bool) -> LoomResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> LoomResult<()>;
}

/// Port for saving and loading workspace documents.
///
/// Implemented by `loom_adapters::store::JsonWorkspaceStore`.
#[cfg_attr(test, mockall::automock)]
pub trait WorkspaceStore: Send + Sync {
    fn save(&self, location: &Path, document: &PersistedNode) -> LoomResult<()>;

    fn load(&self, location: &Path) -> LoomResult<PersistedNode>;

    fn exists(&self, location: &Path) -> bool;
}

// ============================================================================
// Plugin slots
// ============================================================================

/// Renders `{{NAME}}`-style templates for generated files.
pub trait TemplateEngine: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    /// Placeholder names used by `template`, in first-use order.
    fn placeholders(&self, template: &str) -> Vec<String>;

    fn render(&self, template: &str, values: &BTreeMap<String, String>) -> LoomResult<String>;
}

/// Composes output artifacts by reacting to generation events.
///
/// Generators never call each other; each one subscribes its handlers on
/// the bus of a run and communicates only through events and the shared
/// [`GenerationContext`](crate::application::generation::GenerationContext).
pub trait Generator: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    fn subscribe(&self, bus: &mut MessageBus<GenerationScope>) -> Vec<SubscriptionToken>;
}

/// Produces a workspace document from an external source (schema, file).
#[async_trait]
pub trait DatasourceProvider: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    async fn load(&self, source: &str, cancel: &CancellationToken) -> LoomResult<PersistedNode>;
}

/// Listens to structural events of an open workspace.
pub trait WorkspaceSubscriber: Send + Sync {
    fn manifest(&self) -> &PluginManifest;

    fn subscribe(&self, bus: &mut MessageBus<WorkspaceScope>) -> Vec<SubscriptionToken>;
}

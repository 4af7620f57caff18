//! Datasource providers: build workspace subtrees from files.
//!
//! - [`JsonDocumentProvider`] reads a subtree saved in the document format
//! - [`TomlSchemaProvider`] reads a hand-written scope description:
//!
//! ```toml
//! name = "Sales"
//!
//! [[entities]]
//! name = "Order"
//! table = "orders"     # optional, defaults to the snake_case name
//! schema = "sales"     # optional
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use loom_core::{
    application::{
        ApplicationError,
        plugins::{PluginManifest, capabilities},
        ports::DatasourceProvider,
    },
    domain::{ArtifactTree, PersistedNode, TableDecorator, model},
    error::LoomResult,
};

use crate::filesystem::map_io_error;

pub const JSON_ID: &str = "json";
pub const TOML_ID: &str = "toml";

fn manifest(id: &str) -> PluginManifest {
    PluginManifest::new(id, loom_core::VERSION).with_capability(capabilities::DATASOURCE)
}

/// Read `source`, giving up as soon as `cancel` fires.
async fn read_source(source: &str, cancel: &CancellationToken) -> LoomResult<String> {
    let path = Path::new(source);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApplicationError::Cancelled.into()),
        read = tokio::fs::read_to_string(path) => read.map_err(|e| map_io_error(path, e, "read source")),
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Debug, Clone)]
pub struct JsonDocumentProvider {
    manifest: PluginManifest,
}

impl JsonDocumentProvider {
    pub fn new() -> Self {
        Self {
            manifest: manifest(JSON_ID),
        }
    }
}

impl Default for JsonDocumentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasourceProvider for JsonDocumentProvider {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    #[instrument(skip_all, fields(source = %source))]
    async fn load(&self, source: &str, cancel: &CancellationToken) -> LoomResult<PersistedNode> {
        let raw = read_source(source, cancel).await?;
        let document = PersistedNode::from_json(&raw).map_err(|e| ApplicationError::Serialization {
            reason: format!("{source}: {e}"),
        })?;
        debug!(nodes = document.count(), "JSON document parsed");
        Ok(document)
    }
}

// ============================================================================
// TOML
// ============================================================================

/// One scope file.
#[derive(Debug, Deserialize, Clone)]
pub struct ScopeSchema {
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntitySchema>,
}

/// One entry under `[[entities]]`.
#[derive(Debug, Deserialize, Clone)]
pub struct EntitySchema {
    pub name: String,
    pub table: Option<String>,
    pub schema: Option<String>,
}

impl ScopeSchema {
    /// Build the scope as a detached subtree and capture it.
    pub fn to_document(&self) -> LoomResult<PersistedNode> {
        let mut tree = ArtifactTree::new();
        let scope = tree.insert(model::scope(self.name.as_str()))?;

        for entity in &self.entities {
            let id = tree.insert(model::entity(entity.name.as_str()))?;
            tree.add_child(scope, id)?;

            let mut table = TableDecorator::new();
            if let Some(name) = &entity.table {
                table = table.with_table_name(name.as_str());
            }
            if let Some(schema) = &entity.schema {
                table = table.with_schema(schema.as_str());
            }
            tree.add_decorator(id, Box::new(table))?;
        }
        Ok(tree.capture(scope)?)
    }
}

#[derive(Debug, Clone)]
pub struct TomlSchemaProvider {
    manifest: PluginManifest,
}

impl TomlSchemaProvider {
    pub fn new() -> Self {
        Self {
            manifest: manifest(TOML_ID),
        }
    }

    /// `*.toml` files under `root` in path order, or `root` itself when it
    /// is a file. Unreadable entries are skipped with a warning.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn discover(root: &Path) -> LoomResult<Vec<PathBuf>> {
        if root.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        if !root.is_dir() {
            return Err(ApplicationError::FilesystemError {
                path: root.to_path_buf(),
                reason: "schema source not found".into(),
            }
            .into());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable schema entry");
                    continue;
                }
            };
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "toml") {
                found.push(path.to_path_buf());
            }
        }
        debug!(count = found.len(), "schema files discovered");
        Ok(found)
    }
}

impl Default for TomlSchemaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatasourceProvider for TomlSchemaProvider {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    #[instrument(skip_all, fields(source = %source))]
    async fn load(&self, source: &str, cancel: &CancellationToken) -> LoomResult<PersistedNode> {
        let raw = read_source(source, cancel).await?;
        let schema: ScopeSchema = toml::from_str(&raw).map_err(|e| ApplicationError::Serialization {
            reason: format!("failed to parse '{source}': {e}"),
        })?;
        debug!(scope = %schema.name, entities = schema.entities.len(), "scope schema parsed");
        schema.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::domain::kinds;
    use std::fs;

    const SALES: &str = r#"
name = "Sales"

[[entities]]
name = "Order"
table = "orders"
schema = "sales"

[[entities]]
name = "OrderLine"
"#;

    #[tokio::test]
    async fn toml_scope_becomes_a_scope_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sales.toml");
        fs::write(&file, SALES).unwrap();

        let doc = TomlSchemaProvider::new()
            .load(file.to_str().unwrap(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(doc.type_discriminator, kinds::SCOPE);
        assert_eq!(doc.name(), Some("Sales"));
        assert_eq!(doc.children.len(), 2);

        let order = doc.children[0].decorator(TableDecorator::KIND).unwrap();
        assert_eq!(order["table_name"].as_str(), Some("orders"));
        assert_eq!(order["schema"].as_str(), Some("sales"));
        let line = doc.children[1].decorator(TableDecorator::KIND).unwrap();
        assert_eq!(line["table_name"].as_str(), Some("order_line"));
    }

    #[tokio::test]
    async fn malformed_toml_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.toml");
        fs::write(&file, "name = ").unwrap();

        let err = TomlSchemaProvider::new()
            .load(file.to_str().unwrap(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[tokio::test]
    async fn cancelled_load_stops() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = JsonDocumentProvider::new()
            .load("/does/not/matter.json", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn json_provider_reads_documents() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sales.json");
        let doc = ScopeSchema {
            name: "Sales".into(),
            entities: Vec::new(),
        }
        .to_document()
        .unwrap();
        fs::write(&file, doc.to_json().unwrap()).unwrap();

        let loaded = JsonDocumentProvider::new()
            .load(file.to_str().unwrap(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn discover_walks_toml_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.toml"), SALES).unwrap();
        fs::write(dir.path().join("nested/a.toml"), SALES).unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();

        let found = TomlSchemaProvider::discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("b.toml"), PathBuf::from("nested/a.toml")]
        );
        assert!(TomlSchemaProvider::discover(&dir.path().join("missing")).is_err());
    }
}

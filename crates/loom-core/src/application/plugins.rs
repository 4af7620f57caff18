// ============================================================================
// application/plugins.rs - PLUGIN REGISTRATION SURFACE
// ============================================================================

//! Registration of generators, datasource providers, workspace subscribers
//! and the template engine.
//!
//! Every plugin carries a [`PluginManifest`]. The manifest is checked when the
//! plugin is registered, so a malformed plugin fails at startup instead of in
//! the middle of a generation run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    application::{
        ApplicationError,
        ports::{DatasourceProvider, Generator, TemplateEngine, WorkspaceSubscriber},
    },
    error::LoomResult,
};

/// Capability strings a manifest may declare.
pub mod capabilities {
    pub const GENERATOR: &str = "generator";
    pub const DATASOURCE: &str = "datasource";
    pub const WORKSPACE_SUBSCRIBER: &str = "workspace-subscriber";
    pub const TEMPLATE_ENGINE: &str = "template-engine";

    pub const ALL: [&str; 4] = [GENERATOR, DATASOURCE, WORKSPACE_SUBSCRIBER, TEMPLATE_ENGINE];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    pub id: String,
    /// `major.minor.patch`
    pub version: String,
    pub capabilities: Vec<String>,
}

impl PluginManifest {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn declares(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Check the manifest shape for the slot requiring `required`.
    pub fn validate(&self, required: &str) -> Result<(), ManifestError> {
        if self.id.trim().is_empty() {
            return Err(ManifestError::EmptyId);
        }
        if !is_valid_plugin_id(&self.id) {
            return Err(ManifestError::InvalidId(self.id.clone()));
        }
        if !is_semver_triplet(self.version.trim()) {
            return Err(ManifestError::InvalidVersion(self.version.clone()));
        }

        let mut seen = BTreeSet::new();
        for capability in &self.capabilities {
            if !capabilities::ALL.contains(&capability.as_str()) {
                return Err(ManifestError::UnsupportedCapability(capability.clone()));
            }
            if !seen.insert(capability.as_str()) {
                return Err(ManifestError::DuplicateCapability(capability.clone()));
            }
        }
        if !self.declares(required) {
            return Err(ManifestError::MissingCapability(required.to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for PluginManifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("plugin id must not be empty")]
    EmptyId,

    #[error("plugin id '{0}' must be lowercase letters, digits and single '.', '_' or '-' separators")]
    InvalidId(String),

    #[error("version '{0}' is not major.minor.patch")]
    InvalidVersion(String),

    #[error("capability '{0}' is not supported")]
    UnsupportedCapability(String),

    #[error("capability '{0}' is declared twice")]
    DuplicateCapability(String),

    #[error("manifest does not declare the '{0}' capability")]
    MissingCapability(String),

    #[error("a plugin with id '{0}' is already registered")]
    DuplicateId(String),
}

fn is_valid_plugin_id(value: &str) -> bool {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
        } else if matches!(c, '.' | '_' | '-') && !prev_separator {
            prev_separator = true;
        } else {
            return false;
        }
    }
    !prev_separator
}

fn is_semver_triplet(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

// ============================================================================
// Registry
// ============================================================================

/// Holds every registered plugin. Built once at startup, then shared.
#[derive(Default)]
pub struct PluginRegistry {
    ids: BTreeSet<String>,
    generators: Vec<Arc<dyn Generator>>,
    datasources: BTreeMap<String, Arc<dyn DatasourceProvider>>,
    subscribers: Vec<Arc<dyn WorkspaceSubscriber>>,
    template_engine: Option<Arc<dyn TemplateEngine>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn admit(&mut self, manifest: &PluginManifest, required: &str) -> LoomResult<()> {
        let reject = |err: ManifestError| ApplicationError::PluginRegistration {
            plugin: manifest.id.clone(),
            reason: err.to_string(),
        };
        manifest.validate(required).map_err(reject)?;
        if self.ids.contains(&manifest.id) {
            return Err(reject(ManifestError::DuplicateId(manifest.id.clone())).into());
        }
        self.ids.insert(manifest.id.clone());
        info!(plugin = %manifest, slot = required, "Plugin registered");
        Ok(())
    }

    pub fn register_generator(&mut self, generator: impl Generator + 'static) -> LoomResult<()> {
        self.admit(generator.manifest(), capabilities::GENERATOR)?;
        self.generators.push(Arc::new(generator));
        Ok(())
    }

    pub fn register_datasource_provider(
        &mut self,
        provider: impl DatasourceProvider + 'static,
    ) -> LoomResult<()> {
        let id = provider.manifest().id.clone();
        self.admit(provider.manifest(), capabilities::DATASOURCE)?;
        self.datasources.insert(id, Arc::new(provider));
        Ok(())
    }

    pub fn register_workspace_subscriber(
        &mut self,
        subscriber: impl WorkspaceSubscriber + 'static,
    ) -> LoomResult<()> {
        self.admit(subscriber.manifest(), capabilities::WORKSPACE_SUBSCRIBER)?;
        self.subscribers.push(Arc::new(subscriber));
        Ok(())
    }

    /// Only one engine is active; a second registration replaces the first.
    pub fn register_template_engine(
        &mut self,
        engine: impl TemplateEngine + 'static,
    ) -> LoomResult<()> {
        self.admit(engine.manifest(), capabilities::TEMPLATE_ENGINE)?;
        if let Some(previous) = self.template_engine.replace(Arc::new(engine)) {
            debug!(replaced = %previous.manifest(), "Template engine replaced");
            self.ids.remove(&previous.manifest().id);
        }
        Ok(())
    }

    pub fn generators(&self) -> &[Arc<dyn Generator>] {
        &self.generators
    }

    pub fn datasource(&self, id: &str) -> Option<Arc<dyn DatasourceProvider>> {
        self.datasources.get(id).cloned()
    }

    pub fn datasource_ids(&self) -> Vec<&str> {
        self.datasources.keys().map(String::as_str).collect()
    }

    pub fn workspace_subscribers(&self) -> &[Arc<dyn WorkspaceSubscriber>] {
        &self.subscribers
    }

    pub fn template_engine(&self) -> Option<Arc<dyn TemplateEngine>> {
        self.template_engine.clone()
    }

    /// Manifests of every registered plugin, grouped by slot.
    pub fn manifests(&self) -> Vec<PluginManifest> {
        self.generators
            .iter()
            .map(|g| g.manifest().clone())
            .chain(self.datasources.values().map(|d| d.manifest().clone()))
            .chain(self.subscribers.iter().map(|s| s.manifest().clone()))
            .chain(self.template_engine.iter().map(|t| t.manifest().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.ids)
            .finish()
    }
}

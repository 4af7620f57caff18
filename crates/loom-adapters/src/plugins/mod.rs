//! Builtin plugins shipped with Loom.

pub mod audit;
pub mod datasource;
pub mod generators;
pub mod template_engine;

pub use audit::StructuralAuditSubscriber;
pub use datasource::{JsonDocumentProvider, TomlSchemaProvider};
pub use generators::{ReadmeGenerator, RustCrateGenerator, SqlSchemaGenerator};
pub use template_engine::SimpleTemplateEngine;

use loom_core::{application::PluginRegistry, error::LoomResult};
use tracing::instrument;

/// A registry holding every builtin plugin.
#[instrument]
pub fn builtin_plugins() -> LoomResult<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    registry.register_template_engine(SimpleTemplateEngine::new())?;
    registry.register_generator(RustCrateGenerator::new())?;
    registry.register_generator(ReadmeGenerator::new())?;
    registry.register_generator(SqlSchemaGenerator::new())?;
    registry.register_datasource_provider(JsonDocumentProvider::new())?;
    registry.register_datasource_provider(TomlSchemaProvider::new())?;
    registry.register_workspace_subscriber(StructuralAuditSubscriber::new())?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_cleanly() {
        let registry = builtin_plugins().unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.generators().len(), 3);
        assert_eq!(registry.datasource_ids(), vec!["json", "toml"]);
        assert!(registry.template_engine().is_some());
        assert_eq!(registry.workspace_subscribers().len(), 1);
    }
}

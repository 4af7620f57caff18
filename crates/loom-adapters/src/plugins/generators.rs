//! Builtin generators.
//!
//! Each generator queues its files when the output root is announced and
//! fills its own placeholders when the files are rendered. Generators know
//! nothing about each other; a README listing the Rust modules only sees
//! them through the staging tree.

use loom_core::{
    application::{
        generation::{
            GenerationContext, GenerationScope, PlaceholderContentRequested, RootArtifactCreated,
        },
        plugins::{PluginManifest, capabilities},
        ports::Generator,
        services::generation_service::{PATH_PROPERTY, TEMPLATE_PROPERTY},
    },
    bus::{MessageBus, SubscriptionToken},
    domain::{Artifact, PersistedNode, TableDecorator, kinds, model, naming},
};

/// Property naming the scope a generated file belongs to.
const SCOPE_PROPERTY: &str = "scope";

fn manifest(id: &str) -> PluginManifest {
    PluginManifest::new(id, loom_core::VERSION).with_capability(capabilities::GENERATOR)
}

fn templated(path: impl Into<String>, template: &str) -> Artifact {
    let mut file = model::generated_file(path, "");
    file.set_value(TEMPLATE_PROPERTY, template);
    file
}

fn entities(scope: &PersistedNode) -> impl Iterator<Item = &PersistedNode> {
    scope
        .children
        .iter()
        .filter(|c| c.type_discriminator == kinds::ENTITY)
}

fn table_name(entity: &PersistedNode) -> Option<String> {
    entity
        .decorator(TableDecorator::KIND)
        .and_then(|table| table.get("table_name"))
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

/// Scope name recorded on the file being rendered.
fn scope_of(ctx: &GenerationContext, event: &PlaceholderContentRequested) -> Option<String> {
    ctx.staging
        .get(event.artifact)
        .map(|file| file.get_value(SCOPE_PROPERTY, String::new()))
        .filter(|name| !name.is_empty())
}

// ============================================================================
// Rust crate
// ============================================================================

pub const RUST_CRATE_ID: &str = "loom.rust-crate";

const CARGO_TOML: &str = "[package]
name = \"{{WORKSPACE_KEBAB}}\"
version = \"0.1.0\"
edition = \"2024\"

[dependencies]
";

const LIB_RS: &str = "//! {{WORKSPACE}}

{{MODULES}}
";

const MODULE_RS: &str = "//! {{SCOPE}} scope.

{{ENTITIES}}
";

/// A library crate with one module per scope and one struct per entity.
#[derive(Debug, Clone)]
pub struct RustCrateGenerator {
    manifest: PluginManifest,
}

impl RustCrateGenerator {
    pub fn new() -> Self {
        Self {
            manifest: manifest(RUST_CRATE_ID),
        }
    }
}

impl Default for RustCrateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn entity_struct(entity: &PersistedNode) -> String {
    let name = naming::to_pascal_case(entity.name().unwrap_or("Unnamed"));
    let doc = match table_name(entity) {
        Some(table) => format!("/// Row of `{table}`.\n"),
        None => String::new(),
    };
    format!("{doc}#[derive(Debug, Clone, PartialEq)]\npub struct {name} {{\n    pub id: i64,\n}}\n")
}

impl Generator for RustCrateGenerator {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn subscribe(&self, bus: &mut MessageBus<GenerationScope>) -> Vec<SubscriptionToken> {
        let id = self.manifest.id.clone();
        vec![
            bus.subscribe::<RootArtifactCreated, _>(move |event, ctx| {
                ctx.request(event.root, templated("Cargo.toml", CARGO_TOML), id.clone());
                ctx.request(event.root, templated("src/lib.rs", LIB_RS), id.clone());

                let scopes: Vec<String> =
                    ctx.scopes().filter_map(|s| s.name().map(str::to_string)).collect();
                for scope in scopes {
                    let path = format!("src/{}/mod.rs", naming::to_snake_case(&scope));
                    let mut file = templated(path, MODULE_RS);
                    file.set_value(SCOPE_PROPERTY, scope);
                    ctx.request(event.root, file, id.clone());
                }
            }),
            bus.subscribe_filtered::<PlaceholderContentRequested, _, _>(
                |event| event.path == "src/lib.rs" && event.wants("MODULES"),
                |event, ctx| {
                    let modules: Vec<String> = ctx
                        .scopes()
                        .filter_map(PersistedNode::name)
                        .map(|name| format!("pub mod {};", naming::to_snake_case(name)))
                        .collect();
                    event.contribute("MODULES", modules.join("\n"));
                },
            ),
            bus.subscribe_filtered::<PlaceholderContentRequested, _, _>(
                |event| event.wants("ENTITIES"),
                |event, ctx| {
                    let Some(scope) = scope_of(ctx, event) else {
                        return;
                    };
                    event.contribute("SCOPE", &scope);
                    let structs: Vec<String> = ctx
                        .scopes()
                        .filter(|s| s.name() == Some(scope.as_str()))
                        .flat_map(entities)
                        .map(entity_struct)
                        .collect();
                    event.contribute("ENTITIES", structs.join("\n"));
                },
            ),
        ]
    }
}

// ============================================================================
// README
// ============================================================================

pub const README_ID: &str = "loom.readme";

const README_MD: &str = "# {{WORKSPACE}}

## Scopes

{{SCOPES}}

## Files

{{FILES}}
";

/// A README describing the scopes and listing every generated file.
#[derive(Debug, Clone)]
pub struct ReadmeGenerator {
    manifest: PluginManifest,
}

impl ReadmeGenerator {
    pub fn new() -> Self {
        Self {
            manifest: manifest(README_ID),
        }
    }
}

impl Default for ReadmeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for ReadmeGenerator {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn subscribe(&self, bus: &mut MessageBus<GenerationScope>) -> Vec<SubscriptionToken> {
        let id = self.manifest.id.clone();
        vec![
            bus.subscribe::<RootArtifactCreated, _>(move |event, ctx| {
                ctx.request(event.root, templated("README.md", README_MD), id.clone());
            }),
            bus.subscribe_filtered::<PlaceholderContentRequested, _, _>(
                |event| event.path == "README.md",
                |event, ctx| {
                    let scopes: Vec<String> = ctx
                        .scopes()
                        .map(|scope| {
                            let count = entities(scope).count();
                            let noun = if count == 1 { "entity" } else { "entities" };
                            format!("- **{}**: {count} {noun}", scope.name().unwrap_or_default())
                        })
                        .collect();
                    event.contribute("SCOPES", scopes.join("\n"));

                    let files: Vec<String> = ctx
                        .root
                        .map(|root| ctx.staging.descendants(root))
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|id| ctx.staging.get(id))
                        .filter(|node| node.kind() == kinds::GENERATED_FILE)
                        .map(|file| format!("- `{}`", file.get_value(PATH_PROPERTY, file.name())))
                        .collect();
                    event.contribute("FILES", files.join("\n"));
                },
            ),
        ]
    }
}

// ============================================================================
// SQL schema
// ============================================================================

pub const SQL_SCHEMA_ID: &str = "loom.sql-schema";

const SCHEMA_SQL: &str = "-- {{WORKSPACE}} schema

{{TABLES}}
";

/// `schema.sql` with one table per entity carrying a table mapping.
#[derive(Debug, Clone)]
pub struct SqlSchemaGenerator {
    manifest: PluginManifest,
}

impl SqlSchemaGenerator {
    pub fn new() -> Self {
        Self {
            manifest: manifest(SQL_SCHEMA_ID),
        }
    }
}

impl Default for SqlSchemaGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SqlSchemaGenerator {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn subscribe(&self, bus: &mut MessageBus<GenerationScope>) -> Vec<SubscriptionToken> {
        let id = self.manifest.id.clone();
        vec![
            bus.subscribe::<RootArtifactCreated, _>(move |event, ctx| {
                let mapped = ctx
                    .scopes()
                    .flat_map(entities)
                    .any(|e| table_name(e).is_some());
                if mapped {
                    ctx.request(event.root, templated("schema.sql", SCHEMA_SQL), id.clone());
                }
            }),
            bus.subscribe_filtered::<PlaceholderContentRequested, _, _>(
                |event| event.path == "schema.sql",
                |event, ctx| {
                    let tables: Vec<String> = ctx
                        .scopes()
                        .flat_map(entities)
                        .filter_map(|entity| {
                            let table = table_name(entity)?;
                            let schema = entity
                                .decorator(TableDecorator::KIND)
                                .and_then(|t| t.get("schema"))
                                .and_then(|v| v.as_str())
                                .unwrap_or("public")
                                .to_string();
                            Some(format!(
                                "CREATE TABLE IF NOT EXISTS {schema}.{table} (\n    id BIGINT PRIMARY KEY\n);\n"
                            ))
                        })
                        .collect();
                    event.contribute("TABLES", tables.join("\n"));
                },
            ),
        ]
    }
}

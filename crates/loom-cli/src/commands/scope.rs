//! `loom scope`: add, list, rename, remove, import and export scopes.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use loom_adapters::plugins::{
    TomlSchemaProvider,
    datasource::{JSON_ID, TOML_ID},
};
use loom_core::prelude::PluginRegistry;

use crate::{
    cli::{OutputFormat, ScopeCommands},
    commands::{block_on, confirm},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    workspace::{Workspace, plugins},
};

pub fn execute(cmd: ScopeCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let plugins = plugins()?;
    match cmd {
        ScopeCommands::Add { file, name } => {
            let mut ws = Workspace::open(&file, &config, &plugins)?;
            ws.session.add_scope(&name)?;
            ws.save()?;
            output.success(&format!("Scope '{name}' added"))?;
        }

        ScopeCommands::List { file } => {
            let ws = Workspace::open(&file, &config, &plugins)?;
            let names = ws.session.scope_names();
            if output.format() == OutputFormat::Json {
                output.json(&names)?;
            } else {
                for name in names {
                    output.data(&name)?;
                }
            }
        }

        ScopeCommands::Rename { file, from, to } => {
            let mut ws = Workspace::open(&file, &config, &plugins)?;
            let id = ws.scope(&from)?;
            let result = ws.session.rename(id, &to)?;
            ws.save()?;
            match result.message {
                Some(note) => output.warning(&format!("Scope '{from}' {note}"))?,
                None => output.success(&format!("Scope '{from}' renamed to '{to}'"))?,
            }
        }

        ScopeCommands::Remove { file, name, yes } => {
            let mut ws = Workspace::open(&file, &config, &plugins)?;
            let id = ws.scope(&name)?;
            let children = ws.session.tree().children(id).len();
            if !yes && !confirm(&format!("Remove scope '{name}' and its {children} entities?"))? {
                return Err(CliError::Cancelled);
            }
            ws.session.remove(id)?;
            ws.save()?;
            output.success(&format!("Scope '{name}' removed"))?;
        }

        ScopeCommands::Import {
            file,
            source,
            provider,
        } => import(&file, &source, provider, &config, &plugins, &output)?,

        ScopeCommands::Export { file, name, out } => {
            let ws = Workspace::open(&file, &config, &plugins)?;
            let id = ws.scope(&name)?;
            let nodes = ws.export(id, &out)?;
            output.success(&format!(
                "Scope '{name}' exported to {} ({nodes} artifacts)",
                out.display()
            ))?;
        }
    }
    Ok(())
}

/// Import every document found at `source` under the workspace's scopes.
#[instrument(skip_all, fields(source = %source.display()))]
fn import(
    file: &Path,
    source: &Path,
    provider: Option<String>,
    config: &AppConfig,
    plugins: &PluginRegistry,
    output: &OutputManager,
) -> CliResult<()> {
    let provider_id = provider.unwrap_or_else(|| infer_provider(source).to_string());
    let provider = plugins
        .datasource(&provider_id)
        .ok_or_else(|| CliError::UnknownProvider {
            id: provider_id.clone(),
            available: plugins.datasource_ids().iter().map(|s| s.to_string()).collect(),
        })?;

    let sources: Vec<PathBuf> = if provider_id == TOML_ID {
        TomlSchemaProvider::discover(source)?
    } else {
        vec![source.to_path_buf()]
    };
    if sources.is_empty() {
        return Err(CliError::InvalidInput {
            message: format!("no schema files found under {}", source.display()),
            source: None,
        });
    }

    let mut ws = Workspace::open(file, config, plugins)?;
    let parent = ws.session.model().scopes;
    let cancel = CancellationToken::new();

    let imported = block_on(&cancel, async {
        let mut imported = Vec::new();
        for path in &sources {
            let raw = path.to_string_lossy();
            let id = ws
                .session
                .import_from(provider.as_ref(), &raw, parent, &cancel)
                .await?;
            let name = ws.session.tree().get(id).map(|a| a.name()).unwrap_or_default();
            imported.push(name);
        }
        Ok::<_, CliError>(imported)
    })?;

    ws.save()?;
    info!(count = imported.len(), provider = %provider_id, "Scopes imported");
    for name in &imported {
        output.success(&format!("Imported '{name}'"))?;
    }
    Ok(())
}

/// `.toml` files and directories use the schema provider, anything else is a
/// JSON document.
fn infer_provider(source: &Path) -> &'static str {
    if source.is_dir() || source.extension().is_some_and(|ext| ext == "toml") {
        TOML_ID
    } else {
        JSON_ID
    }
}

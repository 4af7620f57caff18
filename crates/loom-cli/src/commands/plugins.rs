//! `loom plugins`: show what the builtin registry holds.

use loom_core::prelude::{PluginManifest, PluginRegistry};

use crate::{
    cli::{ListFormat, PluginCommands},
    error::CliResult,
    output::OutputManager,
    workspace::plugins,
};

pub fn execute(cmd: PluginCommands, output: OutputManager) -> CliResult<()> {
    let registry = plugins()?;
    match cmd {
        PluginCommands::List { format } => {
            for line in render(&registry, format)? {
                output.data(&line)?;
            }
        }
    }
    Ok(())
}

fn render(registry: &PluginRegistry, format: ListFormat) -> CliResult<Vec<String>> {
    let manifests = registry.manifests();
    let lines = match format {
        ListFormat::List => manifests.iter().map(|m| m.id.clone()).collect(),
        ListFormat::Json => vec![
            serde_json::to_string_pretty(&manifests).map_err(std::io::Error::other)?,
        ],
        ListFormat::Csv => std::iter::once("id,version,capabilities".to_string())
            .chain(manifests.iter().map(|m| {
                format!("{},{},{}", m.id, m.version, capabilities(m, ";"))
            }))
            .collect(),
        ListFormat::Table => {
            let width = manifests.iter().map(|m| m.id.len()).max().unwrap_or(0).max(2);
            std::iter::once(format!("{:<width$}  {:<8}  CAPABILITIES", "ID", "VERSION"))
                .chain(manifests.iter().map(|m| {
                    format!("{:<width$}  {:<8}  {}", m.id, m.version, capabilities(m, ", "))
                }))
                .collect()
        }
    };
    Ok(lines)
}

fn capabilities(manifest: &PluginManifest, separator: &str) -> String {
    manifest.capabilities.join(separator)
}

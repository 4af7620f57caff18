//! `loom entity`: add or list the entities of a scope.

use serde::Serialize;

use loom_core::domain::TableDecorator;

use crate::{
    cli::{EntityCommands, OutputFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
    workspace::{Workspace, plugins},
};

#[derive(Debug, Serialize)]
struct EntityRow {
    name: String,
    table: Option<String>,
    schema: Option<String>,
}

pub fn execute(cmd: EntityCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let plugins = plugins()?;
    match cmd {
        EntityCommands::Add {
            file,
            scope,
            name,
            table,
        } => {
            let mut ws = Workspace::open(&file, &config, &plugins)?;
            let scope_id = ws.scope(&scope)?;
            ws.session.add_entity(scope_id, &name, table.as_deref())?;
            ws.save()?;
            output.success(&format!("Entity '{name}' added to '{scope}'"))?;
        }

        EntityCommands::List { file, scope } => {
            let ws = Workspace::open(&file, &config, &plugins)?;
            let scope_id = ws.scope(&scope)?;
            let tree = ws.session.tree();
            let rows: Vec<EntityRow> = tree
                .children(scope_id)
                .iter()
                .filter_map(|&id| tree.get(id))
                .map(|entity| {
                    let table = entity.decorator::<TableDecorator>();
                    EntityRow {
                        name: entity.name(),
                        table: table.map(TableDecorator::table_name),
                        schema: table.map(TableDecorator::schema),
                    }
                })
                .collect();

            if output.format() == OutputFormat::Json {
                output.json(&rows)?;
            } else {
                for row in rows {
                    match row.table {
                        Some(table) => output.data(&format!("{}\t{table}", row.name))?,
                        None => output.data(&row.name)?,
                    }
                }
            }
        }
    }
    Ok(())
}

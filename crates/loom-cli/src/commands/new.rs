//! Implementation of the `loom new` command.

use tracing::{info, instrument};

use crate::{
    cli::NewArgs,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    workspace::{Workspace, default_name},
};

/// Create an empty workspace (root, `scopes`, `outputs`) and save it.
#[instrument(skip_all, fields(file = %args.file.display()))]
pub fn execute(args: NewArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let name = match args.name {
        Some(name) => name,
        None => default_name(&args.file).ok_or_else(|| CliError::InvalidInput {
            message: format!(
                "cannot derive a workspace name from '{}', pass --name",
                args.file.display()
            ),
            source: None,
        })?,
    };

    let mut workspace = Workspace::create(&args.file, &name, &config, args.force)?;
    workspace.save()?;
    info!(workspace = %name, "Workspace created");

    output.success(&format!(
        "Workspace '{name}' created at {}",
        workspace.path().display()
    ))?;
    if !output.is_quiet() {
        output.print("")?;
        output.header("Next steps:")?;
        output.print(&format!(
            "  loom scope add {} <NAME>",
            workspace.path().display()
        ))?;
    }
    Ok(())
}

//! `loom apply`: run an edit script against a workspace and save once.
//!
//! Every step goes through the session's executor, so `undo` and `redo`
//! lines act on the steps before them. The first failing step aborts the
//! run and leaves the file untouched.

use std::fs;

use tracing::{debug, info, instrument};

use crate::{
    cli::ApplyArgs,
    config::AppConfig,
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
    script::{self, Step},
    workspace::{Workspace, plugins},
};

#[instrument(skip_all, fields(script = %args.script.display()))]
pub fn execute(args: ApplyArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let source = fs::read_to_string(&args.script)
        .with_cli_context(|| format!("reading script {}", args.script.display()))?;
    let lines = script::parse(&source).map_err(|e| CliError::Script {
        script: args.script.clone(),
        line: e.line,
        message: e.message,
    })?;

    let plugins = plugins()?;
    let mut ws = Workspace::open(&args.file, &config, &plugins)?;

    for line in &lines {
        let done = run_step(&mut ws, &line.step).map_err(|e| CliError::Script {
            script: args.script.clone(),
            line: line.number,
            message: e.to_string(),
        })?;
        debug!(line = line.number, %done, "Step applied");
        output.print(&format!("  {done}"))?;
    }

    if args.dry_run {
        output.info(&format!(
            "Dry run: {} step(s) applied, {} not saved",
            lines.len(),
            ws.path().display()
        ))?;
        return Ok(());
    }

    ws.save()?;
    info!(steps = lines.len(), "Script applied");
    output.success(&format!(
        "{} step(s) applied to {}",
        lines.len(),
        ws.path().display()
    ))?;
    Ok(())
}

/// Run one step and describe what it did.
fn run_step(ws: &mut Workspace, step: &Step) -> CliResult<String> {
    match step {
        Step::AddScope(name) => {
            ws.session.add_scope(name)?;
            Ok(format!("added scope '{name}'"))
        }
        Step::RenameScope { from, to } => {
            let id = ws.scope(from)?;
            let result = ws.session.rename(id, to)?;
            Ok(result
                .message
                .unwrap_or_else(|| format!("renamed '{from}' to '{to}'")))
        }
        Step::RemoveScope(name) => {
            let id = ws.scope(name)?;
            ws.session.remove(id)?;
            Ok(format!("removed scope '{name}'"))
        }
        Step::AddEntity { scope, name, table } => {
            let scope_id = ws.scope(scope)?;
            ws.session.add_entity(scope_id, name, table.as_deref())?;
            Ok(format!("added entity '{scope}/{name}'"))
        }
        Step::Set { path, key, value } => {
            let id = ws.resolve(path)?;
            ws.session
                .edit_properties(id, [(key.clone(), value.clone())])?;
            Ok(format!("set {path}.{key} = {value}"))
        }
        Step::Copy(path) => {
            let id = ws.resolve(path)?;
            ws.session.copy(id)?;
            Ok(format!("copied '{path}'"))
        }
        Step::Cut(path) => {
            let id = ws.resolve(path)?;
            ws.session.cut(id)?;
            Ok(format!("cut '{path}'"))
        }
        Step::Paste(target) => {
            let (parent, label) = match target {
                Some(scope) => (ws.scope(scope)?, scope.as_str()),
                None => (ws.session.model().scopes, "scopes"),
            };
            let pasted = ws.session.paste(parent)?;
            let name = ws
                .session
                .tree()
                .get(pasted)
                .map(|a| a.name())
                .unwrap_or_default();
            Ok(format!("pasted '{name}' into {label}"))
        }
        Step::Undo => Ok(format!("undid: {}", ws.session.undo()?)),
        Step::Redo => Ok(format!("redid: {}", ws.session.redo()?)),
    }
}

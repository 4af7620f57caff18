//! `loom generate`: run the builtin generators and write their files.

use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use loom_adapters::LocalFilesystem;
use loom_core::prelude::GenerationService;

use crate::{
    cli::{GenerateArgs, OutputFormat},
    commands::block_on,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    workspace::{Workspace, plugins},
};

#[derive(Debug, Serialize)]
struct Report<'a> {
    out: String,
    dry_run: bool,
    files: Vec<String>,
    warnings: &'a [String],
}

#[instrument(skip_all, fields(file = %args.file.display(), out = %args.out.display()))]
pub fn execute(args: GenerateArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let plugins = plugins()?;
    let mut ws = Workspace::open(&args.file, &config, &plugins)?;
    let service = GenerationService::new(
        Arc::clone(&plugins),
        Box::new(LocalFilesystem::new()),
        config.generation.clone(),
    );

    let cancel = CancellationToken::new();
    let spinner = output.spinner("Generating...");
    let outcome = block_on(&cancel, async {
        service
            .generate(ws.session.tree(), ws.session.root(), &cancel)
            .await
            .map_err(CliError::from)
    });
    spinner.finish_and_clear();
    let outcome = outcome?;

    for warning in &outcome.result.warnings {
        output.warning(warning)?;
    }
    if !outcome.result.success {
        return Err(CliError::GenerationFailed {
            errors: outcome.result.errors.clone(),
        });
    }
    let result = outcome.result.clone();

    let files: Vec<String> = if args.dry_run {
        GenerationService::collect_files(&outcome.staging, outcome.root, &args.out)?
            .into_iter()
            .map(|f| f.path.display().to_string())
            .collect()
    } else {
        let output_id = ws.session.apply_generation(outcome)?;
        let written = service.materialize(ws.session.tree(), output_id, &args.out)?;
        if !args.no_record {
            ws.save()?;
        }
        written.iter().map(|p| p.display().to_string()).collect()
    };
    info!(files = files.len(), dry_run = args.dry_run, "Generation finished");

    if output.format() == OutputFormat::Json {
        return Ok(output.json(&Report {
            out: args.out.display().to_string(),
            dry_run: args.dry_run,
            files,
            warnings: &result.warnings,
        })?);
    }

    if args.dry_run {
        output.info(&format!(
            "Dry run: would write {} file(s) to {}",
            files.len(),
            args.out.display()
        ))?;
    } else {
        output.success(&format!(
            "Generated {} file(s) in {}",
            files.len(),
            args.out.display()
        ))?;
    }
    for file in &files {
        output.print(&format!("  {file}"))?;
    }
    Ok(())
}

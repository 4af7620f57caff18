//! Command handlers, one module per subcommand.
//!
//! Handlers translate parsed arguments into calls on the core session and
//! generation service, then report through [`crate::output::OutputManager`].

pub mod apply;
pub mod completions;
pub mod config;
pub mod entity;
pub mod generate;
pub mod init;
pub mod new;
pub mod plugins;
pub mod scope;
pub mod show;

use tokio_util::sync::CancellationToken;

use crate::error::{CliResult, IntoCli};

/// Run `task` to completion on a single-threaded runtime. Ctrl-C cancels
/// `cancel` instead of killing the process, so the core can stop cleanly.
pub(crate) fn block_on<F, T>(cancel: &CancellationToken, task: F) -> CliResult<T>
where
    F: std::future::Future<Output = CliResult<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .with_cli_context(|| "starting async runtime")?;

    runtime.block_on(async {
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling");
                    cancel.cancel();
                }
            })
        };
        let result = task.await;
        watcher.abort();
        result
    })
}

/// Ask before a destructive step. Non-interactive sessions proceed.
#[cfg(feature = "interactive")]
pub(crate) fn confirm(prompt: &str) -> CliResult<bool> {
    use std::io::IsTerminal as _;

    if !std::io::stdin().is_terminal() {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| crate::error::CliError::InvalidInput {
            message: format!("prompt failed: {e}"),
            source: Some(Box::new(e)),
        })
}

#[cfg(not(feature = "interactive"))]
pub(crate) fn confirm(_prompt: &str) -> CliResult<bool> {
    Ok(true)
}

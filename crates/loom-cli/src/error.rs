//! Error handling for the Loom CLI.
//!
//! Provides structured errors with:
//! - User-friendly messages
//! - Actionable suggestions
//! - Proper error chaining
//! - Exit code mapping

use std::error::Error;
use std::path::PathBuf;

use owo_colors::OwoColorize;
use thiserror::Error;

use loom_core::error::{ErrorCategory as CoreCategory, LoomError};

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Workspace file already exists at {path}")]
    WorkspaceExists { path: PathBuf },

    #[error("No scope named '{name}'")]
    ScopeNotFound { name: String, available: Vec<String> },

    #[error("No entity named '{name}' in scope '{scope}'")]
    EntityNotFound { scope: String, name: String },

    #[error("No datasource provider '{id}'")]
    UnknownProvider { id: String, available: Vec<String> },

    /// A step of an edit script failed; nothing was saved.
    #[error("{script}:{line}: {message}")]
    Script {
        script: PathBuf,
        line: usize,
        message: String,
    },

    /// Generators reported errors; nothing was written.
    #[error("Generation failed with {} error(s)", errors.len())]
    GenerationFailed { errors: Vec<String> },

    /// A configuration file could not be read, parsed, or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error propagated from `loom-core` or the adapters.
    #[error("{0}")]
    Core(#[from] LoomError),

    /// An I/O operation failed.
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Operation cancelled by user.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { message, .. } => vec![
                format!("Check your input: {}", message),
                "Use --help for usage information".into(),
            ],

            Self::WorkspaceExists { path } => vec![
                format!("The file '{}' already exists", path.display()),
                "Use --force to overwrite (destructive)".into(),
                "Choose a different file name".into(),
            ],

            Self::ScopeNotFound { available, .. } => {
                if available.is_empty() {
                    vec![
                        "The workspace has no scopes yet".into(),
                        "Add one: loom scope add <FILE> <NAME>".into(),
                    ]
                } else {
                    let mut suggestions = vec!["Existing scopes:".to_string()];
                    suggestions.extend(available.iter().map(|s| format!("  • {s}")));
                    suggestions
                }
            }

            Self::EntityNotFound { scope, .. } => vec![
                format!("List the entities: loom entity list <FILE> {scope}"),
                "Entity names are case-sensitive".into(),
            ],

            Self::UnknownProvider { available, .. } => {
                let mut suggestions = vec!["Available providers:".to_string()];
                suggestions.extend(available.iter().map(|p| format!("  • {p}")));
                suggestions.push("Example: loom scope import shop.json schema.toml -p toml".into());
                suggestions
            }

            Self::Script { .. } => vec![
                "Fix the script line and run it again".into(),
                "Use 'loom apply --help' for the script format".into(),
            ],

            Self::GenerationFailed { errors } => {
                let mut suggestions: Vec<String> =
                    errors.iter().map(|e| format!("  • {e}")).collect();
                suggestions.push("No files were written".into());
                suggestions
            }

            Self::ConfigError { message, .. } => vec![
                format!("Configuration issue: {}", message),
                "Check the file printed by 'loom config path'".into(),
                "Use 'loom init --force' to recreate a default config".into(),
            ],

            Self::Core(core_err) => core_err.suggestions(),

            Self::IoError { message, .. } => vec![
                format!("I/O operation failed: {}", message),
                "Check file permissions".into(),
                "Ensure the parent directory exists".into(),
            ],

            Self::Cancelled => vec![
                "Operation was cancelled".into(),
                "No changes were made".into(),
            ],
        }
    }

    /// Get the error category for styling and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. }
            | Self::WorkspaceExists { .. }
            | Self::Script { .. }
            | Self::Cancelled => ErrorCategory::UserError,
            Self::ScopeNotFound { .. }
            | Self::EntityNotFound { .. }
            | Self::UnknownProvider { .. } => ErrorCategory::NotFound,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::Core(core) => match core.category() {
                CoreCategory::Structure
                | CoreCategory::Validation
                | CoreCategory::Reconstruction
                | CoreCategory::Cancelled => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Configuration => ErrorCategory::Configuration,
                CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::GenerationFailed { .. } | Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    /// Exit code to pass to the OS.
    ///
    /// | Category      | Code |
    /// |---------------|------|
    /// | User error    |  2   |
    /// | Not found     |  3   |
    /// | Configuration |  4   |
    /// | Internal      |  1   |
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
            ErrorCategory::Internal => 1,
        }
    }

    /// Format the error for display with colors and suggestions.
    pub fn format_colored(&self, verbose: bool) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\n{} {}\n\n",
            "✗".red().bold(),
            "Error:".red().bold()
        ));
        output.push_str(&format!("  {}\n", self.to_string().red()));

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                output.push_str(&format!(
                    "\n  {} {}\n",
                    "→".dimmed(),
                    err.to_string().dimmed()
                ));
                source = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str(&format!("\n{}\n", "Suggestions:".yellow().bold()));
            for suggestion in suggestions {
                output.push_str(&format!("  {}\n", suggestion));
            }
        }

        if !verbose {
            output.push('\n');
            output.push_str(&format!(
                "{} {}\n",
                "\u{2139}".blue(), // ℹ
                "Use -v / --verbose for more details.".dimmed(),
            ));
        }

        output
    }

    /// Plain-text version of [`Self::format_colored`], no ANSI codes.
    pub fn format_plain(&self, verbose: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!("\nError: {}\n", self));

        if verbose {
            let mut src = self.source();
            while let Some(err) = src {
                out.push_str(&format!("  Caused by: {err}\n"));
                src = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for s in &suggestions {
                out.push_str(&format!("  {s}\n"));
            }
        }

        if !verbose {
            out.push_str("\nUse -v / --verbose for more details.\n");
        }

        out
    }

    /// Log the error using tracing.
    pub fn log(&self) {
        match self.category() {
            ErrorCategory::UserError => tracing::warn!("User error: {}", self),
            ErrorCategory::NotFound => tracing::warn!("Not found: {}", self),
            ErrorCategory::Configuration => tracing::error!("Configuration error: {}", self),
            ErrorCategory::Internal => tracing::error!("Internal error: {}", self),
        }

        if let Some(source) = self.source() {
            tracing::debug!("Caused by: {}", source);
        }
    }
}

/// Error categories for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User input error (validation, invalid arguments).
    UserError,
    /// Resource not found.
    NotFound,
    /// Configuration error.
    Configuration,
    /// Internal/system error.
    Internal,
}

// ── IntoCli trait ─────────────────────────────────────────────────────────────

/// Extension trait to convert foreign error types into [`CliError`] at
/// call-sites with a descriptive context message.
pub trait IntoCli<T> {
    /// Convert to `CliResult` attaching a human-readable context message.
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

impl<T> IntoCli<T> for anyhow::Result<T> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::ConfigError {
            message: format!("{}: {e:#}", f().into()),
            source: Some(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::application::ApplicationError;
    use std::io;

    // ── suggestions ───────────────────────────────────────────────────────

    #[test]
    fn workspace_exists_suggests_force() {
        let err = CliError::WorkspaceExists {
            path: PathBuf::from("/tmp/shop.json"),
        };
        assert!(err.suggestions().iter().any(|s| s.contains("--force")));
    }

    #[test]
    fn missing_scope_lists_existing_ones() {
        let err = CliError::ScopeNotFound {
            name: "Salse".into(),
            available: vec!["Sales".into(), "Billing".into()],
        };
        let suggestions = err.suggestions();
        assert!(suggestions.iter().any(|s| s.contains("Sales")));
        assert!(suggestions.iter().any(|s| s.contains("Billing")));
    }

    #[test]
    fn empty_workspace_suggests_adding_a_scope() {
        let err = CliError::ScopeNotFound {
            name: "Sales".into(),
            available: vec![],
        };
        assert!(err.suggestions().iter().any(|s| s.contains("scope add")));
    }

    #[test]
    fn core_suggestions_are_forwarded() {
        let err = CliError::from(LoomError::from(ApplicationError::WorkspaceNotFound {
            path: PathBuf::from("shop.json"),
        }));
        assert!(err.suggestions().iter().any(|s| s.contains("loom new")));
    }

    // ── exit codes ────────────────────────────────────────────────────────

    #[test]
    fn exit_code_user_error() {
        assert_eq!(
            CliError::InvalidInput {
                message: "x".into(),
                source: None
            }
            .exit_code(),
            2
        );
        let rejected = LoomError::from(ApplicationError::ValidationFailed("dup".into()));
        assert_eq!(CliError::from(rejected).exit_code(), 2);
    }

    #[test]
    fn exit_code_not_found() {
        assert_eq!(
            CliError::EntityNotFound {
                scope: "Sales".into(),
                name: "Order".into()
            }
            .exit_code(),
            3
        );
        let missing = LoomError::from(ApplicationError::WorkspaceNotFound {
            path: PathBuf::from("x"),
        });
        assert_eq!(CliError::from(missing).exit_code(), 3);
    }

    #[test]
    fn exit_code_configuration() {
        assert_eq!(
            CliError::ConfigError {
                message: "x".into(),
                source: None
            }
            .exit_code(),
            4
        );
    }

    #[test]
    fn exit_code_internal() {
        assert_eq!(
            CliError::IoError {
                message: "x".into(),
                source: io::Error::other("e"),
            }
            .exit_code(),
            1
        );
        assert_eq!(
            CliError::GenerationFailed {
                errors: vec!["boom".into()]
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn cancellation_is_a_user_error() {
        let cancelled = LoomError::from(ApplicationError::Cancelled);
        assert_eq!(CliError::from(cancelled).exit_code(), 2);
        assert_eq!(CliError::Cancelled.exit_code(), 2);
    }

    // ── format ────────────────────────────────────────────────────────────

    #[test]
    fn format_plain_contains_error_header() {
        let err = CliError::WorkspaceExists {
            path: PathBuf::from("/tmp/x"),
        };
        let s = err.format_plain(false);
        assert!(s.contains("Error:"));
        assert!(s.contains("Suggestions:"));
    }

    #[test]
    fn script_errors_point_at_the_line() {
        let err = CliError::Script {
            script: PathBuf::from("edits.loom"),
            line: 3,
            message: "unknown step 'frobnicate'".into(),
        };
        assert!(err.to_string().starts_with("edits.loom:3:"));
    }

    #[test]
    fn format_plain_verbose_omits_hint() {
        let err = CliError::Cancelled;
        let s = err.format_plain(true);
        assert!(!s.contains("--verbose"));
    }

    // ── IntoCli ───────────────────────────────────────────────────────────

    #[test]
    fn into_cli_io_error() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let cli: CliResult<()> = result.with_cli_context(|| "reading script");
        assert!(matches!(cli, Err(CliError::IoError { .. })));
    }

    #[test]
    fn into_cli_anyhow_error_is_configuration() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("bad toml"));
        let cli = result.with_cli_context(|| "loading config").unwrap_err();
        assert_eq!(cli.exit_code(), 4);
        assert!(cli.to_string().contains("bad toml"));
    }
}

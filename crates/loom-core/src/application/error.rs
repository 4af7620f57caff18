//! Application layer errors.
//!
//! These errors represent failures in orchestration, not structural
//! violations. Those are `DomainError` from `crate::domain`.

use std::path::PathBuf;
use thiserror::Error;

use crate::bus::BusError;
use crate::error::ErrorCategory;

/// Errors that occur during application orchestration.
#[derive(Debug, Error, Clone)]
pub enum ApplicationError {
    /// An operation rejected its parameters. Nothing was mutated.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// An operation ran but reported failure. Nothing was recorded.
    #[error("Operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    /// The paste source is gone or the clipboard is empty.
    #[error("Clipboard is empty or its artifact no longer exists")]
    ClipboardEmpty,

    /// Cooperative cancellation was observed.
    #[error("Operation cancelled")]
    Cancelled,

    /// A bus subscriber failed.
    #[error("Handler failed: {reason}")]
    HandlerFailed { reason: String },

    /// A plugin did not match the shape its slot expects.
    #[error("Plugin '{plugin}' rejected: {reason}")]
    PluginRegistration { plugin: String, reason: String },

    /// Template rendering failed.
    #[error("Template rendering failed: {reason}")]
    RenderingFailed { reason: String },

    /// Filesystem operation failed.
    #[error("Filesystem error at {path}: {reason}")]
    FilesystemError { path: PathBuf, reason: String },

    /// Store access failed (lock poisoned, etc.).
    #[error("Workspace store error")]
    StoreLockError,

    /// Reading or writing a workspace document failed.
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    /// No workspace document at the given location.
    #[error("Workspace not found at {path}")]
    WorkspaceNotFound { path: PathBuf },

    /// Workspace document already exists at target location.
    #[error("Workspace already exists at {path}")]
    WorkspaceExists { path: PathBuf },

    /// Generation output directory already exists.
    #[error("Output directory already exists at {path}")]
    OutputExists { path: PathBuf },

    /// Rollback failed (best-effort cleanup failed).
    #[error("Rollback failed for {path}: {reason}")]
    RollbackFailed { path: PathBuf, reason: String },
}

impl From<BusError> for ApplicationError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Cancelled { .. } => Self::Cancelled,
            BusError::Handler(reason) => Self::HandlerFailed { reason },
        }
    }
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ValidationFailed(reason) => vec![
                reason.clone(),
                "The workspace was not changed".into(),
            ],
            Self::NothingToUndo | Self::NothingToRedo => {
                vec!["History is empty in that direction".into()]
            }
            Self::ClipboardEmpty => vec![
                "Copy or cut an artifact before pasting".into(),
                "The copied artifact may have been deleted".into(),
            ],
            Self::PluginRegistration { plugin, .. } => vec![
                format!("Check the manifest of '{}'", plugin),
                "Plugin ids must be unique and versions look like 1.2.3".into(),
            ],
            Self::FilesystemError { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
                "Ensure the parent directory exists".into(),
            ],
            Self::StoreLockError => vec![
                "The workspace store is locked".into(),
                "Try again in a moment".into(),
            ],
            Self::WorkspaceNotFound { path } => vec![
                format!("No workspace at {}", path.display()),
                "Try: loom new <FILE> to create one".into(),
            ],
            Self::OutputExists { path } => vec![
                format!("Directory already exists: {}", path.display()),
                "Choose another --out directory or remove the existing one".into(),
            ],
            Self::WorkspaceExists { path } => vec![
                format!("File already exists: {}", path.display()),
                "Use --force to overwrite (destructive)".into(),
            ],
            _ => vec!["Check the error details above".into()],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed(_)
            | Self::OperationFailed { .. }
            | Self::NothingToUndo
            | Self::NothingToRedo
            | Self::ClipboardEmpty
            | Self::WorkspaceExists { .. }
            | Self::OutputExists { .. } => ErrorCategory::Validation,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::PluginRegistration { .. } => ErrorCategory::Configuration,
            Self::WorkspaceNotFound { .. } => ErrorCategory::NotFound,
            Self::Serialization { .. } => ErrorCategory::Reconstruction,
            Self::HandlerFailed { .. }
            | Self::RenderingFailed { .. }
            | Self::FilesystemError { .. }
            | Self::StoreLockError
            | Self::RollbackFailed { .. } => ErrorCategory::Internal,
        }
    }
}

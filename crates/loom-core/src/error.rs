//! Unified error handling for Loom Core.
//!
//! This module provides a unified error type that wraps domain and application
//! errors, with rich context and user-actionable suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::bus::BusError;
use crate::domain::DomainError;

/// Root error type for Loom Core operations.
#[derive(Debug, Error, Clone)]
pub enum LoomError {
    /// Errors from the domain layer (structural violations, reconstruction).
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Errors from the application layer (orchestration failures).
    #[error("Application error: {0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl From<BusError> for LoomError {
    fn from(err: BusError) -> Self {
        Self::Application(err.into())
    }
}

impl LoomError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Check your setup and try again".into(),
            ],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Loom".into(),
                "Please report it together with the command you ran".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Structure => ErrorCategory::Structure,
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::NotFound => ErrorCategory::NotFound,
                crate::domain::ErrorCategory::Reconstruction => ErrorCategory::Reconstruction,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// `true` when the error was caused by cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Application(ApplicationError::Cancelled))
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Application(ApplicationError::StoreLockError | ApplicationError::Cancelled)
        )
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structure,
    Validation,
    NotFound,
    Reconstruction,
    Cancelled,
    Configuration,
    Internal,
}

/// Convenient result type alias.
pub type LoomResult<T> = Result<T, LoomError>;

/// Extension trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> LoomResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> LoomResult<T> {
        self.map_err(|e| LoomError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactId;

    #[test]
    fn domain_categories_are_mapped() {
        let id = ArtifactId::new();
        let err: LoomError = DomainError::CyclicParenting { parent: id, child: id }.into();
        assert_eq!(err.category(), ErrorCategory::Structure);

        let err: LoomError = DomainError::UnknownType {
            discriminator: "x".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Reconstruction);
        assert!(!err.suggestions().is_empty());
    }

    #[test]
    fn cancelled_bus_dispatch_becomes_cancelled_error() {
        let err: LoomError = BusError::Cancelled { event: "ArtifactCreated" }.into();
        assert!(err.is_cancelled());
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }

    #[test]
    fn context_wraps_foreign_errors() {
        let parsed: Result<u32, _> = "x".parse::<u32>();
        let err = parsed.context("reading depth").unwrap_err();
        assert!(err.to_string().contains("reading depth"));
        assert_eq!(err.category(), ErrorCategory::Internal);
    }
}

// ============================================================================
// domain/error.rs - SUBSTRATE ERROR DOMAIN
// ============================================================================

use thiserror::Error;

use crate::domain::artifact::ArtifactId;

pub type DomainResult<T> = Result<T, DomainError>;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (operations keep them around for undo diagnostics)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
///
/// Structural variants are programming errors raised at the point of
/// violation. They indicate a generator or plugin bug and are never
/// recovered locally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Structural Violations
    // ========================================================================
    #[error("Invalid structure: adding {child} under {parent} would create a cycle")]
    CyclicParenting { parent: ArtifactId, child: ArtifactId },

    #[error("Invalid structure: {child} is already a child of {current_parent}")]
    AlreadyParented {
        child: ArtifactId,
        current_parent: ArtifactId,
    },

    #[error("Invalid structure: {child} is not a child of {parent}")]
    NotAChild { parent: ArtifactId, child: ArtifactId },

    #[error("Invalid structure: duplicate artifact id {id}")]
    DuplicateId { id: ArtifactId },

    #[error("Invalid structure: {reason}")]
    InvalidStructure { reason: String },

    #[error("Decorator '{decorator}' cannot attach to '{actual}' (expected {expected})")]
    HostTypeMismatch {
        decorator: String,
        expected: String,
        actual: String,
    },

    #[error("A decorator is already attached under key '{key}'")]
    DuplicateDecorator { key: String },

    #[error("Decorator '{decorator}' is already attached to {host}")]
    DecoratorAlreadyAttached { decorator: String, host: ArtifactId },

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    #[error("Artifact not found: {id}")]
    ArtifactNotFound { id: ArtifactId },

    #[error("Property '{property}' holds {actual}, expected {expected}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Property name '{name}' is reserved")]
    ReservedProperty { name: String },

    // ========================================================================
    // Reconstruction Errors
    // ========================================================================
    #[error("Unknown type discriminator '{discriminator}'")]
    UnknownType { discriminator: String },

    #[error("Type '{discriminator}' cannot be reconstructed from a snapshot: {reason}")]
    NotReconstructible {
        discriminator: String,
        reason: String,
    },

    #[error("Type '{discriminator}' is already registered")]
    DuplicateType { discriminator: String },

    #[error("Property '{property}' references missing artifact {target}")]
    DanglingReference { property: String, target: ArtifactId },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::CyclicParenting { .. } | Self::AlreadyParented { .. } => vec![
                "The artifact tree rejected a reparenting request".into(),
                "Remove the artifact from its current parent before moving it".into(),
                "This usually points at a generator or plugin bug".into(),
            ],
            Self::HostTypeMismatch { decorator, expected, .. } => vec![
                format!("'{}' only attaches to {}", decorator, expected),
                "Check which generator tried to attach it".into(),
            ],
            Self::UnknownType { discriminator } => vec![
                format!("No factory is registered for '{}'", discriminator),
                "Make sure the plugin that owns this type is installed".into(),
            ],
            Self::NotReconstructible { discriminator, .. } => vec![
                format!("'{}' is transient and is never saved", discriminator),
                "The document was probably written by a newer or patched build".into(),
            ],
            Self::DanglingReference { property, .. } => vec![
                format!("Property '{}' points outside the loaded document", property),
                "Load the whole workspace instead of a fragment".into(),
            ],
            Self::InvalidDocument(_) => vec![
                "The workspace document is malformed".into(),
                "Restore it from version control or a backup".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CyclicParenting { .. }
            | Self::AlreadyParented { .. }
            | Self::NotAChild { .. }
            | Self::DuplicateId { .. }
            | Self::InvalidStructure { .. }
            | Self::HostTypeMismatch { .. }
            | Self::DuplicateDecorator { .. }
            | Self::DecoratorAlreadyAttached { .. } => ErrorCategory::Structure,
            Self::ArtifactNotFound { .. } => ErrorCategory::NotFound,
            Self::TypeMismatch { .. } | Self::ReservedProperty { .. } => ErrorCategory::Validation,
            Self::UnknownType { .. }
            | Self::NotReconstructible { .. }
            | Self::DuplicateType { .. }
            | Self::DanglingReference { .. }
            | Self::InvalidDocument(_) => ErrorCategory::Reconstruction,
        }
    }

    /// `true` for invariant violations of the artifact tree.
    pub fn is_structural(&self) -> bool {
        self.category() == ErrorCategory::Structure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Structure,
    Validation,
    NotFound,
    Reconstruction,
}

//! Application layer for Loom.
//!
//! This layer contains:
//! - **Operations**: Reversible edits run by the `OperationExecutor`
//! - **History**: The undo/redo stacks behind every executor
//! - **Clipboard**: Copy and cut payloads for paste
//! - **Generation**: Events and shared state of a generation run
//! - **Plugins**: Manifest checks and the plugin registry
//! - **Services**: Use case orchestration (WorkspaceSession, GenerationService)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Structural rules live in `crate::domain`; this layer only sequences them.

pub mod clipboard;
pub mod error;
pub mod generation;
pub mod history;
pub mod operations;
pub mod plugins;
pub mod ports;
pub mod services;

pub use clipboard::{ClipboardKind, ClipboardPayload, ClipboardService};
pub use generation::{GenerationContext, GenerationResult, GenerationScope, GenerationSettings};
pub use history::{HistoryConfig, UndoRedoManager, UndoableAction};
pub use operations::{Operation, OperationExecutor, OperationResult};
pub use plugins::{PluginManifest, PluginRegistry};

// Re-export main services
pub use services::{GenerationOutcome, GenerationService, WorkspaceSession};

// Re-export port traits (for adapter implementation)
pub use ports::{
    DatasourceProvider, Filesystem, Generator, TemplateEngine, WorkspaceStore,
    WorkspaceSubscriber,
};

pub use error::ApplicationError;

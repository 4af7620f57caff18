//! Loom Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for Loom, an
//! artifact substrate that models a workspace as a tree of decorated
//! artifacts and lets plugins generate source code from it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             loom-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │ (WorkspaceSession, GenerationService)   │
//! │   Operations, Undo/Redo, Clipboard      │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │  (Filesystem, Store, Plugin slots)      │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     loom-adapters (Infrastructure)      │
//! │ (LocalFilesystem, JsonWorkspaceStore)   │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer + Message Bus       │
//! │ (ArtifactTree, Decorators, Mementos)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use loom_core::prelude::*;
//!
//! # fn main() -> LoomResult<()> {
//! let registry = Arc::new(TypeRegistry::with_builtins()?);
//! let mut session = WorkspaceSession::create("Shop", registry, HistoryConfig::default())?;
//!
//! let sales = session.add_scope("Sales")?;
//! session.add_entity(sales, "Order", None)?;
//! session.undo()?;
//! # Ok(())
//! # }
//! ```

// Domain layer (artifacts, decorators, persistence)
pub mod domain;

// Typed publish/subscribe
pub mod bus;

// Application layer (orchestration logic)
pub mod application;

// Re-export error types
pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        ClipboardKind, GenerationOutcome, GenerationResult, GenerationService,
        GenerationSettings, HistoryConfig, OperationExecutor, PluginManifest, PluginRegistry,
        WorkspaceSession,
        generation::GenerationScope,
        plugins::capabilities,
        ports::{
            DatasourceProvider, Filesystem, Generator, TemplateEngine, WorkspaceStore,
            WorkspaceSubscriber,
        },
    };
    pub use crate::bus::{MessageBus, SubscriptionToken, WorkspaceScope};
    pub use crate::domain::{
        Artifact, ArtifactId, ArtifactTree, IdPolicy, PersistedNode, TypeRegistry, Value,
        WorkspaceModel, kinds, model,
    };
    pub use crate::error::{LoomError, LoomResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

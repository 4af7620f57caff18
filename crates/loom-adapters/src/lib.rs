//! Infrastructure adapters for Loom.
//!
//! This crate implements the ports defined in `loom-core::application::ports`.
//! It contains all external dependencies and I/O operations, plus the
//! builtin plugins.

pub mod filesystem;
pub mod plugins;
pub mod store;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use plugins::builtin_plugins;
pub use store::JsonWorkspaceStore;

//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `loom-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `WorkspaceStore`: Workspace document persistence
//!   - `TemplateEngine`, `Generator`, `DatasourceProvider`, `WorkspaceSubscriber`:
//!     plugin slots filled through the `PluginRegistry`
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{
    DatasourceProvider, Filesystem, Generator, TemplateEngine, WorkspaceStore,
    WorkspaceSubscriber,
};

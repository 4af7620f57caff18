//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer and ports to accomplish
//! high-level use cases like "edit a workspace" or "run the generators".

pub mod generation_service;
pub mod workspace_session;

pub use generation_service::{FileToWrite, GenerationOutcome, GenerationService};
pub use workspace_session::WorkspaceSession;

//! Workspace-structural events.
//!
//! Published inline by [`ArtifactTree`](crate::domain::tree::ArtifactTree)
//! after each structural mutation. Consumers are UI-adjacent; generator
//! plugins listen on the generation bus instead.

use crate::bus::{BusScope, Message};
use crate::domain::ArtifactId;

/// Scope of the structural bus. Handlers get no context.
#[derive(Debug)]
pub struct WorkspaceScope;

impl BusScope for WorkspaceScope {
    const NAME: &'static str = "workspace";
    type Context = ();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildAdded {
    pub parent: ArtifactId,
    pub child: ArtifactId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRemoved {
    pub parent: ArtifactId,
    pub child: ArtifactId,
    pub index: usize,
}

/// Raised before an artifact is renamed. Handlers may veto or rewrite the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRequested {
    pub artifact: ArtifactId,
    pub old_name: String,
    pub new_name: String,
    pub cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub command: String,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            command: command.into(),
        }
    }
}

/// Each subscriber appends the entries it contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMenuOpening {
    pub artifact: ArtifactId,
    pub kind: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactConstructed {
    pub artifact: ArtifactId,
    pub kind: String,
}

impl Message<WorkspaceScope> for ChildAdded {}
impl Message<WorkspaceScope> for ChildRemoved {}
impl Message<WorkspaceScope> for RenameRequested {}
impl Message<WorkspaceScope> for ContextMenuOpening {}
impl Message<WorkspaceScope> for ArtifactConstructed {}

//! Linear undo/redo history.
//!
//! Every successfully executed operation is recorded as an
//! [`UndoableAction`]. Recording a new action clears the redo side; the
//! oldest entries are evicted once the configured depth is exceeded.
//! Actions leaving history for good are released so the arena can free
//! artifacts nothing can bring back.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    application::ApplicationError,
    domain::ArtifactTree,
    error::LoomResult,
};

/// Default number of undo steps kept.
pub const DEFAULT_MAX_UNDO: usize = 100;

/// A recorded, reversible change to the workspace tree.
///
/// The first run happens before recording (see
/// [`OperationExecutor::execute`](crate::application::operations::OperationExecutor::execute)),
/// so an action enters history already applied. `redo` replays that first
/// run against the state `undo` left behind.
pub trait UndoableAction: Send {
    /// Human readable label, e.g. `Add scope 'Infrastructure'`.
    fn description(&self) -> String;

    fn undo(&mut self, tree: &mut ArtifactTree) -> LoomResult<()>;

    fn redo(&mut self, tree: &mut ArtifactTree) -> LoomResult<()>;

    /// Called once when the action is dropped from history. `applied` is
    /// true when it leaves from the undo side (its effect stays) and false
    /// when it leaves from the redo side (its effect is reverted).
    fn release(&mut self, _tree: &mut ArtifactTree, _applied: bool) -> LoomResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undo entries; `0` disables the limit.
    pub max_undo: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_MAX_UNDO,
        }
    }
}

pub struct UndoRedoManager {
    config: HistoryConfig,
    undo_stack: VecDeque<Box<dyn UndoableAction>>,
    redo_stack: Vec<Box<dyn UndoableAction>>,
}

impl UndoRedoManager {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    /// Push a completed action. Clears the redo side.
    pub fn record_action(&mut self, tree: &mut ArtifactTree, action: Box<dyn UndoableAction>) {
        trace!(action = %action.description(), "Recording action");
        while let Some(dropped) = self.redo_stack.pop() {
            release(tree, dropped, false);
        }
        self.undo_stack.push_back(action);

        if self.config.max_undo > 0 {
            while self.undo_stack.len() > self.config.max_undo {
                if let Some(evicted) = self.undo_stack.pop_front() {
                    debug!(action = %evicted.description(), "History full, oldest entry evicted");
                    release(tree, evicted, true);
                }
            }
        }
    }

    /// Undo the most recent action and move it to the redo side.
    ///
    /// A failing action stays on the undo side.
    pub fn undo(&mut self, tree: &mut ArtifactTree) -> LoomResult<String> {
        let mut action = self
            .undo_stack
            .pop_back()
            .ok_or(ApplicationError::NothingToUndo)?;
        let description = action.description();

        if let Err(err) = action.undo(tree) {
            warn!(action = %description, error = %err, "Undo failed");
            self.undo_stack.push_back(action);
            return Err(err);
        }

        debug!(action = %description, "Undone");
        self.redo_stack.push(action);
        Ok(description)
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self, tree: &mut ArtifactTree) -> LoomResult<String> {
        let mut action = self
            .redo_stack
            .pop()
            .ok_or(ApplicationError::NothingToRedo)?;
        let description = action.description();

        if let Err(err) = action.redo(tree) {
            warn!(action = %description, error = %err, "Redo failed");
            self.redo_stack.push(action);
            return Err(err);
        }

        debug!(action = %description, "Redone");
        self.undo_stack.push_back(action);
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.back().map(|a| a.description())
    }

    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|a| a.description())
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Labels from oldest to newest.
    pub fn undo_descriptions(&self) -> Vec<String> {
        self.undo_stack.iter().map(|a| a.description()).collect()
    }

    /// Forget everything, releasing every recorded action.
    pub fn clear(&mut self, tree: &mut ArtifactTree) {
        while let Some(dropped) = self.redo_stack.pop() {
            release(tree, dropped, false);
        }
        while let Some(dropped) = self.undo_stack.pop_back() {
            release(tree, dropped, true);
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }
}

fn release(tree: &mut ArtifactTree, mut action: Box<dyn UndoableAction>, applied: bool) {
    if let Err(err) = action.release(tree, applied) {
        warn!(action = %action.description(), error = %err, "Releasing history entry failed");
    }
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl std::fmt::Debug for UndoRedoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoRedoManager")
            .field("config", &self.config)
            .field("undo", &self.undo_descriptions())
            .field("redo", &self.redo_stack.len())
            .finish()
    }
}

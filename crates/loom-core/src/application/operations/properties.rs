//! Property edits, undone through memento snapshots.

use std::collections::BTreeMap;

use crate::{
    application::operations::{Operation, OperationResult, check_name, rollback_failed},
    domain::{
        ArtifactId, ArtifactTree, DomainError, LockDecorator, Memento, NAME_PROPERTY, State, Value,
        property_bag::RESERVED_PREFIX,
    },
    error::{LoomError, LoomResult},
};

fn snapshot(tree: &ArtifactTree, id: ArtifactId) -> LoomResult<State> {
    Ok(tree.require(id)?.capture_state())
}

fn apply_snapshot(tree: &mut ArtifactTree, id: ArtifactId, state: Option<&State>) -> LoomResult<()> {
    let state = state.ok_or_else(|| LoomError::Internal {
        message: format!("no snapshot recorded for {id}"),
    })?;
    tree.require_mut(id)?.restore_state(state)?;
    Ok(())
}

// ============================================================================
// RenameArtifact
// ============================================================================

/// Rename through the workspace bus so subscribers can veto or rewrite.
pub struct RenameArtifact;

#[derive(Debug, Clone)]
pub struct RenameParams {
    pub target: ArtifactId,
    pub new_name: String,
    before: Option<State>,
    after: Option<State>,
}

impl RenameParams {
    pub fn new(target: ArtifactId, new_name: impl Into<String>) -> Self {
        Self {
            target,
            new_name: new_name.into(),
            before: None,
            after: None,
        }
    }
}

impl Operation for RenameArtifact {
    type Params = RenameParams;

    fn name(&self) -> &'static str {
        "rename"
    }

    fn describe(&self, params: &RenameParams) -> String {
        format!("Rename to '{}'", params.new_name)
    }

    fn validate(&self, tree: &ArtifactTree, params: &RenameParams) -> Option<String> {
        if !tree.contains(params.target) {
            return Some(format!("artifact {} not found", params.target));
        }
        check_name(&params.new_name)
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut RenameParams) -> OperationResult {
        let before = match snapshot(tree, params.target) {
            Ok(state) => state,
            Err(e) => return OperationResult::failed(e.to_string()),
        };
        match tree.rename(params.target, &params.new_name) {
            Ok(true) => {}
            Ok(false) => return OperationResult::failed("rename was vetoed or changed nothing"),
            Err(e) => return OperationResult::failed(e.to_string()),
        }

        let after = match snapshot(tree, params.target) {
            Ok(state) => state,
            Err(e) => return OperationResult::failed(e.to_string()),
        };
        let applied = after
            .get(NAME_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        params.before = Some(before);
        params.after = Some(after);

        if applied != params.new_name {
            return OperationResult::ok_with(format!("renamed to '{applied}'"));
        }
        OperationResult::ok()
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut RenameParams) -> LoomResult<()> {
        apply_snapshot(tree, params.target, params.before.as_ref())
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut RenameParams) -> LoomResult<()> {
        apply_snapshot(tree, params.target, params.after.as_ref())
    }
}

// ============================================================================
// EditProperties
// ============================================================================

/// Overwrite several properties at once. `Value::Null` removes a property.
pub struct EditProperties;

#[derive(Debug, Clone)]
pub struct EditPropertiesParams {
    pub target: ArtifactId,
    pub values: BTreeMap<String, Value>,
    before: Option<State>,
    after: Option<State>,
}

impl EditPropertiesParams {
    pub fn new(target: ArtifactId) -> Self {
        Self {
            target,
            values: BTreeMap::new(),
            before: None,
            after: None,
        }
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl Operation for EditProperties {
    type Params = EditPropertiesParams;

    fn name(&self) -> &'static str {
        "edit-properties"
    }

    fn describe(&self, params: &EditPropertiesParams) -> String {
        let names: Vec<&str> = params.values.keys().map(String::as_str).collect();
        format!("Edit {}", names.join(", "))
    }

    fn validate(&self, tree: &ArtifactTree, params: &EditPropertiesParams) -> Option<String> {
        let Some(target) = tree.get(params.target) else {
            return Some(format!("artifact {} not found", params.target));
        };
        if target.has_decorator::<LockDecorator>() {
            return Some(format!("'{}' is locked", target.name()));
        }
        if params.values.is_empty() {
            return Some("no properties to edit".into());
        }
        params
            .values
            .keys()
            .find(|name| name.starts_with(RESERVED_PREFIX))
            .map(|name| DomainError::ReservedProperty { name: name.clone() }.to_string())
    }

    fn execute(&self, tree: &mut ArtifactTree, params: &mut EditPropertiesParams) -> OperationResult {
        let before = match snapshot(tree, params.target) {
            Ok(state) => state,
            Err(e) => return OperationResult::failed(e.to_string()),
        };

        let mut changed = 0usize;
        for (name, value) in &params.values {
            let outcome = match value {
                Value::Null => tree
                    .require_mut(params.target)
                    .map(|a| a.properties_mut().remove(name).is_some()),
                value => tree.set_value(params.target, name, value.clone()),
            };
            match outcome {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => {
                    // put back what was already written
                    if let Err(rollback) = apply_snapshot(tree, params.target, Some(&before)) {
                        return rollback_failed(e, rollback);
                    }
                    return OperationResult::failed(e.to_string());
                }
            }
        }
        if changed == 0 {
            return OperationResult::failed("no property changed (unchanged values or vetoed)");
        }

        match snapshot(tree, params.target) {
            Ok(after) => {
                params.before = Some(before);
                params.after = Some(after);
                OperationResult::ok_with(format!("{changed} changed"))
            }
            Err(e) => OperationResult::failed(e.to_string()),
        }
    }

    fn undo(&self, tree: &mut ArtifactTree, params: &mut EditPropertiesParams) -> LoomResult<()> {
        apply_snapshot(tree, params.target, params.before.as_ref())
    }

    fn redo(&self, tree: &mut ArtifactTree, params: &mut EditPropertiesParams) -> LoomResult<()> {
        apply_snapshot(tree, params.target, params.after.as_ref())
    }
}

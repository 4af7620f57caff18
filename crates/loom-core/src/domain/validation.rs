use std::collections::HashSet;

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    decorator::Decorator,
    error::DomainError,
    tree::ArtifactTree,
};

/// Centralized tree invariant checks.
///
/// The tree's own mutators keep these invariants; the validator exists for
/// documents and staging trees assembled elsewhere.
pub struct TreeValidator;

impl TreeValidator {
    /// Check the subtree under `root`:
    /// - every child points back at the node listing it
    /// - every node is listed at most once (no cycles, no sharing)
    /// - every attached decorator, composite children included, points at its host
    pub fn validate(tree: &ArtifactTree, root: ArtifactId) -> Result<(), DomainError> {
        tree.require(root)?;
        let mut visited = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                return Err(DomainError::InvalidStructure {
                    reason: format!("{id} is reachable twice under {root}"),
                });
            }
            let node = tree.require(id)?;
            Self::validate_decorators(node)?;

            for child in node.children() {
                let child_node = tree.require(*child)?;
                if child_node.parent() != Some(id) {
                    return Err(DomainError::InvalidStructure {
                        reason: format!(
                            "{child} is listed under {id} but its parent is {:?}",
                            child_node.parent()
                        ),
                    });
                }
                stack.push(*child);
            }
        }
        Ok(())
    }

    fn validate_decorators(node: &Artifact) -> Result<(), DomainError> {
        fn check(decorator: &dyn Decorator, host: ArtifactId) -> Result<(), DomainError> {
            if decorator.host() != Some(host) {
                return Err(DomainError::InvalidStructure {
                    reason: format!(
                        "decorator '{}' on {host} points at {:?}",
                        decorator.kind(),
                        decorator.host()
                    ),
                });
            }
            decorator
                .children()
                .iter()
                .try_for_each(|c| check(c.as_ref(), host))
        }

        node.decorators()
            .try_for_each(|(_, decorator)| check(decorator, node.id()))
    }
}

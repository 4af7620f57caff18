// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Loom.
//!
//! The extensible object substrate: property bags, artifacts held in an
//! arena tree, attachable decorators, and memento capture/restore with an
//! explicit type registry.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or external calls
//! - **Single owner**: the tree is mutated through `&mut`, no internal locking
//! - **Ids, not pointers**: parent links, children and references are
//!   [`ArtifactId`]s checked against the arena before use
pub mod artifact;
pub mod decorator;
pub mod decorators;
pub mod error;
pub mod memento;
pub mod model;
pub mod naming;
pub mod persistence;
pub mod property_bag;
pub mod registry;
pub mod tree;
pub mod value;

mod validation;

pub use artifact::{Artifact, ArtifactId, NAME_PROPERTY};
pub use decorator::{CompositeDecorator, Decorator, DecoratorBase};
pub use decorators::{
    GeneratorBindingDecorator, LabelCapability, LinkDecorator, LockDecorator, TableDecorator,
    VisibilityCapability,
};
pub use error::{DomainError, DomainResult, ErrorCategory};
pub use memento::{Memento, State};
pub use model::{WorkspaceModel, kinds};
pub use persistence::{IdPolicy, PersistedNode};
pub use property_bag::{ObserverId, PropertyBag, PropertyChanged, PropertyChanging};
pub use registry::TypeRegistry;
pub use tree::ArtifactTree;
pub use validation::TreeValidator;
pub use value::{FromValue, Value};

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Cross-module scenarios
    // ========================================================================

    #[test]
    fn removed_subtree_keeps_decorators_and_can_be_relinked() {
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        let sales = tree.insert(model::scope("Sales")).unwrap();
        let order = tree.insert(model::entity("Order")).unwrap();
        tree.add_child(ws.scopes, sales).unwrap();
        tree.add_child(sales, order).unwrap();
        tree.add_decorator(order, Box::new(TableDecorator::new()))
            .unwrap();

        tree.remove_child(ws.scopes, sales).unwrap();
        let table = tree
            .get(order)
            .and_then(|a| a.decorator::<TableDecorator>())
            .unwrap();
        assert_eq!(table.host(), Some(order));

        tree.add_child(ws.scopes, sales).unwrap();
        assert!(TreeValidator::validate(&tree, ws.root).is_ok());
    }

    #[test]
    fn saved_workspace_loads_into_identical_tree() {
        let registry = TypeRegistry::with_builtins().unwrap();
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        let infra = tree.insert(model::scope("Infrastructure")).unwrap();
        tree.add_child(ws.scopes, infra).unwrap();
        tree.add_decorator(infra, Box::new(LockDecorator::new("frozen")))
            .unwrap();

        let json = tree.capture(ws.root).unwrap().to_json().unwrap();

        let mut loaded = ArtifactTree::new();
        let root = loaded
            .restore(
                &PersistedNode::from_json(&json).unwrap(),
                &registry,
                IdPolicy::Preserve,
            )
            .unwrap();
        TreeValidator::validate(&loaded, root).unwrap();

        let model = WorkspaceModel::locate(&loaded, root).unwrap();
        assert_eq!(model.find_scope(&loaded, "Infrastructure"), Some(infra));

        // the restored lock is live again
        assert!(!loaded.rename(infra, "Infra").unwrap());
    }
}

//! Nested document form of a subtree.
//!
//! ```json
//! {
//!   "typeDiscriminator": "entity",
//!   "properties": {
//!     "$id": { "kind": "text", "value": "…uuid…" },
//!     "name": { "kind": "text", "value": "Customer" },
//!     "$decorators": { "kind": "map", "value": {
//!       "table": { "kind": "map", "value": { "$type": …, "table_name": … } }
//!     } }
//!   },
//!   "children": []
//! }
//! ```
//!
//! Loading is all-or-nothing: the whole subtree is built and checked aside,
//! references are resolved once every node exists, and only then are the
//! nodes handed to the tree.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    artifact::{Artifact, ArtifactId},
    decorator::Decorator,
    error::{DomainError, DomainResult},
    memento::{Memento, State},
    property_bag::PropertyBag,
    registry::TypeRegistry,
    tree::ArtifactTree,
    value::Value,
};

pub const ID_KEY: &str = "$id";
pub const DECORATORS_KEY: &str = "$decorators";
pub const TYPE_KEY: &str = "$type";
pub const CHILDREN_KEY: &str = "$children";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedNode {
    pub type_discriminator: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub children: Vec<PersistedNode>,
}

impl PersistedNode {
    pub fn new(type_discriminator: impl Into<String>) -> Self {
        Self {
            type_discriminator: type_discriminator.into(),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<ArtifactId> {
        self.properties
            .get(ID_KEY)
            .and_then(Value::as_str)
            .and_then(|raw| ArtifactId::parse(raw).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// Stored properties of the decorator attached under `key`.
    pub fn decorator(&self, key: &str) -> Option<&BTreeMap<String, Value>> {
        self.properties
            .get(DECORATORS_KEY)
            .and_then(Value::as_map)
            .and_then(|decorators| decorators.get(key))
            .and_then(Value::as_map)
    }

    /// Number of nodes in this subtree.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(PersistedNode::count).sum::<usize>()
    }

    pub fn to_json(&self) -> DomainResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DomainError::InvalidDocument(e.to_string()))
    }

    pub fn from_json(raw: &str) -> DomainResult<Self> {
        serde_json::from_str(raw).map_err(|e| DomainError::InvalidDocument(e.to_string()))
    }
}

/// How ids are assigned when a document is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Keep the ids stored under `$id` (load, undo of a removal).
    Preserve,
    /// Give every node a new id and rewrite internal references (copy/paste).
    Fresh,
}

// ============================================================================
// Capture
// ============================================================================

impl ArtifactTree {
    /// Snapshot `root` and everything below it.
    pub fn capture(&self, root: ArtifactId) -> DomainResult<PersistedNode> {
        let artifact = self.require(root)?;
        let state = artifact.capture_state();

        let mut properties = state.properties;
        properties.insert(ID_KEY.to_string(), Value::Text(root.to_string()));

        let decorators: BTreeMap<String, Value> = artifact
            .decorators()
            .map(|(key, d)| (key.to_string(), encode_decorator(d)))
            .collect();
        if !decorators.is_empty() {
            properties.insert(DECORATORS_KEY.to_string(), Value::Map(decorators));
        }

        let children = artifact
            .children()
            .iter()
            .map(|child| self.capture(*child))
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PersistedNode {
            type_discriminator: state.discriminator,
            properties,
            children,
        })
    }

    /// Rebuild a document as a new detached subtree and return its root.
    ///
    /// Nothing is inserted unless the whole document is valid.
    pub fn restore(
        &mut self,
        node: &PersistedNode,
        registry: &TypeRegistry,
        policy: IdPolicy,
    ) -> DomainResult<ArtifactId> {
        let mut builder = Builder {
            registry,
            policy,
            built: Vec::new(),
            seen: HashSet::new(),
            remap: HashMap::new(),
        };
        let root = builder.build(node, None)?;
        let mut built = builder.built;
        let local = builder.seen;
        if let Some(dup) = local.iter().find(|id| self.contains(**id)) {
            return Err(DomainError::DuplicateId { id: *dup });
        }

        for artifact in built.iter_mut() {
            if policy == IdPolicy::Fresh {
                rewrite_references(artifact, &builder.remap);
            }
            check_references(artifact, |id| local.contains(&id) || self.contains(id))?;
        }

        debug!(%root, nodes = built.len(), "Subtree restored");
        self.adopt(built)?;
        Ok(root)
    }
}

fn encode_decorator(decorator: &dyn Decorator) -> Value {
    let mut map = decorator.capture_state().properties;
    map.insert(TYPE_KEY.to_string(), Value::Text(decorator.kind().to_string()));
    if !decorator.children().is_empty() {
        let children = decorator
            .children()
            .iter()
            .map(|c| encode_decorator(c.as_ref()))
            .collect();
        map.insert(CHILDREN_KEY.to_string(), Value::List(children));
    }
    Value::Map(map)
}

// ============================================================================
// Restore
// ============================================================================

struct Builder<'r> {
    registry: &'r TypeRegistry,
    policy: IdPolicy,
    built: Vec<Artifact>,
    seen: HashSet<ArtifactId>,
    remap: HashMap<ArtifactId, ArtifactId>,
}

impl Builder<'_> {
    fn build(&mut self, node: &PersistedNode, parent: Option<ArtifactId>) -> DomainResult<ArtifactId> {
        let mut properties = node.properties.clone();
        let stored_id = match properties.remove(ID_KEY) {
            Some(Value::Text(raw)) => Some(ArtifactId::parse(&raw)?),
            Some(other) => {
                return Err(DomainError::InvalidDocument(format!(
                    "'{ID_KEY}' must be text, found {}",
                    other.kind_name()
                )));
            }
            None => None,
        };
        let id = match (self.policy, stored_id) {
            (IdPolicy::Preserve, Some(id)) => id,
            (IdPolicy::Fresh, Some(old)) => {
                let new = ArtifactId::new();
                self.remap.insert(old, new);
                new
            }
            (_, None) => ArtifactId::new(),
        };
        if !self.seen.insert(id) {
            return Err(DomainError::DuplicateId { id });
        }

        let decorators = properties.remove(DECORATORS_KEY);
        let state = State {
            discriminator: node.type_discriminator.clone(),
            properties,
        };
        let mut artifact = self.registry.create_artifact(id, &state)?;

        match decorators {
            None => {}
            Some(Value::Map(entries)) => {
                for (key, encoded) in entries {
                    let decorator = decode_decorator(&encoded, self.registry)?;
                    if decorator.key() != key {
                        return Err(DomainError::InvalidDocument(format!(
                            "decorator stored under '{key}' reports key '{}'",
                            decorator.key()
                        )));
                    }
                    artifact.add_decorator(decorator)?;
                }
            }
            Some(other) => {
                return Err(DomainError::InvalidDocument(format!(
                    "'{DECORATORS_KEY}' must be a map, found {}",
                    other.kind_name()
                )));
            }
        }

        let mut children = Vec::with_capacity(node.children.len());
        for child in &node.children {
            children.push(self.build(child, Some(id))?);
        }
        artifact.children = children;
        artifact.parent = parent;
        self.built.push(artifact);
        Ok(id)
    }
}

fn split_decorator_node(encoded: &Value) -> DomainResult<(State, Vec<Value>)> {
    let mut map = encoded
        .as_map()
        .cloned()
        .ok_or_else(|| DomainError::InvalidDocument("decorator node must be a map".into()))?;
    let kind = match map.remove(TYPE_KEY) {
        Some(Value::Text(kind)) => kind,
        _ => {
            return Err(DomainError::InvalidDocument(format!(
                "decorator node without '{TYPE_KEY}'"
            )));
        }
    };
    let children = match map.remove(CHILDREN_KEY) {
        Some(Value::List(children)) => children,
        None => Vec::new(),
        Some(other) => {
            return Err(DomainError::InvalidDocument(format!(
                "'{CHILDREN_KEY}' must be a list, found {}",
                other.kind_name()
            )));
        }
    };
    Ok((
        State {
            discriminator: kind,
            properties: map,
        },
        children,
    ))
}

fn decode_decorator(encoded: &Value, registry: &TypeRegistry) -> DomainResult<Box<dyn Decorator>> {
    let (state, children) = split_decorator_node(encoded)?;
    let mut decorator = registry.create_decorator(&state)?;
    restore_decorator_children(decorator.as_mut(), &children)?;
    Ok(decorator)
}

/// Composite children are created by the composite's factory; the document
/// only carries their state, matched by kind.
fn restore_decorator_children(decorator: &mut dyn Decorator, children: &[Value]) -> DomainResult<()> {
    let owner = decorator.kind();
    for encoded in children {
        let (state, grandchildren) = split_decorator_node(encoded)?;
        let slot = decorator
            .children_mut()
            .iter_mut()
            .find(|c| c.kind() == state.discriminator)
            .ok_or_else(|| {
                DomainError::InvalidDocument(format!(
                    "'{owner}' has no child decorator '{}'",
                    state.discriminator
                ))
            })?;
        slot.restore_state(&state)?;
        restore_decorator_children(slot.as_mut(), &grandchildren)?;
    }
    Ok(())
}

// ============================================================================
// Reference resolution
// ============================================================================

fn for_each_bag_mut(artifact: &mut Artifact, f: &mut impl FnMut(&mut PropertyBag)) {
    fn visit(decorator: &mut dyn Decorator, f: &mut impl FnMut(&mut PropertyBag)) {
        f(decorator.properties_mut());
        for child in decorator.children_mut() {
            visit(child.as_mut(), f);
        }
    }

    f(artifact.properties_mut());
    for key in artifact.decorator_keys() {
        if let Some(decorator) = artifact.decorator_by_key_mut(&key) {
            visit(decorator.as_mut(), f);
        }
    }
}

fn remap_value(value: &mut Value, remap: &HashMap<ArtifactId, ArtifactId>) {
    match value {
        Value::Reference(id) => {
            if let Some(new) = remap.get(id) {
                *id = *new;
            }
        }
        Value::List(items) => items.iter_mut().for_each(|v| remap_value(v, remap)),
        Value::Map(entries) => entries.values_mut().for_each(|v| remap_value(v, remap)),
        _ => {}
    }
}

fn rewrite_references(artifact: &mut Artifact, remap: &HashMap<ArtifactId, ArtifactId>) {
    for_each_bag_mut(artifact, &mut |bag| {
        let mut map = bag.to_map();
        let mut touched = false;
        for value in map.values_mut() {
            let before = value.clone();
            remap_value(value, remap);
            touched |= *value != before;
        }
        if touched {
            bag.replace_all(map);
        }
    });
}

fn check_references(
    artifact: &mut Artifact,
    resolves: impl Fn(ArtifactId) -> bool,
) -> DomainResult<()> {
    let mut dangling = None;
    for_each_bag_mut(artifact, &mut |bag| {
        for (name, value) in bag.iter() {
            value.for_each_reference(&mut |target| {
                if dangling.is_none() && !resolves(target) {
                    dangling = Some(DomainError::DanglingReference {
                        property: name.to_string(),
                        target,
                    });
                }
            });
        }
    });
    dangling.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        decorators::{self, GeneratorBindingDecorator, LinkDecorator, TableDecorator},
        model::{self, WorkspaceModel},
    };
    use tokio_util::sync::CancellationToken;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins().unwrap()
    }

    fn sample(tree: &mut ArtifactTree) -> WorkspaceModel {
        let ws = WorkspaceModel::create(tree, "Shop").unwrap();
        let sales = tree.insert(model::scope("Sales")).unwrap();
        tree.add_child(ws.scopes, sales).unwrap();
        let order = tree.insert(model::entity("Order")).unwrap();
        tree.add_child(sales, order).unwrap();
        tree.add_decorator(order, Box::new(TableDecorator::new()))
            .unwrap();
        let customer = tree.insert(model::entity("Customer")).unwrap();
        tree.add_child(sales, customer).unwrap();
        tree.add_decorator(order, Box::new(LinkDecorator::new(customer)))
            .unwrap();
        tree.add_decorator(customer, Box::new(decorators::control()))
            .unwrap();
        ws
    }

    #[test]
    fn capture_then_restore_reproduces_document() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let document = tree.capture(ws.root).unwrap();

        let mut other = ArtifactTree::new();
        let root = other
            .restore(&document, &registry(), IdPolicy::Preserve)
            .unwrap();
        assert_eq!(root, ws.root);
        assert_eq!(other.capture(root).unwrap(), document);
        assert_eq!(other.len(), tree.len());
    }

    #[test]
    fn document_survives_json() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let document = tree.capture(ws.root).unwrap();

        let json = document.to_json().unwrap();
        assert!(json.contains("\"typeDiscriminator\""));
        assert!(json.contains("\"$decorators\""));
        assert_eq!(PersistedNode::from_json(&json).unwrap(), document);
    }

    #[test]
    fn decorator_properties_are_readable_from_documents() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let document = tree.capture(ws.root).unwrap();

        let order = &document.children[0].children[0].children[0];
        assert_eq!(order.name(), Some("Order"));
        let table = order.decorator(TableDecorator::KIND).unwrap();
        assert_eq!(table["table_name"].as_str(), Some("order"));
        assert!(order.decorator("missing").is_none());
    }

    #[test]
    fn unknown_type_aborts_whole_load() {
        let mut document = PersistedNode::new(model::kinds::WORKSPACE);
        document.children.push(PersistedNode::new(model::kinds::SCOPE));
        document.children.push(PersistedNode::new("plugin-only-kind"));

        let mut tree = ArtifactTree::new();
        let err = tree
            .restore(&document, &registry(), IdPolicy::Preserve)
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownType { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn transient_decorator_refuses_reconstruction() {
        let mut tree = ArtifactTree::new();
        let id = tree.insert(model::output("gen")).unwrap();
        tree.add_decorator(
            id,
            Box::new(GeneratorBindingDecorator::new("readme", CancellationToken::new())),
        )
        .unwrap();
        let document = tree.capture(id).unwrap();

        let mut other = ArtifactTree::new();
        assert!(matches!(
            other.restore(&document, &registry(), IdPolicy::Preserve),
            Err(DomainError::NotReconstructible { .. })
        ));
        assert!(other.is_empty());
    }

    #[test]
    fn reference_outside_document_is_dangling() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let sales = ws.scopes(&tree)[0];
        let order = tree.children(sales)[0];

        // the link on Order points at Customer, which is not part of this fragment
        let fragment = tree.capture(order).unwrap();
        let mut other = ArtifactTree::new();
        assert!(matches!(
            other.restore(&fragment, &registry(), IdPolicy::Fresh),
            Err(DomainError::DanglingReference { .. })
        ));

        // inside the source tree the target resolves
        let copy = tree.restore(&fragment, &registry(), IdPolicy::Fresh).unwrap();
        assert_ne!(copy, order);
    }

    #[test]
    fn fresh_ids_rewrite_internal_references() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let sales = ws.scopes(&tree)[0];
        let document = tree.capture(sales).unwrap();

        let copy = tree.restore(&document, &registry(), IdPolicy::Fresh).unwrap();
        let copied_children = tree.children(copy).to_vec();
        let link_target = tree
            .get(copied_children[0])
            .and_then(|a| a.decorator::<LinkDecorator>())
            .and_then(LinkDecorator::target);
        assert_eq!(link_target, Some(copied_children[1]));
    }

    #[test]
    fn preserve_rejects_ids_already_in_tree() {
        let mut tree = ArtifactTree::new();
        let ws = sample(&mut tree);
        let document = tree.capture(ws.root).unwrap();
        let before = tree.len();

        assert!(matches!(
            tree.restore(&document, &registry(), IdPolicy::Preserve),
            Err(DomainError::DuplicateId { .. })
        ));
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn composite_children_state_is_restored() {
        let mut tree = ArtifactTree::new();
        let id = tree.insert(model::entity("Customer")).unwrap();
        tree.add_decorator(id, Box::new(decorators::control()))
            .unwrap();
        {
            let control = tree
                .get_mut(id)
                .and_then(|a| a.decorator_mut::<crate::domain::CompositeDecorator>())
                .unwrap();
            control
                .child_mut::<decorators::VisibilityCapability>()
                .unwrap()
                .set_visible(false);
        }
        let document = tree.capture(id).unwrap();

        let mut other = ArtifactTree::new();
        let restored = other
            .restore(&document, &registry(), IdPolicy::Preserve)
            .unwrap();
        let visible = other
            .get(restored)
            .and_then(|a| a.decorator::<crate::domain::CompositeDecorator>())
            .and_then(|c| c.child::<decorators::VisibilityCapability>())
            .map(decorators::VisibilityCapability::is_visible);
        assert_eq!(visible, Some(false));
    }
}

// ============================================================================
// domain/tree.rs - ARTIFACT ARENA
// ============================================================================

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::bus::{
    ArtifactConstructed, ChildAdded, ChildRemoved, ContextMenuOpening, MenuItem, MessageBus,
    RenameRequested, WorkspaceScope,
};
use crate::domain::{
    artifact::{Artifact, ArtifactId, NAME_PROPERTY},
    decorator::Decorator,
    error::{DomainError, DomainResult},
    value::Value,
};

/// Arena owning every artifact of one workspace.
///
/// Parent links and children lists are ids into this arena. An id that is
/// no longer in the arena never resolves again: ids are UUIDs and are never
/// reused. Structural mutations are published on the owned workspace bus
/// once they have completed.
#[derive(Debug, Default)]
pub struct ArtifactTree {
    nodes: HashMap<ArtifactId, Artifact>,
    events: MessageBus<WorkspaceScope>,
}

impl ArtifactTree {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get(&self, id: ArtifactId) -> Option<&Artifact> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: ArtifactId) -> Option<&mut Artifact> {
        self.nodes.get_mut(&id)
    }

    pub fn require(&self, id: ArtifactId) -> DomainResult<&Artifact> {
        self.nodes.get(&id).ok_or(DomainError::ArtifactNotFound { id })
    }

    pub fn require_mut(&mut self, id: ArtifactId) -> DomainResult<&mut Artifact> {
        self.nodes
            .get_mut(&id)
            .ok_or(DomainError::ArtifactNotFound { id })
    }

    pub fn contains(&self, id: ArtifactId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ArtifactId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn parent(&self, id: ArtifactId) -> Option<ArtifactId> {
        self.nodes.get(&id).and_then(Artifact::parent)
    }

    pub fn children(&self, id: ArtifactId) -> &[ArtifactId] {
        self.nodes.get(&id).map(Artifact::children).unwrap_or_default()
    }

    /// First direct child of `parent` with the given display name.
    pub fn find_child_by_name(&self, parent: ArtifactId, name: &str) -> Option<ArtifactId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.nodes.get(c).is_some_and(|a| a.name() == name))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ArtifactId) -> Vec<ArtifactId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// `true` when `ancestor` is `id` itself or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: ArtifactId, id: ArtifactId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `root` and everything below it, pre-order.
    pub fn descendants(&self, root: ArtifactId) -> Vec<ArtifactId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children().iter().rev().copied());
        }
        out
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Take ownership of a detached artifact.
    pub fn insert(&mut self, artifact: Artifact) -> DomainResult<ArtifactId> {
        let id = artifact.id();
        if self.nodes.contains_key(&id) {
            return Err(DomainError::DuplicateId { id });
        }
        if artifact.parent().is_some() || !artifact.children().is_empty() {
            return Err(DomainError::InvalidStructure {
                reason: format!("artifact {id} must be inserted without links"),
            });
        }
        let kind = artifact.kind().to_string();
        self.nodes.insert(id, artifact);
        trace!(%id, kind = %kind, "Artifact inserted");
        self.events.notify(&mut ArtifactConstructed { artifact: id, kind });
        Ok(id)
    }

    /// Append `child` to `parent`'s children.
    pub fn add_child(&mut self, parent: ArtifactId, child: ArtifactId) -> DomainResult<()> {
        let index = self.require(parent)?.children().len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` at `index` (clamped) under `parent`.
    ///
    /// Fails without touching the tree when the child is already parented
    /// or when the link would make an artifact its own ancestor.
    pub fn insert_child(
        &mut self,
        parent: ArtifactId,
        index: usize,
        child: ArtifactId,
    ) -> DomainResult<()> {
        self.require(parent)?;
        let child_node = self.require(child)?;

        if self.is_ancestor(child, parent) {
            return Err(DomainError::CyclicParenting { parent, child });
        }
        if let Some(current_parent) = child_node.parent() {
            return Err(DomainError::AlreadyParented {
                child,
                current_parent,
            });
        }

        let parent_node = self.require_mut(parent)?;
        let index = index.min(parent_node.children.len());
        parent_node.children.insert(index, child);
        self.require_mut(child)?.parent = Some(parent);

        debug!(%parent, %child, index, "Child added");
        self.events.notify(&mut ChildAdded {
            parent,
            child,
            index,
        });
        Ok(())
    }

    /// Unlink `child` from `parent`, returning its former index.
    ///
    /// The child subtree stays in the arena with its decorators attached and
    /// can be linked again.
    pub fn remove_child(&mut self, parent: ArtifactId, child: ArtifactId) -> DomainResult<usize> {
        let parent_node = self.require_mut(parent)?;
        let index = parent_node
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(DomainError::NotAChild { parent, child })?;
        parent_node.children.remove(index);
        self.require_mut(child)?.parent = None;

        debug!(%parent, %child, index, "Child removed");
        self.events.notify(&mut ChildRemoved {
            parent,
            child,
            index,
        });
        Ok(index)
    }

    /// Unlink `id` from whatever parent holds it.
    pub fn detach(&mut self, id: ArtifactId) -> DomainResult<Option<(ArtifactId, usize)>> {
        match self.require(id)?.parent() {
            Some(parent) => Ok(Some((parent, self.remove_child(parent, id)?))),
            None => Ok(None),
        }
    }

    /// Remove a detached subtree from the arena and hand it back.
    ///
    /// Links inside the subtree are kept so the nodes can be adopted by
    /// another tree.
    pub fn take_subtree(&mut self, root: ArtifactId) -> DomainResult<Vec<Artifact>> {
        if let Some(parent) = self.require(root)?.parent() {
            return Err(DomainError::InvalidStructure {
                reason: format!("{root} is still a child of {parent}"),
            });
        }
        let ids = self.descendants(root);
        Ok(ids
            .into_iter()
            .filter_map(|id| self.nodes.remove(&id))
            .collect())
    }

    /// Free a detached subtree. References to it stop resolving.
    pub fn discard(&mut self, root: ArtifactId) -> DomainResult<usize> {
        let mut removed = self.take_subtree(root)?;
        for artifact in removed.iter_mut() {
            for key in artifact.decorator_keys() {
                artifact.remove_decorator(&key);
            }
        }
        debug!(%root, count = removed.len(), "Subtree discarded");
        Ok(removed.len())
    }

    /// Insert nodes previously taken from another tree, links included.
    ///
    /// All ids are checked before anything is inserted.
    pub fn adopt(&mut self, artifacts: Vec<Artifact>) -> DomainResult<()> {
        if let Some(dup) = artifacts.iter().find(|a| self.nodes.contains_key(&a.id())) {
            return Err(DomainError::DuplicateId { id: dup.id() });
        }
        for artifact in artifacts {
            let id = artifact.id();
            let kind = artifact.kind().to_string();
            self.nodes.insert(id, artifact);
            self.events.notify(&mut ArtifactConstructed { artifact: id, kind });
        }
        Ok(())
    }

    /// Move the detached subtree `root` out of `staging` and link it under
    /// `parent`. Either everything moves or nothing does.
    pub fn graft(
        &mut self,
        staging: &mut ArtifactTree,
        root: ArtifactId,
        parent: ArtifactId,
    ) -> DomainResult<()> {
        self.require(parent)?;
        if let Some(id) = staging
            .descendants(root)
            .into_iter()
            .find(|id| self.contains(*id))
        {
            return Err(DomainError::DuplicateId { id });
        }

        let nodes = staging.take_subtree(root)?;
        let ids: Vec<ArtifactId> = nodes.iter().map(Artifact::id).collect();
        self.adopt(nodes)?;

        if let Err(err) = self.add_child(parent, root) {
            let back: Vec<Artifact> = ids.iter().filter_map(|id| self.nodes.remove(id)).collect();
            staging.adopt(back)?;
            return Err(err);
        }
        Ok(())
    }

    // ========================================================================
    // Properties and decorators
    // ========================================================================

    pub fn set_value(
        &mut self,
        id: ArtifactId,
        name: &str,
        value: impl Into<Value>,
    ) -> DomainResult<bool> {
        if name.starts_with(crate::domain::property_bag::RESERVED_PREFIX) {
            return Err(DomainError::ReservedProperty {
                name: name.to_string(),
            });
        }
        Ok(self.require_mut(id)?.set_value(name, value))
    }

    /// Rename after giving workspace subscribers a chance to veto or rewrite
    /// the new name. Returns `true` when the name changed.
    pub fn rename(&mut self, id: ArtifactId, new_name: &str) -> DomainResult<bool> {
        let old_name = self.require(id)?.name();
        let mut request = RenameRequested {
            artifact: id,
            old_name,
            new_name: new_name.to_string(),
            cancel: false,
        };
        self.events.notify(&mut request);
        if request.cancel {
            debug!(%id, "Rename vetoed");
            return Ok(false);
        }
        Ok(self
            .require_mut(id)?
            .set_value(NAME_PROPERTY, request.new_name))
    }

    /// Gather context-menu entries contributed by workspace subscribers.
    pub fn open_context_menu(&mut self, id: ArtifactId) -> DomainResult<Vec<MenuItem>> {
        let kind = self.require(id)?.kind().to_string();
        let mut event = ContextMenuOpening {
            artifact: id,
            kind,
            items: Vec::new(),
        };
        self.events.notify(&mut event);
        Ok(event.items)
    }

    pub fn add_decorator(
        &mut self,
        id: ArtifactId,
        decorator: Box<dyn Decorator>,
    ) -> DomainResult<()> {
        self.require_mut(id)?.add_decorator(decorator)
    }

    pub fn remove_decorator(
        &mut self,
        id: ArtifactId,
        key: &str,
    ) -> DomainResult<Option<Box<dyn Decorator>>> {
        Ok(self.require_mut(id)?.remove_decorator(key))
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn events(&self) -> &MessageBus<WorkspaceScope> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut MessageBus<WorkspaceScope> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn tree_with(names: &[&str]) -> (ArtifactTree, Vec<ArtifactId>) {
        let mut tree = ArtifactTree::new();
        let ids = names
            .iter()
            .map(|n| tree.insert(Artifact::new("node", *n)).unwrap())
            .collect();
        (tree, ids)
    }

    #[test]
    fn add_and_remove_child_keep_links_consistent() {
        let (mut tree, ids) = tree_with(&["parent", "child"]);
        let (parent, child) = (ids[0], ids[1]);

        tree.add_child(parent, child).unwrap();
        assert_eq!(tree.parent(child), Some(parent));
        assert!(tree.children(parent).contains(&child));

        assert_eq!(tree.remove_child(parent, child).unwrap(), 0);
        assert_eq!(tree.parent(child), None);
        assert!(!tree.children(parent).contains(&child));
        assert!(tree.contains(child));
    }

    #[test]
    fn cycle_is_rejected_without_mutation() {
        let (mut tree, ids) = tree_with(&["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        tree.add_child(a, b).unwrap();
        tree.add_child(b, c).unwrap();

        let err = tree.add_child(c, a).unwrap_err();
        assert_eq!(err, DomainError::CyclicParenting { parent: c, child: a });
        assert!(err.is_structural());

        assert_eq!(tree.parent(a), None);
        assert!(tree.children(c).is_empty());
        assert_eq!(tree.children(a), &[b]);

        assert!(matches!(
            tree.add_child(a, a),
            Err(DomainError::CyclicParenting { .. })
        ));
    }

    #[test]
    fn already_parented_child_must_be_removed_first() {
        let (mut tree, ids) = tree_with(&["a", "b", "c"]);
        tree.add_child(ids[0], ids[2]).unwrap();
        assert_eq!(
            tree.add_child(ids[1], ids[2]),
            Err(DomainError::AlreadyParented {
                child: ids[2],
                current_parent: ids[0]
            })
        );
        assert!(tree.children(ids[1]).is_empty());
    }

    #[test]
    fn insert_child_restores_position() {
        let (mut tree, ids) = tree_with(&["p", "x", "y", "z"]);
        for child in &ids[1..] {
            tree.add_child(ids[0], *child).unwrap();
        }
        let index = tree.remove_child(ids[0], ids[2]).unwrap();
        tree.insert_child(ids[0], index, ids[2]).unwrap();
        assert_eq!(tree.children(ids[0]), &ids[1..]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut tree = ArtifactTree::new();
        let id = ArtifactId::new();
        tree.insert(Artifact::with_id(id, "node")).unwrap();
        assert_eq!(
            tree.insert(Artifact::with_id(id, "node")),
            Err(DomainError::DuplicateId { id })
        );
    }

    #[test]
    fn discard_requires_detached_subtree_and_frees_it() {
        let (mut tree, ids) = tree_with(&["root", "mid", "leaf"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();

        assert!(tree.discard(ids[1]).is_err());
        tree.remove_child(ids[0], ids[1]).unwrap();
        assert_eq!(tree.discard(ids[1]).unwrap(), 2);
        assert!(tree.get(ids[1]).is_none());
        assert!(tree.get(ids[2]).is_none());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn structural_events_follow_mutations() {
        let (mut tree, ids) = tree_with(&["p", "c"]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let added = log.clone();
        let removed = log.clone();
        tree.events_mut().subscribe::<ChildAdded, _>(move |e, _| {
            added.lock().unwrap().push(format!("added@{}", e.index));
        });
        tree.events_mut().subscribe::<ChildRemoved, _>(move |e, _| {
            removed.lock().unwrap().push(format!("removed@{}", e.index));
        });

        tree.add_child(ids[0], ids[1]).unwrap();
        tree.remove_child(ids[0], ids[1]).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["added@0", "removed@0"]);
    }

    #[test]
    fn rename_can_be_vetoed_or_rewritten() {
        let (mut tree, ids) = tree_with(&["Orders"]);
        let token = tree
            .events_mut()
            .subscribe::<RenameRequested, _>(|e, _| e.cancel = e.new_name.is_empty());
        assert!(!tree.rename(ids[0], "").unwrap());
        assert_eq!(tree.get(ids[0]).unwrap().name(), "Orders");
        tree.events_mut().unsubscribe(token);

        tree.events_mut()
            .subscribe::<RenameRequested, _>(|e, _| e.new_name = e.new_name.trim().to_string());
        assert!(tree.rename(ids[0], "  Sales ").unwrap());
        assert_eq!(tree.get(ids[0]).unwrap().name(), "Sales");
    }

    #[test]
    fn context_menu_gathers_contributions() {
        let (mut tree, ids) = tree_with(&["Orders"]);
        tree.events_mut()
            .subscribe::<ContextMenuOpening, _>(|e, _| e.items.push(MenuItem::new("Rename", "rename")));
        tree.events_mut().subscribe_filtered::<ContextMenuOpening, _, _>(
            |e| e.kind == "entity",
            |e, _| e.items.push(MenuItem::new("Add field", "add-field")),
        );

        let items = tree.open_context_menu(ids[0]).unwrap();
        assert_eq!(items, vec![MenuItem::new("Rename", "rename")]);
    }

    #[test]
    fn graft_moves_subtree_between_trees() {
        let mut target = ArtifactTree::new();
        let host = target.insert(Artifact::new("output-collection", "outputs")).unwrap();

        let mut staging = ArtifactTree::new();
        let root = staging.insert(Artifact::new("output", "gen")).unwrap();
        let file = staging.insert(Artifact::new("generated-file", "a.rs")).unwrap();
        staging.add_child(root, file).unwrap();

        target.graft(&mut staging, root, host).unwrap();
        assert!(staging.is_empty());
        assert_eq!(target.children(host), &[root]);
        assert_eq!(target.children(root), &[file]);
    }

    #[test]
    fn failed_graft_leaves_both_trees_untouched() {
        let mut target = ArtifactTree::new();
        let host = target.insert(Artifact::new("output-collection", "outputs")).unwrap();

        let mut staging = ArtifactTree::new();
        let root = staging.insert(Artifact::with_id(host, "output")).unwrap();

        assert!(matches!(
            target.graft(&mut staging, root, host),
            Err(DomainError::DuplicateId { .. })
        ));
        assert_eq!(target.len(), 1);
        assert!(staging.contains(root));
    }

    #[test]
    fn ancestors_and_descendants() {
        let (mut tree, ids) = tree_with(&["a", "b", "c", "d"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        tree.add_child(ids[0], ids[3]).unwrap();

        assert_eq!(tree.ancestors(ids[2]), vec![ids[1], ids[0]]);
        assert_eq!(tree.descendants(ids[0]), vec![ids[0], ids[1], ids[2], ids[3]]);
        assert!(tree.is_ancestor(ids[0], ids[2]));
        assert!(!tree.is_ancestor(ids[3], ids[2]));
    }
}

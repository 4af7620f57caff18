//! Workspace subscriber logging structural changes and guarding names.

use tracing::{debug, info};

use loom_core::{
    application::{
        plugins::{PluginManifest, capabilities},
        ports::WorkspaceSubscriber,
    },
    bus::{
        ChildAdded, ChildRemoved, ContextMenuOpening, MenuItem, MessageBus, RenameRequested,
        SubscriptionToken, WorkspaceScope,
    },
    domain::kinds,
};

pub const ID: &str = "loom.structural-audit";

/// Characters that cannot appear in artifact names because generated paths
/// are derived from them.
const FORBIDDEN: [char; 3] = ['/', '\\', ':'];

#[derive(Debug, Clone)]
pub struct StructuralAuditSubscriber {
    manifest: PluginManifest,
}

impl StructuralAuditSubscriber {
    pub fn new() -> Self {
        Self {
            manifest: PluginManifest::new(ID, loom_core::VERSION)
                .with_capability(capabilities::WORKSPACE_SUBSCRIBER),
        }
    }
}

impl Default for StructuralAuditSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceSubscriber for StructuralAuditSubscriber {
    fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    fn subscribe(&self, bus: &mut MessageBus<WorkspaceScope>) -> Vec<SubscriptionToken> {
        vec![
            bus.subscribe::<ChildAdded, _>(|event, _| {
                debug!(parent = %event.parent, child = %event.child, index = event.index, "Child added");
            }),
            bus.subscribe::<ChildRemoved, _>(|event, _| {
                debug!(parent = %event.parent, child = %event.child, index = event.index, "Child removed");
            }),
            bus.subscribe::<RenameRequested, _>(|event, _| {
                let trimmed = event.new_name.trim();
                if trimmed.is_empty() || trimmed.contains(FORBIDDEN) {
                    info!(artifact = %event.artifact, name = %event.new_name, "Rename refused");
                    event.cancel = true;
                } else if trimmed.len() != event.new_name.len() {
                    event.new_name = trimmed.to_string();
                }
            }),
            bus.subscribe_filtered::<ContextMenuOpening, _, _>(
                |event| event.kind == kinds::SCOPE,
                |event, _| {
                    event.items.push(MenuItem::new("Add entity", "entity add"));
                    event.items.push(MenuItem::new("Rename scope", "scope rename"));
                    event.items.push(MenuItem::new("Remove scope", "scope remove"));
                },
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::domain::{ArtifactTree, WorkspaceModel, model};

    fn audited() -> (ArtifactTree, WorkspaceModel) {
        let mut tree = ArtifactTree::new();
        let ws = WorkspaceModel::create(&mut tree, "Shop").unwrap();
        StructuralAuditSubscriber::new().subscribe(tree.events_mut());
        (tree, ws)
    }

    #[test]
    fn refuses_path_like_names_and_trims_others() {
        let (mut tree, ws) = audited();
        let sales = tree.insert(model::scope("Sales")).unwrap();
        tree.add_child(ws.scopes, sales).unwrap();

        assert!(!tree.rename(sales, "Sales/Old").unwrap());
        assert!(!tree.rename(sales, "   ").unwrap());
        assert!(tree.rename(sales, "  Revenue ").unwrap());
        assert_eq!(tree.get(sales).unwrap().name(), "Revenue");
    }

    #[test]
    fn scopes_get_menu_entries() {
        let (mut tree, ws) = audited();
        let sales = tree.insert(model::scope("Sales")).unwrap();
        tree.add_child(ws.scopes, sales).unwrap();

        let items = tree.open_context_menu(sales).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].command, "entity add");
        assert!(tree.open_context_menu(ws.root).unwrap().is_empty());
    }
}

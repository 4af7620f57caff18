//! `loom show`: print a workspace as a tree or as its JSON document.

use loom_core::{
    application::services::generation_service::PATH_PROPERTY,
    prelude::{ArtifactId, ArtifactTree, kinds},
};

use crate::{
    cli::{ShowArgs, ShowFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
    workspace::{Workspace, plugins},
};

pub fn execute(args: ShowArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let plugins = plugins()?;
    let workspace = Workspace::open(&args.file, &config, &plugins)?;
    let session = &workspace.session;

    match args.format {
        ShowFormat::Json => output.json(&session.document()?)?,
        ShowFormat::Tree => {
            for line in render_tree(session.tree(), session.root()) {
                output.data(&line)?;
            }
        }
    }
    Ok(())
}

/// One line per artifact: `kind name [decorators]`, indented by depth.
pub fn render_tree(tree: &ArtifactTree, root: ArtifactId) -> Vec<String> {
    let mut lines = Vec::new();
    walk(tree, root, 0, &mut lines);
    lines
}

fn walk(tree: &ArtifactTree, id: ArtifactId, depth: usize, lines: &mut Vec<String>) {
    let Some(artifact) = tree.get(id) else {
        return;
    };
    let mut line = format!("{}{} {}", "  ".repeat(depth), artifact.kind(), artifact.name());
    let decorators = artifact.decorator_keys();
    if !decorators.is_empty() {
        line.push_str(&format!(" [{}]", decorators.join(", ")));
    }
    if artifact.kind() == kinds::GENERATED_FILE {
        let path: String = artifact.get_value(PATH_PROPERTY, String::new());
        if !path.is_empty() {
            line.push_str(&format!(" -> {path}"));
        }
    }
    lines.push(line);
    for &child in tree.children(id) {
        walk(tree, child, depth + 1, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_core::prelude::{HistoryConfig, TypeRegistry, WorkspaceSession};
    use std::sync::Arc;

    #[test]
    fn tree_is_indented_by_depth() {
        let registry = Arc::new(TypeRegistry::with_builtins().unwrap());
        let mut session =
            WorkspaceSession::create("Shop", registry, HistoryConfig::default()).unwrap();
        let sales = session.add_scope("Sales").unwrap();
        session.add_entity(sales, "Order", Some("orders")).unwrap();

        let lines = render_tree(session.tree(), session.root());
        assert_eq!(lines[0], "workspace Shop");
        assert!(lines.contains(&"    scope Sales".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("      entity Order") && l.contains("table")));
    }
}

//! zellij layout documents.
//!
//! Each window (or the single grid) becomes a [`PaneTree`], which is then
//! rendered as a KDL `layout { .. }` block with the stock tab-bar and
//! status-bar template around every tab.

use kdl::{KdlDocument, KdlEntry, KdlNode};
use muxkit_core::{
    Environment, LayoutConfig, LayoutMode, PaneDef, Result, SplitAlgorithm, SplitDirection,
    WindowDef,
};
use tracing::debug;

use crate::tree::{Leaf, PaneNode, PaneTree};

const FALLBACK_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub name: String,
    pub tree: PaneTree,
}

/// `(program, args)` running `cmd` through the user's login shell so zellij
/// never word-splits it itself. Blank commands run nothing.
pub fn shell_command(cmd: &str, env: &Environment) -> (String, Vec<String>) {
    let cmd = cmd.trim();
    if cmd.is_empty() {
        return (String::new(), Vec::new());
    }
    let shell = env.get("SHELL").unwrap_or_else(|| FALLBACK_SHELL.to_string());
    (shell, vec!["-lc".to_string(), cmd.to_string()])
}

fn pane_node(title: &str, cmd: &str, cwd: &str, env: &Environment) -> PaneNode {
    let (command, args) = shell_command(cmd, env);
    PaneNode {
        name: title.trim().to_string(),
        command,
        args,
        cwd: cwd.to_string(),
        ..PaneNode::default()
    }
}

/// Tree for one explicit window: a named algorithm when set, otherwise
/// sequential splits in each pane's declared direction.
pub fn window_tree(window: &WindowDef, project_path: &str, env: &Environment) -> PaneTree {
    let node = |p: &PaneDef| pane_node(&p.title, &p.cmd, project_path, env);
    match window.algorithm() {
        Some(algorithm) => {
            let leaves = window.panes.iter().map(node).collect();
            apply_algorithm(algorithm, leaves)
        }
        None => PaneTree::sequential(
            window
                .panes
                .iter()
                .map(|p| Leaf {
                    node: node(p),
                    split: p.direction(),
                    size: p.size_percent(),
                })
                .collect(),
        ),
    }
}

pub fn apply_algorithm(algorithm: SplitAlgorithm, leaves: Vec<PaneNode>) -> PaneTree {
    match algorithm {
        SplitAlgorithm::EvenHorizontal => PaneTree::even(leaves, SplitDirection::Horizontal),
        SplitAlgorithm::EvenVertical => PaneTree::even(leaves, SplitDirection::Vertical),
        SplitAlgorithm::MainHorizontal => PaneTree::main(leaves, SplitDirection::Vertical),
        SplitAlgorithm::MainVertical => PaneTree::main(leaves, SplitDirection::Horizontal),
        SplitAlgorithm::Tiled => PaneTree::tiled(leaves),
    }
}

/// Tabs for `config`: one grid tab, or one tab per window.
pub fn compile(config: &LayoutConfig, project_path: &str, env: &Environment) -> Result<Vec<Tab>> {
    let tabs = match config.mode()? {
        LayoutMode::Grid(grid) => {
            let count = grid.pane_count();
            let leaves = config
                .grid_commands(count)
                .iter()
                .zip(config.grid_titles(count))
                .map(|(cmd, title)| pane_node(&title, cmd, project_path, env))
                .collect();
            vec![Tab {
                name: config.grid_window_name(),
                tree: PaneTree::grid(grid.rows as usize, grid.columns as usize, leaves),
            }]
        }
        LayoutMode::Windows(windows) => windows
            .iter()
            .map(|w| Tab {
                name: w.name.trim().to_string(),
                tree: window_tree(w, project_path, env),
            })
            .collect(),
    };
    debug!(layout = %config.name, tabs = tabs.len(), "compiled zellij layout");
    Ok(tabs)
}

/// Render `config` as a zellij layout document.
pub fn build_layout(config: &LayoutConfig, project_path: &str, env: &Environment) -> Result<String> {
    Ok(render(&compile(config, project_path, env)?))
}

pub fn render(tabs: &[Tab]) -> String {
    let mut layout = KdlNode::new("layout");
    let body = layout.ensure_children();
    body.nodes_mut().push(default_tab_template());
    for tab in tabs {
        body.nodes_mut().push(tab_node(tab));
    }
    let mut doc = KdlDocument::new();
    doc.nodes_mut().push(layout);
    doc.fmt();
    doc.to_string()
}

fn prop(node: &mut KdlNode, key: &str, value: impl Into<kdl::KdlValue>) {
    node.entries_mut().push(KdlEntry::new_prop(key, value));
}

fn bar(size: i64, location: &str) -> KdlNode {
    let mut pane = KdlNode::new("pane");
    prop(&mut pane, "size", size);
    prop(&mut pane, "borderless", true);
    let mut plugin = KdlNode::new("plugin");
    prop(&mut plugin, "location", location);
    pane.ensure_children().nodes_mut().push(plugin);
    pane
}

fn default_tab_template() -> KdlNode {
    let mut template = KdlNode::new("default_tab_template");
    let body = template.ensure_children();
    body.nodes_mut().push(bar(1, "zellij:tab-bar"));
    body.nodes_mut().push(KdlNode::new("children"));
    body.nodes_mut().push(bar(2, "zellij:status-bar"));
    template
}

fn tab_node(tab: &Tab) -> KdlNode {
    let mut node = KdlNode::new("tab");
    if !tab.name.is_empty() {
        prop(&mut node, "name", tab.name.as_str());
    }
    let root = tab.tree.root();
    let root_node = tab.tree.node(root);
    let panes: Vec<KdlNode> = match root_node.split {
        Some(split) => {
            prop(&mut node, "split_direction", split.as_str());
            root_node
                .children
                .iter()
                .map(|&c| pane(&tab.tree, c))
                .collect()
        }
        None => vec![pane(&tab.tree, root)],
    };
    node.ensure_children().nodes_mut().extend(panes);
    node
}

fn pane(tree: &PaneTree, id: usize) -> KdlNode {
    let src = tree.node(id);
    let mut node = KdlNode::new("pane");
    if let Some(size) = src.size {
        prop(&mut node, "size", format!("{size}%"));
    }
    if let Some(split) = src.split {
        prop(&mut node, "split_direction", split.as_str());
    }
    for (key, value) in [("name", &src.name), ("command", &src.command), ("cwd", &src.cwd)] {
        if !value.trim().is_empty() {
            prop(&mut node, key, value.as_str());
        }
    }
    if !src.args.is_empty() {
        let mut args = KdlNode::new("args");
        for arg in &src.args {
            args.entries_mut().push(KdlEntry::new(arg.as_str()));
        }
        node.ensure_children().nodes_mut().push(args);
    }
    if !src.children.is_empty() {
        let children: Vec<KdlNode> = src.children.iter().map(|&c| pane(tree, c)).collect();
        node.ensure_children().nodes_mut().extend(children);
    }
    node
}

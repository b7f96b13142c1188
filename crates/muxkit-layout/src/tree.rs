//! Pane trees for document-based backends.
//!
//! Nodes live in an arena and refer to children by index. Sequential
//! splitting rewrites the active pane's slot in place, so parents never
//! need to be searched for.
//!
//! Every split node has at least two children whose sizes add up to 100.

use muxkit_core::SplitDirection;

pub type NodeId = usize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaneNode {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
    /// Percent of the parent along the parent's split direction.
    pub size: Option<u32>,
    /// Set on split nodes only.
    pub split: Option<SplitDirection>,
    pub children: Vec<NodeId>,
}

impl PaneNode {
    pub fn is_split(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A leaf pane plus how it attaches to the previous one in sequential mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaf {
    pub node: PaneNode,
    pub split: SplitDirection,
    pub size: Option<u32>,
}

/// Percentages for `count` even siblings. The remainder goes one point each
/// to the first children so the total is exactly 100.
pub fn even_sizes(count: usize) -> Vec<u32> {
    if count == 0 {
        return Vec::new();
    }
    let n = count as u32;
    let base = 100 / n;
    let remainder = (100 - base * n) as usize;
    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Columns and rows of a near-square grid holding `count` panes.
pub fn tiled_shape(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let mut cols = 1;
    while cols * cols < count {
        cols += 1;
    }
    (cols, count.div_ceil(cols))
}

const MAIN_PANE_PERCENT: u32 = 60;
const DEFAULT_SPLIT_PERCENT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneTree {
    nodes: Vec<PaneNode>,
    root: NodeId,
}

impl Default for PaneTree {
    fn default() -> Self {
        Self::single(PaneNode::default())
    }
}

impl PaneTree {
    pub fn single(node: PaneNode) -> Self {
        Self {
            nodes: vec![node],
            root: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PaneNode {
        &self.nodes[id]
    }

    pub fn root_node(&self) -> &PaneNode {
        &self.nodes[self.root]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &PaneNode> + '_ {
        self.nodes[id].children.iter().map(|&c| &self.nodes[c])
    }

    /// Leaves in document order.
    pub fn leaves(&self) -> Vec<&PaneNode> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_split() {
                stack.extend(node.children.iter().rev().copied());
            } else {
                out.push(node);
            }
        }
        out
    }

    /// Every split node has two or more children summing to 100 percent.
    pub fn sizes_balanced(&self) -> bool {
        self.nodes.iter().filter(|n| n.is_split()).all(|n| {
            n.children.len() >= 2
                && n.children
                    .iter()
                    .map(|&c| self.nodes[c].size.unwrap_or(0))
                    .sum::<u32>()
                    == 100
        })
    }

    fn push(&mut self, node: PaneNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn split_node(&mut self, split: SplitDirection, children: Vec<NodeId>) -> NodeId {
        self.push(PaneNode {
            split: Some(split),
            children,
            ..PaneNode::default()
        })
    }

    fn with_leaves(leaves: Vec<PaneNode>) -> (Self, Vec<NodeId>) {
        let ids = (0..leaves.len()).collect();
        (
            Self {
                nodes: leaves,
                root: 0,
            },
            ids,
        )
    }

    // ─── Builders ────────────────────────────────────────────────

    /// Each pane splits off the previously added one in its own direction.
    /// The new pane takes its declared size (default 50) and the pane it
    /// split from keeps the rest.
    pub fn sequential(leaves: Vec<Leaf>) -> Self {
        let mut iter = leaves.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let mut tree = Self::single(first.node);
        let mut active = tree.root;
        for leaf in iter {
            let percent = leaf
                .size
                .filter(|p| (1..100).contains(p))
                .unwrap_or(DEFAULT_SPLIT_PERCENT);
            let added = tree.push(PaneNode {
                size: Some(percent),
                ..leaf.node
            });
            // Move the active pane out of its slot and put the new split
            // node there; the parent's child index stays valid.
            let mut moved = std::mem::take(&mut tree.nodes[active]);
            let slot_size = moved.size.take();
            moved.size = Some(100 - percent);
            let moved = tree.push(moved);
            tree.nodes[active] = PaneNode {
                size: slot_size,
                split: Some(leaf.split),
                children: vec![moved, added],
                ..PaneNode::default()
            };
            active = added;
        }
        tree
    }

    /// All panes side by side in `split`, evenly sized.
    pub fn even(leaves: Vec<PaneNode>, split: SplitDirection) -> Self {
        if leaves.len() <= 1 {
            return leaves.into_iter().next().map(Self::single).unwrap_or_default();
        }
        let (mut tree, ids) = Self::with_leaves(leaves);
        tree.root = tree.even_in(ids, split);
        tree
    }

    fn even_in(&mut self, ids: Vec<NodeId>, split: SplitDirection) -> NodeId {
        if ids.len() == 1 {
            return ids[0];
        }
        for (&id, size) in ids.iter().zip(even_sizes(ids.len())) {
            self.nodes[id].size = Some(size);
        }
        self.split_node(split, ids)
    }

    /// First pane takes 60% along `split`; the rest share the remaining 40%
    /// evenly in the opposite direction.
    pub fn main(leaves: Vec<PaneNode>, split: SplitDirection) -> Self {
        if leaves.len() <= 1 {
            return leaves.into_iter().next().map(Self::single).unwrap_or_default();
        }
        let (mut tree, ids) = Self::with_leaves(leaves);
        let main = ids[0];
        tree.nodes[main].size = Some(MAIN_PANE_PERCENT);
        let stack = tree.even_in(ids[1..].to_vec(), split.opposite());
        tree.nodes[stack].size = Some(100 - MAIN_PANE_PERCENT);
        tree.root = tree.split_node(split, vec![main, stack]);
        tree
    }

    /// Near-square grid: `ceil(sqrt(n))` columns.
    pub fn tiled(leaves: Vec<PaneNode>) -> Self {
        let (cols, rows) = tiled_shape(leaves.len());
        Self::grid(rows, cols, leaves)
    }

    /// `rows` stacked rows of `cols` panes, filled row-major. Missing cells
    /// become empty placeholder panes. Single-cell rows collapse into their
    /// pane and a single row is the root itself.
    pub fn grid(rows: usize, cols: usize, leaves: Vec<PaneNode>) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        if rows == 1 && cols == 1 {
            return leaves.into_iter().next().map(Self::single).unwrap_or_default();
        }
        let mut cells = leaves;
        cells.resize_with(rows * cols, PaneNode::default);
        let (mut tree, ids) = Self::with_leaves(cells);

        let row_ids: Vec<NodeId> = ids
            .chunks(cols)
            .map(|row| tree.even_in(row.to_vec(), SplitDirection::Horizontal))
            .collect();
        tree.root = tree.even_in(row_ids, SplitDirection::Vertical);
        if rows == 1 {
            tree.nodes[tree.root].size = None;
        }
        tree
    }
}

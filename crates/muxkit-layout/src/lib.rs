//! Layout compiler.
//!
//! One [`LayoutConfig`](muxkit_core::LayoutConfig) compiles two ways:
//! [`tmux::plan`] produces the split commands that build it in tmux, and
//! [`zellij::build_layout`] renders a KDL layout document from a pane tree.

pub mod tmux;
pub mod tree;
pub mod zellij;

pub use tmux::{PaneRef, Step, TmuxPlan};
pub use tree::{Leaf, NodeId, PaneNode, PaneTree, even_sizes, tiled_shape};
pub use zellij::{Tab, build_layout, shell_command};

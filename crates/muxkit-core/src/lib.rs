//! Shared model and capability contract for muxkit.
//!
//! Backends (`muxkit-tmux`, `muxkit-zellij`) implement [`MuxClient`] on top
//! of the [`CommandRunner`] process layer; the layout compiler consumes
//! [`LayoutConfig`] and [`GridSpec`].

pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod grid;
pub mod layout;
pub mod mux_type;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{MuxClient, require_session};
pub use env::Environment;
pub use error::{MuxError, Result};
pub use exec::{CommandOutput, CommandRunner, ProcessRunner, argv};
pub use grid::GridSpec;
pub use layout::{
    LayoutConfig, LayoutMode, PaneDef, SplitAlgorithm, SplitDirection, WindowDef, expand_vars,
    parse_percent,
};
pub use mux_type::{MuxType, parse_type, resolve_type};
pub use types::{AttachCommand, PaneInfo, PopupOptions, SessionInfo, WindowInfo};

pub use tokio_util::sync::CancellationToken;

//! muxkit-zellij: zellij backend.
//!
//! zellij has no query CLI worth parsing, so inspection and most mutations
//! go through a bundled bridge plugin reached with `zellij action pipe`.
//! This crate also installs that plugin and writes a derived zellij config
//! that loads it.

pub mod bridge;
pub mod cache;
pub mod client;
pub mod config;
mod fsutil;
pub mod metadata;
pub mod mux;
pub mod protocol;
pub mod target;

pub use bridge::{BRIDGE_FILE_NAME, BridgeInstall, ensure_bridge_plugin, install_bridge};
pub use cache::SnapshotCache;
pub use client::ZellijClient;
pub use config::{
    augment_config, default_bridge_dir, default_config_path, default_layout_dir,
    ensure_config_with_bridge, normalize_plugin_url,
};
pub use metadata::{load_session_paths, metadata_path, record_session_path};
pub use protocol::{PIPE_NAME, PipeRequest, PipeResponse, SessionSnapshot};
pub use target::{keys_to_text, split_session_pane, split_target};

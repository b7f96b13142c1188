//! Default zellij locations and derived-config augmentation.
//!
//! The user's own config is only ever read. The augmented copy lives under
//! the bridge directory and is handed to zellij with `--config`.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlNode};
use muxkit_core::{Environment, MuxError, Result};
use tracing::{debug, info};

use crate::fsutil::write_atomic;

const LOAD_PLUGINS: &str = "load_plugins";
pub const DERIVED_CONFIG_FILE: &str = "config.kdl";

fn zellij_dir(env: &Environment) -> Result<PathBuf> {
    if let Some(dir) = env.get("ZELLIJ_CONFIG_DIR") {
        return Ok(env.expand_user_path(&dir));
    }
    if cfg!(target_os = "macos") {
        let home = env
            .home_dir()
            .ok_or_else(|| MuxError::config("cannot determine home directory"))?;
        return Ok(home
            .join("Library")
            .join("Application Support")
            .join("com.Zellij-Contributors.zellij"));
    }
    env.config_dir()
        .map(|d| d.join("zellij"))
        .ok_or_else(|| MuxError::config("cannot determine config directory"))
}

/// `ZELLIJ_CONFIG_FILE`, else `config.kdl` in the zellij config directory.
pub fn default_config_path(env: &Environment) -> Result<PathBuf> {
    if let Some(file) = env.get("ZELLIJ_CONFIG_FILE") {
        return Ok(env.expand_user_path(&file));
    }
    Ok(zellij_dir(env)?.join("config.kdl"))
}

pub fn default_layout_dir(env: &Environment) -> Result<PathBuf> {
    Ok(zellij_dir(env)?.join("layouts"))
}

/// Where the bridge plugin, derived config and session metadata live.
pub fn default_bridge_dir(env: &Environment) -> Result<PathBuf> {
    env.config_dir()
        .map(|d| d.join("muxkit").join("zellij"))
        .ok_or_else(|| MuxError::config("cannot determine config directory"))
}

/// Turn a plugin path into a zellij location URL. URLs pass through.
pub fn normalize_plugin_url(path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }
    if ["file:", "http:", "https:"].iter().any(|p| path.starts_with(p)) {
        return path.to_string();
    }
    format!("file:{}", path.replace('\\', "/"))
}

/// Parse `path`. A missing or blank file is an empty document.
pub fn read_config_document(path: &Path) -> Result<KdlDocument> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(KdlDocument::new()),
        Err(e) => return Err(e.into()),
    };
    if raw.trim().is_empty() {
        return Ok(KdlDocument::new());
    }
    raw.parse()
        .map_err(|e| MuxError::config(format!("parse zellij config {}: {e}", path.display())))
}

/// Add `plugin_url` under a top-level `load_plugins` block. Returns false
/// when the entry was already there.
pub fn augment_config(doc: &mut KdlDocument, plugin_url: &str) -> bool {
    if doc.get(LOAD_PLUGINS).is_none() {
        doc.nodes_mut().push(KdlNode::new(LOAD_PLUGINS));
    }
    let Some(load) = doc.get_mut(LOAD_PLUGINS) else {
        return false;
    };
    let children = load.ensure_children();
    if children.nodes().iter().any(|n| n.name().value() == plugin_url) {
        return false;
    }
    children.nodes_mut().push(KdlNode::new(plugin_url));
    true
}

/// Write `<out_dir>/config.kdl`: the base config (default location when
/// `base` is `None`) plus a `load_plugins` entry for `plugin`.
pub fn ensure_config_with_bridge(
    env: &Environment,
    base: Option<&Path>,
    plugin: &Path,
    out_dir: &Path,
) -> Result<PathBuf> {
    let plugin = plugin.to_string_lossy();
    if plugin.trim().is_empty() {
        return Err(MuxError::validation("zellij bridge plugin path is required"));
    }
    let base = match base {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => default_config_path(env)?,
    };
    let out = out_dir.join(DERIVED_CONFIG_FILE);
    if base == out {
        return Err(MuxError::validation(format!(
            "refusing to overwrite {} with its own derived copy",
            base.display()
        )));
    }

    let mut doc = read_config_document(&base)?;
    let url = normalize_plugin_url(&plugin);
    let added = augment_config(&mut doc, &url);
    debug!(base = %base.display(), %url, added, "augmented zellij config");

    write_atomic(&out, doc.to_string().as_bytes())?;
    info!(path = %out.display(), "wrote derived zellij config");
    Ok(out)
}

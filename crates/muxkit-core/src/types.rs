use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Inspection records ───────────────────────────────────────────

/// A multiplexer session. `path` is empty when the backend does not know
/// the session's working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    #[serde(default)]
    pub path: String,
}

/// A window (tmux) or tab (zellij). `index` is backend-native: the numeric
/// window index for tmux, the tab position for zellij.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub index: String,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneInfo {
    /// Backend-native id. tmux uses `%N`; zellij panes are `session:id`.
    pub id: String,
    pub index: String,
    pub active: bool,
    pub title: String,
    pub command: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    pub dead: bool,
    pub dead_status: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<DateTime<Utc>>,
}

impl PaneInfo {
    /// Title if set, else the running command.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.command
        } else {
            &self.title
        }
    }
}

// ─── Popup / attach ───────────────────────────────────────────────

/// Floating window request. Every field is optional; `None` lets the
/// backend pick its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopupOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub start_dir: Option<String>,
}

/// The argv a caller would exec to attach to a session, for front ends that
/// hand off process control themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachCommand {
    pub program: String,
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
}

impl AttachCommand {
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }
}

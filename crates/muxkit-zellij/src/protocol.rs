//! Wire types for the bridge plugin pipe.
//!
//! Requests travel as the single trailing argument of `zellij action pipe`;
//! the plugin answers with one JSON object on stdout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pipe name the bridge plugin listens on.
pub const PIPE_NAME: &str = "muxkit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PipeRequest {
    Snapshot,
    PaneScrollback {
        pane_id: u32,
        lines: usize,
    },
    SendKeys {
        pane_id: u32,
        text: String,
    },
    RenameSession {
        new_name: String,
    },
    RenameTab {
        tab_position: u32,
        new_name: String,
    },
    SwitchSession {
        session: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tab_position: Option<u32>,
    },
}

impl PipeRequest {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::PaneScrollback { .. } => "pane_scrollback",
            Self::SendKeys { .. } => "send_keys",
            Self::RenameSession { .. } => "rename_session",
            Self::RenameTab { .. } => "rename_tab",
            Self::SwitchSession { .. } => "switch_session",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PipeResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub sessions: Vec<SessionSnapshot>,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionSnapshot {
    pub name: String,
    #[serde(default)]
    pub tabs: Vec<TabSnapshot>,
    #[serde(default)]
    pub panes: PaneManifest,
    #[serde(default)]
    pub connected_clients: u32,
    #[serde(default)]
    pub is_current_session: bool,
}

impl SessionSnapshot {
    pub fn active_tab(&self) -> Option<&TabSnapshot> {
        self.tabs.iter().find(|t| t.active)
    }

    /// Panes of the tab at `position`, in plugin order.
    pub fn panes_in_tab(&self, position: u32) -> &[PaneSnapshot] {
        self.panes
            .panes
            .get(&position.to_string())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TabSnapshot {
    pub position: u32,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub selectable_tiled_panes_count: u32,
    #[serde(default)]
    pub selectable_floating_panes_count: u32,
}

/// Panes grouped by tab position. Keys are positions rendered as strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PaneManifest {
    #[serde(default)]
    pub panes: BTreeMap<String, Vec<PaneSnapshot>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaneSnapshot {
    pub id: u32,
    pub is_plugin: bool,
    pub is_focused: bool,
    pub is_floating: bool,
    pub is_suppressed: bool,
    pub is_selectable: bool,
    pub title: String,
    pub exited: bool,
    pub exit_status: Option<i32>,
    pub pane_content_x: u32,
    pub pane_content_y: u32,
    pub pane_content_columns: u32,
    pub pane_content_rows: u32,
    pub terminal_command: Option<String>,
}

impl PaneSnapshot {
    /// A terminal pane a user could focus.
    pub fn is_user_pane(&self) -> bool {
        !self.is_plugin && !self.is_suppressed && self.is_selectable
    }
}

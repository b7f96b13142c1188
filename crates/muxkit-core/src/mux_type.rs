//! Backend identifier and the precedence chain that selects one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MuxError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MuxType {
    #[default]
    Tmux,
    Zellij,
}

impl MuxType {
    pub const ALL: [Self; 2] = [Self::Tmux, Self::Zellij];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tmux => "tmux",
            Self::Zellij => "zellij",
        }
    }
}

impl fmt::Display for MuxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MuxType {
    type Err = MuxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_type(s)
    }
}

/// Strict parse. Case-insensitive; the empty string means tmux.
pub fn parse_type(raw: &str) -> Result<MuxType, MuxError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "tmux" => Ok(MuxType::Tmux),
        "zellij" => Ok(MuxType::Zellij),
        other => Err(MuxError::validation(format!(
            "unknown multiplexer {other:?} (expected tmux or zellij)"
        ))),
    }
}

/// Lenient parse used by resolution: blank or unrecognized means "not set".
fn candidate(raw: Option<&str>) -> Option<MuxType> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match parse_type(raw) {
        Ok(t) => Some(t),
        Err(e) => {
            tracing::warn!("ignoring multiplexer setting: {e}");
            None
        }
    }
}

/// Pick the backend: CLI, then project-local, then project, then global,
/// then tmux. Never fails.
pub fn resolve_type(
    cli: Option<&str>,
    global: Option<&str>,
    project: Option<&str>,
    project_local: Option<&str>,
) -> MuxType {
    [cli, project_local, project, global]
        .into_iter()
        .find_map(candidate)
        .unwrap_or_default()
}

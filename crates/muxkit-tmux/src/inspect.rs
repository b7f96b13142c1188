//! Read-only queries: sessions, windows, panes, clients.

use muxkit_core::{CancellationToken, MuxError, PaneInfo, Result, SessionInfo, WindowInfo};
use tracing::warn;

use crate::executor::{TmuxClient, is_benign_absence};
use crate::pane_info::{PaneFormat, parse_panes};

fn non_empty_lines(out: &str) -> impl Iterator<Item = &str> {
    out.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
}

impl TmuxClient {
    /// Session names. Empty when no server is running.
    pub fn list_session_names(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let out = self.exec(cancel, &["list-sessions", "-F", "#{session_name}"])?;
        if is_benign_absence(&out) {
            return Ok(Vec::new());
        }
        if !out.success() {
            return Err(MuxError::tool("tmux", "list-sessions", &out));
        }
        Ok(non_empty_lines(&out.stdout)
            .map(|l| l.trim().to_string())
            .collect())
    }

    pub fn list_session_paths(&self, cancel: &CancellationToken) -> Result<Vec<SessionInfo>> {
        let out = self.exec(
            cancel,
            &["list-sessions", "-F", "#{session_name}\t#{session_path}"],
        )?;
        if is_benign_absence(&out) {
            return Ok(Vec::new());
        }
        if !out.success() {
            return Err(MuxError::tool("tmux", "list-sessions", &out));
        }
        Ok(non_empty_lines(&out.stdout)
            .map(|line| {
                let (name, path) = line.split_once('\t').unwrap_or((line, ""));
                SessionInfo {
                    name: name.trim().to_string(),
                    path: path.trim().to_string(),
                }
            })
            .filter(|s| !s.name.is_empty())
            .collect())
    }

    /// Session of the client this process runs in, if any.
    pub fn display_current_session(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        let out = self.exec(cancel, &["display-message", "-p", "#S"])?;
        if is_benign_absence(&out) {
            return Ok(None);
        }
        if !out.success() {
            return Err(MuxError::tool("tmux", "display-message", &out));
        }
        let name = out.stdout.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    pub fn has_session(&self, cancel: &CancellationToken, session: &str) -> Result<bool> {
        let out = self.exec(cancel, &["has-session", "-t", session])?;
        match out.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(MuxError::tool("tmux", "has-session", &out)),
        }
    }

    pub fn has_clients(&self, cancel: &CancellationToken, session: &str) -> Result<bool> {
        let session = muxkit_core::require_session(session)?;
        let out = self.exec(cancel, &["list-clients", "-t", session, "-F", "#{client_tty}"])?;
        if out.code == Some(1) {
            return Ok(false);
        }
        if !out.success() {
            return Err(MuxError::tool("tmux", "list-clients", &out));
        }
        Ok(non_empty_lines(&out.stdout).next().is_some())
    }

    pub fn list_window_info(
        &self,
        cancel: &CancellationToken,
        session: &str,
    ) -> Result<Vec<WindowInfo>> {
        let session = muxkit_core::require_session(session)?;
        let out = self.exec(
            cancel,
            &[
                "list-windows",
                "-t",
                session,
                "-F",
                "#{window_index}\t#{window_name}\t#{window_active}",
            ],
        )?;
        if out.code == Some(1) {
            return Ok(Vec::new());
        }
        if !out.success() {
            return Err(MuxError::tool("tmux", "list-windows", &out));
        }
        Ok(non_empty_lines(&out.stdout)
            .filter_map(|line| {
                let parts: Vec<&str> = line.split('\t').collect();
                if parts.len() < 3 {
                    warn!(line, "skipping list-windows row");
                    return None;
                }
                Some(WindowInfo {
                    index: parts[0].trim().to_string(),
                    name: parts[1].trim().to_string(),
                    active: parts[2].trim() == "1",
                })
            })
            .collect())
    }

    /// Panes of a window or pane target, walking [`PaneFormat::LADDER`].
    ///
    /// A tier that exits 1, or succeeds with no parseable rows, hands over to
    /// the next tier. Benign absence ends the walk with an empty list.
    pub fn list_panes(&self, cancel: &CancellationToken, target: &str) -> Result<Vec<PaneInfo>> {
        let target = target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("pane target is required"));
        }
        let last = PaneFormat::LADDER.len() - 1;
        for (tier, format) in PaneFormat::LADDER.into_iter().enumerate() {
            let fmt = format.format_string();
            let out = self.exec(cancel, &["list-panes", "-t", target, "-F", &fmt])?;
            if is_benign_absence(&out) {
                return Ok(Vec::new());
            }
            if !out.success() {
                if out.code != Some(1) {
                    return Err(MuxError::tool("tmux", "list-panes", &out));
                }
                if tier == last {
                    return Ok(Vec::new());
                }
                warn!(?format, output = %out.combined(), "list-panes failed, trying next format");
                continue;
            }
            let panes = parse_panes(format, &out.stdout);
            if !panes.is_empty() || tier == last {
                return Ok(panes);
            }
            warn!(?format, "list-panes yielded no rows, trying next format");
        }
        Ok(Vec::new())
    }
}

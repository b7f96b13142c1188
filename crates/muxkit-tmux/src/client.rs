//! [`MuxClient`] for tmux.

use muxkit_core::{
    AttachCommand, CancellationToken, MuxClient, MuxError, MuxType, PaneInfo, PopupOptions,
    Result, SessionInfo, WindowInfo, require_session,
};
use tracing::debug;

use crate::executor::TmuxClient;
use crate::session::WindowRequest;

/// `display-popup` appeared in tmux 3.2.
const POPUP_MIN_VERSION: (u32, u32) = (3, 2);

/// Parse `tmux -V` output such as `tmux 3.3a` or `tmux next-3.4`.
pub fn parse_version(raw: &str) -> Option<(u32, u32)> {
    let v = raw.trim();
    let v = v.strip_prefix("tmux").unwrap_or(v).trim();
    let v = v.strip_prefix("next-").unwrap_or(v);
    let (major, rest) = v.split_once('.')?;
    let minor: String = rest.chars().take_while(char::is_ascii_digit).collect();
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Join argv into one shell word list, single-quoting anything unsafe.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| {
            let safe = !a.is_empty()
                && a.chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./=:@%+,".contains(c));
            if safe {
                a.clone()
            } else {
                format!("'{}'", a.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl MuxClient for TmuxClient {
    fn mux_type(&self) -> MuxType {
        MuxType::Tmux
    }

    fn binary(&self) -> &str {
        &self.bin
    }

    fn is_inside(&self) -> bool {
        self.inside_tmux()
    }

    fn list_sessions(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        self.list_session_names(cancel)
    }

    fn list_sessions_info(&self, cancel: &CancellationToken) -> Result<Vec<SessionInfo>> {
        self.list_session_paths(cancel)
    }

    fn current_session(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        self.display_current_session(cancel)
    }

    fn list_windows(&self, cancel: &CancellationToken, session: &str) -> Result<Vec<WindowInfo>> {
        self.list_window_info(cancel, session)
    }

    fn list_panes_detailed(&self, cancel: &CancellationToken, target: &str) -> Result<Vec<PaneInfo>> {
        self.list_panes(cancel, target)
    }

    fn capture_pane_lines(
        &self,
        cancel: &CancellationToken,
        target: &str,
        lines: usize,
    ) -> Result<Vec<String>> {
        self.capture_lines(cancel, target, lines)
    }

    fn session_has_clients(&self, cancel: &CancellationToken, session: &str) -> Result<bool> {
        self.has_clients(cancel, session)
    }

    fn rename_session(&self, cancel: &CancellationToken, session: &str, new_name: &str) -> Result<()> {
        self.rename(cancel, session, new_name)
    }

    fn rename_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        window: &str,
        new_name: &str,
    ) -> Result<()> {
        self.rename_window_in(cancel, session, window, new_name)
    }

    fn kill_session(&self, cancel: &CancellationToken, session: &str) -> Result<()> {
        self.kill(cancel, session)
    }

    fn send_keys(&self, cancel: &CancellationToken, target: &str, keys: &[&str]) -> Result<()> {
        self.send(cancel, target, keys)
    }

    fn attach(&self, cancel: &CancellationToken, target: &str, inside: bool) -> Result<()> {
        self.attach_or_switch(cancel, target, inside)
    }

    fn attach_command(&self, target: &str, inside: bool) -> AttachCommand {
        let mut args = Vec::with_capacity(5);
        if inside {
            if let Some(socket) = self.socket_from_env() {
                args.extend(["-S".to_string(), socket]);
            }
        }
        args.extend(["attach-session".to_string(), "-t".to_string(), target.to_string()]);
        AttachCommand {
            program: self.bin.clone(),
            args,
            env: Vec::new(),
        }
    }

    fn supports_popup(&self, cancel: &CancellationToken) -> bool {
        if !self.inside_tmux() {
            return false;
        }
        let version = match self.exec(cancel, &["-V"]) {
            Ok(out) if out.success() => parse_version(&out.stdout),
            Ok(_) | Err(_) => None,
        };
        debug!(?version, "tmux version");
        version.is_some_and(|v| v >= POPUP_MIN_VERSION)
    }

    fn display_popup(
        &self,
        cancel: &CancellationToken,
        opts: &PopupOptions,
        command: &[String],
    ) -> Result<()> {
        let joined = shell_join(command);
        let mut args = vec!["display-popup", "-E"];
        let width = opts.width.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let height = opts.height.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let dir = opts.start_dir.as_deref().map(str::trim).filter(|s| !s.is_empty());
        if let Some(w) = width {
            args.extend(["-w", w]);
        }
        if let Some(h) = height {
            args.extend(["-h", h]);
        }
        if let Some(d) = dir {
            args.extend(["-d", d]);
        }
        if !joined.is_empty() {
            args.push(&joined);
        }
        self.run_ok(cancel, "display-popup", &args).map(drop)
    }

    fn open_dashboard_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        name: &str,
        command: &[String],
    ) -> Result<()> {
        let session = require_session(session)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MuxError::validation("window name is required"));
        }
        let exists = self
            .list_window_info(cancel, session)?
            .iter()
            .any(|w| w.name == name);
        if !exists {
            let joined = shell_join(command);
            self.new_window(
                cancel,
                &WindowRequest {
                    session,
                    window_name: Some(name),
                    start_dir: None,
                    command: Some(&joined),
                },
            )?;
        }
        self.select_window(cancel, &format!("{session}:{name}"))
    }
}

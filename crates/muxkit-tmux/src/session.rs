//! Session, window and pane creation plus the other mutating primitives.

use std::path::{Path, PathBuf};

use muxkit_core::{
    CancellationToken, GridSpec, MuxError, Result, SplitDirection, require_session,
};
use tracing::{debug, info};

use crate::executor::TmuxClient;

const PANE_ID_FORMAT: &str = "#{pane_id}";

/// Arguments for `split-window`.
#[derive(Debug, Clone, Default)]
pub struct SplitRequest<'a> {
    pub target: &'a str,
    pub start_dir: Option<&'a str>,
    pub direction: SplitDirection,
    /// Size of the new pane in percent.
    pub percent: Option<u32>,
    pub command: Option<&'a str>,
}

/// Arguments for `new-session` / `new-window`.
#[derive(Debug, Clone, Default)]
pub struct WindowRequest<'a> {
    pub session: &'a str,
    pub window_name: Option<&'a str>,
    pub start_dir: Option<&'a str>,
    pub command: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct EnsureOptions {
    pub session: String,
    pub grid: GridSpec,
    /// Defaults to the current directory.
    pub start_dir: Option<PathBuf>,
    pub attach: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub created: bool,
    pub attached: bool,
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

impl TmuxClient {
    /// `new-session -d`, returning the first pane id.
    pub fn new_session(&self, cancel: &CancellationToken, req: &WindowRequest<'_>) -> Result<String> {
        let session = require_session(req.session)?;
        let mut args = vec!["new-session", "-d", "-s", session];
        if let Some(name) = non_blank(req.window_name) {
            args.extend(["-n", name]);
        }
        if let Some(dir) = non_blank(req.start_dir) {
            args.extend(["-c", dir]);
        }
        args.extend(["-P", "-F", PANE_ID_FORMAT]);
        if let Some(cmd) = non_blank(req.command) {
            args.push(cmd);
        }
        self.run_pane_id(cancel, "new-session", &args)
    }

    /// `new-window` in `session`, returning its pane id.
    pub fn new_window(&self, cancel: &CancellationToken, req: &WindowRequest<'_>) -> Result<String> {
        let session = require_session(req.session)?;
        let mut args = vec!["new-window", "-t", session];
        if let Some(name) = non_blank(req.window_name) {
            args.extend(["-n", name]);
        }
        if let Some(dir) = non_blank(req.start_dir) {
            args.extend(["-c", dir]);
        }
        args.extend(["-P", "-F", PANE_ID_FORMAT]);
        if let Some(cmd) = non_blank(req.command) {
            args.push(cmd);
        }
        self.run_pane_id(cancel, "new-window", &args)
    }

    /// Split `req.target`, returning the new pane id. `Vertical` stacks the
    /// new pane below, `Horizontal` places it to the right.
    pub fn split_window(&self, cancel: &CancellationToken, req: &SplitRequest<'_>) -> Result<String> {
        let target = req.target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("split target cannot be empty"));
        }
        let orientation = match req.direction {
            SplitDirection::Vertical => "-v",
            SplitDirection::Horizontal => "-h",
        };
        let percent = req.percent.filter(|p| (1..100).contains(p)).map(|p| p.to_string());
        let mut args = vec!["split-window", orientation, "-t", target];
        if let Some(dir) = non_blank(req.start_dir) {
            args.extend(["-c", dir]);
        }
        if let Some(p) = percent.as_deref() {
            args.extend(["-p", p]);
        }
        args.extend(["-P", "-F", PANE_ID_FORMAT]);
        if let Some(cmd) = non_blank(req.command) {
            args.push(cmd);
        }
        self.run_pane_id(cancel, "split-window", &args)
    }

    /// Build a `rows`x`columns` grid in a new detached session.
    ///
    /// The first pane is split downward `rows - 1` times to make one root per
    /// row; each row root is then split rightward `columns - 1` times. A final
    /// `select-layout tiled` evens out the geometry. Returns pane ids in
    /// row-major order.
    pub fn create_grid(
        &self,
        cancel: &CancellationToken,
        session: &str,
        start_dir: &str,
        grid: GridSpec,
    ) -> Result<Vec<String>> {
        let first = self.new_session(
            cancel,
            &WindowRequest {
                session,
                start_dir: Some(start_dir),
                ..WindowRequest::default()
            },
        )?;

        let mut row_roots = vec![first];
        for _ in 1..grid.rows {
            let above = row_roots.last().cloned().unwrap_or_default();
            let next = self.split_window(
                cancel,
                &SplitRequest {
                    target: &above,
                    start_dir: Some(start_dir),
                    direction: SplitDirection::Vertical,
                    ..SplitRequest::default()
                },
            )?;
            row_roots.push(next);
        }

        let mut panes = Vec::with_capacity(grid.pane_count());
        for root in row_roots {
            let mut current = root.clone();
            panes.push(root);
            for _ in 1..grid.columns {
                current = self.split_window(
                    cancel,
                    &SplitRequest {
                        target: &current,
                        start_dir: Some(start_dir),
                        direction: SplitDirection::Horizontal,
                        ..SplitRequest::default()
                    },
                )?;
                panes.push(current.clone());
            }
        }

        self.select_layout(cancel, session, "tiled")?;
        debug!(session, %grid, panes = panes.len(), "grid created");
        Ok(panes)
    }

    /// Create the session as a grid when missing, then optionally attach.
    pub fn ensure_session(
        &self,
        cancel: &CancellationToken,
        opts: &EnsureOptions,
    ) -> Result<EnsureOutcome> {
        let session = require_session(&opts.session)?;
        let start_dir = match &opts.start_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let start_dir = std::path::absolute(&start_dir)?;
        if !start_dir.is_dir() {
            return Err(MuxError::validation(format!(
                "start dir {} does not exist",
                start_dir.display()
            )));
        }

        let mut outcome = EnsureOutcome::default();
        if !self.has_session(cancel, session)? {
            let dir = path_str(&start_dir)?;
            self.create_grid(cancel, session, dir, opts.grid)?;
            info!(session, grid = %opts.grid, "created session");
            outcome.created = true;
        }
        if opts.attach {
            self.attach_or_switch(cancel, session, self.inside_tmux())?;
            outcome.attached = true;
        }
        Ok(outcome)
    }

    pub fn select_layout(&self, cancel: &CancellationToken, target: &str, layout: &str) -> Result<()> {
        let target = target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("select-layout target cannot be empty"));
        }
        self.run_ok(cancel, "select-layout", &["select-layout", "-t", target, layout])
            .map(drop)
    }

    /// Set a pane's title.
    pub fn select_pane_title(&self, cancel: &CancellationToken, target: &str, title: &str) -> Result<()> {
        let target = target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("select-pane target cannot be empty"));
        }
        self.run_ok(cancel, "select-pane", &["select-pane", "-t", target, "-T", title])
            .map(drop)
    }

    pub fn select_window(&self, cancel: &CancellationToken, target: &str) -> Result<()> {
        self.run_ok(cancel, "select-window", &["select-window", "-t", target])
            .map(drop)
    }

    /// `set-option`. A `scope` of `None` or `-g` sets the global option.
    pub fn set_option(
        &self,
        cancel: &CancellationToken,
        scope: Option<&str>,
        option: &str,
        value: &str,
    ) -> Result<()> {
        let mut args = vec!["set-option"];
        match non_blank(scope) {
            Some("-g") | None => args.push("-g"),
            Some(session) => args.extend(["-t", session]),
        }
        args.extend([option, value]);
        self.run_ok(cancel, "set-option", &args).map(drop)
    }

    /// Kill `session:window`. A window that is already gone is not an error.
    pub fn kill_window(&self, cancel: &CancellationToken, session: &str, window: &str) -> Result<()> {
        let session = require_session(session)?;
        let window = window.trim();
        if window.is_empty() {
            return Err(MuxError::validation("window name is required"));
        }
        let target = format!("{session}:{window}");
        let out = self.exec(cancel, &["kill-window", "-t", &target])?;
        if out.success() || (out.code == Some(1) && out.contains_any(&["can't find window"])) {
            return Ok(());
        }
        Err(MuxError::tool("tmux", "kill-window", &out))
    }

    pub fn kill(&self, cancel: &CancellationToken, session: &str) -> Result<()> {
        let session = require_session(session)?;
        self.run_ok(cancel, "kill-session", &["kill-session", "-t", session])
            .map(drop)
    }

    pub fn rename(&self, cancel: &CancellationToken, session: &str, new_name: &str) -> Result<()> {
        let session = require_session(session)?;
        let new_name = require_session(new_name)?;
        self.run_ok(cancel, "rename-session", &["rename-session", "-t", session, new_name])
            .map(drop)
    }

    pub fn rename_window_in(
        &self,
        cancel: &CancellationToken,
        session: &str,
        window: &str,
        new_name: &str,
    ) -> Result<()> {
        let session = require_session(session)?;
        let window = window.trim();
        let new_name = new_name.trim();
        if window.is_empty() || new_name.is_empty() {
            return Err(MuxError::validation("window and new name are required"));
        }
        let target = format!("{session}:{window}");
        self.run_ok(cancel, "rename-window", &["rename-window", "-t", &target, new_name])
            .map(drop)
    }

    pub fn send(&self, cancel: &CancellationToken, target: &str, keys: &[&str]) -> Result<()> {
        let target = target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("send-keys target cannot be empty"));
        }
        let mut args = vec!["send-keys", "-t", target];
        args.extend_from_slice(keys);
        self.run_ok(cancel, "send-keys", &args).map(drop)
    }

    /// Attach from outside tmux, or switch the current client from inside.
    /// An attach refused as nested while `$TMUX` is set falls back to
    /// `switch-client`.
    pub fn attach_or_switch(&self, cancel: &CancellationToken, target: &str, inside: bool) -> Result<()> {
        let target = require_session(target)?;
        if inside {
            return self.switch_client(cancel, target);
        }
        match self.run_attached(cancel, &["attach-session", "-t", target])? {
            Some(0) => Ok(()),
            code if self.env.is_set("TMUX") => {
                debug!(?code, "attach-session refused inside tmux, switching client");
                self.switch_client(cancel, target)
            }
            code => Err(MuxError::Tool {
                tool: "tmux".into(),
                action: "attach-session".into(),
                code,
                output: format!("could not attach to {target}"),
            }),
        }
    }

    fn switch_client(&self, cancel: &CancellationToken, target: &str) -> Result<()> {
        match self.run_attached(cancel, &["switch-client", "-t", target])? {
            Some(0) => Ok(()),
            code => Err(MuxError::Tool {
                tool: "tmux".into(),
                action: "switch-client".into(),
                code,
                output: format!("could not switch to {target}"),
            }),
        }
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| MuxError::validation(format!("start dir {} is not valid UTF-8", path.display())))
}

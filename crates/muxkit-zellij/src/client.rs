//! ZellijClient: pipe transport, snapshot cache and plain CLI actions.
//!
//! Every RPC is one `zellij [--session S] action pipe --name muxkit
//! [--plugin URL] -- <json>` invocation whose stdout is the JSON reply.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use muxkit_core::{
    CancellationToken, CommandOutput, CommandRunner, Environment, MuxError, PopupOptions,
    ProcessRunner, Result,
};
use tracing::{debug, warn};

use crate::bridge::ensure_bridge_plugin;
use crate::cache::{Snapshot, SnapshotCache};
use crate::config::{default_bridge_dir, normalize_plugin_url};
use crate::metadata::{load_session_paths, metadata_path, record_session_path};
use crate::protocol::{PIPE_NAME, PipeRequest, PipeResponse};

/// `list-sessions` phrasing for "nothing running".
fn no_sessions(out: &CommandOutput) -> bool {
    let msg = out.combined().to_lowercase();
    (msg.contains("no active") && msg.contains("sessions")) || msg.contains("no sessions")
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

pub struct ZellijClient {
    pub(crate) bin: String,
    bridge_url: Option<String>,
    metadata: Option<PathBuf>,
    runner: Arc<dyn CommandRunner>,
    pub(crate) env: Environment,
    cache: SnapshotCache,
}

impl ZellijClient {
    /// Resolve `bin` (or `zellij` on `PATH`). Without an explicit `bridge`
    /// the bundled plugin is installed into the default bridge directory.
    pub fn new(bin: Option<&str>, bridge: Option<&Path>) -> Result<Self> {
        let env = Environment::process();
        let bin = match non_blank(bin) {
            Some(b) => b.to_string(),
            None => env
                .find_executable("zellij")
                .map(|p| p.to_string_lossy().into_owned())
                .ok_or_else(|| MuxError::BinaryNotFound("zellij".into()))?,
        };
        let bridge_dir = default_bridge_dir(&env)?;
        let bridge = match bridge.filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p.to_path_buf(),
            None => ensure_bridge_plugin(&bridge_dir)?.path,
        };
        Ok(Self::with_runner(bin, Arc::new(ProcessRunner::new()))
            .with_env(env)
            .with_bridge_path(&bridge)
            .with_metadata_path(metadata_path(&bridge_dir)))
    }

    pub fn with_runner(bin: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin: bin.into(),
            bridge_url: None,
            metadata: None,
            runner,
            env: Environment::process(),
            cache: SnapshotCache::default(),
        }
    }

    /// Address the bridge plugin explicitly on every pipe call.
    #[must_use]
    pub fn with_bridge_path(mut self, path: &Path) -> Self {
        let url = normalize_plugin_url(&path.to_string_lossy());
        self.bridge_url = (!url.is_empty()).then_some(url);
        self
    }

    #[must_use]
    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_cache_window(mut self, window: Duration) -> Self {
        self.cache = SnapshotCache::new(window);
        self
    }

    pub fn bridge_url(&self) -> Option<&str> {
        self.bridge_url.as_deref()
    }

    pub fn metadata_path(&self) -> Option<&Path> {
        self.metadata.as_deref()
    }

    /// `$ZELLIJ` or `$ZELLIJ_SESSION_NAME` is set.
    pub fn inside_zellij(&self) -> bool {
        self.env.is_set("ZELLIJ") || self.env.is_set("ZELLIJ_SESSION_NAME")
    }

    pub fn env_session(&self) -> Option<String> {
        self.env.get("ZELLIJ_SESSION_NAME")
    }

    pub(crate) fn exec(&self, cancel: &CancellationToken, args: &[String]) -> Result<CommandOutput> {
        debug!(bin = %self.bin, ?args, "zellij");
        self.runner.run(cancel, &self.bin, args)
    }

    fn run_ok(&self, cancel: &CancellationToken, action: &str, args: &[String]) -> Result<()> {
        let out = self.exec(cancel, args)?;
        if !out.success() {
            return Err(MuxError::tool("zellij", action, &out));
        }
        Ok(())
    }

    fn run_interactive(&self, cancel: &CancellationToken, action: &str, args: &[String]) -> Result<()> {
        debug!(bin = %self.bin, ?args, "zellij (interactive)");
        match self.runner.run_interactive(cancel, &self.bin, args)? {
            Some(0) => Ok(()),
            code => Err(MuxError::Tool {
                tool: "zellij".into(),
                action: action.into(),
                code,
                output: match code {
                    Some(c) => format!("exit status {c}"),
                    None => "terminated by signal".into(),
                },
            }),
        }
    }

    // ─── Session discovery ───────────────────────────────────────

    pub fn list_session_names(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        let args = muxkit_core::argv(&["list-sessions", "--short", "--no-formatting"]);
        let out = self.exec(cancel, &args)?;
        if !out.success() {
            if no_sessions(&out) {
                return Ok(Vec::new());
            }
            return Err(MuxError::tool("zellij", "list-sessions", &out));
        }
        Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Full session/tab/pane tree, served from cache inside its window.
    ///
    /// Sessions are asked in listing order; the first to answer wins since
    /// any bridge instance reports every session.
    pub fn snapshot(&self, cancel: &CancellationToken) -> Result<Snapshot> {
        if let Some(hit) = self.cache.get() {
            return Ok(hit);
        }
        let sessions = self.list_session_names(cancel)?;
        if sessions.is_empty() {
            self.cache.invalidate();
            return Ok(Arc::new(Vec::new()));
        }

        let mut last_err = None;
        for session in &sessions {
            match self.call(cancel, Some(session.as_str()), &PipeRequest::Snapshot) {
                Ok(resp) => return Ok(self.cache.store(resp.sessions)),
                Err(MuxError::Cancelled) => return Err(MuxError::Cancelled),
                Err(e) => {
                    warn!(session = %session, error = %e, "snapshot request failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            MuxError::protocol("no zellij sessions responded to snapshot request")
        }))
    }

    pub fn invalidate_snapshot(&self) {
        self.cache.invalidate();
    }

    // ─── Pipe transport ──────────────────────────────────────────

    pub(crate) fn pipe_args(&self, session: Option<&str>, payload: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(10);
        if let Some(s) = non_blank(session) {
            args.extend(["--session".to_string(), s.to_string()]);
        }
        args.extend(["action", "pipe", "--name", PIPE_NAME].map(String::from));
        if let Some(url) = &self.bridge_url {
            args.extend(["--plugin".to_string(), url.clone()]);
        }
        args.extend(["--".to_string(), payload.to_string()]);
        args
    }

    /// Send `req` and decode the reply without judging `ok`.
    pub fn pipe(
        &self,
        cancel: &CancellationToken,
        session: Option<&str>,
        req: &PipeRequest,
    ) -> Result<PipeResponse> {
        let payload = serde_json::to_string(req)
            .map_err(|e| MuxError::protocol(format!("encode pipe request: {e}")))?;
        let out = self.exec(cancel, &self.pipe_args(session, &payload))?;
        if !out.success() {
            return Err(MuxError::tool("zellij", "pipe", &out));
        }
        let body = out.stdout.trim();
        if body.is_empty() {
            return Err(MuxError::protocol("zellij pipe returned empty response"));
        }
        serde_json::from_str(body)
            .map_err(|e| MuxError::protocol(format!("parse pipe response: {e}")))
    }

    /// [`Self::pipe`], turning `ok: false` into a protocol error.
    pub fn call(
        &self,
        cancel: &CancellationToken,
        session: Option<&str>,
        req: &PipeRequest,
    ) -> Result<PipeResponse> {
        let resp = self.pipe(cancel, session, req)?;
        if !resp.ok {
            let msg = non_blank(resp.error.as_deref())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} failed", req.action()));
            return Err(MuxError::protocol(msg));
        }
        Ok(resp)
    }

    // ─── Pipe operations ─────────────────────────────────────────

    pub fn pane_scrollback(
        &self,
        cancel: &CancellationToken,
        session: &str,
        pane_id: u32,
        lines: usize,
    ) -> Result<Vec<String>> {
        let req = PipeRequest::PaneScrollback { pane_id, lines };
        Ok(self.call(cancel, Some(session), &req)?.lines)
    }

    /// Write literal `text` to a pane. Control keys must already be
    /// translated.
    pub fn send_text(
        &self,
        cancel: &CancellationToken,
        session: &str,
        pane_id: u32,
        text: &str,
    ) -> Result<()> {
        let req = PipeRequest::SendKeys {
            pane_id,
            text: text.to_string(),
        };
        self.call(cancel, Some(session), &req).map(drop)
    }

    pub fn rename_session_via_pipe(
        &self,
        cancel: &CancellationToken,
        session: &str,
        new_name: &str,
    ) -> Result<()> {
        let req = PipeRequest::RenameSession {
            new_name: new_name.to_string(),
        };
        self.call(cancel, Some(session), &req)?;
        self.cache.invalidate();
        Ok(())
    }

    pub fn rename_tab(
        &self,
        cancel: &CancellationToken,
        session: &str,
        tab_position: u32,
        new_name: &str,
    ) -> Result<()> {
        let req = PipeRequest::RenameTab {
            tab_position,
            new_name: new_name.to_string(),
        };
        self.call(cancel, Some(session), &req)?;
        self.cache.invalidate();
        Ok(())
    }

    /// Ask the bridge in `current` to move its client to `target`.
    pub fn switch_session(
        &self,
        cancel: &CancellationToken,
        current: &str,
        target: &str,
        tab_position: Option<u32>,
    ) -> Result<()> {
        let req = PipeRequest::SwitchSession {
            session: target.to_string(),
            tab_position,
        };
        self.call(cancel, Some(current), &req)?;
        self.cache.invalidate();
        Ok(())
    }

    // ─── Plain CLI actions ───────────────────────────────────────

    pub fn kill(&self, cancel: &CancellationToken, session: &str) -> Result<()> {
        let session = muxkit_core::require_session(session)?;
        self.run_ok(cancel, "kill-session", &muxkit_core::argv(&["kill-session", session]))?;
        self.cache.invalidate();
        Ok(())
    }

    pub fn attach_session(&self, cancel: &CancellationToken, session: &str) -> Result<()> {
        let session = muxkit_core::require_session(session)?;
        self.run_interactive(cancel, "attach", &muxkit_core::argv(&["attach", session]))
    }

    /// Start `session` from a layout file in the foreground.
    /// `zellij [--config C] --session S --layout L`.
    pub fn start_session(
        &self,
        cancel: &CancellationToken,
        session: &str,
        layout: &Path,
        config: Option<&Path>,
    ) -> Result<()> {
        let session = muxkit_core::require_session(session)?;
        let mut args = Vec::new();
        if let Some(config) = config {
            args.push("--config".to_string());
            args.push(config.to_string_lossy().into_owned());
        }
        args.extend(muxkit_core::argv(&["--session", session, "--layout"]));
        args.push(layout.to_string_lossy().into_owned());
        self.cache.invalidate();
        self.run_interactive(cancel, "start session", &args)
    }

    /// `zellij --session S action <action> <args..>`.
    pub fn run_action(
        &self,
        cancel: &CancellationToken,
        session: &str,
        action: &str,
        args: &[String],
    ) -> Result<()> {
        let mut argv = muxkit_core::argv(&["--session", session, "action", action]);
        argv.extend(args.iter().cloned());
        self.run_ok(cancel, &format!("action {action}"), &argv)?;
        self.cache.invalidate();
        Ok(())
    }

    /// `zellij run --floating --close-on-exit`, in the current session when
    /// one is known.
    pub fn run_floating(
        &self,
        cancel: &CancellationToken,
        opts: &PopupOptions,
        command: &[String],
    ) -> Result<()> {
        let mut args = Vec::new();
        if let Some(session) = self.env_session() {
            args.extend(["--session".to_string(), session]);
        }
        args.extend(["run", "--floating", "--close-on-exit"].map(String::from));
        for (flag, value) in [
            ("--cwd", &opts.start_dir),
            ("--width", &opts.width),
            ("--height", &opts.height),
        ] {
            if let Some(v) = non_blank(value.as_deref()) {
                args.extend([flag.to_string(), v.to_string()]);
            }
        }
        args.push("--".to_string());
        args.extend(command.iter().cloned());
        self.run_interactive(cancel, "run", &args)
    }

    // ─── Metadata ────────────────────────────────────────────────

    /// Remember where `session` was created. A client without a metadata
    /// path records nothing.
    pub fn record_session_path(&self, session: &str, path: &str) -> Result<()> {
        match &self.metadata {
            Some(meta) => record_session_path(meta, session, path),
            None => Ok(()),
        }
    }

    /// Recorded session paths. An unreadable store is treated as empty.
    pub fn session_paths(&self) -> HashMap<String, String> {
        let Some(meta) = &self.metadata else {
            return HashMap::new();
        };
        load_session_paths(meta).unwrap_or_else(|e| {
            warn!(path = %meta.display(), error = %e, "ignoring session metadata");
            HashMap::new()
        })
    }
}

impl std::fmt::Debug for ZellijClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZellijClient")
            .field("bin", &self.bin)
            .field("bridge_url", &self.bridge_url)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxkit_core::testing::{FakeRunner, Reply};

    const SNAPSHOT: &str = r#"{"ok":true,"sessions":[{"name":"alpha","tabs":[],"panes":{"panes":{}},"connected_clients":1,"is_current_session":true}]}"#;

    fn client(fake: &Arc<FakeRunner>) -> ZellijClient {
        ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty())
    }

    const LIST: &[&str] = &["list-sessions", "--short", "--no-formatting"];

    fn snapshot_args(session: &str) -> Vec<String> {
        muxkit_core::argv(&[
            "--session",
            session,
            "action",
            "pipe",
            "--name",
            PIPE_NAME,
            "--",
            r#"{"action":"snapshot"}"#,
        ])
    }

    #[test]
    fn list_sessions_parses_lines() {
        let fake = Arc::new(FakeRunner::new().on(LIST, Reply::ok("alpha\nbeta\n\n")));
        let names = client(&fake)
            .list_session_names(&CancellationToken::new())
            .expect("list");
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn list_sessions_no_active_is_empty() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::fail(1, "No active zellij sessions found."))
                .on(LIST, Reply::fail(1, "No sessions")),
        );
        let c = client(&fake);
        let cancel = CancellationToken::new();
        assert!(c.list_session_names(&cancel).expect("benign").is_empty());
        assert!(c.list_session_names(&cancel).expect("benign").is_empty());
    }

    #[test]
    fn list_sessions_other_failure_is_tool_error() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::fail(2, "permission denied")));
        let err = client(&fake)
            .list_session_names(&CancellationToken::new())
            .expect_err("fails");
        assert_eq!(err.to_string(), "zellij list-sessions: permission denied");
    }

    #[test]
    fn snapshot_is_cached_within_window() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on(&snapshot_args("alpha")[..], Reply::ok(SNAPSHOT)),
        );
        let c = client(&fake);
        let cancel = CancellationToken::new();
        let first = c.snapshot(&cancel).expect("first");
        let second = c.snapshot(&cancel).expect("second");
        assert_eq!(first[0].name, "alpha");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fake.call_count(), 2);
        fake.assert_done();
    }

    #[test]
    fn snapshot_refreshes_after_window() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(SNAPSHOT))
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(SNAPSHOT)),
        );
        let c = client(&fake).with_cache_window(Duration::from_millis(20));
        let cancel = CancellationToken::new();
        c.snapshot(&cancel).expect("first");
        std::thread::sleep(Duration::from_millis(40));
        c.snapshot(&cancel).expect("second");
        assert_eq!(fake.call_count(), 4);
        fake.assert_done();
    }

    #[test]
    fn snapshot_tries_next_session_on_failure() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("stale\nalpha\n"))
                .on(&snapshot_args("stale")[..], Reply::fail(1, "plugin not loaded"))
                .on(&snapshot_args("alpha")[..], Reply::ok(SNAPSHOT)),
        );
        let snap = client(&fake)
            .snapshot(&CancellationToken::new())
            .expect("second session answers");
        assert_eq!(snap.len(), 1);
        fake.assert_done();
    }

    #[test]
    fn snapshot_without_sessions_is_empty_and_uncached() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::fail(1, "No active zellij sessions found."))
                .on(LIST, Reply::fail(1, "No active zellij sessions found.")),
        );
        let c = client(&fake);
        let cancel = CancellationToken::new();
        assert!(c.snapshot(&cancel).expect("empty").is_empty());
        assert!(c.snapshot(&cancel).expect("empty").is_empty());
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn snapshot_reports_last_error_when_nobody_answers() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(r#"{"ok":false,"error":"permission denied"}"#)),
        );
        let err = client(&fake)
            .snapshot(&CancellationToken::new())
            .expect_err("no answer");
        assert!(matches!(err, MuxError::Protocol(ref m) if m == "permission denied"));
    }

    #[test]
    fn pipe_includes_plugin_url() {
        let fake = Arc::new(FakeRunner::new().on(
            &[
                "--session",
                "alpha",
                "action",
                "pipe",
                "--name",
                "muxkit",
                "--plugin",
                "file:/opt/bridge.wasm",
                "--",
                r#"{"action":"send_keys","pane_id":1,"text":"ls\n"}"#,
            ],
            Reply::ok(r#"{"ok":true}"#),
        ));
        client(&fake)
            .with_bridge_path(Path::new("/opt/bridge.wasm"))
            .send_text(&CancellationToken::new(), "alpha", 1, "ls\n")
            .expect("send");
        fake.assert_done();
    }

    #[test]
    fn pipe_failures_are_classified() {
        let fake = Arc::new(
            FakeRunner::new()
                .on_any(Reply::fail(1, "There is no active session!"))
                .on_any(Reply::ok("   "))
                .on_any(Reply::ok("not json"))
                .on_any(Reply::ok(r#"{"ok":false}"#)),
        );
        let c = client(&fake);
        let cancel = CancellationToken::new();
        let req = PipeRequest::RenameSession { new_name: "x".into() };
        assert!(matches!(c.call(&cancel, Some("a"), &req), Err(MuxError::Tool { .. })));
        assert!(matches!(c.call(&cancel, Some("a"), &req), Err(MuxError::Protocol(_))));
        assert!(matches!(c.call(&cancel, Some("a"), &req), Err(MuxError::Protocol(_))));
        let err = c.call(&cancel, Some("a"), &req).expect_err("not ok");
        assert_eq!(err.to_string(), "rename_session failed");
    }

    #[test]
    fn scrollback_returns_lines() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::ok(r#"{"ok":true,"lines":["a","b"]}"#)));
        let lines = client(&fake)
            .pane_scrollback(&CancellationToken::new(), "alpha", 4, 2)
            .expect("scrollback");
        assert_eq!(lines, vec!["a", "b"]);
        let call = &fake.calls()[0];
        assert_eq!(call.last().map(String::as_str), Some(r#"{"action":"pane_scrollback","pane_id":4,"lines":2}"#));
    }

    #[test]
    fn mutations_invalidate_snapshot() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(SNAPSHOT))
                .on(&["kill-session", "alpha"], Reply::empty())
                .on(LIST, Reply::fail(1, "No active zellij sessions found.")),
        );
        let c = client(&fake);
        let cancel = CancellationToken::new();
        assert_eq!(c.snapshot(&cancel).expect("warm").len(), 1);
        c.kill(&cancel, "alpha").expect("kill");
        assert!(c.snapshot(&cancel).expect("refreshed").is_empty());
        fake.assert_done();
    }

    #[test]
    fn floating_run_argv() {
        let fake = Arc::new(FakeRunner::new().on(
            &[
                "--session",
                "alpha",
                "run",
                "--floating",
                "--close-on-exit",
                "--cwd",
                "/srv",
                "--width",
                "80%",
                "--",
                "lazygit",
            ],
            Reply::empty(),
        ));
        ZellijClient::with_runner("zellij", fake.clone())
            .with_env(Environment::from_pairs([("ZELLIJ_SESSION_NAME", "alpha")]))
            .run_floating(
                &CancellationToken::new(),
                &PopupOptions {
                    width: Some("80%".into()),
                    height: Some(" ".into()),
                    start_dir: Some("/srv".into()),
                },
                &["lazygit".to_string()],
            )
            .expect("popup");
        fake.assert_done();
    }

    #[test]
    fn metadata_round_trip_through_client() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fake = Arc::new(FakeRunner::new());
        let c = client(&fake).with_metadata_path(dir.path().join("sessions.json"));
        c.record_session_path("api", "/srv/api").expect("record");
        assert_eq!(c.session_paths().get("api").map(String::as_str), Some("/srv/api"));

        let bare = client(&fake);
        bare.record_session_path("api", "/srv/api").expect("no-op");
        assert!(bare.session_paths().is_empty());
    }

    #[test]
    fn start_session_passes_config_and_layout() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(
                    &[
                        "--config",
                        "/cfg/config.kdl",
                        "--session",
                        "api",
                        "--layout",
                        "/layouts/api.kdl",
                    ],
                    Reply::empty(),
                )
                .on(&["--session", "api", "--layout", "/l.kdl"], Reply::fail(2, "")),
        );
        let c = client(&fake);
        c.start_session(
            &CancellationToken::new(),
            "api",
            Path::new("/layouts/api.kdl"),
            Some(Path::new("/cfg/config.kdl")),
        )
        .expect("start");
        let err = c
            .start_session(&CancellationToken::new(), "api", Path::new("/l.kdl"), None)
            .expect_err("exit 2");
        assert!(matches!(err, MuxError::Tool { code: Some(2), .. }));
        fake.assert_done();
    }
}

//! [`MuxClient`] for zellij, projected from the bridge snapshot.

use muxkit_core::{
    AttachCommand, CancellationToken, MuxClient, MuxError, MuxType, PaneInfo, PopupOptions,
    Result, SessionInfo, WindowInfo, require_session,
};

use crate::client::ZellijClient;
use crate::protocol::{PaneSnapshot, SessionSnapshot};
use crate::target::{keys_to_text, parse_tab_position, split_session_pane, split_target};

fn pane_info(session: &str, pane: &PaneSnapshot) -> PaneInfo {
    PaneInfo {
        id: format!("{session}:{}", pane.id),
        index: pane.id.to_string(),
        active: pane.is_focused,
        title: pane.title.clone(),
        command: pane.terminal_command.clone().unwrap_or_default(),
        left: pane.pane_content_x,
        top: pane.pane_content_y,
        width: pane.pane_content_columns,
        height: pane.pane_content_rows,
        dead: pane.exited,
        dead_status: pane.exit_status.unwrap_or(0),
        last_active: None,
    }
}

impl ZellijClient {
    fn find_session<'a>(sessions: &'a [SessionSnapshot], name: &str) -> Option<&'a SessionSnapshot> {
        sessions.iter().find(|s| s.name == name)
    }
}

impl MuxClient for ZellijClient {
    fn mux_type(&self) -> MuxType {
        MuxType::Zellij
    }

    fn binary(&self) -> &str {
        &self.bin
    }

    fn is_inside(&self) -> bool {
        self.inside_zellij()
    }

    fn list_sessions(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        self.list_session_names(cancel)
    }

    fn list_sessions_info(&self, cancel: &CancellationToken) -> Result<Vec<SessionInfo>> {
        let snapshot = self.snapshot(cancel)?;
        let mut paths = self.session_paths();
        Ok(snapshot
            .iter()
            .map(|s| SessionInfo {
                name: s.name.clone(),
                path: paths.remove(&s.name).unwrap_or_default(),
            })
            .collect())
    }

    fn current_session(&self, cancel: &CancellationToken) -> Result<Option<String>> {
        if let Some(name) = self.env_session() {
            return Ok(Some(name));
        }
        let snapshot = self.snapshot(cancel)?;
        Ok(snapshot
            .iter()
            .find(|s| s.is_current_session)
            .map(|s| s.name.clone()))
    }

    fn list_windows(&self, cancel: &CancellationToken, session: &str) -> Result<Vec<WindowInfo>> {
        let session = require_session(session)?;
        let snapshot = self.snapshot(cancel)?;
        let Some(found) = Self::find_session(&snapshot, session) else {
            return Ok(Vec::new());
        };
        Ok(found
            .tabs
            .iter()
            .map(|tab| WindowInfo {
                index: tab.position.to_string(),
                name: tab.name.clone(),
                active: tab.active,
            })
            .collect())
    }

    /// `target` is `session` (active tab) or `session:tabPosition`.
    fn list_panes_detailed(&self, cancel: &CancellationToken, target: &str) -> Result<Vec<PaneInfo>> {
        let (session, tab) = split_target(target);
        let session = require_session(session)?;
        let snapshot = self.snapshot(cancel)?;
        let Some(found) = Self::find_session(&snapshot, session) else {
            return Ok(Vec::new());
        };
        let position = tab
            .parse::<u32>()
            .ok()
            .or_else(|| found.active_tab().map(|t| t.position));
        let Some(position) = position else {
            return Ok(Vec::new());
        };
        Ok(found
            .panes_in_tab(position)
            .iter()
            .filter(|p| p.is_user_pane())
            .map(|p| pane_info(session, p))
            .collect())
    }

    fn capture_pane_lines(
        &self,
        cancel: &CancellationToken,
        target: &str,
        lines: usize,
    ) -> Result<Vec<String>> {
        let (session, pane_id) = split_session_pane(target)?;
        if lines == 0 {
            return Ok(Vec::new());
        }
        let mut out = self.pane_scrollback(cancel, session, pane_id, lines)?;
        if out.len() > lines {
            out.drain(..out.len() - lines);
        }
        Ok(out)
    }

    fn session_has_clients(&self, cancel: &CancellationToken, session: &str) -> Result<bool> {
        let session = require_session(session)?;
        let snapshot = self.snapshot(cancel)?;
        Ok(Self::find_session(&snapshot, session).is_some_and(|s| s.connected_clients > 0))
    }

    fn rename_session(&self, cancel: &CancellationToken, session: &str, new_name: &str) -> Result<()> {
        let session = require_session(session)?;
        let new_name = require_session(new_name)?;
        self.rename_session_via_pipe(cancel, session, new_name)
    }

    fn rename_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        window: &str,
        new_name: &str,
    ) -> Result<()> {
        let session = require_session(session)?;
        let position = parse_tab_position(window)?;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(MuxError::validation("new tab name is required"));
        }
        self.rename_tab(cancel, session, position, new_name)
    }

    fn kill_session(&self, cancel: &CancellationToken, session: &str) -> Result<()> {
        self.kill(cancel, session)
    }

    fn send_keys(&self, cancel: &CancellationToken, target: &str, keys: &[&str]) -> Result<()> {
        let (session, pane_id) = split_session_pane(target)?;
        let text = keys_to_text(keys);
        if text.is_empty() {
            return Ok(());
        }
        self.send_text(cancel, session, pane_id, &text)
    }

    /// Inside zellij the bridge switches the current client, optionally to a
    /// tab; outside, `zellij attach` takes over the terminal.
    fn attach(&self, cancel: &CancellationToken, target: &str, inside: bool) -> Result<()> {
        let (session, tab) = split_target(target);
        let session = require_session(session)?;
        if inside {
            let current = self.env_session().unwrap_or_else(|| session.to_string());
            return self.switch_session(cancel, &current, session, tab.parse().ok());
        }
        self.attach_session(cancel, session)
    }

    fn attach_command(&self, target: &str, _inside: bool) -> AttachCommand {
        let (session, _) = split_target(target);
        AttachCommand {
            program: self.bin.clone(),
            args: vec!["attach".to_string(), session.to_string()],
            env: Vec::new(),
        }
    }

    fn supports_popup(&self, _cancel: &CancellationToken) -> bool {
        true
    }

    fn display_popup(
        &self,
        cancel: &CancellationToken,
        opts: &PopupOptions,
        command: &[String],
    ) -> Result<()> {
        self.run_floating(cancel, opts, command)
    }

    /// An empty `session` means the current one.
    fn open_dashboard_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        name: &str,
        command: &[String],
    ) -> Result<()> {
        let session = match session.trim() {
            "" => self
                .current_session(cancel)?
                .ok_or_else(|| MuxError::validation("no active zellij session"))?,
            s => s.to_string(),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(MuxError::validation("tab name is required"));
        }
        let exists = self
            .list_windows(cancel, &session)?
            .iter()
            .any(|w| w.name == name);
        if exists {
            return self.run_action(cancel, &session, "go-to-tab-name", &[name.to_string()]);
        }
        let mut args = vec!["--name".to_string(), name.to_string(), "--".to_string()];
        args.extend(command.iter().cloned());
        self.run_action(cancel, &session, "new-tab", &args)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use muxkit_core::Environment;
    use muxkit_core::testing::{FakeRunner, Reply};

    const LIST: &[&str] = &["list-sessions", "--short", "--no-formatting"];

    const SNAPSHOT: &str = r#"{"ok":true,"sessions":[
        {"name":"alpha","connected_clients":2,"is_current_session":true,
         "tabs":[{"position":0,"name":"editor","active":false},
                 {"position":1,"name":"logs","active":true}],
         "panes":{"panes":{
            "0":[{"id":1,"is_selectable":true,"is_focused":true,"title":"nvim",
                  "terminal_command":"nvim .","pane_content_x":1,"pane_content_y":2,
                  "pane_content_columns":100,"pane_content_rows":40}],
            "1":[{"id":2,"is_selectable":true,"title":"tail","exited":true,"exit_status":3},
                 {"id":3,"is_selectable":true,"is_suppressed":true,"title":"hidden"},
                 {"id":4,"is_plugin":true,"is_selectable":false,"title":"status-bar"}]}}},
        {"name":"beta","connected_clients":0,"tabs":[],"panes":{"panes":{}}}
    ]}"#;

    fn warm(env: Environment) -> (Arc<FakeRunner>, ZellijClient) {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\nbeta\n"))
                .on_any(Reply::ok(SNAPSHOT)),
        );
        let client = ZellijClient::with_runner("zellij", fake.clone()).with_env(env);
        (fake, client)
    }

    #[test]
    fn inside_detection_reads_env_only() {
        let fake = Arc::new(FakeRunner::new());
        let outside = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        assert!(!outside.is_inside());
        let inside = ZellijClient::with_runner("zellij", fake.clone())
            .with_env(Environment::from_pairs([("ZELLIJ", "0")]));
        assert!(inside.is_inside());
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn windows_and_panes_from_one_snapshot() {
        let (fake, c) = warm(Environment::empty());
        let cancel = CancellationToken::new();

        let windows = c.list_windows(&cancel, "alpha").expect("windows");
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].index, "1");
        assert!(windows[1].active);

        // Default is the active tab; plugins and suppressed panes are hidden.
        let active = c.list_panes_detailed(&cancel, "alpha").expect("panes");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "alpha:2");
        assert!(active[0].dead);
        assert_eq!(active[0].dead_status, 3);

        let first = c.list_panes_detailed(&cancel, "alpha:0").expect("panes");
        assert_eq!(first[0].command, "nvim .");
        assert_eq!((first[0].left, first[0].top, first[0].width, first[0].height), (1, 2, 100, 40));

        assert!(c.list_windows(&cancel, "gone").expect("missing").is_empty());
        assert!(c.list_panes_detailed(&cancel, "gone:0").expect("missing").is_empty());
        // Everything above was served by one list + one pipe call.
        assert_eq!(fake.call_count(), 2);
    }

    #[test]
    fn clients_and_current_session() {
        let (_, c) = warm(Environment::empty());
        let cancel = CancellationToken::new();
        assert!(c.session_has_clients(&cancel, "alpha").expect("alpha"));
        assert!(!c.session_has_clients(&cancel, "beta").expect("beta"));
        assert!(!c.session_has_clients(&cancel, "gone").expect("gone"));
        assert_eq!(c.current_session(&cancel).expect("current").as_deref(), Some("alpha"));
    }

    #[test]
    fn current_session_prefers_env() {
        let fake = Arc::new(FakeRunner::new());
        let c = ZellijClient::with_runner("zellij", fake.clone())
            .with_env(Environment::from_pairs([("ZELLIJ_SESSION_NAME", "work")]));
        assert_eq!(
            c.current_session(&CancellationToken::new()).expect("env").as_deref(),
            Some("work")
        );
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn no_server_is_benign_everywhere() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::fail(1, "No active zellij sessions found."))
                .on(LIST, Reply::fail(1, "No active zellij sessions found."))
                .on(LIST, Reply::fail(1, "No active zellij sessions found.")),
        );
        let c = ZellijClient::with_runner("zellij", fake).with_env(Environment::empty());
        let cancel = CancellationToken::new();
        assert!(c.list_sessions(&cancel).expect("sessions").is_empty());
        assert_eq!(c.current_session(&cancel).expect("current"), None);
        assert!(!c.session_has_clients(&cancel, "alpha").expect("clients"));
    }

    #[test]
    fn sessions_info_joins_recorded_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (_, c) = warm(Environment::empty());
        let c = c.with_metadata_path(dir.path().join("sessions.json"));
        c.record_session_path("alpha", "/srv/alpha").expect("record");
        let info = c.list_sessions_info(&CancellationToken::new()).expect("info");
        assert_eq!(
            info,
            vec![
                SessionInfo { name: "alpha".into(), path: "/srv/alpha".into() },
                SessionInfo { name: "beta".into(), path: String::new() },
            ]
        );
    }

    #[test]
    fn send_keys_translates_and_skips_empty() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::ok(r#"{"ok":true}"#)));
        let c = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        let cancel = CancellationToken::new();
        c.send_keys(&cancel, "alpha:7", &["make", "Enter"]).expect("send");
        c.send_keys(&cancel, "alpha:7", &[]).expect("nothing to send");
        assert_eq!(fake.call_count(), 1);
        let call = &fake.calls()[0];
        assert_eq!(
            call.last().map(String::as_str),
            Some(r#"{"action":"send_keys","pane_id":7,"text":"make\n"}"#)
        );
        assert!(matches!(c.send_keys(&cancel, "alpha", &["x"]), Err(MuxError::Validation(_))));
    }

    #[test]
    fn capture_trims_to_requested_lines() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::ok(r#"{"ok":true,"lines":["1","2","3"]}"#)));
        let c = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        let cancel = CancellationToken::new();
        assert_eq!(c.capture_pane_lines(&cancel, "alpha:1", 2).expect("capture"), vec!["2", "3"]);
        assert!(c.capture_pane_lines(&cancel, "alpha:1", 0).expect("zero").is_empty());
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn rename_window_needs_numeric_tab() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::ok(r#"{"ok":true}"#)));
        let c = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        let cancel = CancellationToken::new();
        c.rename_window(&cancel, "alpha", "2", "build").expect("rename");
        assert!(matches!(
            c.rename_window(&cancel, "alpha", "logs", "build"),
            Err(MuxError::Validation(_))
        ));
        assert_eq!(fake.call_count(), 1);
    }

    #[test]
    fn attach_inside_switches_through_bridge() {
        let fake = Arc::new(FakeRunner::new().on(
            &[
                "--session",
                "work",
                "action",
                "pipe",
                "--name",
                "muxkit",
                "--",
                r#"{"action":"switch_session","session":"alpha","tab_position":1}"#,
            ],
            Reply::ok(r#"{"ok":true}"#),
        ));
        let c = ZellijClient::with_runner("zellij", fake.clone())
            .with_env(Environment::from_pairs([("ZELLIJ_SESSION_NAME", "work")]));
        c.attach(&CancellationToken::new(), "alpha:1", true).expect("switch");
        fake.assert_done();
    }

    #[test]
    fn attach_outside_runs_zellij_attach() {
        let fake = Arc::new(FakeRunner::new().on(&["attach", "alpha"], Reply::empty()));
        let c = ZellijClient::with_runner("/usr/bin/zellij", fake.clone()).with_env(Environment::empty());
        c.attach(&CancellationToken::new(), "alpha", false).expect("attach");
        assert_eq!(
            c.attach_command("alpha:1", false).argv(),
            vec!["/usr/bin/zellij", "attach", "alpha"]
        );
        assert!(c.supports_popup(&CancellationToken::new()));
        fake.assert_done();
    }

    #[test]
    fn dashboard_focuses_existing_tab() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(SNAPSHOT))
                .on(&["--session", "alpha", "action", "go-to-tab-name", "logs"], Reply::empty()),
        );
        let c = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        c.open_dashboard_window(&CancellationToken::new(), "alpha", "logs", &[])
            .expect("focus");
        fake.assert_done();
    }

    #[test]
    fn dashboard_creates_missing_tab_in_current_session() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(LIST, Reply::ok("alpha\n"))
                .on_any(Reply::ok(SNAPSHOT))
                .on(
                    &["--session", "alpha", "action", "new-tab", "--name", "dash", "--", "muxkit", "sessions"],
                    Reply::empty(),
                ),
        );
        let c = ZellijClient::with_runner("zellij", fake.clone()).with_env(Environment::empty());
        c.open_dashboard_window(
            &CancellationToken::new(),
            "",
            "dash",
            &["muxkit".to_string(), "sessions".to_string()],
        )
        .expect("create");
        fake.assert_done();
    }
}

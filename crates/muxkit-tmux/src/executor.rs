//! TmuxClient and its subprocess helpers.
//!
//! Every tmux primitive is one invocation through the injected
//! [`CommandRunner`], so tests script exact argv sequences with
//! `muxkit_core::testing::FakeRunner`.

use std::sync::Arc;

use muxkit_core::{
    CancellationToken, CommandOutput, CommandRunner, Environment, MuxError, ProcessRunner, Result,
};
use tracing::debug;

/// Phrases tmux prints when there is simply nothing to report: no server
/// yet, a session or pane that is already gone, or no attached client.
pub const BENIGN_ABSENCE: &[&str] = &[
    "no server",
    "can't find",
    "no such file",
    "failed to connect",
    "error connecting to",
    "no sessions",
    "no session",
    "no current target",
];

/// Exit status 1 together with one of [`BENIGN_ABSENCE`].
pub fn is_benign_absence(out: &CommandOutput) -> bool {
    out.code == Some(1) && out.contains_any(BENIGN_ABSENCE)
}

pub struct TmuxClient {
    pub(crate) bin: String,
    socket_path: Option<String>,
    socket_name: Option<String>,
    runner: Arc<dyn CommandRunner>,
    pub(crate) env: Environment,
}

impl TmuxClient {
    /// Resolve `bin` (or `tmux` on `PATH`) and run it as a real process.
    pub fn new(bin: Option<&str>) -> Result<Self> {
        let env = Environment::process();
        let bin = match bin.map(str::trim).filter(|b| !b.is_empty()) {
            Some(b) => b.to_string(),
            None => env
                .find_executable("tmux")
                .map(|p| p.to_string_lossy().into_owned())
                .ok_or_else(|| MuxError::BinaryNotFound("tmux".into()))?,
        };
        Ok(Self::with_runner(bin, Arc::new(ProcessRunner::new())).with_env(env))
    }

    pub fn with_runner(bin: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            bin: bin.into(),
            socket_path: None,
            socket_name: None,
            runner,
            env: Environment::process(),
        }
    }

    #[must_use]
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_socket_name(mut self, name: impl Into<String>) -> Self {
        self.socket_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// `$TMUX` or `$TMUX_PANE` is set.
    pub fn inside_tmux(&self) -> bool {
        self.env.is_set("TMUX") || self.env.is_set("TMUX_PANE")
    }

    /// Socket path from `$TMUX`, which tmux sets to `socket,pid,session`.
    pub fn socket_from_env(&self) -> Option<String> {
        let raw = self.env.get("TMUX")?;
        let socket = raw.split(',').next().unwrap_or_default().trim();
        (!socket.is_empty()).then(|| socket.to_string())
    }

    pub(crate) fn argv(&self, args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        // Socket path takes precedence over socket name
        if let Some(ref path) = self.socket_path {
            argv.extend(["-S".to_string(), path.clone()]);
        } else if let Some(ref name) = self.socket_name {
            argv.extend(["-L".to_string(), name.clone()]);
        }
        argv.extend(args.iter().map(|a| a.to_string()));
        argv
    }

    /// Run and return the raw output; the caller classifies the exit status.
    pub(crate) fn exec(&self, cancel: &CancellationToken, args: &[&str]) -> Result<CommandOutput> {
        let argv = self.argv(args);
        debug!(bin = %self.bin, args = ?argv, "tmux");
        self.runner.run(cancel, &self.bin, &argv)
    }

    /// Run and require success. Returns stdout.
    pub(crate) fn run_ok(
        &self,
        cancel: &CancellationToken,
        action: &str,
        args: &[&str],
    ) -> Result<String> {
        let out = self.exec(cancel, args)?;
        if !out.success() {
            return Err(MuxError::tool("tmux", action, &out));
        }
        Ok(out.stdout)
    }

    /// Like [`Self::run_ok`], for commands printing a single `#{pane_id}`.
    pub(crate) fn run_pane_id(
        &self,
        cancel: &CancellationToken,
        action: &str,
        args: &[&str],
    ) -> Result<String> {
        let pane = self.run_ok(cancel, action, args)?.trim().to_string();
        if pane.is_empty() {
            return Err(MuxError::protocol(format!("tmux {action} returned empty pane id")));
        }
        Ok(pane)
    }

    pub(crate) fn run_attached(
        &self,
        cancel: &CancellationToken,
        args: &[&str],
    ) -> Result<Option<i32>> {
        let argv = self.argv(args);
        debug!(bin = %self.bin, args = ?argv, "tmux (interactive)");
        self.runner.run_interactive(cancel, &self.bin, &argv)
    }
}

impl std::fmt::Debug for TmuxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmuxClient")
            .field("bin", &self.bin)
            .field("socket_path", &self.socket_path)
            .field("socket_name", &self.socket_name)
            .finish_non_exhaustive()
    }
}

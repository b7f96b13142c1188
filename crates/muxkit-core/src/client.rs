//! The capability contract every backend implements.

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::mux_type::MuxType;
use crate::types::{AttachCommand, PaneInfo, PopupOptions, SessionInfo, WindowInfo};

/// Uniform multiplexer operations.
///
/// Inspection calls normalize "no server / no such session" conditions to
/// empty results. Mutations fail only on genuine tool errors. All calls
/// block; `cancel` terminates any subprocess in flight.
pub trait MuxClient: Send + Sync {
    fn mux_type(&self) -> MuxType;

    /// Binary name or path used for every invocation.
    fn binary(&self) -> &str;

    /// Whether this process runs inside a session of this backend. Reads
    /// environment variables only.
    fn is_inside(&self) -> bool;

    fn list_sessions(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Session names with a best-effort working directory.
    fn list_sessions_info(&self, cancel: &CancellationToken) -> Result<Vec<SessionInfo>>;

    /// `None` outside any session.
    fn current_session(&self, cancel: &CancellationToken) -> Result<Option<String>>;

    fn list_windows(&self, cancel: &CancellationToken, session: &str) -> Result<Vec<WindowInfo>>;

    fn list_panes_detailed(&self, cancel: &CancellationToken, target: &str)
    -> Result<Vec<PaneInfo>>;

    /// At most the last `lines` lines of the pane's visible content.
    fn capture_pane_lines(
        &self,
        cancel: &CancellationToken,
        target: &str,
        lines: usize,
    ) -> Result<Vec<String>>;

    fn session_has_clients(&self, cancel: &CancellationToken, session: &str) -> Result<bool>;

    fn rename_session(&self, cancel: &CancellationToken, session: &str, new_name: &str)
    -> Result<()>;

    fn rename_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        window: &str,
        new_name: &str,
    ) -> Result<()>;

    fn kill_session(&self, cancel: &CancellationToken, session: &str) -> Result<()>;

    /// Deliver keys. Named keys (`Enter`, `C-c`, ...) follow tmux spelling.
    fn send_keys(&self, cancel: &CancellationToken, target: &str, keys: &[&str]) -> Result<()>;

    fn attach(&self, cancel: &CancellationToken, target: &str, inside: bool) -> Result<()>;

    /// The command [`MuxClient::attach`] would run, without running it.
    fn attach_command(&self, target: &str, inside: bool) -> AttachCommand;

    fn supports_popup(&self, cancel: &CancellationToken) -> bool;

    fn display_popup(
        &self,
        cancel: &CancellationToken,
        opts: &PopupOptions,
        command: &[String],
    ) -> Result<()>;

    /// Focus the window named `name` in `session`, creating it with
    /// `command` when it does not exist.
    fn open_dashboard_window(
        &self,
        cancel: &CancellationToken,
        session: &str,
        name: &str,
        command: &[String],
    ) -> Result<()>;
}

/// Reject a blank session name before any subprocess runs.
pub fn require_session(session: &str) -> Result<&str> {
    let session = session.trim();
    if session.is_empty() {
        return Err(crate::error::MuxError::validation("session name is required"));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuxError;

    #[test]
    fn require_session_trims_and_rejects_blank() {
        assert_eq!(require_session("  dev ").expect("dev"), "dev");
        assert!(matches!(require_session("   "), Err(MuxError::Validation(_))));
    }

    // The trait must stay usable as `dyn MuxClient` for the runtime factory.
    #[test]
    fn trait_is_dyn_compatible() {
        fn takes(_: Option<&dyn MuxClient>) {}
        takes(None);
    }
}

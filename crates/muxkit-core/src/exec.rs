//! Subprocess execution with cooperative cancellation.
//!
//! Every multiplexer operation bottoms out in a [`CommandRunner`]. The trait
//! is the seam tests replace with a scripted fake; [`ProcessRunner`] is the
//! real implementation that spawns the binary and kills it when the caller's
//! [`CancellationToken`] fires.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{MuxError, Result};

/// Captured result of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stdout and stderr joined, for diagnostics and phrase matching.
    pub fn combined(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, true) => String::new(),
            (false, true) => out.to_string(),
            (true, false) => err.to_string(),
            (false, false) => format!("{out}\n{err}"),
        }
    }

    /// Case-insensitive search of the combined output for any of `phrases`.
    pub fn contains_any(&self, phrases: &[&str]) -> bool {
        let text = self.combined().to_ascii_lowercase();
        phrases.iter().any(|p| text.contains(p))
    }
}

/// Abstraction over subprocess execution.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, capturing output. A nonzero exit is not an
    /// error at this layer; callers classify it.
    fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput>;

    /// Run `program` attached to the current terminal and return its exit code.
    fn run_interactive(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Option<i32>>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        (**self).run(cancel, program, args)
    }

    fn run_interactive(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Option<i32>> {
        (**self).run_interactive(cancel, program, args)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<T> {
    fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        (**self).run(cancel, program, args)
    }

    fn run_interactive(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Option<i32>> {
        (**self).run_interactive(cancel, program, args)
    }
}

// ─── ProcessRunner ──────────────────────────────────────────────────

const DEFAULT_POLL: Duration = Duration::from_millis(10);

/// Spawns real processes. Cancellation is observed by polling the child.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn spawn(&self, program: &str, args: &[String], captured: bool) -> Result<Child> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if captured {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
        }
        cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MuxError::BinaryNotFound(program.to_string()),
            _ => MuxError::Io(e),
        })
    }

    /// Block until `child` exits or `cancel` fires. On cancel the child is
    /// killed and reaped before returning.
    fn wait(&self, child: &mut Child, cancel: &CancellationToken) -> Result<Option<i32>> {
        loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MuxError::Cancelled);
            }
            if let Some(status) = child.try_wait()? {
                return Ok(status.code());
            }
            thread::sleep(self.poll_interval);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut r| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        if cancel.is_cancelled() {
            return Err(MuxError::Cancelled);
        }
        debug!(program, ?args, "exec");
        let mut child = self.spawn(program, args, true)?;
        let out = drain(child.stdout.take());
        let err = drain(child.stderr.take());
        let code = self.wait(&mut child, cancel);
        let stdout = join(out);
        let stderr = join(err);
        Ok(CommandOutput {
            code: code?,
            stdout,
            stderr,
        })
    }

    fn run_interactive(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<Option<i32>> {
        if cancel.is_cancelled() {
            return Err(MuxError::Cancelled);
        }
        debug!(program, ?args, "exec interactive");
        let mut child = self.spawn(program, args, false)?;
        self.wait(&mut child, cancel)
    }
}

/// Convert a borrowed argv into the owned form [`CommandRunner`] takes.
pub fn argv<S: AsRef<str>>(parts: &[S]) -> Vec<String> {
    parts.iter().map(|s| s.as_ref().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        argv(&["-c", script])
    }

    #[test]
    fn combined_joins_trimmed_streams() {
        let out = CommandOutput::failed(1, " partial \n", "\nboom\n");
        assert_eq!(out.combined(), "partial\nboom");
        assert!(!out.success());
        assert!(out.contains_any(&["boom"]));
        assert!(!out.contains_any(&["no server"]));
    }

    #[test]
    fn contains_any_is_case_insensitive() {
        let out = CommandOutput::failed(1, "", "No Server running on /tmp/x");
        assert!(out.contains_any(&["no server"]));
    }

    #[test]
    fn process_runner_captures_output_and_code() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        let out = runner
            .run(&cancel, "sh", &sh("printf hello; printf oops >&2; exit 3"))
            .expect("run sh");
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "oops");
    }

    #[test]
    fn process_runner_missing_binary() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        let err = runner
            .run(&cancel, "muxkit-definitely-not-a-binary", &[])
            .expect_err("should fail");
        assert!(matches!(err, MuxError::BinaryNotFound(name) if name == "muxkit-definitely-not-a-binary"));
    }

    #[test]
    fn process_runner_pre_cancelled_does_not_spawn() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = runner
            .run(&cancel, "sh", &sh("exit 0"))
            .expect_err("cancelled");
        assert!(matches!(err, MuxError::Cancelled));
    }

    #[test]
    fn process_runner_kills_on_cancel() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let killer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        let err = runner
            .run(&cancel, "sh", &sh("exec sleep 30"))
            .expect_err("cancelled");
        killer.join().expect("join");
        assert!(matches!(err, MuxError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}

//! Scripted [`CommandRunner`] for tests in this and sibling crates.
//!
//! Expectations are consumed strictly in order. An unexpected argv panics
//! with both the expected and actual command lines so failures read well.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::error::{MuxError, Result};
use crate::exec::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
pub struct Reply {
    output: CommandOutput,
}

impl Reply {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            output: CommandOutput::ok(stdout),
        }
    }

    pub fn empty() -> Self {
        Self::ok("")
    }

    /// Nonzero exit with `stderr` as the diagnostic text.
    pub fn fail(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            output: CommandOutput::failed(code, "", stderr),
        }
    }
}

#[derive(Debug)]
enum Matcher {
    Exact(Vec<String>),
    Any,
}

#[derive(Debug, Default)]
pub struct FakeRunner {
    script: Mutex<VecDeque<(Matcher, Reply)>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect the next call to have exactly `args` (program excluded).
    #[must_use]
    pub fn on<S: AsRef<str>>(self, args: &[S], reply: Reply) -> Self {
        let args = args.iter().map(|s| s.as_ref().to_string()).collect();
        self.push(Matcher::Exact(args), reply)
    }

    /// Accept any argv for the next call.
    #[must_use]
    pub fn on_any(self, reply: Reply) -> Self {
        self.push(Matcher::Any, reply)
    }

    fn push(self, matcher: Matcher, reply: Reply) -> Self {
        lock(&self.script).push_back((matcher, reply));
        self
    }

    /// Every argv seen so far, program excluded.
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Panic if scripted replies remain unconsumed.
    pub fn assert_done(&self) {
        let remaining = lock(&self.script);
        assert!(
            remaining.is_empty(),
            "{} scripted call(s) never happened: {:?}",
            remaining.len(),
            remaining.iter().map(|(m, _)| m).collect::<Vec<_>>()
        );
    }

    fn next(&self, cancel: &CancellationToken, args: &[String]) -> Result<CommandOutput> {
        if cancel.is_cancelled() {
            return Err(MuxError::Cancelled);
        }
        lock(&self.calls).push(args.to_vec());
        let Some((matcher, reply)) = lock(&self.script).pop_front() else {
            panic!("unexpected call: {}", args.join(" "));
        };
        if let Matcher::Exact(expected) = &matcher {
            assert_eq!(
                expected.join(" "),
                args.join(" "),
                "argv mismatch at call #{}",
                self.call_count()
            );
        }
        Ok(reply.output)
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        cancel: &CancellationToken,
        _program: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        self.next(cancel, args)
    }

    fn run_interactive(
        &self,
        cancel: &CancellationToken,
        _program: &str,
        args: &[String],
    ) -> Result<Option<i32>> {
        self.next(cancel, args).map(|out| out.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::argv;

    #[test]
    fn replays_in_order_and_records() {
        let fake = FakeRunner::new()
            .on(&["has-session", "-t", "dev"], Reply::empty())
            .on_any(Reply::fail(1, "no server running"));
        let cancel = CancellationToken::new();
        let first = fake
            .run(&cancel, "tmux", &argv(&["has-session", "-t", "dev"]))
            .expect("first");
        assert!(first.success());
        let second = fake
            .run(&cancel, "tmux", &argv(&["list-sessions"]))
            .expect("second");
        assert_eq!(second.code, Some(1));
        assert_eq!(fake.call_count(), 2);
        fake.assert_done();
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let fake = FakeRunner::new().on_any(Reply::empty());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fake.run(&cancel, "tmux", &[]).expect_err("cancelled");
        assert!(matches!(err, MuxError::Cancelled));
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    #[should_panic(expected = "unexpected call")]
    fn unscripted_call_panics() {
        let fake = FakeRunner::new();
        let _ = fake.run(&CancellationToken::new(), "tmux", &argv(&["ls"]));
    }
}

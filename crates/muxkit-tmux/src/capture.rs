//! Pane capture.

use muxkit_core::{CancellationToken, MuxError, Result};

use crate::executor::{TmuxClient, is_benign_absence};

/// Split captured text into lines, dropping only the trailing newline.
/// Blank output is no lines at all.
fn split_capture(raw: &str) -> Vec<String> {
    let raw = raw.trim_end_matches('\n');
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split('\n').map(str::to_string).collect()
}

fn keep_last(mut lines: Vec<String>, n: usize) -> Vec<String> {
    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }
    lines
}

impl TmuxClient {
    /// The last `lines` lines of `target`.
    ///
    /// The alternate screen is tried first so full-screen programs show what
    /// they are drawing; when that fails or is blank the primary screen is
    /// read with a scroll range of exactly `lines`.
    pub fn capture_lines(
        &self,
        cancel: &CancellationToken,
        target: &str,
        lines: usize,
    ) -> Result<Vec<String>> {
        let target = target.trim();
        if target.is_empty() {
            return Err(MuxError::validation("pane target is required"));
        }
        if lines == 0 {
            return Ok(Vec::new());
        }

        let alt = self.exec(
            cancel,
            &["capture-pane", "-p", "-J", "-e", "-a", "-t", target, "-S", "0", "-E", "-"],
        )?;
        if alt.success() {
            let parsed = split_capture(&alt.stdout);
            if !parsed.is_empty() {
                return Ok(keep_last(parsed, lines));
            }
        }

        let start = format!("-{lines}");
        let primary = self.exec(
            cancel,
            &["capture-pane", "-p", "-J", "-e", "-t", target, "-S", &start, "-E", "-"],
        )?;
        if is_benign_absence(&primary) {
            return Ok(Vec::new());
        }
        if !primary.success() {
            return Err(MuxError::tool("tmux", "capture-pane", &primary));
        }
        Ok(keep_last(split_capture(&primary.stdout), lines))
    }
}

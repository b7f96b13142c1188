//! `list-panes -F` formats and their parsers.
//!
//! Pane inspection walks [`PaneFormat::LADDER`] from richest to most basic.
//! Each tier has its own column layout and is parsed with its own
//! column-count check; short rows are skipped, never fatal.

use chrono::{DateTime, Utc};
use muxkit_core::PaneInfo;
use tracing::warn;

const FULL_FIELDS: &[&str] = &[
    "#{pane_id}",
    "#{pane_index}",
    "#{pane_active}",
    "#{pane_title}",
    "#{pane_current_command}",
    "#{pane_start_command}",
    "#{pane_pid}",
    "#{pane_left}",
    "#{pane_top}",
    "#{pane_width}",
    "#{pane_height}",
    "#{pane_dead}",
    "#{pane_dead_status}",
    "#{pane_last_active}",
];

const LEGACY_FIELDS: &[&str] = &[
    "#{pane_id}",
    "#{pane_index}",
    "#{pane_active}",
    "#{pane_title}",
    "#{pane_current_command}",
    "#{pane_start_command}",
    "#{pane_left}",
    "#{pane_top}",
    "#{pane_width}",
    "#{pane_height}",
    "#{pane_dead}",
    "#{pane_dead_status}",
    "#{pane_last_active}",
];

const BASIC_FIELDS: &[&str] = &[
    "#{pane_id}",
    "#{pane_index}",
    "#{pane_active}",
    "#{pane_title}",
    "#{pane_current_command}",
    "#{pane_left}",
    "#{pane_top}",
    "#{pane_width}",
    "#{pane_height}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFormat {
    /// Everything, including the pane pid.
    Full,
    /// Full without `pane_pid`, for older servers.
    Legacy,
    /// Identity and geometry only.
    Basic,
}

impl PaneFormat {
    pub const LADDER: [Self; 3] = [Self::Full, Self::Legacy, Self::Basic];

    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Full => FULL_FIELDS,
            Self::Legacy => LEGACY_FIELDS,
            Self::Basic => BASIC_FIELDS,
        }
    }

    /// Tab-joined `-F` argument.
    pub fn format_string(self) -> String {
        self.fields().join("\t")
    }

    pub fn columns(self) -> usize {
        self.fields().len()
    }

    /// Parse one row, or `None` when it has too few columns.
    pub fn parse_row(self, line: &str) -> Option<PaneInfo> {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < self.columns() {
            return None;
        }
        let field = |i: usize| parts[i].trim();
        // Column offsets after the shared identity prefix.
        let (geo, dead) = match self {
            Self::Full => (7, Some(11)),
            Self::Legacy => (6, Some(10)),
            Self::Basic => (5, None),
        };

        let command = field(4).to_string();
        let mut title = field(3).to_string();
        if title.is_empty() {
            title = command.clone();
        }
        let mut pane = PaneInfo {
            id: field(0).to_string(),
            index: field(1).to_string(),
            active: field(2) == "1",
            title,
            command,
            left: parse_u32(field(geo)),
            top: parse_u32(field(geo + 1)),
            width: parse_u32(field(geo + 2)),
            height: parse_u32(field(geo + 3)),
            ..PaneInfo::default()
        };
        if let Some(d) = dead {
            pane.dead = field(d) == "1";
            pane.dead_status = field(d + 1).parse().unwrap_or(0);
            pane.last_active = parse_unix(field(d + 2));
        }
        Some(pane)
    }
}

/// Parse every row of a `list-panes` reply in `format`.
pub fn parse_panes(format: PaneFormat, output: &str) -> Vec<PaneInfo> {
    let mut panes = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match format.parse_row(line) {
            Some(pane) => panes.push(pane),
            None => warn!(
                ?format,
                line = idx + 1,
                "skipping list-panes row with fewer than {} fields",
                format.columns()
            ),
        }
    }
    panes
}

fn parse_u32(s: &str) -> u32 {
    s.parse().unwrap_or(0)
}

fn parse_unix(s: &str) -> Option<DateTime<Utc>> {
    match s.parse::<i64>() {
        Ok(secs) if secs > 0 => DateTime::from_timestamp(secs, 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_row() {
        let line = "%3\t1\t1\teditor\tnvim\tnvim .\t4242\t0\t0\t120\t40\t0\t0\t1700000000";
        let pane = PaneFormat::Full.parse_row(line).expect("should parse");
        assert_eq!(pane.id, "%3");
        assert_eq!(pane.index, "1");
        assert!(pane.active);
        assert_eq!(pane.title, "editor");
        assert_eq!(pane.command, "nvim");
        assert_eq!((pane.left, pane.top, pane.width, pane.height), (0, 0, 120, 40));
        assert!(!pane.dead);
        assert_eq!(
            pane.last_active.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn legacy_row_has_no_pid_column() {
        let line = "%4\t2\t0\t\tzsh\t\t121\t0\t60\t40\t1\t130\t0";
        let pane = PaneFormat::Legacy.parse_row(line).expect("should parse");
        assert_eq!(pane.left, 121);
        assert_eq!(pane.width, 60);
        assert!(pane.dead);
        assert_eq!(pane.dead_status, 130);
        assert!(pane.last_active.is_none());
        // Empty title falls back to the command.
        assert_eq!(pane.title, "zsh");
    }

    #[test]
    fn basic_row() {
        let line = "%0\t0\t1\tmain\tbash\t0\t0\t80\t24";
        let pane = PaneFormat::Basic.parse_row(line).expect("should parse");
        assert_eq!(pane.id, "%0");
        assert_eq!((pane.width, pane.height), (80, 24));
        assert!(!pane.dead);
    }

    #[test]
    fn short_rows_are_skipped() {
        let output = "%0\t0\t1\tmain\tbash\t0\t0\t80\t24\n%1\t1\t0\n\n%2\t2\t0\tlogs\ttail\t0\t25\t80\t24\n";
        let panes = parse_panes(PaneFormat::Basic, output);
        assert_eq!(panes.len(), 2);
        assert_eq!(panes[1].id, "%2");
        // A basic row is too short for the full tier.
        assert!(parse_panes(PaneFormat::Full, output).is_empty());
    }

    #[test]
    fn trailing_empty_field_is_kept() {
        // An empty last_active must not drop the row below the column count.
        let line = "%3\t1\t1\tt\tc\ts\t1\t0\t0\t10\t10\t0\t0\t";
        assert!(PaneFormat::Full.parse_row(line).is_some());
    }

    #[test]
    fn format_strings_match_columns() {
        for format in PaneFormat::LADDER {
            assert_eq!(
                format.format_string().split('\t').count(),
                format.columns()
            );
        }
        assert_eq!(PaneFormat::Full.columns(), 14);
        assert_eq!(PaneFormat::Legacy.columns(), 13);
        assert_eq!(PaneFormat::Basic.columns(), 9);
    }
}

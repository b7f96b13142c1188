//! `session:index` addressing and key translation.

use muxkit_core::{MuxError, Result};

/// Split on the first `:`. A target without one is a bare session.
pub fn split_target(target: &str) -> (&str, &str) {
    let target = target.trim();
    match target.split_once(':') {
        Some((session, rest)) => (session.trim(), rest.trim()),
        None => (target, ""),
    }
}

/// `session:paneId` with a numeric pane id.
pub fn split_session_pane(target: &str) -> Result<(&str, u32)> {
    let (session, pane) = split_target(target);
    if session.is_empty() {
        return Err(MuxError::validation("session is required"));
    }
    if pane.is_empty() {
        return Err(MuxError::validation("pane id is required"));
    }
    let id = pane
        .parse()
        .map_err(|_| MuxError::validation(format!("invalid pane id {pane:?}")))?;
    Ok((session, id))
}

pub fn parse_tab_position(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(MuxError::validation("tab index is required"));
    }
    raw.parse()
        .map_err(|_| MuxError::validation(format!("invalid tab index {raw:?}")))
}

/// Translate tmux-style key names into literal text for the plugin.
pub fn keys_to_text(keys: &[&str]) -> String {
    let mut text = String::new();
    for key in keys {
        match *key {
            "Enter" | "C-m" => text.push('\n'),
            "C-c" => text.push('\u{3}'),
            other => text.push_str(other),
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_on_first_colon() {
        assert_eq!(split_target("api:3"), ("api", "3"));
        assert_eq!(split_target(" api "), ("api", ""));
        assert_eq!(split_target("a:b:c"), ("a", "b:c"));
        assert_eq!(split_target(""), ("", ""));
    }

    #[test]
    fn pane_address_validation() {
        assert_eq!(split_session_pane("api:12").expect("valid"), ("api", 12));
        for bad in ["api", ":3", "api:x", "api:-1"] {
            assert!(
                matches!(split_session_pane(bad), Err(MuxError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn tab_position() {
        assert_eq!(parse_tab_position(" 2 ").expect("valid"), 2);
        assert!(parse_tab_position("").is_err());
        assert!(parse_tab_position("main").is_err());
    }

    #[test]
    fn named_keys_become_control_text() {
        assert_eq!(keys_to_text(&["ls -la", "Enter"]), "ls -la\n");
        assert_eq!(keys_to_text(&["C-c"]), "\u{3}");
        assert_eq!(keys_to_text(&["echo", " hi", "C-m"]), "echo hi\n");
        assert_eq!(keys_to_text(&[]), "");
    }
}

//! Environment lookup used for "am I inside a session" detection.
//!
//! Clients read variables through [`Environment`] instead of `std::env`
//! directly so tests can supply a fixed set without mutating the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct Environment {
    fixed: Option<HashMap<String, String>>,
}

impl Environment {
    /// Read from the real process environment.
    pub fn process() -> Self {
        Self { fixed: None }
    }

    /// A frozen environment with no variables set.
    pub fn empty() -> Self {
        Self {
            fixed: Some(HashMap::new()),
        }
    }

    /// A frozen environment containing only `pairs`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fixed: Some(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Trimmed, non-empty value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = match &self.fixed {
            Some(map) => map.get(key).cloned(),
            None => std::env::var(key).ok(),
        }?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn home_dir(&self) -> Option<PathBuf> {
        match &self.fixed {
            Some(_) => self.get("HOME").map(PathBuf::from),
            None => dirs::home_dir(),
        }
    }

    /// Per-user config root. A fixed environment uses `XDG_CONFIG_HOME`,
    /// then `$HOME/.config`.
    pub fn config_dir(&self) -> Option<PathBuf> {
        match &self.fixed {
            Some(_) => self
                .get("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| self.home_dir().map(|h| h.join(".config"))),
            None => dirs::config_dir(),
        }
    }

    /// Expand a leading `~` or `~/` against the home directory.
    pub fn expand_user_path(&self, raw: &str) -> PathBuf {
        let raw = raw.trim();
        if raw == "~" {
            if let Some(home) = self.home_dir() {
                return home;
            }
        } else if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = self.home_dir() {
                return home.join(rest);
            }
        }
        Path::new(raw).to_path_buf()
    }

    /// Locate `name` on `PATH`. Names containing a separator are returned as-is
    /// when they point at an existing file.
    pub fn find_executable(&self, name: &str) -> Option<PathBuf> {
        if name.contains(std::path::MAIN_SEPARATOR) {
            let path = PathBuf::from(name);
            return path.is_file().then_some(path);
        }
        let path_var = self.get("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

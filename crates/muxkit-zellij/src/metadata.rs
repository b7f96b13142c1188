//! Session→path map for sessions created through muxkit.
//!
//! zellij does not expose a session's working directory, so the path given
//! at creation time is remembered in `sessions.json` under the bridge dir.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use muxkit_core::{MuxError, Result, require_session};
use serde::{Deserialize, Serialize};

use crate::fsutil::write_atomic;

pub const METADATA_FILE: &str = "sessions.json";

pub fn metadata_path(bridge_dir: &Path) -> PathBuf {
    bridge_dir.join(METADATA_FILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub path: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadataStore {
    #[serde(default)]
    pub sessions: BTreeMap<String, SessionMetadata>,
}

impl SessionMetadataStore {
    /// A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| {
            MuxError::config(format!("parse session metadata {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| MuxError::config(format!("encode session metadata: {e}")))?;
        write_atomic(path, &data)
    }
}

/// Remember `project_path` for `session`. An unreadable store is replaced.
pub fn record_session_path(metadata: &Path, session: &str, project_path: &str) -> Result<()> {
    let session = require_session(session)?;
    let mut store = SessionMetadataStore::load(metadata).unwrap_or_default();
    store.sessions.insert(
        session.to_string(),
        SessionMetadata {
            path: project_path.to_string(),
            updated_at: Utc::now(),
        },
    );
    store.save(metadata)
}

/// Sessions with a non-empty recorded path.
pub fn load_session_paths(metadata: &Path) -> Result<HashMap<String, String>> {
    let store = SessionMetadataStore::load(metadata)?;
    Ok(store
        .sessions
        .into_iter()
        .filter(|(_, meta)| !meta.path.is_empty())
        .map(|(name, meta)| (name, meta.path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = metadata_path(dir.path());
        record_session_path(&path, "api", "/srv/api").expect("record api");
        record_session_path(&path, "blank", "").expect("record blank");
        record_session_path(&path, "api", "/srv/api-v2").expect("overwrite");

        let paths = load_session_paths(&path).expect("load");
        assert_eq!(paths.len(), 1);
        assert_eq!(paths.get("api").map(String::as_str), Some("/srv/api-v2"));
    }

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = load_session_paths(&metadata_path(dir.path())).expect("load");
        assert!(paths.is_empty());
    }

    #[test]
    fn corrupt_store_is_config_error_and_replaced_on_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = metadata_path(dir.path());
        std::fs::write(&path, "{not json").expect("write");
        assert!(matches!(load_session_paths(&path), Err(MuxError::Config(_))));

        record_session_path(&path, "api", "/srv/api").expect("record");
        assert_eq!(load_session_paths(&path).expect("load").len(), 1);
    }

    #[test]
    fn empty_session_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = record_session_path(&metadata_path(dir.path()), " ", "/x").expect_err("invalid");
        assert!(matches!(err, MuxError::Validation(_)));
    }
}

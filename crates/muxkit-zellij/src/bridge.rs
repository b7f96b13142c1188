//! Bridge plugin provisioning.
//!
//! The plugin ships inside the binary and is written out on demand. An
//! existing file with the same SHA-256 is left alone.

use std::path::{Path, PathBuf};

use muxkit_core::Result;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::fsutil::write_atomic;

pub const BRIDGE_FILE_NAME: &str = "muxkit-bridge.wasm";

/// The bundled plugin build.
pub static BRIDGE_WASM: &[u8] = include_bytes!("../assets/muxkit-bridge.wasm");

pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeInstall {
    pub path: PathBuf,
    /// False when the file on disk already matched.
    pub written: bool,
}

/// Install the bundled plugin into `dir`.
pub fn ensure_bridge_plugin(dir: &Path) -> Result<BridgeInstall> {
    install_bridge(dir, BRIDGE_WASM)
}

/// Install `asset` as the bridge plugin in `dir`, skipping the write when
/// the current file hashes the same.
pub fn install_bridge(dir: &Path, asset: &[u8]) -> Result<BridgeInstall> {
    let path = dir.join(BRIDGE_FILE_NAME);
    let wanted = content_hash(asset);
    match std::fs::read(&path) {
        Ok(existing) if content_hash(&existing) == wanted => {
            debug!(path = %path.display(), "bridge plugin up to date");
            return Ok(BridgeInstall {
                path,
                written: false,
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    write_atomic(&path, asset)?;
    info!(path = %path.display(), sha256 = %wanted, "installed bridge plugin");
    Ok(BridgeInstall {
        path,
        written: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_asset_is_wasm() {
        assert!(BRIDGE_WASM.starts_with(b"\0asm"));
    }

    #[test]
    fn second_install_skips_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = install_bridge(dir.path(), b"plugin-v1").expect("first");
        assert!(first.written);
        let modified = std::fs::metadata(&first.path)
            .and_then(|m| m.modified())
            .expect("mtime");

        let second = install_bridge(dir.path(), b"plugin-v1").expect("second");
        assert!(!second.written);
        assert_eq!(second.path, first.path);
        let after = std::fs::metadata(&second.path)
            .and_then(|m| m.modified())
            .expect("mtime");
        assert_eq!(modified, after);
    }

    #[test]
    fn changed_content_is_rewritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        install_bridge(dir.path(), b"plugin-v1").expect("v1");
        let upgrade = install_bridge(dir.path(), b"plugin-v2").expect("v2");
        assert!(upgrade.written);
        assert_eq!(std::fs::read(&upgrade.path).expect("read"), b"plugin-v2");
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

//! Global and project-local settings.
//!
//! These are plain data handed to the clients and the layout compiler.
//! A missing file is an empty config; a file that exists but does not parse
//! is a [`MuxError::Config`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::env::Environment;
use crate::error::{MuxError, Result};
use crate::layout::LayoutConfig;

pub const CONFIG_DIR_ENV: &str = "MUXKIT_CONFIG_DIR";
pub const PROJECT_LOCAL_FILE: &str = ".muxkit.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZellijSection {
    /// Base zellij config to augment. Defaults to zellij's own lookup.
    pub config: Option<String>,
    pub layout_dir: Option<String>,
    /// Override for the bridge plugin location (path or URL).
    pub bridge_plugin: Option<String>,
}

/// Either the name of a layout defined elsewhere or an inline layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutSelection {
    Name(String),
    Inline(Box<LayoutConfig>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub session: String,
    pub path: String,
    pub multiplexer: Option<String>,
    pub layout: Option<LayoutSelection>,
    pub vars: BTreeMap<String, String>,
}

impl ProjectConfig {
    /// Session name, falling back to the project name.
    pub fn session_name(&self) -> &str {
        let session = self.session.trim();
        if session.is_empty() {
            self.name.trim()
        } else {
            session
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub multiplexer: Option<String>,
    pub zellij: ZellijSection,
    pub layouts: BTreeMap<String, LayoutConfig>,
    pub projects: Vec<ProjectConfig>,
}

/// `.muxkit.toml` in a project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectLocalConfig {
    pub session: Option<String>,
    pub multiplexer: Option<String>,
    pub layout: Option<LayoutSelection>,
}

fn load_toml<T>(path: &Path) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    toml::from_str(&text).map_err(|e| MuxError::config(format!("{}: {e}", path.display())))
}

impl GlobalConfig {
    pub fn default_path(env: &Environment) -> Option<PathBuf> {
        if let Some(dir) = env.get(CONFIG_DIR_ENV) {
            return Some(env.expand_user_path(&dir).join("config.toml"));
        }
        env.config_dir().map(|d| d.join("muxkit").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_toml(path)
    }

    /// Project whose name or session matches `key`, or whose path equals `dir`.
    pub fn find_project(&self, key: Option<&str>, dir: Option<&Path>) -> Option<&ProjectConfig> {
        let env = Environment::process();
        self.projects.iter().find(|p| {
            let by_key = key.is_some_and(|k| p.name == k || p.session_name() == k);
            let by_dir = dir.is_some_and(|d| {
                !p.path.trim().is_empty() && env.expand_user_path(&p.path) == d
            });
            by_key || by_dir
        })
    }

    /// Resolve a selection to a layout: inline as-is, names via `layouts`.
    pub fn resolve_layout(&self, selection: &LayoutSelection) -> Result<LayoutConfig> {
        match selection {
            LayoutSelection::Inline(layout) => Ok((**layout).clone()),
            LayoutSelection::Name(name) => {
                let mut layout = self
                    .layouts
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MuxError::config(format!("unknown layout {name:?}")))?;
                if layout.name.is_empty() {
                    layout.name = name.clone();
                }
                Ok(layout)
            }
        }
    }
}

impl ProjectLocalConfig {
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        load_toml(&dir.join(PROJECT_LOCAL_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL: &str = r#"
multiplexer = "zellij"

[zellij]
config = "~/.config/zellij/config.kdl"

[layouts.quad]
grid = "2x2"
command = "htop"

[[projects]]
name = "api"
path = "/srv/api"
layout = "quad"

[[projects]]
name = "web"
session = "web-dev"
multiplexer = "tmux"

[projects.layout]
grid = "1x2"
"#;

    #[test]
    fn parses_global_config() {
        let cfg: GlobalConfig = toml::from_str(GLOBAL).expect("parse");
        assert_eq!(cfg.multiplexer.as_deref(), Some("zellij"));
        assert_eq!(cfg.zellij.config.as_deref(), Some("~/.config/zellij/config.kdl"));
        assert_eq!(cfg.projects.len(), 2);
        assert_eq!(
            cfg.projects[0].layout,
            Some(LayoutSelection::Name("quad".into()))
        );
        assert!(matches!(
            cfg.projects[1].layout,
            Some(LayoutSelection::Inline(_))
        ));
    }

    #[test]
    fn resolves_named_and_inline_layouts() {
        let cfg: GlobalConfig = toml::from_str(GLOBAL).expect("parse");
        let named = cfg
            .resolve_layout(&LayoutSelection::Name("quad".into()))
            .expect("quad");
        assert_eq!(named.name, "quad");
        assert_eq!(named.command.as_deref(), Some("htop"));

        let inline = cfg.projects[1].layout.as_ref().expect("inline");
        assert_eq!(cfg.resolve_layout(inline).expect("inline").grid.as_deref(), Some("1x2"));

        let err = cfg
            .resolve_layout(&LayoutSelection::Name("nope".into()))
            .expect_err("missing");
        assert!(matches!(err, MuxError::Config(_)));
    }

    #[test]
    fn find_project_by_name_session_or_path() {
        let cfg: GlobalConfig = toml::from_str(GLOBAL).expect("parse");
        assert_eq!(cfg.find_project(Some("api"), None).map(|p| p.name.as_str()), Some("api"));
        assert_eq!(cfg.find_project(Some("web-dev"), None).map(|p| p.name.as_str()), Some("web"));
        assert_eq!(
            cfg.find_project(None, Some(Path::new("/srv/api"))).map(|p| p.name.as_str()),
            Some("api")
        );
        assert!(cfg.find_project(Some("other"), None).is_none());
        assert_eq!(cfg.projects[0].session_name(), "api");
    }

    #[test]
    fn missing_files_are_empty_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let global = GlobalConfig::load(&dir.path().join("config.toml")).expect("load");
        assert_eq!(global, GlobalConfig::default());
        let local = ProjectLocalConfig::load_from_dir(dir.path()).expect("load");
        assert_eq!(local, ProjectLocalConfig::default());
    }

    #[test]
    fn project_local_config_loads() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_LOCAL_FILE),
            "session = \"mine\"\nmultiplexer = \"zellij\"\nlayout = \"quad\"\n",
        )
        .expect("write");
        let local = ProjectLocalConfig::load_from_dir(dir.path()).expect("load");
        assert_eq!(local.session.as_deref(), Some("mine"));
        assert_eq!(local.multiplexer.as_deref(), Some("zellij"));
        assert_eq!(local.layout, Some(LayoutSelection::Name("quad".into())));
    }

    #[test]
    fn unparseable_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "multiplexer = [").expect("write");
        let err = GlobalConfig::load(&path).expect_err("bad toml");
        assert!(matches!(err, MuxError::Config(_)));
    }

    #[test]
    fn default_path_honours_env() {
        let env = Environment::from_pairs([(CONFIG_DIR_ENV, "/etc/muxkit")]);
        assert_eq!(
            GlobalConfig::default_path(&env),
            Some(PathBuf::from("/etc/muxkit/config.toml"))
        );
    }
}

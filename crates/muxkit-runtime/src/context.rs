//! Config loading and the per-invocation settings derived from it.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use muxkit_core::config::{GlobalConfig, LayoutSelection, ProjectConfig, ProjectLocalConfig};
use muxkit_core::{Environment, GridSpec, LayoutConfig, MuxType, resolve_type};

pub struct Context {
    pub env: Environment,
    pub global: GlobalConfig,
    /// `.muxkit.toml` of the project directory in use.
    pub local: ProjectLocalConfig,
    pub cwd: PathBuf,
    cli_mux: Option<String>,
}

impl Context {
    /// Load the global config (explicit path or default location) and the
    /// project-local config of `cwd`. Missing files are empty configs.
    pub fn load(
        cli_mux: Option<String>,
        config_path: Option<&Path>,
        env: Environment,
        cwd: PathBuf,
    ) -> anyhow::Result<Self> {
        let global = match config_path
            .map(Path::to_path_buf)
            .or_else(|| GlobalConfig::default_path(&env))
        {
            Some(path) => GlobalConfig::load(&path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => GlobalConfig::default(),
        };
        let local = ProjectLocalConfig::load_from_dir(&cwd)
            .with_context(|| format!("loading project config in {}", cwd.display()))?;
        Ok(Self {
            env,
            global,
            local,
            cwd,
            cli_mux,
        })
    }

    /// Project matching `key` by name or session, else the one whose path
    /// is the current directory.
    pub fn project(&self, key: Option<&str>) -> Option<&ProjectConfig> {
        match key {
            Some(key) => self.global.find_project(Some(key), None),
            None => self.global.find_project(None, Some(&self.cwd)),
        }
    }

    /// Multiplexer for `project`: CLI, then `.muxkit.toml`, then the
    /// project entry, then the global setting.
    pub fn mux_for(&self, project: Option<&ProjectConfig>) -> MuxType {
        resolve_type(
            self.cli_mux.as_deref(),
            self.global.multiplexer.as_deref(),
            project.and_then(|p| p.multiplexer.as_deref()),
            self.local.multiplexer.as_deref(),
        )
    }

    /// A layout file when `raw` names an existing file, otherwise a layout
    /// from the global config.
    pub fn layout_by_name(&self, raw: &str) -> anyhow::Result<LayoutConfig> {
        let path = self.env.expand_user_path(raw);
        let path = if path.is_relative() { self.cwd.join(path) } else { path };
        if path.is_file() {
            return LayoutConfig::load(&path).with_context(|| format!("loading {}", path.display()));
        }
        Ok(self
            .global
            .resolve_layout(&LayoutSelection::Name(raw.to_string()))?)
    }

    /// Layout for `up`: `--grid`, then `--layout`, then `.muxkit.toml`, then
    /// the project entry, then a default 2x2 grid.
    pub fn select_layout(
        &self,
        grid: Option<&str>,
        layout: Option<&str>,
        project: Option<&ProjectConfig>,
    ) -> anyhow::Result<LayoutConfig> {
        if let Some(raw) = grid {
            return Ok(LayoutConfig::grid(GridSpec::parse(raw)?));
        }
        if let Some(name) = layout {
            return self.layout_by_name(name);
        }
        let selection = self
            .local
            .layout
            .as_ref()
            .or_else(|| project.and_then(|p| p.layout.as_ref()));
        match selection {
            Some(LayoutSelection::Name(name)) => self.layout_by_name(name),
            Some(inline) => Ok(self.global.resolve_layout(inline)?),
            None => Ok(LayoutConfig::grid(GridSpec::default())),
        }
    }
}

/// Session name derived from a directory. tmux reserves `.` and `:`.
pub fn session_from_dir(dir: &Path) -> String {
    let base = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string());
    sanitize_session(&base)
}

pub fn sanitize_session(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c == '.' || c == ':' || c.is_whitespace() { '-' } else { c })
        .collect()
}

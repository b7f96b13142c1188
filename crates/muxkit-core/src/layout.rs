//! Declarative layout model.
//!
//! A [`LayoutConfig`] is either grid-driven (`grid = "2x3"` plus flat
//! per-pane commands and titles) or an explicit list of windows, each with
//! ordered panes. The compilers in `muxkit-layout` consume it read-only.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::env::Environment;
use crate::error::{MuxError, Result};
use crate::grid::GridSpec;

// ─── Split direction / algorithm ──────────────────────────────────

/// Direction of a split. `Horizontal` places children side by side,
/// `Vertical` stacks them top to bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitDirection {
    #[default]
    Horizontal,
    Vertical,
}

impl SplitDirection {
    /// Lenient parse: `v`/`vertical` is vertical, anything else horizontal.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "v" | "vertical" => Self::Vertical,
            _ => Self::Horizontal,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
        }
    }
}

impl fmt::Display for SplitDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitAlgorithm {
    EvenHorizontal,
    EvenVertical,
    MainHorizontal,
    MainVertical,
    #[default]
    Tiled,
}

impl SplitAlgorithm {
    pub const ALL: [Self; 5] = [
        Self::EvenHorizontal,
        Self::EvenVertical,
        Self::MainHorizontal,
        Self::MainVertical,
        Self::Tiled,
    ];

    /// Unrecognized names select `Tiled`.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EvenHorizontal => "even-horizontal",
            Self::EvenVertical => "even-vertical",
            Self::MainHorizontal => "main-horizontal",
            Self::MainVertical => "main-vertical",
            Self::Tiled => "tiled",
        }
    }
}

impl fmt::Display for SplitAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitAlgorithm {
    type Err = MuxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == wanted)
            .ok_or_else(|| MuxError::validation(format!("unknown layout algorithm: {s}")))
    }
}

// ─── Layout records ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneDef {
    pub title: String,
    pub cmd: String,
    /// Percent, `"30%"` or `"30"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// `horizontal` or `vertical`; how this pane splits off the previous one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split: Option<String>,
}

impl PaneDef {
    pub fn direction(&self) -> SplitDirection {
        self.split
            .as_deref()
            .map(SplitDirection::parse_lenient)
            .unwrap_or_default()
    }

    pub fn size_percent(&self) -> Option<u32> {
        self.size.as_deref().and_then(parse_percent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDef {
    pub name: String,
    /// Named split algorithm. Absent means sequential splits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub panes: Vec<PaneDef>,
}

impl WindowDef {
    pub fn algorithm(&self) -> Option<SplitAlgorithm> {
        self.layout
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SplitAlgorithm::parse_lenient)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub name: String,
    pub description: String,
    pub vars: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<String>,
    /// Window/tab name used in grid mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    /// Run in every grid pane without a per-pane command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub commands: Vec<String>,
    pub titles: Vec<String>,
    pub windows: Vec<WindowDef>,
}

/// Which of the two layout shapes a config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode<'a> {
    Grid(GridSpec),
    Windows(&'a [WindowDef]),
}

impl LayoutConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MuxError::config(format!("parse layout: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut layout = Self::from_toml_str(&text)
            .map_err(|e| MuxError::config(format!("{}: {e}", path.display())))?;
        if layout.name.trim().is_empty() {
            if let Some(stem) = path.file_stem() {
                layout.name = stem.to_string_lossy().into_owned();
            }
        }
        Ok(layout)
    }

    /// A grid-only layout, as `muxkit up --grid 2x3` builds.
    pub fn grid(spec: GridSpec) -> Self {
        Self {
            grid: Some(spec.to_string()),
            ..Self::default()
        }
    }

    /// Grid wins when set. A config with neither a grid nor windows is a
    /// default 2x2 grid.
    pub fn mode(&self) -> Result<LayoutMode<'_>> {
        match self.grid.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Ok(LayoutMode::Grid(GridSpec::parse(raw)?)),
            _ if !self.windows.is_empty() => Ok(LayoutMode::Windows(&self.windows)),
            _ => Ok(LayoutMode::Grid(GridSpec::default())),
        }
    }

    /// Per-pane commands for a grid of `count` panes. Missing entries fall
    /// back to `command`, then to empty.
    pub fn grid_commands(&self, count: usize) -> Vec<String> {
        let fallback = self.command.as_deref().map(str::trim).unwrap_or_default();
        (0..count)
            .map(|i| match self.commands.get(i) {
                Some(cmd) => cmd.clone(),
                None => fallback.to_string(),
            })
            .collect()
    }

    pub fn grid_titles(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| self.titles.get(i).cloned().unwrap_or_default())
            .collect()
    }

    /// Window name for grid mode: `window`, then `name`, then `grid`.
    pub fn grid_window_name(&self) -> String {
        [self.window.as_deref(), Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("grid")
            .to_string()
    }

    /// Copy with `${VAR}` references expanded in every command, title and
    /// grid field. `extra` overrides the layout's own `vars`.
    pub fn expand_vars(
        &self,
        extra: &BTreeMap<String, String>,
        project_path: &str,
        project_name: &str,
        env: &Environment,
    ) -> Self {
        let mut vars = self.vars.clone();
        vars.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars.insert("PROJECT_PATH".into(), project_path.into());
        vars.insert("PROJECT_NAME".into(), project_name.into());
        let x = |s: &str| expand_vars(s, &vars, env);

        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            vars: self.vars.clone(),
            grid: self.grid.as_deref().map(x),
            window: self.window.as_deref().map(x),
            command: self.command.as_deref().map(x),
            commands: self.commands.iter().map(|c| x(c)).collect(),
            titles: self.titles.iter().map(|t| x(t)).collect(),
            windows: self
                .windows
                .iter()
                .map(|w| WindowDef {
                    name: x(&w.name),
                    layout: w.layout.clone(),
                    panes: w
                        .panes
                        .iter()
                        .map(|p| PaneDef {
                            title: x(&p.title),
                            cmd: x(&p.cmd),
                            size: p.size.clone(),
                            split: p.split.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("static regex")
});

/// Expand `${VAR}` and `${VAR:-default}`. Lookup order: `vars`, then the
/// environment, then the inline default. `$HOME` and a leading `~` are
/// expanded afterwards.
pub fn expand_vars(input: &str, vars: &BTreeMap<String, String>, env: &Environment) -> String {
    let replaced = VAR_PATTERN.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        vars.get(name)
            .filter(|v| !v.is_empty())
            .cloned()
            .or_else(|| env.get(name))
            .unwrap_or_else(|| caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string())
    });
    let mut out = replaced.into_owned();
    if let Some(home) = env.home_dir() {
        let home = home.to_string_lossy();
        out = out.replace("$HOME", &home);
        if out == "~" {
            out = home.into_owned();
        } else if let Some(rest) = out.strip_prefix("~/") {
            out = format!("{}/{rest}", home.trim_end_matches('/'));
        }
    }
    out
}

/// `"30%"` or `"30"` to 30. Blank, unparseable, zero, or over 100 is `None`.
pub fn parse_percent(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let raw = raw.strip_suffix('%').unwrap_or(raw).trim();
    match raw.parse::<u32>() {
        Ok(n) if (1..=100).contains(&n) => Some(n),
        _ => None,
    }
}

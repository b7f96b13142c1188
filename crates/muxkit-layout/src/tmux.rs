//! tmux layouts as a flat list of steps.
//!
//! tmux has no layout document, so a [`LayoutConfig`] compiles to the
//! commands that build it. Steps refer to panes by creation order (`#0`,
//! `#1`, ..); [`apply`] maps those to real pane ids as they come back.

use std::fmt;

use muxkit_core::{
    CancellationToken, GridSpec, LayoutConfig, LayoutMode, MuxError, Result, SplitAlgorithm,
    SplitDirection, WindowDef,
};
use muxkit_tmux::{SplitRequest, TmuxClient, WindowRequest};
use tracing::{debug, info};

/// Index of a pane in creation order.
pub type PaneRef = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// New session laid out as a grid; creates `grid.pane_count()` panes
    /// in row-major order.
    Grid { grid: GridSpec },
    /// New session whose first window is named `window`; creates one pane.
    NewSession { window: String },
    /// New window in the session; creates one pane.
    NewWindow { window: String },
    /// Split `target`; creates one pane.
    Split {
        target: PaneRef,
        direction: SplitDirection,
        percent: Option<u32>,
    },
    /// Rename the session's first window.
    RenameFirstWindow { name: String },
    SelectLayout {
        target: PaneRef,
        algorithm: SplitAlgorithm,
    },
    Title { pane: PaneRef, title: String },
    /// Type `command` into the pane's shell and press Enter.
    Run { pane: PaneRef, command: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid { grid } => write!(
                f,
                "grid {grid}: new-session, split-window x{}, select-layout tiled",
                grid.pane_count() - 1
            ),
            Self::NewSession { window } => write!(f, "new-session -n {window:?}"),
            Self::NewWindow { window } => write!(f, "new-window -n {window:?}"),
            Self::Split {
                target,
                direction,
                percent,
            } => {
                let flag = match direction {
                    SplitDirection::Vertical => "-v",
                    SplitDirection::Horizontal => "-h",
                };
                write!(f, "split-window {flag} -t #{target}")?;
                if let Some(p) = percent {
                    write!(f, " -p {p}")?;
                }
                Ok(())
            }
            Self::RenameFirstWindow { name } => write!(f, "rename-window -t ^ {name:?}"),
            Self::SelectLayout { target, algorithm } => {
                write!(f, "select-layout -t #{target} {algorithm}")
            }
            Self::Title { pane, title } => write!(f, "select-pane -t #{pane} -T {title:?}"),
            Self::Run { pane, command } => write!(f, "send-keys -t #{pane} {command:?} Enter"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TmuxPlan {
    pub steps: Vec<Step>,
}

impl TmuxPlan {
    /// Panes the plan creates.
    pub fn pane_count(&self) -> usize {
        self.steps
            .iter()
            .map(|s| match s {
                Step::Grid { grid } => grid.pane_count(),
                Step::NewSession { .. } | Step::NewWindow { .. } | Step::Split { .. } => 1,
                _ => 0,
            })
            .sum()
    }

    /// One line per step.
    pub fn describe(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{s}\n"))
            .collect()
    }

    fn labels(&mut self, first: PaneRef, titles: &[String], commands: &[String]) {
        for (i, title) in titles.iter().enumerate() {
            if !title.trim().is_empty() {
                self.steps.push(Step::Title {
                    pane: first + i,
                    title: title.trim().to_string(),
                });
            }
        }
        for (i, command) in commands.iter().enumerate() {
            if !command.trim().is_empty() {
                self.steps.push(Step::Run {
                    pane: first + i,
                    command: command.trim().to_string(),
                });
            }
        }
    }
}

/// Compile `config` into tmux steps.
pub fn plan(config: &LayoutConfig) -> Result<TmuxPlan> {
    let mut plan = TmuxPlan::default();
    match config.mode()? {
        LayoutMode::Grid(grid) => {
            let count = grid.pane_count();
            plan.steps.push(Step::Grid { grid });
            plan.steps.push(Step::RenameFirstWindow {
                name: config.grid_window_name(),
            });
            plan.labels(0, &config.grid_titles(count), &config.grid_commands(count));
        }
        LayoutMode::Windows(windows) => {
            for (i, window) in windows.iter().enumerate() {
                plan_window(&mut plan, window, i == 0);
            }
        }
    }
    Ok(plan)
}

fn plan_window(plan: &mut TmuxPlan, window: &WindowDef, first_window: bool) {
    let first = plan.pane_count();
    let name = window.name.trim().to_string();
    plan.steps.push(if first_window {
        Step::NewSession { window: name }
    } else {
        Step::NewWindow { window: name }
    });

    // Each pane splits off the one created before it.
    let mut active = first;
    for pane in window.panes.iter().skip(1) {
        plan.steps.push(Step::Split {
            target: active,
            direction: pane.direction(),
            percent: pane.size_percent(),
        });
        active += 1;
    }
    if let Some(algorithm) = window.algorithm() {
        plan.steps.push(Step::SelectLayout {
            target: first,
            algorithm,
        });
    }

    let titles: Vec<String> = window.panes.iter().map(|p| p.title.clone()).collect();
    let commands: Vec<String> = window.panes.iter().map(|p| p.cmd.clone()).collect();
    plan.labels(first, &titles, &commands);
}

/// Run `plan` against a new session named `session`, returning the pane ids
/// in creation order.
pub fn apply(
    client: &TmuxClient,
    cancel: &CancellationToken,
    session: &str,
    start_dir: &str,
    plan: &TmuxPlan,
) -> Result<Vec<String>> {
    let mut panes: Vec<String> = Vec::with_capacity(plan.pane_count());
    let pane = |panes: &[String], i: PaneRef| -> Result<String> {
        panes
            .get(i)
            .cloned()
            .ok_or_else(|| MuxError::validation(format!("layout step refers to unknown pane #{i}")))
    };

    for step in &plan.steps {
        debug!(session, %step, "applying layout step");
        match step {
            Step::Grid { grid } => {
                panes.extend(client.create_grid(cancel, session, start_dir, *grid)?);
            }
            Step::NewSession { window } => {
                panes.push(client.new_session(
                    cancel,
                    &WindowRequest {
                        session,
                        window_name: Some(window.as_str()),
                        start_dir: Some(start_dir),
                        command: None,
                    },
                )?);
            }
            Step::NewWindow { window } => {
                panes.push(client.new_window(
                    cancel,
                    &WindowRequest {
                        session,
                        window_name: Some(window.as_str()),
                        start_dir: Some(start_dir),
                        command: None,
                    },
                )?);
            }
            Step::Split {
                target,
                direction,
                percent,
            } => {
                let target = pane(&panes, *target)?;
                panes.push(client.split_window(
                    cancel,
                    &SplitRequest {
                        target: &target,
                        start_dir: Some(start_dir),
                        direction: *direction,
                        percent: *percent,
                        command: None,
                    },
                )?);
            }
            Step::RenameFirstWindow { name } => {
                client.rename_window_in(cancel, session, "^", name)?;
            }
            Step::SelectLayout { target, algorithm } => {
                client.select_layout(cancel, &pane(&panes, *target)?, algorithm.as_str())?;
            }
            Step::Title { pane: i, title } => {
                client.select_pane_title(cancel, &pane(&panes, *i)?, title)?;
            }
            Step::Run { pane: i, command } => {
                client.send(cancel, &pane(&panes, *i)?, &[command.as_str(), "Enter"])?;
            }
        }
    }
    info!(session, panes = panes.len(), "applied tmux layout");
    Ok(panes)
}

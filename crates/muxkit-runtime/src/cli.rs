//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "muxkit", version, about = "Drive tmux or zellij through one interface")]
pub struct Cli {
    /// Multiplexer to use (tmux or zellij). Overrides every config file.
    #[arg(long, global = true, env = "MUXKIT_MUX")]
    pub mux: Option<String>,

    /// Global config file (default: <config dir>/muxkit/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List sessions with their working directory when known
    Sessions(ListOpts),
    /// List windows (tmux) or tabs (zellij) of a session
    Windows {
        session: String,
        #[command(flatten)]
        list: ListOpts,
    },
    /// List panes of a session or window
    Panes {
        target: String,
        #[command(flatten)]
        list: ListOpts,
    },
    /// Print the last lines of a pane
    Capture {
        target: String,
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
    /// Create a session from a grid or layout, then attach
    Up(UpOpts),
    /// Print the compiled layout for the selected multiplexer
    Layout {
        /// Layout name from the global config, or a layout file
        layout: String,
        /// Project directory substituted for ${PROJECT_PATH}
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Install the zellij bridge plugin and write a config that loads it
    SetupZellij {
        /// Base zellij config to augment
        #[arg(long)]
        base: Option<PathBuf>,
    },
    /// Attach to a session, or switch to it from inside one
    Attach { target: String },
}

#[derive(clap::Args, Debug, Default)]
pub struct ListOpts {
    /// Emit JSON instead of tab-separated text
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, Default)]
pub struct UpOpts {
    /// Project name or session from the global config
    pub project: Option<String>,
    #[arg(long, short = 's')]
    pub session: Option<String>,
    /// Project directory (default: project path or current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Plain RxC grid, e.g. 2x3
    #[arg(long, conflicts_with = "layout")]
    pub grid: Option<String>,
    /// Layout name or file
    #[arg(long)]
    pub layout: Option<String>,
    /// Create the session without attaching (tmux only)
    #[arg(long)]
    pub detach: bool,
}

//! muxkit-tmux: tmux backend.
//! Every operation is one or more `tmux` subprocess calls routed through
//! the injected runner. No layout or config logic lives here.

pub mod capture;
pub mod client;
pub mod executor;
pub mod inspect;
pub mod pane_info;
pub mod session;

pub use client::{parse_version, shell_join};
pub use executor::{BENIGN_ABSENCE, TmuxClient, is_benign_absence};
pub use pane_info::{PaneFormat, parse_panes};
pub use session::{EnsureOptions, EnsureOutcome, SplitRequest, WindowRequest};

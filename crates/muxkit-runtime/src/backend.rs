//! Backend construction. This is the only place that switches on
//! [`MuxType`]; everything else goes through [`Backend`].

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use muxkit_core::{CancellationToken, LayoutConfig, MuxClient, MuxType};
use muxkit_layout::tmux as tmux_layout;
use muxkit_layout::zellij as zellij_layout;
use muxkit_tmux::TmuxClient;
use muxkit_zellij::{
    ZellijClient, default_bridge_dir, default_layout_dir, ensure_bridge_plugin,
    ensure_config_with_bridge,
};
use tracing::info;

use crate::context::Context;

/// A session to create.
#[derive(Debug, Clone)]
pub struct Launch {
    pub session: String,
    /// Project directory every pane starts in.
    pub path: PathBuf,
    /// Already variable-expanded.
    pub layout: LayoutConfig,
    pub attach: bool,
}

pub trait Backend {
    fn client(&self) -> &dyn MuxClient;

    /// Create the session unless it already exists, then attach if asked.
    fn launch(&self, cancel: &CancellationToken, launch: &Launch) -> anyhow::Result<()>;

    /// Compiled form of `layout` for display.
    fn render_layout(&self, layout: &LayoutConfig, path: &Path) -> anyhow::Result<String>;
}

pub fn connect(mux: MuxType, ctx: &Context) -> anyhow::Result<Box<dyn Backend>> {
    match mux {
        MuxType::Tmux => Ok(Box::new(TmuxBackend {
            client: TmuxClient::new(None)?,
        })),
        MuxType::Zellij => Ok(Box::new(ZellijBackend::new(ctx)?)),
    }
}

fn session_exists(client: &dyn MuxClient, cancel: &CancellationToken, session: &str) -> anyhow::Result<bool> {
    Ok(client.list_sessions(cancel)?.iter().any(|s| s == session))
}

fn path_str(path: &Path) -> anyhow::Result<&str> {
    path.to_str()
        .with_context(|| format!("{} is not valid UTF-8", path.display()))
}

// ─── tmux ─────────────────────────────────────────────────────────

pub struct TmuxBackend {
    pub client: TmuxClient,
}

impl Backend for TmuxBackend {
    fn client(&self) -> &dyn MuxClient {
        &self.client
    }

    fn launch(&self, cancel: &CancellationToken, launch: &Launch) -> anyhow::Result<()> {
        if session_exists(&self.client, cancel, &launch.session)? {
            info!(session = %launch.session, "session exists, not recreating");
        } else {
            let plan = tmux_layout::plan(&launch.layout)?;
            tmux_layout::apply(
                &self.client,
                cancel,
                &launch.session,
                path_str(&launch.path)?,
                &plan,
            )
            .with_context(|| format!("creating tmux session {}", launch.session))?;
        }
        if launch.attach {
            self.client
                .attach(cancel, &launch.session, self.client.is_inside())?;
        }
        Ok(())
    }

    fn render_layout(&self, layout: &LayoutConfig, _path: &Path) -> anyhow::Result<String> {
        Ok(tmux_layout::plan(layout)?.describe())
    }
}

// ─── zellij ───────────────────────────────────────────────────────

pub struct ZellijBackend {
    pub client: ZellijClient,
    bridge: PathBuf,
    bridge_dir: PathBuf,
    layout_dir: PathBuf,
    base_config: Option<PathBuf>,
    env: muxkit_core::Environment,
}

impl ZellijBackend {
    fn new(ctx: &Context) -> anyhow::Result<Self> {
        let section = &ctx.global.zellij;
        let expand = |raw: &Option<String>| {
            raw.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| ctx.env.expand_user_path(s))
        };
        let bridge_dir = default_bridge_dir(&ctx.env)?;
        let bridge = match expand(&section.bridge_plugin) {
            Some(path) => path,
            None => ensure_bridge_plugin(&bridge_dir)?.path,
        };
        let layout_dir = match expand(&section.layout_dir) {
            Some(dir) => dir,
            None => default_layout_dir(&ctx.env)?,
        };
        Ok(Self {
            client: ZellijClient::new(None, Some(&bridge))?,
            bridge,
            bridge_dir,
            layout_dir,
            base_config: expand(&section.config),
            env: ctx.env.clone(),
        })
    }
}

impl Backend for ZellijBackend {
    fn client(&self) -> &dyn MuxClient {
        &self.client
    }

    fn launch(&self, cancel: &CancellationToken, launch: &Launch) -> anyhow::Result<()> {
        if session_exists(&self.client, cancel, &launch.session)? {
            info!(session = %launch.session, "session exists, attaching");
            if launch.attach {
                self.client.attach(cancel, &launch.session, self.client.is_inside())?;
            }
            return Ok(());
        }
        if !launch.attach {
            anyhow::bail!("zellij sessions start in the foreground; drop --detach");
        }

        let document = self.render_layout(&launch.layout, &launch.path)?;
        let layout_file = write_layout(&self.layout_dir, &launch.session, &document)?;
        let config = ensure_config_with_bridge(
            &self.env,
            self.base_config.as_deref(),
            &self.bridge,
            &self.bridge_dir,
        )?;
        self.client
            .record_session_path(&launch.session, path_str(&launch.path)?)?;
        info!(session = %launch.session, layout = %layout_file.display(), "starting zellij session");
        self.client
            .start_session(cancel, &launch.session, &layout_file, Some(&config))?;
        Ok(())
    }

    fn render_layout(&self, layout: &LayoutConfig, path: &Path) -> anyhow::Result<String> {
        Ok(zellij_layout::build_layout(layout, path_str(path)?, &self.env)?)
    }
}

/// `<dir>/muxkit-<session>.kdl`.
fn write_layout(dir: &Path, session: &str, document: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("muxkit-{session}.kdl"));
    std::fs::write(&path, document).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use muxkit_core::testing::{FakeRunner, Reply};
    use muxkit_core::{Environment, GridSpec};

    fn tmux(fake: &Arc<FakeRunner>) -> TmuxBackend {
        TmuxBackend {
            client: TmuxClient::with_runner("tmux", fake.clone()).with_env(Environment::empty()),
        }
    }

    fn launch(attach: bool) -> Launch {
        Launch {
            session: "dev".into(),
            path: PathBuf::from("/w"),
            layout: LayoutConfig::grid(GridSpec::new(1, 1).expect("grid")),
            attach,
        }
    }

    #[test]
    fn tmux_launch_skips_existing_session() {
        let fake = Arc::new(
            FakeRunner::new().on(&["list-sessions", "-F", "#{session_name}"], Reply::ok("dev\n")),
        );
        tmux(&fake)
            .launch(&CancellationToken::new(), &launch(false))
            .expect("launch");
        fake.assert_done();
    }

    #[test]
    fn tmux_launch_builds_layout() {
        let fake = Arc::new(
            FakeRunner::new()
                .on(&["list-sessions", "-F", "#{session_name}"], Reply::fail(1, "no server running on /tmp/tmux-0/default"))
                .on(
                    &["new-session", "-d", "-s", "dev", "-c", "/w", "-P", "-F", "#{pane_id}"],
                    Reply::ok("%0\n"),
                )
                .on(&["select-layout", "-t", "dev", "tiled"], Reply::empty())
                .on(&["rename-window", "-t", "dev:^", "grid"], Reply::empty()),
        );
        tmux(&fake)
            .launch(&CancellationToken::new(), &launch(false))
            .expect("launch");
        fake.assert_done();
    }

    #[test]
    fn tmux_render_is_step_list() {
        let fake = Arc::new(FakeRunner::new());
        let text = tmux(&fake)
            .render_layout(&launch(false).layout, Path::new("/w"))
            .expect("render");
        assert!(text.starts_with("grid 1x1"));
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn layout_file_is_named_after_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_layout(&dir.path().join("layouts"), "api", "layout {}\n").expect("write");
        assert_eq!(path, dir.path().join("layouts").join("muxkit-api.kdl"));
        assert_eq!(std::fs::read_to_string(path).expect("read"), "layout {}\n");
    }
}

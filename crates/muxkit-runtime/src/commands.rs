//! Subcommand implementations. Output goes to the given writer so tests can
//! read it back.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use muxkit_core::{CancellationToken, MuxClient};
use muxkit_zellij::{default_bridge_dir, ensure_bridge_plugin, ensure_config_with_bridge};
use serde::Serialize;

use crate::backend::{self, Launch};
use crate::cli::{Cli, Command, ListOpts, UpOpts};
use crate::context::{Context, sanitize_session, session_from_dir};

pub fn run(cli: Cli, cancel: &CancellationToken, out: &mut dyn Write) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    let ctx = Context::load(
        cli.mux,
        cli.config.as_deref(),
        muxkit_core::Environment::process(),
        cwd,
    )?;

    // Backend for the project of the current directory, if any.
    let here = || backend::connect(ctx.mux_for(ctx.project(None)), &ctx);

    match cli.command {
        Command::Sessions(list) => {
            let backend = here()?;
            sessions(backend.client(), cancel, &list, out)
        }
        Command::Windows { session, list } => {
            let backend = here()?;
            windows(backend.client(), cancel, &session, &list, out)
        }
        Command::Panes { target, list } => {
            let backend = here()?;
            panes(backend.client(), cancel, &target, &list, out)
        }
        Command::Capture { target, lines } => {
            let backend = here()?;
            capture(backend.client(), cancel, &target, lines, out)
        }
        Command::Attach { target } => {
            let backend = here()?;
            let client = backend.client();
            Ok(client.attach(cancel, &target, client.is_inside())?)
        }
        Command::Up(opts) => up(&ctx, cancel, &opts),
        Command::Layout { layout, path } => {
            let project = ctx.project(None);
            let path = path.unwrap_or_else(|| ctx.cwd.clone());
            let compiled = ctx.layout_by_name(&layout)?.expand_vars(
                &project.map(|p| p.vars.clone()).unwrap_or_default(),
                &path.to_string_lossy(),
                &project_name(project.map(|p| p.name.as_str()), &path),
                &ctx.env,
            );
            let backend = backend::connect(ctx.mux_for(project), &ctx)?;
            write!(out, "{}", backend.render_layout(&compiled, &path)?)?;
            Ok(())
        }
        Command::SetupZellij { base } => setup_zellij(&ctx, base.as_deref(), out),
    }
}

fn project_name(name: Option<&str>, path: &Path) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn emit_json<T: Serialize>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub fn sessions(
    client: &dyn MuxClient,
    cancel: &CancellationToken,
    list: &ListOpts,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let sessions = client.list_sessions_info(cancel)?;
    if list.json {
        return emit_json(out, &sessions);
    }
    for s in sessions {
        writeln!(out, "{}\t{}", s.name, s.path)?;
    }
    Ok(())
}

pub fn windows(
    client: &dyn MuxClient,
    cancel: &CancellationToken,
    session: &str,
    list: &ListOpts,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let windows = client.list_windows(cancel, session)?;
    if list.json {
        return emit_json(out, &windows);
    }
    for w in windows {
        let marker = if w.active { "*" } else { "" };
        writeln!(out, "{}\t{}{marker}", w.index, w.name)?;
    }
    Ok(())
}

pub fn panes(
    client: &dyn MuxClient,
    cancel: &CancellationToken,
    target: &str,
    list: &ListOpts,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let panes = client.list_panes_detailed(cancel, target)?;
    if list.json {
        return emit_json(out, &panes);
    }
    for p in panes {
        let state = match (p.dead, p.active) {
            (true, _) => format!("dead({})", p.dead_status),
            (false, true) => "active".to_string(),
            (false, false) => String::new(),
        };
        writeln!(
            out,
            "{}\t{}\t{}\t{}x{}+{}+{}\t{state}",
            p.id,
            p.index,
            p.label(),
            p.width,
            p.height,
            p.left,
            p.top
        )?;
    }
    Ok(())
}

pub fn capture(
    client: &dyn MuxClient,
    cancel: &CancellationToken,
    target: &str,
    lines: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    for line in client.capture_pane_lines(cancel, target, lines)? {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn up(ctx: &Context, cancel: &CancellationToken, opts: &UpOpts) -> anyhow::Result<()> {
    let project = ctx.project(opts.project.as_deref());
    if opts.project.is_some() && project.is_none() {
        anyhow::bail!("no project named {:?} in the global config", opts.project);
    }

    let path: PathBuf = match (&opts.path, project) {
        (Some(path), _) => ctx.env.expand_user_path(&path.to_string_lossy()),
        (None, Some(p)) if !p.path.trim().is_empty() => ctx.env.expand_user_path(&p.path),
        _ => ctx.cwd.clone(),
    };
    let path = std::path::absolute(&path)?;
    if !path.is_dir() {
        anyhow::bail!("project directory {} does not exist", path.display());
    }

    let session = opts
        .session
        .as_deref()
        .or(ctx.local.session.as_deref())
        .or(project.map(|p| p.session_name()))
        .map(sanitize_session)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| session_from_dir(&path));

    let vars: BTreeMap<String, String> = project.map(|p| p.vars.clone()).unwrap_or_default();
    let layout = ctx
        .select_layout(opts.grid.as_deref(), opts.layout.as_deref(), project)?
        .expand_vars(
            &vars,
            &path.to_string_lossy(),
            &project_name(project.map(|p| p.name.as_str()), &path),
            &ctx.env,
        );

    let backend = backend::connect(ctx.mux_for(project), ctx)?;
    tracing::info!(%session, path = %path.display(), layout = %layout.name, "bringing up session");
    backend.launch(
        cancel,
        &Launch {
            session,
            path,
            layout,
            attach: !opts.detach,
        },
    )
}

fn setup_zellij(ctx: &Context, base: Option<&Path>, out: &mut dyn Write) -> anyhow::Result<()> {
    let bridge_dir = default_bridge_dir(&ctx.env)?;
    let install = ensure_bridge_plugin(&bridge_dir)?;
    let configured = ctx
        .global
        .zellij
        .config
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| ctx.env.expand_user_path(s));
    let base = base.map(Path::to_path_buf).or(configured);
    let config = ensure_config_with_bridge(&ctx.env, base.as_deref(), &install.path, &bridge_dir)?;

    let status = if install.written { "installed" } else { "up to date" };
    writeln!(out, "bridge plugin {status}: {}", install.path.display())?;
    writeln!(out, "zellij config: {}", config.display())?;
    writeln!(out, "start zellij with: zellij --config {}", config.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use muxkit_core::Environment;
    use muxkit_core::testing::{FakeRunner, Reply};
    use muxkit_tmux::TmuxClient;

    fn client(fake: &Arc<FakeRunner>) -> TmuxClient {
        TmuxClient::with_runner("tmux", fake.clone()).with_env(Environment::empty())
    }

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn sessions_as_text_and_json() {
        let fake = Arc::new(
            FakeRunner::new()
                .on_any(Reply::ok("api\t/srv/api\nscratch\t\n"))
                .on_any(Reply::ok("api\t/srv/api\n")),
        );
        let tmux = client(&fake);
        let cancel = CancellationToken::new();

        let mut buf = Vec::new();
        sessions(&tmux, &cancel, &ListOpts { json: false }, &mut buf).expect("text");
        assert_eq!(text(buf), "api\t/srv/api\nscratch\t\n");

        let mut buf = Vec::new();
        sessions(&tmux, &cancel, &ListOpts { json: true }, &mut buf).expect("json");
        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("parse");
        assert_eq!(parsed[0]["name"], "api");
        assert_eq!(parsed[0]["path"], "/srv/api");
    }

    #[test]
    fn no_server_prints_nothing() {
        let fake = Arc::new(
            FakeRunner::new().on_any(Reply::fail(1, "no server running on /tmp/tmux-1000/default")),
        );
        let mut buf = Vec::new();
        sessions(&client(&fake), &CancellationToken::new(), &ListOpts::default(), &mut buf)
            .expect("benign");
        assert!(buf.is_empty());
    }

    #[test]
    fn capture_prints_lines() {
        let fake = Arc::new(FakeRunner::new().on_any(Reply::ok("one\ntwo\nthree\n")));
        let mut buf = Vec::new();
        capture(&client(&fake), &CancellationToken::new(), "%1", 2, &mut buf).expect("capture");
        assert_eq!(text(buf), "two\nthree\n");
    }

    #[test]
    fn project_name_falls_back_to_dir() {
        assert_eq!(project_name(Some(" api "), Path::new("/x")), "api");
        assert_eq!(project_name(None, Path::new("/srv/web")), "web");
    }
}

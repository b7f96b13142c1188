//! muxkit: one CLI over tmux and zellij.
//!
//! Every backend call blocks, so commands run on the blocking pool while
//! the async side only waits for Ctrl-C and cancels the shared token.

use anyhow::Context as _;
use clap::Parser;
use muxkit_core::CancellationToken;

mod backend;
mod cli;
mod commands;
mod context;

fn init_tracing() {
    let filter = std::env::var("MUXKIT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        commands::run(args, &cancel, &mut out)
    })
    .await
    .context("command task failed")?
}

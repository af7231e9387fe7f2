//! bookgate IRC ebook gateway

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

use bookgate_server::args::{Args, Command};
use bookgate_server::cli;
use bookgate_server::config::ServerConfig;
use bookgate_server::constants::MSG_BANNER;
use bookgate_server::server;
use bookgate_server::state::ServerState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    let max_level = if args.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();

    if let Some(Command::Cli(cli_args)) = args.command.take() {
        cli::run(cli_args).await?;
        return Ok(());
    }

    println!("{}{}", MSG_BANNER, env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::from(args);
    if let Err(e) = config.validate() {
        anyhow::bail!("configuration error: {}", e);
    }

    tokio::fs::create_dir_all(config.books_dir())
        .await
        .with_context(|| format!("creating {}", config.books_dir().display()))?;

    match &config.name {
        Some(name) => info!("IRC nickname: {}", name),
        None => info!("IRC nicknames are generated per session"),
    }
    info!("downloads go to {}", config.download_dir.display());
    if config.log {
        info!("raw IRC traffic is logged per session");
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    let state = Arc::new(ServerState::with_network(config));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("unable to listen for shutdown signal: {}", e);
            return;
        }
        signal.cancel();
    });

    server::run(listener, state, shutdown).await?;
    Ok(())
}

//! ttymux server - virtual terminal daemon

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ttymux_protocol::TerminalIndex;
use ttymux_server::cli::Cli;
use ttymux_server::config::{ConfigLoader, DEFAULT_CONFIG_TOML};
use ttymux_server::demo;
use ttymux_server::server::TtyServer;
use ttymux_utils::{LogConfig, Result};

async fn run(cli: Cli) -> Result<()> {
    if cli.print_config {
        print!("{}", DEFAULT_CONFIG_TOML.trim_start());
        return Ok(());
    }

    let config = ConfigLoader::load_and_validate(cli.config.as_deref())?;

    let filter = cli.log.as_deref().unwrap_or(&config.logging.filter);
    ttymux_utils::init_logging_with_config(LogConfig::server(filter))?;

    info!("ttymux server {} starting", env!("CARGO_PKG_VERSION"));

    let socket_path = cli
        .socket
        .or_else(|| config.general.socket_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(ttymux_utils::socket_path);

    let server = TtyServer::bind(config, &socket_path)?;
    let shutdown = server.shutdown_handle();

    if cli.demo {
        info!("Starting echo demo on terminal 0");
        tokio::spawn(demo::run_echo(server.tty(TerminalIndex::from(0))));
    }

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Interrupt received, shutting down");
        let _ = shutdown.send(());
    });

    server.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(e) = &result {
        error!("Server failed: {}", e);
    }
    result
}

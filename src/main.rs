//! adder-pool CLI entry point

use adder_pool::config::{cli::Cli, toml::load_config, validator};
use adder_pool::distributed::Coordinator;
use anyhow::{Context, Result};
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let cli = Cli::parse_args();
    let config = load_config(&cli)?;

    // Configuration errors are fatal before any socket is opened
    let listen_port = validator::validate_port(&cli.port)?;
    let driver_addr = validator::resolve_host(&cli.host, config.session.driver_port)?;

    info!("adder-pool v{}", env!("CARGO_PKG_VERSION"));
    info!("Driver: {} ({})", cli.host, driver_addr);
    info!("Session: {}", config.session);

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let summary = runtime
        .block_on(Coordinator::new(listen_port, driver_addr, config.session).run())
        .context("Session failed")?;

    info!(
        "Session closed: {} worker(s), {} command(s) answered",
        summary.workers, summary.commands_answered
    );

    Ok(())
}

//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::parse_duration;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(port) = cli.driver_port {
        config.session.driver_port = port;
    }
    if let Some(attempts) = cli.max_attempts {
        config.session.max_attempts = attempts;
    }
    if let Some(ref timeout) = cli.connect_timeout {
        config.session.connect_timeout = parse_duration(timeout)
            .context("Invalid --connect-timeout")?;
    }
    if let Some(ref timeout) = cli.command_timeout {
        config.session.command_timeout = parse_duration(timeout)
            .context("Invalid --command-timeout")?;
    }

    Ok(config)
}

/// Build the effective configuration: defaults, then file, then CLI
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    let config = merge_cli_with_config(cli, base)?;
    validator::validate_session(&config.session)
        .context("Configuration validation failed")?;

    Ok(config)
}

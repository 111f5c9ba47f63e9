//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Well-known UDP port the driver listens on for announcements
pub const DEFAULT_DRIVER_PORT: u16 = 3126;

/// Number of UDP announce / TCP accept rounds before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Per-attempt accept timeout, also used for the worker count read
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-command read timeout while serving
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
}

/// Protocol timing and addressing for one coordinator session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// UDP port of the driver's announcement listener
    #[serde(default = "default_driver_port")]
    pub driver_port: u16,
    /// Rendezvous attempts before the handshake fails
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Accept timeout per rendezvous attempt and worker count read timeout
    #[serde(default = "default_connect_timeout", with = "duration_str")]
    pub connect_timeout: Duration,
    /// Read timeout for each command while serving
    #[serde(default = "default_command_timeout", with = "duration_str")]
    pub command_timeout: Duration,
}

fn default_driver_port() -> u16 {
    DEFAULT_DRIVER_PORT
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver_port: DEFAULT_DRIVER_PORT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver_port={} max_attempts={} connect_timeout={} command_timeout={}",
            self.driver_port,
            self.max_attempts,
            cli_convert::format_duration(self.connect_timeout),
            cli_convert::format_duration(self.command_timeout),
        )
    }
}

/// Durations are written as strings like "5s" or "500ms" in TOML
mod duration_str {
    use super::cli_convert::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(d)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

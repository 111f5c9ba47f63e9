//! Configuration validation

use super::*;
use crate::error::ConfigError;
use std::net::{SocketAddr, ToSocketAddrs};

/// Lowest port the coordinator may listen on
pub const MIN_LISTEN_PORT: u16 = 1024;

/// Validate the local port argument
///
/// The argument must consist of ASCII digits only and fall within
/// [1024, 65535]. Signs, whitespace and overflowing values are rejected.
pub fn validate_port(arg: &str) -> Result<u16, ConfigError> {
    let invalid = || ConfigError::InvalidPort(arg.to_string());

    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let port: u16 = arg.parse().map_err(|_| invalid())?;
    if port < MIN_LISTEN_PORT {
        return Err(invalid());
    }

    Ok(port)
}

/// Resolve the driver host once, pairing it with the driver port
///
/// The first address returned by the resolver is used.
pub fn resolve_host(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ConfigError::Resolve {
            host: host.to_string(),
            source,
        })?;

    addrs.next().ok_or_else(|| ConfigError::NoAddress(host.to_string()))
}

/// Validate session timing settings
pub fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.max_attempts == 0 {
        return Err(ConfigError::Zero("max_attempts"));
    }
    if session.connect_timeout.is_zero() {
        return Err(ConfigError::Zero("connect_timeout"));
    }
    if session.command_timeout.is_zero() {
        return Err(ConfigError::Zero("command_timeout"));
    }

    Ok(())
}

//! Error types
//!
//! Configuration errors are raised before any socket is opened. Session
//! errors end the control session; the coordinator still tears down every
//! resource before handing them back. Worker-local failures never show up
//! here: they are logged and absorbed by the worker task.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port argument is not all digits or is outside [1024, 65535]
    #[error("The port must be an integer between 1024 and 65535, got '{0}'")]
    InvalidPort(String),

    /// Host name lookup failed
    #[error("Failed to resolve host '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Host name lookup succeeded but returned nothing usable
    #[error("Host '{0}' did not resolve to any address")]
    NoAddress(String),

    /// Duration string could not be parsed
    #[error("Invalid duration '{0}' (expected a number followed by ms, s, m or h)")]
    InvalidDuration(String),

    /// A setting that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Failures that end a coordinator session
#[derive(Debug, Error)]
pub enum SessionError {
    /// Local TCP listener could not be bound
    #[error("Failed to bind local TCP listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// UDP announcement could not be sent (never retried)
    #[error("Failed to send local TCP port information to {addr}: {source}")]
    Announce {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Driver never connected back
    #[error("The driver did not connect after {attempts} attempt(s)")]
    HandshakeTimeout { attempts: u32 },

    /// Worker count did not arrive in time
    #[error("The driver did not send the number of workers within {0:?}")]
    WorkerCountTimeout(Duration),

    /// No command arrived in time
    #[error("No command received within {0:?}")]
    CommandTimeout(Duration),

    /// A worker listener could not be bound
    #[error("Failed to create worker {index}: {source}")]
    SpawnWorker {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure on the control connection
    #[error("Control connection failed: {0}")]
    Io(#[from] io::Error),
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

//! adder-pool - rendezvous-based distributed integer aggregation
//!
//! A coordinator announces itself to a remote driver over UDP, receives a
//! driver-initiated TCP control connection, spins up a pool of worker
//! listeners ("adders") that each accumulate one inbound stream of integers,
//! and answers aggregate queries over the control connection until told to
//! shut down.
//!
//! # Architecture
//!
//! - **Rendezvous**: UDP announcement + TCP accept with bounded retries
//! - **Workers**: One task per worker, one inbound stream each
//! - **Coordinator**: Command loop answering sum / argmax / count queries
//! - **Stats**: Lock-free per-worker counters with consistent snapshots

pub mod config;
pub mod distributed;
pub mod error;
pub mod stats;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use distributed::Coordinator;
pub use error::{ConfigError, SessionError};
pub use worker::Worker;

/// Result type used at the application boundary
pub type Result<T> = anyhow::Result<T>;

//! Distributed mode implementation
//!
//! # Architecture
//!
//! - **Driver**: Remote peer that supplies the worker count, feeds the
//!   workers and issues commands (external)
//! - **Coordinator**: Performs the rendezvous, owns the worker pool and
//!   serves the command loop
//! - **Workers**: One task per worker, each accumulating one inbound stream
//!
//! # Modules
//!
//! - `protocol`: Wire encoding and command codes
//! - `rendezvous`: UDP announcement / TCP accept handshake
//! - `coordinator`: Session state machine and command loop

pub mod coordinator;
pub mod protocol;
pub mod rendezvous;

// Re-export key types
pub use coordinator::{Coordinator, SessionSummary};
pub use protocol::{Command, GAVE_UP, SENTINEL};

//! Worker (adder) implementation
//!
//! A Worker is a single-purpose accumulator bound to one OS-assigned port. It
//! accepts exactly one inbound connection, reads a stream of integers until
//! the sentinel `0` or end-of-stream, and keeps a running sum and count that
//! the coordinator can poll at any time.
//!
//! # Lifecycle
//!
//! 1. **Listening**: `Worker::start()` binds the listener and spawns the task;
//!    the port is known before any peer connects
//! 2. **Connected**: the one peer is accepted and the listener is dropped
//! 3. **Closed**: sentinel, end-of-stream, I/O error, or `close()`
//!
//! Accept and read never time out. A worker failure is logged and ends only
//! that worker; its last counters stay readable.

use crate::distributed::protocol::{read_int, SENTINEL};
use crate::stats::{StatsSnapshot, WorkerStats};
use log::{debug, error, info};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// All interfaces, OS-assigned port
pub(crate) const ANY_PORT: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));

/// How a worker's input stream ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamEnd {
    Sentinel,
    Closed,
}

/// Handle to one running worker
///
/// Owned by the coordinator, which is solely responsible for closing it.
#[derive(Debug)]
pub struct Worker {
    /// Bound listening port (fixed for the worker's lifetime)
    port: u16,

    /// Counters written by the worker task
    stats: Arc<WorkerStats>,

    /// Worker task; taken on close
    task: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start a worker on an OS-assigned port on all interfaces
    pub async fn start() -> io::Result<Self> {
        Self::bind(ANY_PORT).await
    }

    /// Start a worker listening on `addr`
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let port = listener.local_addr()?.port();
        let stats = Arc::new(WorkerStats::new());

        let task = tokio::spawn(run(listener, port, stats.clone()));
        info!("A new worker created at port {}", port);

        Ok(Self {
            port,
            stats,
            task: Some(task),
        })
    }

    /// Listening port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Current running sum
    pub fn sum(&self) -> i32 {
        self.stats.sum()
    }

    /// Current number of values received
    pub fn count(&self) -> u32 {
        self.stats.count()
    }

    /// Sum and count read together
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether the worker has stopped reading
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Close the worker's sockets
    ///
    /// Aborts the worker task and waits until it has been dropped, so both
    /// the listener and the accepted stream are closed on return. Safe to
    /// call repeatedly and while the task is blocked in accept or read.
    pub async fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("The worker at port {} panicked: {}", self.port, e);
                }
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(ref task) = self.task {
            task.abort();
        }
    }
}

/// Worker task body
async fn run(listener: TcpListener, port: u16, stats: Arc<WorkerStats>) {
    match accumulate(listener, port, &stats).await {
        Ok(StreamEnd::Sentinel) => {
            debug!("The worker at port {} received the sentinel", port);
        }
        Ok(StreamEnd::Closed) => {
            info!("The input stream of the worker at port {} has ended", port);
        }
        Err(e) => {
            error!("The worker at port {} returned an error: {}", port, e);
        }
    }

    let final_stats = stats.snapshot();
    debug!(
        "The worker at port {} stopped with sum={} count={}",
        port, final_stats.sum, final_stats.count
    );
}

/// Accept one peer and fold its integers into `stats`
async fn accumulate(
    listener: TcpListener,
    port: u16,
    stats: &WorkerStats,
) -> io::Result<StreamEnd> {
    let (mut stream, peer) = listener.accept().await?;
    // One connection per worker
    drop(listener);
    debug!("The worker at port {} accepted {}", port, peer);

    loop {
        match read_int(&mut stream).await {
            Ok(SENTINEL) => return Ok(StreamEnd::Sentinel),
            Ok(value) => stats.record(value),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(StreamEnd::Closed),
            Err(e) => return Err(e),
        }
    }
}

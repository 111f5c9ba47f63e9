//! Coordinator
//!
//! This module implements the coordinator session. The coordinator:
//! - Performs the rendezvous handshake with the driver
//! - Receives the worker count and starts that many workers
//! - Reports every worker's port, in creation order
//! - Answers aggregate queries until shutdown or a fatal error
//! - Closes the control connection and every worker, best-effort
//!
//! # States
//!
//! ```text
//! Handshaking -> AwaitingWorkerCount -> ReportingPorts -> Serving -> Closed
//! ```
//!
//! Any failure jumps straight to `Closed`. Teardown always runs before the
//! session result is returned.

use crate::config::SessionConfig;
use crate::distributed::protocol::{read_int, write_int, Command, GAVE_UP};
use crate::distributed::rendezvous;
use crate::error::{SessionError, SessionResult};
use crate::stats::{aggregator, StatsSnapshot};
use crate::worker::{Worker, ANY_PORT};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    Handshaking,
    AwaitingWorkerCount,
    ReportingPorts,
    Serving,
    Closed,
}

/// Outcome of a session that ended with a shutdown command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Workers created for the session
    pub workers: usize,
    /// Commands answered with a response
    pub commands_answered: u64,
}

/// Coordinator
///
/// Runs one control session against one driver.
pub struct Coordinator {
    /// Local TCP port the driver connects back to (0 = OS-assigned)
    listen_port: u16,

    /// Driver's UDP announcement address
    driver_addr: SocketAddr,

    /// Protocol timing
    session: SessionConfig,
}

impl Coordinator {
    /// Create a new coordinator
    pub fn new(listen_port: u16, driver_addr: SocketAddr, session: SessionConfig) -> Self {
        Self {
            listen_port,
            driver_addr,
            session,
        }
    }

    /// Run the session to completion
    ///
    /// Returns `Ok` only when the driver sent the shutdown command. Every
    /// worker and the control connection are closed before returning, on
    /// both paths.
    pub async fn run(self) -> SessionResult<SessionSummary> {
        let listener = rendezvous::bind_listener(self.listen_port).await?;
        debug!("session state: {:?}", SessionState::Handshaking);

        let (control, peer) =
            match rendezvous::request_connection(&listener, self.driver_addr, &self.session).await {
                Ok(connection) => connection,
                Err(e) => {
                    error!("Execution finished with an error: {}", e);
                    return Err(e);
                }
            };
        drop(listener);
        info!(
            "Connection to {} established (announced to {})",
            peer, self.driver_addr
        );

        let mut session = Session::new(control, self.session);
        let result = session.serve().await;
        if let Err(ref e) = result {
            error!("Execution finished with an error: {}", e);
        }

        session.close().await;
        result
    }
}

/// Live control session: the control stream plus the worker pool
struct Session {
    control: TcpStream,
    workers: Vec<Worker>,
    /// Address every worker listener binds
    worker_addr: SocketAddr,
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    fn new(control: TcpStream, config: SessionConfig) -> Self {
        Self {
            control,
            workers: Vec::new(),
            worker_addr: ANY_PORT,
            config,
            state: SessionState::Handshaking,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("session state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Drive the session from the worker count to shutdown
    async fn serve(&mut self) -> SessionResult<SessionSummary> {
        self.transition(SessionState::AwaitingWorkerCount);
        let count = self.await_worker_count().await?;

        self.transition(SessionState::ReportingPorts);
        self.spawn_workers(count).await?;
        self.report_ports().await?;

        self.transition(SessionState::Serving);
        self.command_loop().await
    }

    /// Read the worker count, telling the driver `-1` on timeout
    async fn await_worker_count(&mut self) -> SessionResult<i32> {
        let window = self.config.connect_timeout;
        match timeout(window, read_int(&mut self.control)).await {
            Ok(Ok(count)) => {
                info!("The driver requested {} worker(s)", count);
                Ok(count)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                error!("The driver did not return the number of workers within the allotted time");
                if let Err(e) = write_int(&mut self.control, GAVE_UP).await {
                    warn!("Failed to notify the driver: {}", e);
                }
                Err(SessionError::WorkerCountTimeout(window))
            }
        }
    }

    /// Start `count` workers; zero or negative yields an empty pool
    ///
    /// The pool grows one bound worker at a time, so a count larger than the
    /// host can serve ends in `SpawnWorker` rather than a huge allocation.
    async fn spawn_workers(&mut self, count: i32) -> SessionResult<()> {
        let count = usize::try_from(count).unwrap_or(0);

        for index in 0..count {
            let worker = Worker::bind(self.worker_addr)
                .await
                .map_err(|source| SessionError::SpawnWorker { index, source })?;
            self.workers.push(worker);
        }

        Ok(())
    }

    /// Send each worker's port in creation order
    async fn report_ports(&mut self) -> SessionResult<()> {
        for worker in &self.workers {
            write_int(&mut self.control, i32::from(worker.port())).await?;
        }
        debug!("Reported {} worker port(s)", self.workers.len());

        Ok(())
    }

    fn snapshots(&self) -> Vec<StatsSnapshot> {
        self.workers.iter().map(Worker::snapshot).collect()
    }

    /// Answer commands until shutdown
    async fn command_loop(&mut self) -> SessionResult<SessionSummary> {
        let window = self.config.command_timeout;
        let mut answered = 0u64;

        loop {
            let code = match timeout(window, read_int(&mut self.control)).await {
                Ok(code) => code?,
                Err(_) => return Err(SessionError::CommandTimeout(window)),
            };

            let command = Command::from(code);
            debug!("Received command {:?}", command);

            let response = match command {
                Command::Shutdown => {
                    info!("Shutdown requested by the driver");
                    if let Err(e) = self.control.shutdown().await {
                        debug!("Failed to close the control output: {}", e);
                    }
                    for worker in &mut self.workers {
                        worker.close().await;
                    }
                    return Ok(SessionSummary {
                        workers: self.workers.len(),
                        commands_answered: answered,
                    });
                }
                Command::Sum => aggregator::total_sum(&self.snapshots()),
                Command::ArgMax => aggregator::max_sum_index(&self.snapshots()),
                Command::Count => aggregator::total_count(&self.snapshots()),
                Command::Unknown(code) => {
                    warn!("Ignoring unknown command code {}", code);
                    continue;
                }
            };

            write_int(&mut self.control, response).await?;
            answered += 1;
        }
    }

    /// Close the control connection, then every worker
    async fn close(mut self) {
        self.transition(SessionState::Closed);
        let Session {
            control,
            mut workers,
            ..
        } = self;
        drop(control);

        for worker in &mut workers {
            worker.close().await;
            info!(
                "The sockets of the worker at port {} have been closed",
                worker.port()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::decode_announcement;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::UdpSocket;
    use tokio::task::JoinHandle;

    fn fast_session() -> SessionConfig {
        SessionConfig {
            max_attempts: 3,
            connect_timeout: Duration::from_millis(300),
            command_timeout: Duration::from_secs(5),
            ..SessionConfig::default()
        }
    }

    /// Start a coordinator and play the driver side of the handshake
    async fn connect_driver(
        session: SessionConfig,
    ) -> (TcpStream, JoinHandle<SessionResult<SessionSummary>>) {
        let udp = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let driver_addr = udp.local_addr().unwrap();

        let coordinator = Coordinator::new(0, driver_addr, session);
        let handle = tokio::spawn(coordinator.run());

        let mut buf = [0u8; 16];
        let (n, _) = udp.recv_from(&mut buf).await.unwrap();
        let port = decode_announcement(&buf[..n]).unwrap();
        let control = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();

        (control, handle)
    }

    async fn feed(port: u16, values: &[i32]) {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.unwrap();
        for &v in values {
            write_int(&mut stream, v).await.unwrap();
        }
        write_int(&mut stream, 0).await.unwrap();
    }

    async fn query(control: &mut TcpStream, command: Command) -> i32 {
        write_int(control, command.code()).await.unwrap();
        read_int(control).await.unwrap()
    }

    /// Poll the count until it reaches `expected` (workers run concurrently)
    async fn wait_for_count(control: &mut TcpStream, expected: i32) {
        for _ in 0..200 {
            if query(control, Command::Count).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("count never reached {}", expected);
    }

    #[tokio::test]
    async fn test_three_worker_scenario() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, 3).await.unwrap();
        let mut ports = Vec::new();
        for _ in 0..3 {
            ports.push(read_int(&mut control).await.unwrap() as u16);
        }
        assert_ne!(ports[0], ports[1]);
        assert_ne!(ports[1], ports[2]);
        assert_ne!(ports[0], ports[2]);

        feed(ports[0], &[5, -2, 3]).await;
        feed(ports[1], &[10]).await;
        feed(ports[2], &[]).await;

        wait_for_count(&mut control, 3).await;
        assert_eq!(query(&mut control, Command::Sum).await, 16);
        assert_eq!(query(&mut control, Command::Count).await, 3);
        assert_eq!(query(&mut control, Command::ArgMax).await, 2);

        write_int(&mut control, Command::Shutdown.code()).await.unwrap();

        // No response follows the shutdown command
        let mut rest = Vec::new();
        control.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.workers, 3);
        assert!(summary.commands_answered >= 3);

        for port in ports {
            assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_unknown_command_is_skipped() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, 1).await.unwrap();
        let port = read_int(&mut control).await.unwrap() as u16;
        feed(port, &[4, 4]).await;
        wait_for_count(&mut control, 2).await;

        // The unknown code gets no reply, so the next reply answers Sum
        write_int(&mut control, 9).await.unwrap();
        write_int(&mut control, -3).await.unwrap();
        assert_eq!(query(&mut control, Command::Sum).await, 8);

        write_int(&mut control, 0).await.unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.workers, 1);
    }

    #[tokio::test]
    async fn test_empty_pool() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, 0).await.unwrap();
        assert_eq!(query(&mut control, Command::Sum).await, 0);
        assert_eq!(query(&mut control, Command::Count).await, 0);
        assert_eq!(query(&mut control, Command::ArgMax).await, 1);

        write_int(&mut control, 0).await.unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.workers, 0);
        assert_eq!(summary.commands_answered, 3);
    }

    #[tokio::test]
    async fn test_negative_worker_count_yields_empty_pool() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, -4).await.unwrap();
        assert_eq!(query(&mut control, Command::Count).await, 0);

        write_int(&mut control, 0).await.unwrap();
        assert_eq!(handle.await.unwrap().unwrap().workers, 0);
    }

    #[tokio::test]
    async fn test_worker_count_timeout_sends_gave_up() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        // Never send the worker count
        assert_eq!(read_int(&mut control).await.unwrap(), GAVE_UP);

        // Nothing else follows: no ports are reported
        let mut rest = Vec::new();
        control.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::WorkerCountTimeout(_))));
    }

    #[tokio::test]
    async fn test_command_timeout_closes_workers() {
        let session = SessionConfig {
            command_timeout: Duration::from_millis(200),
            ..fast_session()
        };
        let (mut control, handle) = connect_driver(session).await;

        write_int(&mut control, 2).await.unwrap();
        let first = read_int(&mut control).await.unwrap() as u16;
        let second = read_int(&mut control).await.unwrap() as u16;

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::CommandTimeout(_))));

        for port in [first, second] {
            assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_driver_disconnect_is_fatal() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, 1).await.unwrap();
        let port = read_int(&mut control).await.unwrap() as u16;
        drop(control);

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SessionError::Io(_))));
        assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.is_err());
    }

    /// Connected loopback pair: (coordinator side, driver side)
    async fn control_pair() -> (TcpStream, TcpStream) {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let driver = TcpStream::connect(addr).await.unwrap();
        let (coordinator, _) = listener.accept().await.unwrap();
        (coordinator, driver)
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[tokio::test]
    async fn test_huge_worker_count_fails_cleanly() {
        let (control, _driver) = control_pair().await;
        let mut session = Session::new(control, fast_session());

        // Pin workers to one port: the first bind succeeds, the second cannot
        let port = free_port();
        session.worker_addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));

        let result = session.spawn_workers(i32::MAX).await;
        assert!(matches!(
            result,
            Err(SessionError::SpawnWorker { index: 1, .. })
        ));
        assert_eq!(session.workers.len(), 1);
        assert!(session.workers.capacity() < 1024);

        session.close().await;
        assert!(TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await.is_err());
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_reset_worker_does_not_stop_session() {
        let (mut control, handle) = connect_driver(fast_session()).await;

        write_int(&mut control, 2).await.unwrap();
        let first = read_int(&mut control).await.unwrap() as u16;
        let second = read_int(&mut control).await.unwrap() as u16;

        let mut broken = TcpStream::connect((Ipv4Addr::LOCALHOST, first)).await.unwrap();
        write_int(&mut broken, 7).await.unwrap();
        write_int(&mut broken, 5).await.unwrap();
        wait_for_count(&mut control, 2).await;

        // Zero linger makes the drop send an RST to the first worker
        broken.set_linger(Some(Duration::ZERO)).unwrap();
        drop(broken);

        feed(second, &[20, 1]).await;
        wait_for_count(&mut control, 4).await;
        assert_eq!(query(&mut control, Command::Sum).await, 33);
        assert_eq!(query(&mut control, Command::ArgMax).await, 2);

        write_int(&mut control, 0).await.unwrap();
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.workers, 2);
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let udp = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let driver_addr = udp.local_addr().unwrap();

        let session = SessionConfig {
            max_attempts: 2,
            connect_timeout: Duration::from_millis(100),
            ..SessionConfig::default()
        };
        let result = Coordinator::new(0, driver_addr, session).run().await;
        assert!(matches!(
            result,
            Err(SessionError::HandshakeTimeout { attempts: 2 })
        ));
    }
}

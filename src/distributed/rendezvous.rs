//! Rendezvous handshake
//!
//! The coordinator has no address the driver knows in advance, so it opens a
//! local TCP listener, tells the driver about it with a UDP datagram, and
//! waits for the driver to connect in. UDP delivery is unreliable, so each
//! attempt re-sends the announcement and waits at most `connect_timeout` for
//! the connection. A failed UDP send is fatal immediately; running out of
//! attempts is fatal after the last timeout.

use crate::config::SessionConfig;
use crate::distributed::protocol::encode_announcement;
use crate::error::{SessionError, SessionResult};
use log::{info, warn};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::time::timeout;

/// Bind the local TCP listener the driver will connect to
///
/// Listens on all interfaces. Port 0 asks the OS for a free port.
pub async fn bind_listener(port: u16) -> SessionResult<TcpListener> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map_err(|source| SessionError::Bind { port, source })?;

    let local_port = listener
        .local_addr()
        .map_err(|source| SessionError::Bind { port, source })?
        .port();
    info!("A local TCP listener created at port {}", local_port);

    Ok(listener)
}

/// Announce the listener to the driver and wait for it to connect
///
/// # Arguments
///
/// * `listener` - Bound local TCP listener (not yet accepting)
/// * `driver` - Driver's UDP announcement address
/// * `session` - Attempt count and per-attempt timeout
///
/// # Returns
///
/// The connected control stream and the address it came from.
pub async fn request_connection(
    listener: &TcpListener,
    driver: SocketAddr,
    session: &SessionConfig,
) -> SessionResult<(TcpStream, SocketAddr)> {
    let local_port = listener.local_addr()?.port();
    let payload = encode_announcement(local_port);

    for attempt in 1..=session.max_attempts {
        announce(driver, &payload).await?;

        info!(
            "Establishing TCP connection. Attempt {}/{}",
            attempt, session.max_attempts
        );

        match timeout(session.connect_timeout, listener.accept()).await {
            Ok(Ok(connection)) => return Ok(connection),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!(
                    "The driver did not respond within {:?}",
                    session.connect_timeout
                );
            }
        }
    }

    Err(SessionError::HandshakeTimeout {
        attempts: session.max_attempts,
    })
}

/// Send one announcement datagram from a transient UDP socket
async fn announce(driver: SocketAddr, payload: &[u8]) -> SessionResult<()> {
    let send = async {
        let local: SocketAddr = if driver.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.send_to(payload, driver).await
    };

    send.await
        .map_err(|source| SessionError::Announce { addr: driver, source })?;
    info!("UDP packet sent to address {}", driver);

    Ok(())
}

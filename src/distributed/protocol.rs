//! Wire protocol between the driver, the coordinator and the workers
//!
//! # Announcement
//!
//! A single UDP datagram sent to the driver's well-known port. The payload is
//! the coordinator's local TCP port as ASCII decimal digits, with no length
//! prefix and no terminator.
//!
//! # Integer Framing
//!
//! Every value on the control stream and on each worker stream is a 4-byte
//! big-endian two's-complement integer. There is no other framing.
//!
//! # Message Flow
//!
//! ```text
//! Driver                          Coordinator
//!     |<------- UDP "<port>" --------|
//!     |-------- TCP connect -------->|
//!     |-------- N ------------------>|
//!     |<------- port[0..N] ----------|
//!     |-------- cmd (1|2|3) -------->|
//!     |<------- response ------------|
//!     |-------- cmd 0 -------------->|   (no response)
//! ```

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Value that ends a worker's input stream
pub const SENTINEL: i32 = 0;

/// Written to the driver when the worker count never arrives
pub const GAVE_UP: i32 = -1;

/// Driver command, decoded from its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 0: close everything, no response
    Shutdown,
    /// 1: total sum over all workers
    Sum,
    /// 2: 1-based index of the worker with the largest sum
    ArgMax,
    /// 3: total number of values received
    Count,
    /// Any other code; skipped without a response
    Unknown(i32),
}

impl Command {
    /// Integer code on the wire
    pub fn code(self) -> i32 {
        match self {
            Command::Shutdown => 0,
            Command::Sum => 1,
            Command::ArgMax => 2,
            Command::Count => 3,
            Command::Unknown(code) => code,
        }
    }
}

impl From<i32> for Command {
    fn from(code: i32) -> Self {
        match code {
            0 => Command::Shutdown,
            1 => Command::Sum,
            2 => Command::ArgMax,
            3 => Command::Count,
            other => Command::Unknown(other),
        }
    }
}

/// Announcement payload for a local TCP port
pub fn encode_announcement(port: u16) -> Vec<u8> {
    port.to_string().into_bytes()
}

/// Decode an announcement payload back to a port
///
/// Returns `None` unless the payload is plain ASCII digits fitting a `u16`.
pub fn decode_announcement(payload: &[u8]) -> Option<u16> {
    if payload.is_empty() || !payload.iter().all(u8::is_ascii_digit) {
        return None;
    }

    std::str::from_utf8(payload).ok()?.parse().ok()
}

/// Read one integer
///
/// A stream that ends before four bytes arrive yields `UnexpectedEof`.
pub async fn read_int<R>(reader: &mut R) -> io::Result<i32>
where
    R: AsyncRead + Unpin,
{
    reader.read_i32().await
}

/// Write one integer and flush it immediately
pub async fn write_int<W>(writer: &mut W, value: i32) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i32(value).await?;
    writer.flush().await
}

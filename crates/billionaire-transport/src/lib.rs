//! Transport abstraction layer for the Billionaire client.
//!
//! Provides the [`Connection`] trait, which the client is generic over,
//! and [`StreamConnection`], which implements it for any Tokio byte
//! stream. The game server speaks plain TCP, so [`TcpConnection`] is
//! what a real client uses; tests can run the same client over an
//! in-memory `tokio::io::duplex` pipe.

mod error;
mod stream;

pub use error::TransportError;
pub use stream::{READ_CHUNK_BYTES, StreamConnection, TcpConnection};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single connection that can send and receive bytes.
///
/// The methods return `impl Future + Send` rather than being declared
/// `async fn` so a client generic over `C: Connection` can move its
/// connection into a spawned Tokio task. Implementors can still write
/// plain `async fn` bodies.
///
/// `send` and `recv` take `&self` and may be called concurrently from
/// two loops (one reading, one writing). `recv` must be cancel-safe: a
/// `recv` dropped before it completes loses no data.
pub trait Connection: Send + Sync + 'static {
    /// Writes all of `data` to the peer.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits for the next chunk of bytes from the peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection cleanly.
    /// Chunk boundaries carry no meaning; reassembling frames is the
    /// protocol layer's job.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the writing side. Further sends fail.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

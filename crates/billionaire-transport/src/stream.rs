//! [`Connection`] over any Tokio byte stream, and the TCP connector.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::{Connection, ConnectionId, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Size of the buffer each `recv` reads into.
pub const READ_CHUNK_BYTES: usize = 4096;

/// A connection to the game server over plain TCP.
pub type TcpConnection = StreamConnection<TcpStream>;

/// A [`Connection`] over a byte stream `S`.
///
/// The stream is split into a read half and a write half, each behind
/// its own `tokio::sync::Mutex`, so a reader parked in `recv` never
/// blocks a concurrent `send`.
pub struct StreamConnection<S> {
    id: ConnectionId,
    peer: String,
    reader: Mutex<ReadHalf<S>>,
    writer: Mutex<WriteHalf<S>>,
}

impl<S> fmt::Debug for StreamConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wraps an already-open stream. `peer` is used only in logs.
    pub fn new(stream: S, peer: impl Into<String>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        let peer = peer.into();
        tracing::debug!(%id, %peer, "connection opened");
        Self {
            id,
            peer,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// The remote end, as given at construction.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl StreamConnection<TcpStream> {
    /// Opens a TCP connection to `addr` (`"host:port"`).
    ///
    /// With `timeout`, gives up after that long with
    /// [`TransportError::ConnectTimeout`].
    ///
    /// # Errors
    /// - [`TransportError::ConnectionRefused`] if nothing listens there.
    /// - [`TransportError::ConnectFailed`] for any other I/O failure.
    /// - [`TransportError::ConnectTimeout`] if `timeout` elapses.
    pub async fn connect(addr: &str, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let attempt = TcpStream::connect(addr);
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, attempt).await.map_err(|_| {
                TransportError::ConnectTimeout {
                    addr: addr.to_string(),
                    timeout,
                }
            })?,
            None => attempt.await,
        };

        let stream = result.map_err(|source| {
            if source.kind() == std::io::ErrorKind::ConnectionRefused {
                TransportError::ConnectionRefused {
                    addr: addr.to_string(),
                    source,
                }
            } else {
                TransportError::ConnectFailed {
                    addr: addr.to_string(),
                    source,
                }
            }
        })?;

        // Frames are small and latency matters more than throughput.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr, error = %e, "could not disable Nagle");
        }

        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.to_string());
        tracing::info!(%peer, "connected to server");
        Ok(Self::new(stream, peer))
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await.map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let n = self
            .reader
            .lock()
            .await
            .read(&mut buf)
            .await
            .map_err(TransportError::ReceiveFailed)?;

        if n == 0 {
            tracing::debug!(id = %self.id, peer = %self.peer, "peer closed connection");
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

//! `BillionaireClient` builder and connection task.
//!
//! This is the entry point for talking to a Billionaire server. It ties
//! the layers together: transport → protocol → dispatch → snapshots.
//!
//! ```text
//!            send_command ──→ outbound queue ──→ writer loop ──→ Connection::send
//!                                                    │ (waits for Started)
//!                                                    └── sent record ──┐
//!                                                                      ↓
//!  Connection::recv ──→ FrameDecoder ──→ Dispatcher (hand, book, session)
//!                                            │
//!                           watch<GameView> ←┴→ broadcast<Event>
//! ```
//!
//! Everything right of the `send_command` call runs in one spawned task.
//! The reader loop and writer loop are two futures raced with
//! `tokio::select!` inside it, so they never run in parallel with each
//! other and the [`Dispatcher`](crate::dispatch::Dispatcher) needs no lock.

use std::sync::Arc;
use std::time::Duration;

use billionaire_book::OfferBook;
use billionaire_cards::CardMultiset;
use billionaire_protocol::{Codec, CommandBatch, FrameDecoder, JsonCodec};
use billionaire_session::{SessionState, SessionWatch};
use billionaire_transport::{Connection, ConnectionId, TcpConnection};
use tokio::sync::{Notify, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::{BillionaireError, ClientConfig, Event, GameView, SessionEnd};

/// One queued send: the batch and where to report the outcome.
struct Outbound {
    batch: CommandBatch,
    ack: oneshot::Sender<Result<(), BillionaireError>>,
}

/// Builder for configuring and connecting a client.
///
/// # Example
///
/// ```rust,no_run
/// use billionaire::prelude::*;
///
/// # async fn run() -> Result<(), BillionaireError> {
/// let client = BillionaireClient::builder()
///     .host("127.0.0.1")
///     .port(5555)
///     .connect()
///     .await?;
/// client.session().wait_until_started().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the server host.
    pub fn host(mut self, host: &str) -> Self {
        self.config.host = host.to_string();
        self
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Gives up connecting after `timeout`.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Sets the event broadcast capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Sets the largest partial frame the decoder will buffer.
    pub fn max_frame_bytes(mut self, max: usize) -> Self {
        self.config.max_frame_bytes = max;
        self
    }

    /// Connects over TCP and starts the connection task.
    ///
    /// # Errors
    /// Returns [`BillionaireError::Transport`] if the connection cannot be
    /// opened. A refused connection is reported as
    /// [`TransportError::ConnectionRefused`](billionaire_transport::TransportError::ConnectionRefused)
    /// and is not retried.
    pub async fn connect(self) -> Result<BillionaireClient, BillionaireError> {
        let addr = self.config.address();
        let conn = TcpConnection::connect(&addr, self.config.connect_timeout).await?;
        Ok(BillionaireClient::spawn(conn, self.config))
    }

    /// Starts the connection task over an already-open connection.
    pub fn with_connection<C: Connection>(self, conn: C) -> BillionaireClient {
        BillionaireClient::spawn(conn, self.config)
    }
}

/// A live session with a Billionaire server.
///
/// Cheap to query: every read is a snapshot, nothing blocks on the
/// connection task. Dropping the client shuts the session down.
pub struct BillionaireClient {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    session: SessionWatch,
    view: watch::Receiver<GameView>,
    events: broadcast::Sender<Event>,
    shutdown: Arc<Notify>,
    task: JoinHandle<Result<SessionEnd, BillionaireError>>,
}

impl std::fmt::Debug for BillionaireClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillionaireClient")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BillionaireClient {
    /// Creates a new builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connects with `config`. Same as `builder().config(config).connect()`.
    pub async fn connect(config: ClientConfig) -> Result<Self, BillionaireError> {
        ClientBuilder::new().config(config).connect().await
    }

    /// Runs a client over any [`Connection`] with default settings.
    pub fn from_connection<C: Connection>(conn: C) -> Self {
        Self::spawn(conn, ClientConfig::default())
    }

    fn spawn<C: Connection>(conn: C, config: ClientConfig) -> Self {
        let id = conn.id();
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let mut dispatcher = Dispatcher::new(events.clone());
        dispatcher.connected();

        let session = dispatcher.session();
        let view = dispatcher.watch_view();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(run_connection(
            Arc::new(conn),
            dispatcher,
            outbound_rx,
            Arc::clone(&shutdown),
            JsonCodec,
            config.max_frame_bytes,
        ));

        Self {
            id,
            outbound,
            session,
            view,
            events,
            shutdown,
            task,
        }
    }

    /// The underlying connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `commands` and waits until they are on the wire.
    ///
    /// Dropping the returned future while the batch is still held
    /// withdraws it.
    ///
    /// Accepts a single [`Command`](billionaire_protocol::Command), a
    /// `Vec` of them, or a [`CommandBatch`]. Nothing is written before
    /// the game has started: a call made earlier (or between FINISH and
    /// the next START) waits. Batches go out in the order the calls were
    /// made, across all callers.
    ///
    /// # Errors
    /// - [`BillionaireError::Protocol`] if the batch cannot be encoded.
    /// - [`BillionaireError::Disconnected`] if the session ends first.
    pub async fn send_command(
        &self,
        commands: impl Into<CommandBatch>,
    ) -> Result<(), BillionaireError> {
        let batch = commands.into();
        if batch.is_empty() {
            return Ok(());
        }

        let (ack, done) = oneshot::channel();
        self.outbound
            .send(Outbound { batch, ack })
            .map_err(|_| BillionaireError::Disconnected)?;
        done.await.map_err(|_| BillionaireError::Disconnected)?
    }

    /// The latest snapshot of the game.
    pub fn view(&self) -> GameView {
        self.view.borrow().clone()
    }

    /// Cards in hand.
    pub fn hand(&self) -> CardMultiset {
        self.view.borrow().hand.clone()
    }

    /// Open offers.
    pub fn offers(&self) -> OfferBook {
        self.view.borrow().offers.clone()
    }

    /// Session lifecycle state.
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// A handle for awaiting session states.
    pub fn session(&self) -> SessionWatch {
        self.session.clone()
    }

    /// A receiver that is notified after every applied frame.
    pub fn watch_view(&self) -> watch::Receiver<GameView> {
        self.view.clone()
    }

    /// Subscribes to events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Asks the connection task to stop. Returns immediately;
    /// use [`closed`](Self::closed) to wait for it.
    pub fn shutdown(&self) {
        tracing::debug!(id = %self.id, "shutdown requested");
        self.shutdown.notify_one();
    }

    /// Waits for the session to end and returns how it ended.
    ///
    /// # Errors
    /// The transport error that ended the session, if one did.
    pub async fn closed(self) -> Result<SessionEnd, BillionaireError> {
        // Keep `self` alive until the task finishes: dropping the
        // outbound sender early would look like a shutdown request.
        let Self { task, outbound, .. } = self;
        let result = task.await;
        drop(outbound);
        match result {
            Ok(end) => end,
            Err(e) => {
                tracing::error!(error = %e, "connection task failed");
                Err(BillionaireError::Disconnected)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

async fn run_connection<C: Connection, K: Codec + Clone>(
    conn: Arc<C>,
    mut dispatcher: Dispatcher,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    shutdown: Arc<Notify>,
    codec: K,
    max_frame_bytes: usize,
) -> Result<SessionEnd, BillionaireError> {
    let id = conn.id();
    let session = dispatcher.session();
    let mut decoder = FrameDecoder::with_codec(codec.clone(), max_frame_bytes);
    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
    tracing::info!(%id, "session started");

    let result = tokio::select! {
        end = read_loop(&*conn, &mut dispatcher, &mut decoder, &mut sent_rx) => end,
        end = write_loop(&*conn, &codec, &mut outbound, &session, &sent_tx) => end,
        _ = shutdown.notified() => Ok(SessionEnd::Shutdown),
    };

    // Batches the writer managed to send before the loops stopped.
    while let Ok(batch) = sent_rx.try_recv() {
        dispatcher.handle_sent(&batch);
    }

    if let Err(e) = conn.close().await {
        tracing::debug!(%id, error = %e, "close after session end failed");
    }

    let reason = match &result {
        Ok(end) => end.to_string(),
        Err(e) => e.to_string(),
    };
    tracing::info!(%id, %reason, "session ended");
    dispatcher.close(&reason);
    result
}

/// Reads, decodes and applies frames; also applies the writer's sent
/// records so all state changes happen here.
async fn read_loop<C: Connection, K: Codec>(
    conn: &C,
    dispatcher: &mut Dispatcher,
    decoder: &mut FrameDecoder<K>,
    sent: &mut mpsc::UnboundedReceiver<CommandBatch>,
) -> Result<SessionEnd, BillionaireError> {
    loop {
        tokio::select! {
            // Sent records first, so an answer to an offer never
            // overtakes the offer itself.
            biased;

            Some(batch) = sent.recv() => dispatcher.handle_sent(&batch),

            read = conn.recv() => match read {
                Ok(Some(bytes)) => {
                    for frame in decoder.push(&bytes) {
                        match frame {
                            Ok(batch) => dispatcher.handle_frame(batch),
                            Err(e) => dispatcher.frame_dropped(&e, &bytes),
                        }
                    }
                }
                Ok(None) => return Ok(SessionEnd::ServerClosed),
                Err(e) => {
                    tracing::warn!(error = %e, "receive failed");
                    return Err(e.into());
                }
            },
        }
    }
}

/// Drains the outbound queue in order, one batch at a time, each only
/// once the game is running.
async fn write_loop<C: Connection, K: Codec>(
    conn: &C,
    codec: &K,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    session: &SessionWatch,
    sent: &mpsc::UnboundedSender<CommandBatch>,
) -> Result<SessionEnd, BillionaireError> {
    while let Some(Outbound { batch, ack }) = outbound.recv().await {
        if let Err(e) = session.wait_until_started().await {
            let _ = ack.send(Err(e.into()));
            return Ok(SessionEnd::Shutdown);
        }

        // The caller gave up while the batch was held.
        if ack.is_closed() {
            tracing::debug!(commands = batch.len(), "dropping abandoned batch");
            continue;
        }

        let bytes = match codec.encode(&batch) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode batch");
                let _ = ack.send(Err(e.into()));
                continue;
            }
        };

        if let Err(e) = conn.send(&bytes).await {
            tracing::warn!(error = %e, "send failed");
            let _ = ack.send(Err(BillionaireError::Disconnected));
            return Err(e.into());
        }

        tracing::debug!(commands = batch.len(), bytes = bytes.len(), "batch sent");
        let _ = sent.send(batch);
        let _ = ack.send(Ok(()));
    }

    // Every sender is gone: the client was dropped.
    Ok(SessionEnd::Shutdown)
}

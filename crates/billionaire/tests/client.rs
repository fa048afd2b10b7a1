//! Integration tests for the client against a scripted loopback server.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use billionaire::prelude::*;
use billionaire::{FrameDecoder, SessionError, StreamConnection, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(150);

const JOIN: &str = r#"{"commands":[{"command":"JOIN","client_id":"me"}]}"#;
const START: &str =
    r#"{"commands":[{"command":"START","hand":[{"id":0,"amt":5,"val":10},{"id":1,"amt":2,"val":50}]}]}"#;

// =========================================================================
// Scripted server
// =========================================================================

/// The server side of one client connection.
struct FakeServer {
    socket: TcpStream,
    decoder: FrameDecoder,
    frames: VecDeque<CommandBatch>,
}

impl FakeServer {
    async fn send(&mut self, frame: &str) {
        self.socket.write_all(frame.as_bytes()).await.unwrap();
    }

    async fn send_bytes(&mut self, bytes: &[u8]) {
        self.socket.write_all(bytes).await.unwrap();
    }

    /// Next frame from the client; fails the test after [`WAIT`].
    async fn recv(&mut self) -> CommandBatch {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(frame) = self.frames.pop_front() {
                    return frame;
                }
                let mut buf = [0u8; 4096];
                let n = self.socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed while a frame was expected");
                for frame in self.decoder.push(&buf[..n]) {
                    self.frames.push_back(frame.unwrap());
                }
            }
        })
        .await
        .expect("timed out waiting for a frame")
    }

    /// Asserts the client sends nothing for [`QUIET`].
    async fn expect_silence(&mut self) {
        assert!(self.frames.is_empty());
        let mut buf = [0u8; 64];
        let read = tokio::time::timeout(QUIET, self.socket.read(&mut buf)).await;
        assert!(read.is_err(), "client sent data while it should be held");
    }

    /// Reads until the client closes its side.
    async fn expect_eof(&mut self) {
        tokio::time::timeout(WAIT, async {
            let mut buf = [0u8; 256];
            while self.socket.read(&mut buf).await.unwrap() > 0 {}
        })
        .await
        .expect("client never closed");
    }
}

async fn connect() -> (BillionaireClient, FakeServer) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (client, accepted) = tokio::join!(
        BillionaireClient::builder()
            .host("127.0.0.1")
            .port(port)
            .connect_timeout(WAIT)
            .connect(),
        listener.accept(),
    );
    let (socket, _) = accepted.unwrap();
    let server = FakeServer {
        socket,
        decoder: FrameDecoder::new(),
        frames: VecDeque::new(),
    };
    (client.unwrap(), server)
}

/// Waits until the published view satisfies `pred`.
async fn wait_view(client: &BillionaireClient, pred: impl FnMut(&GameView) -> bool) -> GameView {
    let mut rx = client.watch_view();
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("view never reached the expected state")
        .expect("client task ended")
        .clone()
}

/// Polls `fut` exactly once, so a send is queued without being awaited.
async fn poll_once<F: Future>(fut: &mut Pin<Box<F>>) -> Option<F::Output> {
    tokio::select! {
        biased;
        out = fut.as_mut() => Some(out),
        _ = std::future::ready(()) => None,
    }
}

async fn started() -> (BillionaireClient, FakeServer) {
    let (client, mut server) = connect().await;
    server.send(JOIN).await;
    wait_view(&client, |v| v.state == SessionState::Joined).await;
    server.send(START).await;
    wait_view(&client, |v| v.state == SessionState::Started).await;
    (client, server)
}

fn gold(n: u32) -> CardMultiset {
    [(CardId::Gold, n)].into_iter().collect()
}

// =========================================================================
// Session flow
// =========================================================================

#[tokio::test]
async fn test_connect_starts_in_connected() {
    let (client, _server) = connect().await;
    assert_eq!(client.state(), SessionState::Connected);
    assert!(client.hand().is_empty());
}

#[tokio::test]
async fn test_join_and_start_set_hand() {
    let (client, mut server) = connect().await;

    server.send(JOIN).await;
    let view = wait_view(&client, |v| v.state == SessionState::Joined).await;
    assert_eq!(view.client_id, Some(ParticipantId::from("me")));

    server.send(START).await;
    let view = wait_view(&client, |v| v.state == SessionState::Started).await;
    assert_eq!(view.hand.amount(CardId::Diamonds), 5);
    assert_eq!(view.hand.amount(CardId::Gold), 2);
    assert_eq!(view.hand.len(), 2);
}

#[tokio::test]
async fn test_send_before_start_is_held_then_flushed() {
    let (client, mut server) = connect().await;

    let mut sending = Box::pin(client.send_command(Command::new_offer(&gold(2))));
    assert!(poll_once(&mut sending).await.is_none());

    server.send(JOIN).await;
    wait_view(&client, |v| v.state == SessionState::Joined).await;
    server.expect_silence().await;

    server.send(START).await;
    let frame = server.recv().await;
    sending.await.unwrap();

    let offer = frame.get(CommandKind::NewOffer).expect("NEW_OFFER");
    assert_eq!(offer.cards_attr("cards").unwrap(), gold(2));

    let view = wait_view(&client, |v| v.has_open_offer()).await;
    assert_eq!(view.hand.amount(CardId::Diamonds), 5);
    assert_eq!(view.hand.amount(CardId::Gold), 0);
    assert_eq!(view.holdings().amount(CardId::Gold), 2);
    assert!(view.is_own_offer(2));
}

#[tokio::test]
async fn test_sends_go_out_in_submission_order() {
    let (client, mut server) = connect().await;

    let mut first = Box::pin(client.send_command(Command::cancel_offer(1)));
    let mut second = Box::pin(client.send_command(Command::cancel_offer(2)));
    let mut third = Box::pin(client.send_command(Command::cancel_offer(3)));
    assert!(poll_once(&mut first).await.is_none());
    assert!(poll_once(&mut second).await.is_none());
    assert!(poll_once(&mut third).await.is_none());

    server.send(JOIN).await;
    server.send(START).await;

    let mut sizes = Vec::new();
    for _ in 0..3 {
        let frame = server.recv().await;
        let cancel = frame.get(CommandKind::CancelOffer).unwrap();
        sizes.push(cancel.u64_attr("card_amt").unwrap());
    }
    assert_eq!(sizes, vec![1, 2, 3]);

    first.await.unwrap();
    second.await.unwrap();
    third.await.unwrap();
}

#[tokio::test]
async fn test_abandoned_send_is_not_written() {
    let (client, mut server) = connect().await;

    let mut abandoned = Box::pin(client.send_command(Command::cancel_offer(1)));
    assert!(poll_once(&mut abandoned).await.is_none());
    drop(abandoned);

    let mut kept = Box::pin(client.send_command(Command::cancel_offer(2)));
    assert!(poll_once(&mut kept).await.is_none());

    server.send(JOIN).await;
    server.send(START).await;

    let frame = server.recv().await;
    let cancel = frame.get(CommandKind::CancelOffer).unwrap();
    assert_eq!(cancel.u64_attr("card_amt"), Some(2));
    kept.await.unwrap();
    server.expect_silence().await;
}

#[tokio::test]
async fn test_finish_holds_sends_until_next_start() {
    let (client, mut server) = started().await;

    server.send(r#"{"commands":[{"command":"FINISH"}]}"#).await;
    wait_view(&client, |v| v.state == SessionState::Finished).await;

    let mut sending = Box::pin(client.send_command(Command::cancel_offer(4)));
    assert!(poll_once(&mut sending).await.is_none());
    server.expect_silence().await;

    server.send(START).await;
    let frame = server.recv().await;
    assert!(frame.contains(CommandKind::CancelOffer));
    sending.await.unwrap();
}

// =========================================================================
// Book and trades
// =========================================================================

#[tokio::test]
async fn test_book_event_then_successful_trade() {
    let (client, mut server) = started().await;

    server
        .send(r#"{"commands":[{"command":"BOOK_EVENT","event":"NEW_OFFER","card_amt":3,"participants":["bob"]}]}"#)
        .await;
    let view = wait_view(&client, |v| !v.offers.is_empty()).await;
    assert_eq!(view.offers.owner_of(3), Some(&ParticipantId::from("bob")));

    server
        .send(r#"{"commands":[{"command":"SUCCESSFUL_TRADE","card_amt":3,"cards":[{"id":4,"amt":3}]}]}"#)
        .await;
    let view = wait_view(&client, |v| v.offers.is_empty()).await;
    assert_eq!(view.hand.amount(CardId::Mining), 3);
    assert_eq!(view.hand.amount(CardId::Diamonds), 5);
}

#[tokio::test]
async fn test_cancelled_offer_returns_cards() {
    let (client, mut server) = started().await;

    client.send_command(Command::new_offer(&gold(2))).await.unwrap();
    server.recv().await;
    wait_view(&client, |v| v.has_open_offer()).await;

    server
        .send(r#"{"commands":[{"command":"CANCELLED_OFFER","cards":[{"id":1,"amt":2}]}]}"#)
        .await;
    let view = wait_view(&client, |v| !v.has_open_offer()).await;
    assert_eq!(view.hand.amount(CardId::Gold), 2);
    assert!(view.offers.is_empty());
}

#[tokio::test]
async fn test_events_report_received_and_sent() {
    let (client, mut server) = started().await;
    let mut events = client.subscribe();

    client.send_command(Command::cancel_offer(2)).await.unwrap();
    server.recv().await;
    server.send(r#"{"commands":[{"command":"ERROR","message":"no such offer"}]}"#).await;

    let mut saw_sent = false;
    let mut saw_error = false;
    while !(saw_sent && saw_error) {
        match tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            Event::Sent(c) if c == CommandKind::CancelOffer => saw_sent = true,
            Event::Received(c) if c == CommandKind::Error => {
                assert_eq!(c.str_attr("message"), Some("no such offer"));
                saw_error = true;
            }
            _ => {}
        }
    }
}

// =========================================================================
// Bad input
// =========================================================================

#[tokio::test]
async fn test_malformed_frames_are_dropped_not_fatal() {
    let (client, mut server) = connect().await;
    let mut events = client.subscribe();

    server.send("{not json").await;
    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, Event::FrameDropped { .. }));

    server.send_bytes(&[0xff, 0xfe, 0xfd]).await;
    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert!(matches!(event, Event::FrameDropped { .. }));
    assert_eq!(client.state(), SessionState::Connected);
    assert!(client.hand().is_empty());

    server.send(JOIN).await;
    wait_view(&client, |v| v.state == SessionState::Joined).await;
}

#[tokio::test]
async fn test_frame_split_across_writes() {
    let (client, mut server) = connect().await;

    let (head, tail) = JOIN.split_at(20);
    server.send(head).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    server.send(tail).await;

    wait_view(&client, |v| v.state == SessionState::Joined).await;
}

// =========================================================================
// Ending the session
// =========================================================================

#[tokio::test]
async fn test_server_close_releases_waiters() {
    let (client, mut server) = connect().await;
    server.send(JOIN).await;
    wait_view(&client, |v| v.state == SessionState::Joined).await;

    let session = client.session();
    let waiter = tokio::spawn(async move { session.wait_until_started().await });
    let mut sending = Box::pin(client.send_command(Command::cancel_offer(1)));
    assert!(poll_once(&mut sending).await.is_none());

    drop(server);

    assert_eq!(waiter.await.unwrap(), Err(SessionError::Closed));
    assert!(matches!(sending.await, Err(BillionaireError::Disconnected)));
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(matches!(client.closed().await, Ok(SessionEnd::ServerClosed)));
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
    let (client, mut server) = started().await;
    let mut events = client.subscribe();

    client.shutdown();
    server.expect_eof().await;

    let end = tokio::time::timeout(WAIT, client.closed()).await.unwrap();
    assert!(matches!(end, Ok(SessionEnd::Shutdown)));

    let last = std::iter::from_fn(|| events.try_recv().ok()).last();
    assert!(matches!(last, Some(Event::Disconnected { .. })));
}

#[tokio::test]
async fn test_send_after_close_is_disconnected() {
    let (client, server) = connect().await;
    drop(server);
    wait_view(&client, |v| v.state == SessionState::Disconnected).await;

    let result = client.send_command(Command::cancel_offer(1)).await;
    assert!(matches!(result, Err(BillionaireError::Disconnected)));
}

#[tokio::test]
async fn test_connection_refused_is_returned() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = BillionaireClient::builder().port(port).connect().await;
    assert!(matches!(
        result,
        Err(BillionaireError::Transport(TransportError::ConnectionRefused { .. }))
    ));
}

// =========================================================================
// Other transports and the bot seam
// =========================================================================

#[tokio::test]
async fn test_client_over_in_memory_stream() {
    let (near, mut far) = tokio::io::duplex(4096);
    let client = BillionaireClient::from_connection(StreamConnection::new(near, "duplex"));

    far.write_all(JOIN.as_bytes()).await.unwrap();
    far.write_all(START.as_bytes()).await.unwrap();

    let view = wait_view(&client, |v| v.state == SessionState::Started).await;
    assert_eq!(view.hand.amount(CardId::Gold), 2);
}

/// Offers all its gold once, then idles.
struct OneShot {
    done: bool,
}

impl Bot for OneShot {
    async fn issue_command(&mut self, view: &GameView) -> Issued {
        if self.done || view.hand.amount(CardId::Gold) == 0 {
            return Issued::Idle;
        }
        self.done = true;
        Issued::Command(Command::new_offer(&gold(view.hand.amount(CardId::Gold))))
    }
}

#[tokio::test]
async fn test_bot_driver_sends_and_returns_on_close() {
    let (client, mut server) = started().await;

    let driver = BotDriver::new(client, OneShot { done: false })
        .with_interval(Duration::from_millis(10));
    let running = tokio::spawn(driver.run());

    let frame = server.recv().await;
    let offer = frame.get(CommandKind::NewOffer).unwrap();
    assert_eq!(offer.cards_attr("cards").unwrap(), gold(2));

    drop(server);
    let end = tokio::time::timeout(WAIT, running).await.unwrap().unwrap();
    assert!(matches!(end, Ok(SessionEnd::ServerClosed)));
}

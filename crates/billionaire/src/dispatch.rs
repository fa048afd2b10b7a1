//! Applying commands to the game state.
//!
//! The [`Dispatcher`] is owned by the connection task and is the only
//! code that mutates the hand, the book, or the session. It is plain
//! synchronous code with no I/O; the task feeds it frames as they are
//! decoded and "sent" records as the writer puts batches on the wire.
//!
//! ## Order within a frame
//!
//! A frame may carry several commands. They are applied in the fixed
//! order of [`DISPATCH_ORDER`], not in wire order, so that a frame
//! holding both START and SUCCESSFUL_TRADE always resets the hand
//! before adding the traded cards.

use billionaire_cards::CardMultiset;
use billionaire_protocol::{Command, CommandBatch, CommandKind, ParticipantId, ProtocolError};
use billionaire_session::{SessionEvent, SessionGate, SessionWatch};
use tokio::sync::{broadcast, watch};

use crate::{Event, GameView};

/// The order commands are applied in when a frame holds several.
///
/// The first nine drive the session, the hand and the book. END_ROUND
/// settles the round; the rest are accepted for compatibility with
/// older servers but only logged and published.
pub const DISPATCH_ORDER: [CommandKind; 17] = [
    CommandKind::Error,
    CommandKind::Join,
    CommandKind::Start,
    CommandKind::SuccessfulTrade,
    CommandKind::CancelledOffer,
    CommandKind::BookEvent,
    CommandKind::Finish,
    CommandKind::EndGame,
    CommandKind::Billionaire,
    // -- Round bookkeeping and legacy kinds --
    CommandKind::EndRound,
    CommandKind::Receive,
    CommandKind::Check,
    CommandKind::BookState,
    CommandKind::Ask,
    CommandKind::NewOffer,
    CommandKind::Cancel,
    CommandKind::CancelOffer,
];

/// Single writer of the game state.
pub(crate) struct Dispatcher {
    view: GameView,
    gate: SessionGate,
    view_tx: watch::Sender<GameView>,
    events: broadcast::Sender<Event>,
}

impl Dispatcher {
    pub(crate) fn new(events: broadcast::Sender<Event>) -> Self {
        let (view_tx, _) = watch::channel(GameView::default());
        Self {
            view: GameView::default(),
            gate: SessionGate::new(),
            view_tx,
            events,
        }
    }

    pub(crate) fn session(&self) -> SessionWatch {
        self.gate.watch()
    }

    pub(crate) fn watch_view(&self) -> watch::Receiver<GameView> {
        self.view_tx.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn view(&self) -> &GameView {
        &self.view
    }

    /// The transport is up.
    pub(crate) fn connected(&mut self) {
        self.session_event(SessionEvent::Connect);
        self.publish();
    }

    /// Applies one decoded frame, then publishes a snapshot.
    pub(crate) fn handle_frame(&mut self, batch: CommandBatch) {
        tracing::trace!(commands = batch.len(), "applying frame");

        for kind in DISPATCH_ORDER {
            let Some(command) = batch.get(kind) else {
                continue;
            };
            self.apply(command);
            let _ = self.events.send(Event::Received(command.clone()));
        }
        self.publish();
    }

    /// Records a batch the writer has just put on the wire.
    ///
    /// Only NEW_OFFER changes anything: its cards move from the hand
    /// into escrow, and the offer joins the book as ours. Everything
    /// else waits for the server's answer.
    pub(crate) fn handle_sent(&mut self, batch: &CommandBatch) {
        if let Some(offer) = batch.get(CommandKind::NewOffer) {
            self.open_own_offer(offer);
            self.publish();
        }
        for command in batch {
            let _ = self.events.send(Event::Sent(command.clone()));
        }
    }

    /// An inbound frame could not be decoded. Nothing is applied.
    pub(crate) fn frame_dropped(&mut self, error: &ProtocolError, raw: &[u8]) {
        tracing::warn!(
            error = %error,
            raw = %String::from_utf8_lossy(raw),
            "dropped malformed frame"
        );
        let _ = self.events.send(Event::FrameDropped {
            reason: error.to_string(),
        });
    }

    /// The session is over. Wakes every gate waiter with `Closed`.
    pub(crate) fn close(&mut self, reason: &str) {
        if self.gate.is_closed() {
            return;
        }
        self.gate.close();
        self.publish();
        let _ = self.events.send(Event::Disconnected {
            reason: reason.to_string(),
        });
    }

    // -----------------------------------------------------------------
    // Per-kind handlers
    // -----------------------------------------------------------------

    fn apply(&mut self, command: &Command) {
        match command.kind() {
            CommandKind::Error => {
                tracing::warn!(command = %command, "server reported an error");
            }
            CommandKind::Join => self.on_join(command),
            CommandKind::Start => self.on_start(command),
            CommandKind::SuccessfulTrade => self.on_successful_trade(command),
            CommandKind::CancelledOffer => self.on_cancelled_offer(command),
            CommandKind::BookEvent => self.on_book_event(command),
            CommandKind::Finish | CommandKind::EndGame => self.on_finish(),
            CommandKind::Billionaire => self.on_billionaire(command),
            CommandKind::EndRound => self.on_end_round(command),
            CommandKind::Receive
            | CommandKind::Check
            | CommandKind::BookState
            | CommandKind::Ask
            | CommandKind::NewOffer
            | CommandKind::Cancel
            | CommandKind::CancelOffer => {
                tracing::debug!(command = %command, "notification only");
            }
        }

        if let Some(event) = SessionEvent::from_kind(command.kind()) {
            self.session_event(event);
        }
    }

    fn on_join(&mut self, command: &Command) {
        // `bot_id` is what older servers call it.
        let id = command
            .str_attr("client_id")
            .or_else(|| command.str_attr("bot_id"));
        match id {
            Some(id) => {
                let id = ParticipantId::new(id);
                tracing::info!(client_id = %id, "joined game");
                self.view.client_id = Some(id);
            }
            None => tracing::warn!(command = %command, "JOIN without a client id"),
        }
    }

    fn on_start(&mut self, command: &Command) {
        match command.cards_attr("hand") {
            Ok(hand) => {
                tracing::info!(%hand, "game started");
                self.view.hand = hand;
            }
            Err(e) => {
                tracing::warn!(error = %e, "START with an unreadable hand, keeping the old one");
            }
        }
        self.view.offers.clear();
        self.view.own_offers.clear();
        self.view.billionaire = None;
    }

    fn on_successful_trade(&mut self, command: &Command) {
        let received = self.read_cards(command);
        let size = offer_size(command, &received);

        tracing::info!(size, %received, "trade completed");
        self.view.hand.merge(&received);
        self.view.offers.remove_offer(size);
        if self.view.own_offers.remove(&size).is_none() {
            tracing::debug!(size, "trade for an offer with no escrow");
        }
    }

    fn on_cancelled_offer(&mut self, command: &Command) {
        let returned = self.read_cards(command);
        let size = offer_size(command, &returned);

        tracing::info!(size, %returned, "offer cancelled");
        self.view.hand.merge(&returned);
        self.view.own_offers.remove(&size);
        // A refused offer whose size was already open belongs to someone
        // else; only our own entry leaves the book.
        if self.view.is_own_offer(size) {
            self.view.offers.remove_offer(size);
        }
    }

    fn on_book_event(&mut self, command: &Command) {
        let event = command.str_attr("event").and_then(|e| e.parse::<CommandKind>().ok());
        let Some(size) = card_amt(command) else {
            tracing::warn!(command = %command, "BOOK_EVENT without card_amt");
            return;
        };

        match event {
            Some(CommandKind::NewOffer) => {
                let owner = match command.participants() {
                    Ok(participants) => participants.into_iter().next(),
                    Err(e) => {
                        tracing::warn!(error = %e, "BOOK_EVENT with unreadable participants");
                        None
                    }
                };
                let Some(owner) = owner else {
                    tracing::warn!(size, "new offer without an owner");
                    return;
                };
                if let Err(e) = self.view.offers.add_offer(size, owner) {
                    tracing::warn!(error = %e, "book out of sync with server");
                }
            }
            Some(CommandKind::SuccessfulTrade | CommandKind::CancelledOffer) => {
                self.view.offers.remove_offer(size);
            }
            _ => tracing::debug!(command = %command, "unhandled book event"),
        }
    }

    fn on_finish(&mut self) {
        tracing::info!("game finished");
        self.view.offers.clear();
        self.view.own_offers.clear();
    }

    fn on_billionaire(&mut self, command: &Command) {
        let Some(id) = command.str_attr("client_id") else {
            tracing::warn!(command = %command, "BILLIONAIRE without a client id");
            return;
        };
        let id = ParticipantId::new(id);
        let mine = self.view.client_id.as_ref() == Some(&id);
        tracing::info!(billionaire = %id, mine, "billionaire declared");
        self.view.billionaire = Some(id);
    }

    fn on_end_round(&mut self, command: &Command) {
        let score = command.i64_attr("score");
        tracing::info!(?score, "round ended");
        if score.is_some() {
            self.view.score = score;
        }
        // The server empties its book when a round is won; cards that
        // were on offer do not come back.
        self.view.offers.clear();
        self.view.own_offers.clear();
    }

    // -----------------------------------------------------------------
    // Outbound bookkeeping
    // -----------------------------------------------------------------

    fn open_own_offer(&mut self, offer: &Command) {
        let cards = match offer.cards_attr("cards") {
            Ok(cards) if !cards.is_empty() => cards,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(error = %e, "sent NEW_OFFER with unreadable cards");
                return;
            }
        };

        let escrowed = self.view.hand.take_all(&cards);
        if escrowed != cards {
            tracing::warn!(offered = %cards, held = %escrowed, "offered more than the hand holds");
        }
        let size = cards.total();
        self.view.own_offers.entry(size).or_default().merge(&escrowed);

        let Some(me) = self.view.client_id.clone() else {
            tracing::debug!(size, "offer sent before JOIN, not tracked in the book");
            return;
        };
        // A size that is already open means the server will match or
        // refuse this offer; either answer settles the escrow.
        if let Err(e) = self.view.offers.add_offer(size, me) {
            tracing::debug!(error = %e, "own offer not added to book");
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn read_cards(&self, command: &Command) -> CardMultiset {
        command.cards_attr("cards").unwrap_or_else(|e| {
            tracing::warn!(kind = %command.kind(), error = %e, "unreadable card list");
            CardMultiset::new()
        })
    }

    fn session_event(&mut self, event: SessionEvent) {
        if let Err(e) = self.gate.apply(event) {
            tracing::warn!(error = %e, "ignored session event");
        }
    }

    fn publish(&mut self) {
        self.view.state = self.gate.state();
        self.view_tx.send_replace(self.view.clone());
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> billionaire_session::SessionState {
        self.gate.state()
    }
}

/// `card_amt` as a size, if present and in range.
fn card_amt(command: &Command) -> Option<u32> {
    command.u64_attr("card_amt").and_then(|n| u32::try_from(n).ok())
}

/// The offer a trade or cancellation refers to: `card_amt` if given,
/// otherwise the number of cards that changed hands.
fn offer_size(command: &Command, cards: &CardMultiset) -> u32 {
    card_amt(command).unwrap_or_else(|| cards.total())
}

#[cfg(test)]
mod tests {
    use billionaire_cards::CardId;
    use billionaire_session::SessionState;
    use serde_json::json;

    use super::*;

    fn dispatcher() -> (Dispatcher, broadcast::Receiver<Event>) {
        let (tx, rx) = broadcast::channel(64);
        let mut d = Dispatcher::new(tx);
        d.connected();
        (d, rx)
    }

    fn frame(value: serde_json::Value) -> CommandBatch {
        serde_json::from_value(value).unwrap()
    }

    fn join(id: &str) -> CommandBatch {
        frame(json!({"commands": [{"command": "JOIN", "client_id": id}]}))
    }

    fn start(hand: serde_json::Value) -> CommandBatch {
        frame(json!({"commands": [{"command": "START", "hand": hand}]}))
    }

    fn started(id: &str) -> (Dispatcher, broadcast::Receiver<Event>) {
        let (mut d, rx) = dispatcher();
        d.handle_frame(join(id));
        d.handle_frame(start(json!([
            {"id": 0, "amt": 5},
            {"id": 1, "amt": 2},
            {"id": 2, "amt": 3}
        ])));
        (d, rx)
    }

    fn book_event(event: &str, size: u32, who: &str) -> CommandBatch {
        frame(json!({"commands": [{
            "command": "BOOK_EVENT",
            "event": event,
            "card_amt": size,
            "participants": [who]
        }]}))
    }

    // =====================================================================
    // Dispatch order
    // =====================================================================

    #[test]
    fn test_dispatch_order_covers_every_kind_once() {
        for kind in CommandKind::ALL {
            let n = DISPATCH_ORDER.iter().filter(|k| **k == kind).count();
            assert_eq!(n, 1, "{kind} appears {n} times");
        }
    }

    #[test]
    fn test_start_applies_before_trade_in_same_frame() {
        let (mut d, _rx) = dispatcher();
        d.handle_frame(join("me"));

        // Wire order puts the trade first; START must still reset first.
        d.handle_frame(frame(json!({"commands": [
            {"command": "SUCCESSFUL_TRADE", "cards": [{"id": 4, "amt": 2}]},
            {"command": "START", "hand": [{"id": 0, "amt": 1}]}
        ]})));

        assert_eq!(d.view().hand.amount(CardId::Diamonds), 1);
        assert_eq!(d.view().hand.amount(CardId::Mining), 2);
    }

    #[test]
    fn test_received_events_follow_dispatch_order() {
        let (mut d, mut rx) = dispatcher();
        d.handle_frame(frame(json!({"commands": [
            {"command": "START", "hand": []},
            {"command": "JOIN", "client_id": "me"}
        ]})));

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let Event::Received(c) = event {
                kinds.push(c.kind());
            }
        }
        assert_eq!(kinds, vec![CommandKind::Join, CommandKind::Start]);
    }

    // =====================================================================
    // Session
    // =====================================================================

    #[test]
    fn test_join_records_id_and_state() {
        let (mut d, _rx) = dispatcher();
        d.handle_frame(join("p1"));

        assert_eq!(d.view().client_id, Some(ParticipantId::from("p1")));
        assert_eq!(d.state(), SessionState::Joined);
    }

    #[test]
    fn test_join_accepts_legacy_bot_id() {
        let (mut d, _rx) = dispatcher();
        d.handle_frame(frame(json!({"commands": [{"command": "JOIN", "bot_id": "old"}]})));
        assert_eq!(d.view().client_id, Some(ParticipantId::from("old")));
    }

    #[test]
    fn test_start_sets_hand() {
        let (d, _rx) = started("me");
        let view = d.view();
        assert_eq!(view.hand.amount(CardId::Diamonds), 5);
        assert_eq!(view.hand.amount(CardId::Gold), 2);
        assert_eq!(d.state(), SessionState::Started);
    }

    #[test]
    fn test_start_resets_book() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 3, "bob"));
        d.handle_frame(start(json!([{"id": 7, "amt": 9}])));

        assert!(d.view().offers.is_empty());
        assert_eq!(d.view().hand.amount(CardId::Sport), 9);
        assert_eq!(d.view().hand.amount(CardId::Diamonds), 0);
    }

    #[test]
    fn test_finish_clears_book_and_regates() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 3, "bob"));
        d.handle_frame(frame(json!({"commands": [{"command": "END_GAME"}]})));

        assert!(d.view().offers.is_empty());
        assert_eq!(d.state(), SessionState::Finished);
    }

    #[test]
    fn test_published_view_tracks_state() {
        let (mut d, _rx) = dispatcher();
        let view = d.watch_view();
        assert_eq!(view.borrow().state, SessionState::Connected);

        d.handle_frame(join("me"));
        assert_eq!(view.borrow().state, SessionState::Joined);
    }

    // =====================================================================
    // Book events
    // =====================================================================

    #[test]
    fn test_book_event_then_successful_trade() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 3, "bob"));
        assert_eq!(d.view().offers.owner_of(3), Some(&ParticipantId::from("bob")));

        d.handle_frame(frame(json!({"commands": [{
            "command": "SUCCESSFUL_TRADE",
            "card_amt": 3,
            "cards": [{"id": 4, "amt": 3}]
        }]})));

        assert_eq!(d.view().offers.owner_of(3), None);
        assert_eq!(d.view().hand.amount(CardId::Mining), 3);
    }

    #[test]
    fn test_book_event_trade_between_others_removes_offer() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 2, "bob"));
        d.handle_frame(book_event("SUCCESSFUL_TRADE", 2, "alice"));
        assert!(d.view().offers.is_empty());
    }

    #[test]
    fn test_book_event_duplicate_size_keeps_first_owner() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 5, "alice"));
        d.handle_frame(book_event("NEW_OFFER", 5, "bob"));
        assert_eq!(d.view().offers.owner_of(5), Some(&ParticipantId::from("alice")));
    }

    #[test]
    fn test_book_event_without_card_amt_is_ignored() {
        let (mut d, _rx) = started("me");
        d.handle_frame(frame(json!({"commands": [{
            "command": "BOOK_EVENT", "event": "NEW_OFFER", "participants": ["bob"]
        }]})));
        assert!(d.view().offers.is_empty());
    }

    // =====================================================================
    // Own offers
    // =====================================================================

    #[test]
    fn test_sent_offer_moves_cards_to_escrow() {
        let (mut d, _rx) = started("me");
        let offer: CardMultiset = [(CardId::Oil, 3)].into_iter().collect();
        d.handle_sent(&CommandBatch::from(Command::new_offer(&offer)));

        let view = d.view();
        assert_eq!(view.hand.amount(CardId::Oil), 0);
        assert_eq!(view.own_offers.get(&3), Some(&offer));
        assert!(view.is_own_offer(3));
    }

    #[test]
    fn test_cancelled_offer_returns_cards() {
        let (mut d, _rx) = started("me");
        let offer: CardMultiset = [(CardId::Oil, 3)].into_iter().collect();
        d.handle_sent(&CommandBatch::from(Command::new_offer(&offer)));

        d.handle_frame(frame(json!({"commands": [{
            "command": "CANCELLED_OFFER",
            "cards": [{"id": 2, "amt": 3}]
        }]})));

        let view = d.view();
        assert_eq!(view.hand.amount(CardId::Oil), 3);
        assert!(view.own_offers.is_empty());
        assert!(view.offers.is_empty());
    }

    #[test]
    fn test_refused_offer_leaves_other_owner_in_book() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 2, "bob"));

        let offer: CardMultiset = [(CardId::Gold, 2)].into_iter().collect();
        d.handle_sent(&CommandBatch::from(Command::new_offer(&offer)));
        assert_eq!(d.view().offers.owner_of(2), Some(&ParticipantId::from("bob")));

        d.handle_frame(frame(json!({"commands": [{
            "command": "CANCELLED_OFFER",
            "cards": [{"id": 1, "amt": 2}]
        }]})));

        assert_eq!(d.view().hand.amount(CardId::Gold), 2);
        assert_eq!(d.view().offers.owner_of(2), Some(&ParticipantId::from("bob")));
    }

    #[test]
    fn test_own_offer_traded() {
        let (mut d, _rx) = started("me");
        let offer: CardMultiset = [(CardId::Diamonds, 2)].into_iter().collect();
        d.handle_sent(&CommandBatch::from(Command::new_offer(&offer)));

        d.handle_frame(frame(json!({"commands": [{
            "command": "SUCCESSFUL_TRADE",
            "cards": [{"id": 6, "amt": 2}]
        }]})));

        let view = d.view();
        assert_eq!(view.hand.amount(CardId::Diamonds), 3);
        assert_eq!(view.hand.amount(CardId::Banking), 2);
        assert!(view.own_offers.is_empty());
        assert!(view.offers.is_empty());
    }

    #[test]
    fn test_trade_with_huge_card_counts_keeps_session() {
        let (mut d, _rx) = started("me");
        d.handle_frame(frame(json!({"commands": [{
            "command": "SUCCESSFUL_TRADE",
            "cards": [{"id": 4, "amt": u32::MAX}, {"id": 5, "amt": 1}]
        }]})));

        let view = d.view();
        assert_eq!(d.state(), SessionState::Started);
        assert_eq!(view.hand.amount(CardId::Mining), u32::MAX);
        assert_eq!(view.hand.amount(CardId::Shipping), 1);
        assert_eq!(view.hand.amount(CardId::Diamonds), 5);
    }

    #[test]
    fn test_end_round_records_score_and_clears_book() {
        let (mut d, _rx) = started("me");
        d.handle_frame(book_event("NEW_OFFER", 3, "bob"));
        d.handle_frame(frame(json!({"commands": [
            {"command": "BILLIONAIRE", "client_id": "bob"},
            {"command": "END_ROUND", "score": 120}
        ]})));

        let view = d.view();
        assert_eq!(view.score, Some(120));
        assert!(view.is_billionaire(&ParticipantId::from("bob")));
        assert!(view.offers.is_empty());
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    #[test]
    fn test_close_emits_disconnected_once() {
        let (mut d, mut rx) = started("me");
        d.close("server closed");
        d.close("again");

        let disconnects = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|e| matches!(e, Event::Disconnected { .. }))
            .count();
        assert_eq!(disconnects, 1);
        assert_eq!(d.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_frame_dropped_emits_event() {
        let (mut d, mut rx) = dispatcher();
        d.frame_dropped(&ProtocolError::MalformedPayload("x".into()), b"{not json");

        let dropped = std::iter::from_fn(|| rx.try_recv().ok())
            .any(|e| matches!(e, Event::FrameDropped { .. }));
        assert!(dropped);
        assert_eq!(d.view().hand, CardMultiset::new());
    }
}

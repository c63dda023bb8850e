use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::models::character::CharacterId;
use crate::models::event::Event;

/// Per-client mailbox, modeled on the queue-per-waypoint actor state in
/// `broker.rs`'s `CargoBroker`: a plain lock-protected buffer guarded by
/// atomics for the flags callers need to check without awaiting anything.
struct ClientState {
    tx: mpsc::UnboundedSender<Event>,
    paused: AtomicBool,
    alive: AtomicBool,
    is_admin: bool,
    last_sent_sequence: AtomicU64,
    buffer: Mutex<VecDeque<Event>>,
}

/// Handle returned to a newly subscribed client.
pub struct SubscriberHandle {
    pub character_id: CharacterId,
    pub rx: mpsc::UnboundedReceiver<Event>,
}

/// Fan-out registry: one entry per connected client, keyed by character id
/// (spec.md §4.4 "SubscriptionHub"). A client may be paused, during which
/// events accumulate in its buffer instead of being pushed down the
/// channel; resuming flushes the buffer, skipping anything already
/// delivered so a reconnect never produces duplicates.
pub struct SubscriptionHub {
    clients: DashMap<CharacterId, Arc<ClientState>>,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self { clients: DashMap::new() }
    }

    /// Registers a client connection, replacing any prior one for the same
    /// character (a reconnect). `is_admin` marks it eligible for
    /// `EventFilter::AdminOnly` broadcasts.
    pub fn subscribe(&self, character_id: CharacterId, is_admin: bool) -> SubscriberHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(ClientState {
            tx,
            paused: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            is_admin,
            last_sent_sequence: AtomicU64::new(0),
            buffer: Mutex::new(VecDeque::new()),
        });
        self.clients.insert(character_id.clone(), state);
        SubscriberHandle { character_id, rx }
    }

    pub fn unsubscribe(&self, character_id: &str) {
        if let Some((_, state)) = self.clients.remove(character_id) {
            state.alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn pause(&self, character_id: &str) {
        if let Some(state) = self.clients.get(character_id) {
            state.paused.store(true, Ordering::SeqCst);
        }
    }

    /// Flushes buffered events (skipping any with `sequence` at or below
    /// the last one actually sent, per spec.md §4.4 dedup requirement) and
    /// clears the paused flag.
    pub fn resume(&self, character_id: &str) {
        let Some(state) = self.clients.get(character_id) else { return };
        let mut buffered = state.buffer.lock().unwrap();
        let last_sent = state.last_sent_sequence.load(Ordering::SeqCst);
        while let Some(event) = buffered.pop_front() {
            if event.sequence > last_sent {
                state.last_sent_sequence.store(event.sequence, Ordering::SeqCst);
                let _ = state.tx.send(event);
            }
        }
        state.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_connected(&self, character_id: &str) -> bool {
        self.clients.get(character_id).map(|s| s.alive.load(Ordering::SeqCst)).unwrap_or(false)
    }

    /// Every character id currently holding a live subscription; used by the
    /// admin `event_query` command for a connection census.
    pub fn connected_characters(&self) -> Vec<CharacterId> {
        self.clients
            .iter()
            .filter(|entry| entry.value().alive.load(Ordering::SeqCst))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Delivers `event` to every id in `recipients`, plus every admin-flagged
    /// client when `admin_only` is set. Called synchronously from
    /// `EventBus::emit` right after sequence assignment, so ordering across
    /// clients matches emission order.
    pub fn dispatch(&self, event: Event, recipients: &[CharacterId], admin_only: bool) {
        if admin_only {
            for entry in self.clients.iter() {
                if entry.value().is_admin {
                    self.deliver_to(entry.value(), event.clone());
                }
            }
            return;
        }
        for character_id in recipients {
            if let Some(state) = self.clients.get(character_id) {
                self.deliver_to(&state, event.clone());
            }
        }
    }

    fn deliver_to(&self, state: &ClientState, event: Event) {
        if state.paused.load(Ordering::SeqCst) {
            state.buffer.lock().unwrap().push_back(event);
        } else {
            state.last_sent_sequence.store(event.sequence, Ordering::SeqCst);
            let _ = state.tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::models::event::EventFilterOrResolved;

    fn resolved_event(sequence: u64) -> Event {
        let mut event = Event::new("test.tick", json!({}), crate::models::event::EventFilter::AdminOnly);
        event.sequence = sequence;
        event.filter = EventFilterOrResolved::Resolved(vec!["char-1".to_string()], false);
        event
    }

    #[tokio::test]
    async fn pause_buffers_and_resume_flushes_without_duplicates() {
        let hub = SubscriptionHub::new();
        let mut handle = hub.subscribe("char-1".to_string(), false);

        hub.dispatch(resolved_event(1), &["char-1".to_string()], false);
        assert_eq!(handle.rx.recv().await.unwrap().sequence, 1);

        hub.pause("char-1");
        hub.dispatch(resolved_event(2), &["char-1".to_string()], false);
        hub.dispatch(resolved_event(3), &["char-1".to_string()], false);

        assert!(handle.rx.try_recv().is_err());

        hub.resume("char-1");
        assert_eq!(handle.rx.recv().await.unwrap().sequence, 2);
        assert_eq!(handle.rx.recv().await.unwrap().sequence, 3);
    }

    #[tokio::test]
    async fn unsubscribe_marks_disconnected() {
        let hub = SubscriptionHub::new();
        let _handle = hub.subscribe("char-1".to_string(), false);
        assert!(hub.is_connected("char-1"));
        hub.unsubscribe("char-1");
        assert!(!hub.is_connected("char-1"));
    }
}

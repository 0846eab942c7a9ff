//! Per-subscriber bounded event fanout: single producer (the Swamp), many
//! consumers. A slow subscriber is dropped from, not allowed to stall, the
//! publish path.

use hydraide_core::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::RwLock;

/// One Treasure-level event: a save (with its new value) or a delete.
#[derive(Debug, Clone)]
pub struct TreasureEvent {
    /// The affected Treasure's key.
    pub key: String,
    /// The value as of this event; `None` for a delete.
    pub value: Option<Value>,
    /// True if this event represents a deletion.
    pub deleted: bool,
}

/// A Swamp-level info event: size/count deltas, emitted to info
/// subscribers independent of per-Treasure events.
#[derive(Debug, Clone, Copy)]
pub struct SwampInfo {
    /// Current Treasure count at the time of this event.
    pub count: usize,
}

/// Fanout broker for one event type. Each subscriber gets its own bounded
/// queue; `publish` never blocks — a full queue drops the new event for
/// that subscriber and increments the dropped-message counter.
#[derive(Debug, Default)]
pub struct EventBroker<T: Clone> {
    subscribers: RwLock<Vec<(String, SyncSender<T>)>>,
    dropped: AtomicU64,
}

impl<T: Clone> EventBroker<T> {
    /// A broker with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register `client_id` for delivery, returning its receiving end. A
    /// second subscription under the same id replaces the first.
    pub fn subscribe(&self, client_id: impl Into<String>, capacity: usize) -> Receiver<T> {
        let client_id = client_id.into();
        let (tx, rx) = sync_channel(capacity.max(1));
        let mut subscribers = self.subscribers.write().unwrap();
        subscribers.retain(|(id, _)| id != &client_id);
        subscribers.push((client_id, tx));
        rx
    }

    /// Remove a subscriber; a subsequent publish no longer reaches it.
    pub fn unsubscribe(&self, client_id: &str) {
        self.subscribers.write().unwrap().retain(|(id, _)| id != client_id);
    }

    /// Deliver `event` to every current subscriber. Delivery to the same
    /// subscriber preserves publish order; a full queue drops this event
    /// for that subscriber only.
    pub fn publish(&self, event: T) {
        let subscribers = self.subscribers.read().unwrap();
        for (_, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().unwrap().len()
    }

    /// Total events dropped across all subscribers due to a full queue.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn subscriber_receives_published_events_in_order() {
        let broker: EventBroker<TreasureEvent> = EventBroker::new();
        let rx = broker.subscribe("client-1", 8);
        broker.publish(TreasureEvent {
            key: "k1".into(),
            value: Some(Value::I64(1)),
            deleted: false,
        });
        broker.publish(TreasureEvent {
            key: "k1".into(),
            value: None,
            deleted: true,
        });
        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(!first.deleted);
        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(second.deleted);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let broker: EventBroker<SwampInfo> = EventBroker::new();
        let rx = broker.subscribe("client-1", 4);
        broker.unsubscribe("client-1");
        broker.publish(SwampInfo { count: 1 });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_and_counts_without_blocking() {
        let broker: EventBroker<SwampInfo> = EventBroker::new();
        let _rx = broker.subscribe("client-1", 1);
        broker.publish(SwampInfo { count: 1 });
        broker.publish(SwampInfo { count: 2 });
        assert_eq!(broker.dropped_count(), 1);
    }

    #[test]
    fn resubscribing_same_id_replaces_prior_receiver() {
        let broker: EventBroker<SwampInfo> = EventBroker::new();
        let _rx1 = broker.subscribe("client-1", 4);
        let rx2 = broker.subscribe("client-1", 4);
        assert_eq!(broker.subscriber_count(), 1);
        broker.publish(SwampInfo { count: 7 });
        assert_eq!(rx2.recv_timeout(Duration::from_secs(1)).unwrap().count, 7);
    }
}

//! Registry of live agent channels with fan-out broadcast.
//!
//! Each agent connection owns a bounded outbound queue drained by its own
//! writer task. The registry keeps the sending half, so broadcasting is a
//! series of non-blocking `try_send` calls: a slow peer can never stall the
//! round loop.
//!
//! ```text
//! broadcast(payload) ──try_send──▶ [queue 1] ──▶ writer 1 ──▶ socket 1
//!                    ──try_send──▶ [queue 2] ──▶ writer 2 ──▶ socket 2
//!                    ──try_send──▶ [closed ]     (removed)
//! ```
//!
//! Dropping a sender closes its queue; the writer sees the end of the queue
//! and closes the socket. That is how [`ConnectionRegistry::disconnect_all`]
//! ends every connection at once.

use std::collections::HashMap;
use std::fmt;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Messages a connection may have queued before new ones are dropped.
pub const OUTBOUND_CAPACITY: usize = 32;

/// Handle of one registered channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conn#{}", self.0)
    }
}

/// What one broadcast achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Queued for delivery.
    pub delivered: usize,
    /// Skipped because the peer's queue was full.
    pub dropped: usize,
    /// Removed because the peer had gone away.
    pub removed: usize,
}

/// The set of connected agent channels.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_id: u64,
    channels: HashMap<ConnectionId, mpsc::Sender<Utf8Bytes>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new channel. The caller drains the returned receiver.
    pub fn add(&mut self) -> (ConnectionId, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.channels.insert(id, tx);
        (id, rx)
    }

    /// Forget a channel. Returns whether it was still registered.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.channels.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Queue the same payload on every channel.
    ///
    /// Closed channels are removed; full channels miss this payload only.
    pub fn broadcast(&mut self, payload: Utf8Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        self.channels
            .retain(|id, tx| match tx.try_send(payload.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    debug!(conn = %id, "outbound queue full, dropping round");
                    report.dropped += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn = %id, "channel closed, removing");
                    report.removed += 1;
                    false
                }
            });

        report
    }

    /// Close every channel. Returns how many were closed.
    pub fn disconnect_all(&mut self) -> usize {
        let count = self.channels.len();
        self.channels.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_channel() {
        let mut registry = ConnectionRegistry::new();
        let (_, mut rx1) = registry.add();
        let (_, mut rx2) = registry.add();

        let report = registry.broadcast(Utf8Bytes::from_static("round"));
        assert_eq!(report.delivered, 2);

        assert_eq!(rx1.recv().await.unwrap().as_str(), "round");
        assert_eq!(rx2.recv().await.unwrap().as_str(), "round");
    }

    #[tokio::test]
    async fn test_closed_channel_is_removed_others_still_served() {
        let mut registry = ConnectionRegistry::new();
        let (gone, rx_gone) = registry.add();
        let (_, mut rx_live) = registry.add();
        drop(rx_gone);

        let report = registry.broadcast(Utf8Bytes::from_static("x"));
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                dropped: 0,
                removed: 1
            }
        );
        assert!(!registry.contains(gone));
        assert_eq!(registry.len(), 1);
        assert_eq!(rx_live.recv().await.unwrap().as_str(), "x");
    }

    #[tokio::test]
    async fn test_full_queue_drops_payload_but_keeps_channel() {
        let mut registry = ConnectionRegistry::new();
        let (slow, mut rx) = registry.add();

        for _ in 0..OUTBOUND_CAPACITY {
            registry.broadcast(Utf8Bytes::from_static("a"));
        }
        let report = registry.broadcast(Utf8Bytes::from_static("b"));
        assert_eq!(report.dropped, 1);
        assert!(registry.contains(slow));

        // Draining makes room again
        rx.recv().await.unwrap();
        assert_eq!(registry.broadcast(Utf8Bytes::from_static("c")).delivered, 1);
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_queues() {
        let mut registry = ConnectionRegistry::new();
        let (_, mut rx1) = registry.add();
        let (_, mut rx2) = registry.add();
        registry.broadcast(Utf8Bytes::from_static("last"));

        assert_eq!(registry.disconnect_all(), 2);
        assert!(registry.is_empty());

        // Queued payloads still drain, then the queue ends
        assert_eq!(rx1.recv().await.unwrap().as_str(), "last");
        assert!(rx1.recv().await.is_none());
        assert_eq!(rx2.recv().await.unwrap().as_str(), "last");
        assert!(rx2.recv().await.is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (id, _rx) = registry.add();
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
    }

    #[test]
    fn test_connection_ids_are_unique() {
        let mut registry = ConnectionRegistry::new();
        let (a, _ra) = registry.add();
        registry.remove(a);
        let (b, _rb) = registry.add();
        assert_ne!(a, b);
    }
}

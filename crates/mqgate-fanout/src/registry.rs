//! The observer registry and broadcast path.

use std::collections::HashMap;
use std::sync::Arc;

use mqgate_core::ConnectionId;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::observer::{ObserverConnection, SendOutcome};
use crate::record::FanoutEvent;

/// Owns the set of live observers and fans events out to them.
///
/// The set is the only state touched by multiple concurrent event sources,
/// so mutation goes exclusively through [`add`](Self::add) /
/// [`remove`](Self::remove), and [`broadcast`](Self::broadcast) iterates a
/// snapshot: an observer added or removed mid-broadcast never corrupts the
/// iteration, it just catches the next event.
#[derive(Default)]
pub struct EventFanout {
    observers: RwLock<HashMap<ConnectionId, Arc<ObserverConnection>>>,
}

impl EventFanout {
    /// Create an empty fan-out set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Admit an observer whose handshake completed. Moves it to `Open` and
    /// adds it to the set.
    pub async fn add(&self, observer: Arc<ObserverConnection>) {
        observer.mark_open();
        let mut set = self.observers.write().await;
        let _ = set.insert(observer.id, observer);
    }

    /// Drop an observer from the set and mark it closed. Idempotent, and
    /// harmless if it races with natural connection teardown.
    pub async fn remove(&self, id: ConnectionId) {
        let mut set = self.observers.write().await;
        if let Some(observer) = set.remove(&id) {
            observer.mark_closed();
        }
    }

    /// Push one event to every live observer.
    ///
    /// The record is serialized once and the same bytes queued for each
    /// observer. Delivery is fire-and-forget: a full queue drops the record
    /// for that observer only, and an observer whose channel is gone is
    /// evicted. Nothing here blocks on any observer or reports back to the
    /// event source.
    pub async fn broadcast(&self, event: &FanoutEvent) {
        let record = match serde_json::to_string(event) {
            Ok(json) => Arc::new(json),
            Err(err) => {
                warn!(event_type = event.event_type(), %err, "failed to serialize fan-out record");
                return;
            }
        };

        let snapshot: Vec<Arc<ObserverConnection>> =
            self.observers.read().await.values().cloned().collect();
        debug!(
            event_type = event.event_type(),
            observers = snapshot.len(),
            "broadcast"
        );

        let mut dead = Vec::new();
        for observer in &snapshot {
            match observer.send(Arc::clone(&record)) {
                SendOutcome::Sent => {}
                SendOutcome::QueueFull => {
                    warn!(id = %observer.id, dropped = observer.drop_count(), "observer queue full, record dropped");
                }
                SendOutcome::Closed => dead.push(observer.id),
            }
        }

        for id in dead {
            debug!(%id, "evicting dead observer");
            self.remove(id).await;
        }
    }

    /// Number of observers currently in the set.
    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }
}

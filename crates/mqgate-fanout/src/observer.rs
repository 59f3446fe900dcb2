//! Observer connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use mqgate_core::ConnectionId;
use tokio::sync::mpsc;

/// Observer lifecycle. `Closed` is terminal; there is no re-entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Liveness {
    /// Handshake in progress; not yet receiving events.
    Connecting = 0,
    /// In the fan-out set, receiving events.
    Open = 1,
    /// Teardown started; no further records are queued.
    Closing = 2,
    /// Gone. Terminal.
    Closed = 3,
}

impl Liveness {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Outcome of queueing one record for an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Record queued for delivery.
    Sent,
    /// Queue full: the record is dropped for this observer only.
    QueueFull,
    /// The observer's transport is gone; remove it from the set.
    Closed,
}

/// A connection registered to receive fan-out records.
pub struct ObserverConnection {
    /// Process-unique connection id.
    pub id: ConnectionId,
    /// Queue to the observer's transport write task.
    tx: mpsc::Sender<Arc<String>>,
    liveness: AtomicU8,
    dropped: AtomicU64,
}

impl ObserverConnection {
    /// Create an observer in the `Connecting` state.
    #[must_use]
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        Self {
            id,
            tx,
            liveness: AtomicU8::new(Liveness::Connecting as u8),
            dropped: AtomicU64::new(0),
        }
    }

    /// Current liveness.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        Liveness::from_u8(self.liveness.load(Ordering::Acquire))
    }

    /// Handshake finished: `Connecting → Open`. No-op in any other state.
    pub fn mark_open(&self) {
        let _ = self.liveness.compare_exchange(
            Liveness::Connecting as u8,
            Liveness::Open as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Teardown started. No-op once `Closed`.
    pub fn begin_close(&self) {
        let _ = self
            .liveness
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                (v != Liveness::Closed as u8).then_some(Liveness::Closing as u8)
            });
    }

    /// Terminal transition, from any prior state. Idempotent.
    pub fn mark_closed(&self) {
        self.liveness.store(Liveness::Closed as u8, Ordering::Release);
    }

    /// Queue one serialized record without blocking.
    ///
    /// Only `Open` observers receive records. A full queue drops the record
    /// and counts it; a closed channel reports [`SendOutcome::Closed`] so the
    /// registry can evict this observer.
    pub fn send(&self, record: Arc<String>) -> SendOutcome {
        if self.liveness() != Liveness::Open {
            return SendOutcome::Closed;
        }
        match self.tx.try_send(record) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
                SendOutcome::QueueFull
            }
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    /// Records dropped for this observer because its queue was full.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

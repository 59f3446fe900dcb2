//! Connection identifiers.
//!
//! Every connection the gateway accepts — broker sessions on either transport
//! and observer connections — gets a [`ConnectionId`] that is unique for the
//! lifetime of the process. Ids are handed out by a [`ConnectionIdAllocator`]
//! backed by an atomic counter, so allocation is lock-free and never reuses a
//! value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-unique identifier for a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Return the raw numeric value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Hands out monotonically increasing [`ConnectionId`]s.
#[derive(Debug, Default)]
pub struct ConnectionIdAllocator {
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    /// Create an allocator starting at id 1. Id 0 is reserved for the
    /// gateway's internal pseudo-connection (observer-injected publishes).
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id.
    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Id of the internal pseudo-connection used for observer-injected publishes.
pub const GATEWAY_CONNECTION_ID: ConnectionId = ConnectionId(0);

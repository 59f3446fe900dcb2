//! Lifecycle and traffic events emitted by the protocol engine.
//!
//! The engine emits one [`EngineEvent`] per occurrence, serially, after the
//! corresponding authorization decision has been applied. The gateway
//! observes them over a `tokio::sync::broadcast` channel and mirrors them to
//! observer connections; it never generates them itself.

use bytes::Bytes;

use crate::ids::ConnectionId;

/// One broker occurrence, as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A client completed authentication and its session is live.
    Connect {
        /// Connection the event belongs to.
        id: ConnectionId,
        /// Name of the authenticated principal.
        principal: String,
    },
    /// A session ended, for any reason.
    Disconnect {
        /// Connection the event belongs to.
        id: ConnectionId,
    },
    /// An authorized publish was applied.
    Publish {
        /// Connection the publish arrived on.
        id: ConnectionId,
        /// Name of the publishing principal.
        principal: String,
        /// Destination topic.
        topic: String,
        /// Opaque message payload.
        payload: Bytes,
    },
    /// An authorized subscribe was installed.
    Subscribe {
        /// Connection the subscribe arrived on.
        id: ConnectionId,
        /// Name of the subscribing principal.
        principal: String,
        /// Granted topic filters (post-rewrite).
        topics: Vec<String>,
    },
}

impl EngineEvent {
    /// Stable type string for logging and wire records.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
        }
    }

    /// Connection the event belongs to.
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        match self {
            Self::Connect { id, .. }
            | Self::Disconnect { id }
            | Self::Publish { id, .. }
            | Self::Subscribe { id, .. } => *id,
        }
    }
}

//! Wire records exchanged with observers.
//!
//! Outbound: one UTF-8 JSON record per broker occurrence, self-describing
//! via a `type` tag, camelCase fields, RFC-3339 timestamps, base64 payloads.
//! Inbound: the single `publish` request an observer may submit.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use mqgate_core::{ConnectionId, EngineEvent};
use serde::{Deserialize, Serialize};

/// Errors on the observer protocol surface.
#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    /// An observer's inbound record could not be parsed. Logged and ignored;
    /// the observer connection stays open.
    #[error("malformed observer message: {0}")]
    MalformedObserverMessage(#[source] serde_json::Error),
}

/// One broker occurrence as pushed to observers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FanoutEvent {
    /// A client session became live.
    #[serde(rename_all = "camelCase")]
    Connect {
        /// Connection the event belongs to.
        connection_id: ConnectionId,
        /// Authenticated principal name.
        principal_name: String,
        /// RFC-3339 emission time.
        timestamp: String,
    },
    /// A client session ended.
    #[serde(rename_all = "camelCase")]
    Disconnect {
        /// Connection the event belongs to.
        connection_id: ConnectionId,
        /// RFC-3339 emission time.
        timestamp: String,
    },
    /// An authorized publish was applied.
    #[serde(rename_all = "camelCase")]
    Publish {
        /// Connection the publish arrived on.
        connection_id: ConnectionId,
        /// Publishing principal name.
        principal_name: String,
        /// Destination topic.
        topic: String,
        /// Message payload, base64-encoded.
        payload: String,
        /// RFC-3339 emission time.
        timestamp: String,
    },
    /// An authorized subscribe was installed.
    #[serde(rename_all = "camelCase")]
    Subscribe {
        /// Connection the subscribe arrived on.
        connection_id: ConnectionId,
        /// Subscribing principal name.
        principal_name: String,
        /// Granted topic filters.
        topics: Vec<String>,
        /// RFC-3339 emission time.
        timestamp: String,
    },
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl FanoutEvent {
    /// Build the wire record for an engine event, stamped with the current
    /// UTC time.
    #[must_use]
    pub fn from_engine(event: &EngineEvent) -> Self {
        let timestamp = now_rfc3339();
        match event {
            EngineEvent::Connect { id, principal } => Self::Connect {
                connection_id: *id,
                principal_name: principal.clone(),
                timestamp,
            },
            EngineEvent::Disconnect { id } => Self::Disconnect {
                connection_id: *id,
                timestamp,
            },
            EngineEvent::Publish {
                id,
                principal,
                topic,
                payload,
            } => Self::Publish {
                connection_id: *id,
                principal_name: principal.clone(),
                topic: topic.clone(),
                payload: BASE64.encode(payload),
                timestamp,
            },
            EngineEvent::Subscribe {
                id,
                principal,
                topics,
            } => Self::Subscribe {
                connection_id: *id,
                principal_name: principal.clone(),
                topics: topics.clone(),
                timestamp,
            },
        }
    }

    /// Stable type string, matching the wire `type` tag.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
        }
    }
}

/// A record an observer may send to the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverRequest {
    /// Forward a publish into the broker as the gateway's internal
    /// pseudo-connection. This path is implicitly trusted and bypasses the
    /// ACL gate.
    Publish {
        /// Destination topic.
        topic: String,
        /// UTF-8 payload.
        payload: String,
    },
}

impl ObserverRequest {
    /// Parse one inbound observer record.
    pub fn parse(text: &str) -> Result<Self, FanoutError> {
        serde_json::from_str(text).map_err(FanoutError::MalformedObserverMessage)
    }
}

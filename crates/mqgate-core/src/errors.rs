//! Gateway error hierarchy.
//!
//! Authentication and authorization failures are terminal for the request
//! they belong to, never for the process: an [`AuthError`] closes the one
//! connection that presented bad credentials, an [`AclError`] rejects the one
//! operation that was denied. Neither crosses a component boundary as a fatal
//! error.

use crate::ids::ConnectionId;

/// Kind of topic operation being authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Publish a message to a topic.
    Publish,
    /// Subscribe to a topic filter.
    Subscribe,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publish => f.write_str("publish"),
            Self::Subscribe => f.write_str("subscribe"),
        }
    }
}

/// Errors from the authentication gate.
///
/// Surfaced to the connecting client as a connection refusal; the connection
/// is closed before any operation is evaluated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Username or password was absent or empty.
    #[error("auth failed: missing username or password")]
    MissingCredentials,
    /// Username unknown or password mismatched.
    #[error("auth failed: invalid credentials")]
    InvalidCredentials,
}

/// Errors from the topic-authorization gate.
///
/// A denial rejects the single operation only; the connection stays live.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AclError {
    /// Publish targeted a reserved (system-internal) namespace.
    #[error("publish to reserved topic {topic} denied")]
    ReservedTopic {
        /// Topic that was targeted.
        topic: String,
    },
    /// No rule allowed the operation (deny-by-default included).
    #[error("{kind} on {topic} denied for {principal}")]
    Denied {
        /// Name of the principal that was refused.
        principal: String,
        /// Operation that was refused.
        kind: OperationKind,
        /// Topic or filter that was targeted.
        topic: String,
    },
}

/// Errors surfaced by the protocol engine at its interface.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine is shut down and no longer accepts traffic.
    #[error("engine closed")]
    Closed,
    /// A session stream failed.
    #[error("session {id} i/o error: {source}")]
    Io {
        /// Connection the failure belongs to.
        id: ConnectionId,
        /// Underlying stream error.
        #[source]
        source: std::io::Error,
    },
}

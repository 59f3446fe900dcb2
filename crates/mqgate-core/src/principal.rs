//! Authenticated identities and transport tagging.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Identity asserted by a connection after successful authentication.
///
/// A `Principal` is created by the authentication gate exactly once per
/// connection and is read-only afterwards. It is never shared across
/// connections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque identifier, typically the presented username.
    pub name: String,
    /// Optional attributes consulted by ACL rules.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl Principal {
    /// Create a principal with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Create a principal carrying attributes.
    #[must_use]
    pub fn with_attributes(name: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// How a connection reached the gateway.
///
/// Selected once at accept time; dispatches between handing the socket
/// straight to the engine and wrapping it in the frame-stream bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Native byte stream (plain TCP).
    Stream,
    /// Message-framed transport (WebSocket), bridged into a byte stream.
    Framed,
}

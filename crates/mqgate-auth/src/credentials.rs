//! In-memory credential store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Expected secret and ACL attributes for one username.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Expected password.
    pub secret: String,
    /// Attributes copied onto the principal at authentication time, for ACL
    /// rules that want them.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl UserEntry {
    /// Entry with a secret and no attributes.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Mapping from username to expected secret, built from configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    users: HashMap<String, UserEntry>,
}

impl CredentialStore {
    /// Build a store from a username → entry map.
    #[must_use]
    pub fn new(users: HashMap<String, UserEntry>) -> Self {
        Self { users }
    }

    /// Look up the entry for a username.
    #[must_use]
    pub fn lookup(&self, username: &str) -> Option<&UserEntry> {
        self.users.get(username)
    }

    /// Number of configured users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether any users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

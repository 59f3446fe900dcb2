//! Connection-establishment authentication.

use mqgate_core::{AuthError, ConnectionId, Principal};
use tracing::{debug, warn};

use crate::credentials::CredentialStore;

/// Decides, once per connection, whether a presented identity may proceed.
///
/// The decision is made exactly once per connection by the engine contract;
/// the gate itself is stateless and safe to share.
#[derive(Clone, Debug)]
pub struct AuthGate {
    store: CredentialStore,
}

impl AuthGate {
    /// Build a gate over a credential store.
    #[must_use]
    pub fn new(store: CredentialStore) -> Self {
        Self { store }
    }

    /// Verify the presented credentials.
    ///
    /// Absent or empty username/password fail with
    /// [`AuthError::MissingCredentials`]; an unknown username or a mismatched
    /// secret fails with [`AuthError::InvalidCredentials`]. On success the
    /// returned [`Principal`] carries the user's configured attributes and is
    /// attached to the connection before any operation is evaluated.
    pub fn authenticate(
        &self,
        id: ConnectionId,
        username: Option<&str>,
        password: Option<&[u8]>,
    ) -> Result<Principal, AuthError> {
        let username = username
            .filter(|u| !u.is_empty())
            .ok_or(AuthError::MissingCredentials)?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingCredentials)?;

        let entry = self.store.lookup(username).ok_or_else(|| {
            warn!(%id, username, "auth failed: unknown user");
            AuthError::InvalidCredentials
        })?;
        if entry.secret.as_bytes() != password {
            warn!(%id, username, "auth failed: secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        debug!(%id, username, "authenticated");
        Ok(Principal::with_attributes(
            username,
            entry.attributes.clone(),
        ))
    }
}

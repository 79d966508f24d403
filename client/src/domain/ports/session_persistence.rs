//! Port for persisting the provider session between runs.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::domain::UserIdentity;

use super::define_port_error;

define_port_error! {
    /// Failures raised by session persistence adapters.
    pub enum SessionPersistenceError {
        /// Reading or writing the backing medium failed.
        Io { message: String } => "session storage i/o failed: {message}",
        /// Stored bytes could not be decoded.
        Corrupt { message: String } => "stored session is unreadable: {message}",
    }
}

/// Tokens and identity saved after a successful sign-in.
///
/// Token strings are wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    identity: UserIdentity,
}

impl StoredSession {
    /// Bundle freshly issued tokens with the identity they belong to.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        identity: UserIdentity,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            identity,
        }
    }

    /// Bearer token for backend calls.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Token used to obtain a new access token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Access token expiry.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Identity the tokens were issued to.
    #[must_use]
    pub const fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Whether the access token expires within `margin` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expires_at <= now + margin
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

impl Drop for StoredSession {
    fn drop(&mut self) {
        self.access_token.zeroize();
        self.refresh_token.zeroize();
    }
}

/// Storage for the session restored on the next start.
#[cfg_attr(test, mockall::automock)]
pub trait SessionPersistence: Send + Sync {
    /// Load the saved session, if any.
    fn load(&self) -> Result<Option<StoredSession>, SessionPersistenceError>;

    /// Replace the saved session.
    fn save(&self, session: &StoredSession) -> Result<(), SessionPersistenceError>;

    /// Forget the saved session. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), SessionPersistenceError>;
}

/// Process-local session storage.
#[derive(Debug, Default)]
pub struct InMemorySessionPersistence {
    slot: Mutex<Option<StoredSession>>,
}

impl InMemorySessionPersistence {
    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<StoredSession>) -> T) -> T {
        let mut guard = self
            .slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

impl SessionPersistence for InMemorySessionPersistence {
    fn load(&self) -> Result<Option<StoredSession>, SessionPersistenceError> {
        Ok(self.with_slot(|slot| slot.clone()))
    }

    fn save(&self, session: &StoredSession) -> Result<(), SessionPersistenceError> {
        self.with_slot(|slot| *slot = Some(session.clone()));
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionPersistenceError> {
        self.with_slot(|slot| *slot = None);
        Ok(())
    }
}

//! Driven port for the external authentication provider.
//!
//! The provider owns tokens and their persistence. The session store only
//! sees identities plus the notifications the provider raises on its own
//! initiative (token refresh, sign-out forced by the backend).

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::UserIdentity;

use super::define_port_error;

define_port_error! {
    /// Sign-in and session failures. Callers treat all of them as "not signed in".
    pub enum AuthError {
        /// The provider could not be reached.
        Transport { message: String } => "auth provider unreachable: {message}",
        /// The provider refused the credentials or token.
        Rejected { message: String } => "auth provider rejected the request: {message}",
        /// The OAuth redirect could not be received.
        Callback { message: String } => "sign-in redirect failed: {message}",
        /// The provider answered with an unexpected payload.
        Decode { message: String } => "auth provider returned malformed data: {message}",
        /// Persisted session state could not be read or written.
        Storage { message: String } => "session storage failed: {message}",
    }
}

/// Provider-initiated session changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// Tokens were refreshed; the identity may carry updated profile data.
    TokenRefreshed(UserIdentity),
    /// The provider ended the session (expired refresh token, remote sign-out).
    SignedOut,
}

/// Capacity of provider notification channels.
pub const AUTH_EVENT_CAPACITY: usize = 16;

/// Authentication operations offered by the backend-as-a-service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Restore a previously persisted session, refreshing it if required.
    async fn restore_session(&self) -> Result<Option<UserIdentity>, AuthError>;

    /// Run the interactive Google sign-in. `Ok(None)` means the user abandoned it.
    async fn sign_in_with_google(&self) -> Result<Option<UserIdentity>, AuthError>;

    /// End the session and drop cached tokens.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Subscribe to provider-initiated session changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Scripted provider used when no backend is configured and in tests.
pub struct FixtureAuthProvider {
    sign_in_as: Option<UserIdentity>,
    current: Mutex<Option<UserIdentity>>,
    events: broadcast::Sender<AuthEvent>,
}

impl FixtureAuthProvider {
    /// Provider whose interactive sign-in yields `sign_in_as` (`None` simulates abandonment).
    pub fn new(sign_in_as: Option<UserIdentity>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            sign_in_as,
            current: Mutex::new(None),
            events,
        }
    }

    /// Pretend a session was persisted by an earlier run.
    #[must_use]
    pub fn with_restored(self, identity: UserIdentity) -> Self {
        *self.lock() = Some(identity);
        self
    }

    /// Raise a provider-initiated notification.
    pub fn emit(&self, event: AuthEvent) {
        match &event {
            AuthEvent::TokenRefreshed(identity) => *self.lock() = Some(identity.clone()),
            AuthEvent::SignedOut => *self.lock() = None,
        }
        // No subscribers simply means nobody is listening yet.
        self.events.send(event).ok();
    }

    fn lock(&self) -> MutexGuard<'_, Option<UserIdentity>> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthProvider for FixtureAuthProvider {
    async fn restore_session(&self) -> Result<Option<UserIdentity>, AuthError> {
        Ok(self.lock().clone())
    }

    async fn sign_in_with_google(&self) -> Result<Option<UserIdentity>, AuthError> {
        let identity = self.sign_in_as.clone();
        if identity.is_some() {
            *self.lock() = identity.clone();
        }
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.lock() = None;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

//! Process-wide session state.
//!
//! The store owns the only mutable copy of the current [`Session`]. Screens
//! read snapshots or subscribe to a watch channel; they never mutate it.
//! Provider-initiated changes (token refresh, remote sign-out) arrive on a
//! background listener that lives exactly as long as the store.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ports::{AuthEvent, AuthProvider};
use super::{Session, UserIdentity};

/// Holds the current identity and notifies observers when it changes.
pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    state: Arc<watch::Sender<Session>>,
    listener: JoinHandle<()>,
}

impl SessionStore {
    /// Subscribe to the provider, then restore any persisted session.
    ///
    /// The returned store is settled: `loading` is false. A failed
    /// restoration leaves the store signed out.
    pub async fn start(provider: Arc<dyn AuthProvider>) -> Self {
        let (state, _) = watch::channel(Session {
            identity: None,
            loading: true,
        });
        let state = Arc::new(state);
        let listener = tokio::spawn(follow_provider(provider.subscribe(), Arc::clone(&state)));
        let store = Self {
            provider,
            state,
            listener,
        };
        store.restore().await;
        store
    }

    async fn restore(&self) {
        let identity = match self.provider.restore_session().await {
            Ok(Some(identity)) => {
                info!(user_id = %identity.id(), "restored persisted session");
                Some(identity)
            }
            Ok(None) => {
                debug!("no persisted session");
                None
            }
            Err(error) => {
                warn!(%error, "session restoration failed; starting signed out");
                None
            }
        };
        self.state.send_modify(|session| {
            session.identity = identity;
            session.loading = false;
        });
    }

    /// Run the interactive Google sign-in.
    ///
    /// Returns the new identity. Failure and abandonment both yield `None`
    /// and leave whatever identity was present untouched.
    pub async fn sign_in_with_google(&self) -> Option<UserIdentity> {
        self.state.send_modify(|session| session.loading = true);
        let identity = match self.provider.sign_in_with_google().await {
            Ok(Some(identity)) => {
                info!(user_id = %identity.id(), "signed in with Google");
                Some(identity)
            }
            Ok(None) => {
                info!("Google sign-in abandoned");
                None
            }
            Err(error) => {
                warn!(%error, "Google sign-in failed");
                None
            }
        };
        self.state.send_modify(|session| {
            session.loading = false;
            if let Some(identity) = &identity {
                session.identity = Some(identity.clone());
            }
        });
        identity
    }

    /// End the session. Calling it while signed out is a no-op.
    pub async fn sign_out(&self) {
        if let Err(error) = self.provider.sign_out().await {
            warn!(%error, "provider sign-out failed; clearing the local session anyway");
        }
        self.state.send_if_modified(|session| {
            let changed = session.identity.take().is_some();
            if changed {
                info!("signed out");
            }
            changed
        });
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current_session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe session changes. The current value counts as already seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn follow_provider(
    mut events: broadcast::Receiver<AuthEvent>,
    state: Arc<watch::Sender<Session>>,
) {
    loop {
        match events.recv().await {
            Ok(AuthEvent::TokenRefreshed(identity)) => {
                debug!(user_id = %identity.id(), "provider refreshed the session");
                state.send_if_modified(|session| {
                    if session.identity.as_ref() == Some(&identity) {
                        return false;
                    }
                    session.identity = Some(identity);
                    true
                });
            }
            Ok(AuthEvent::SignedOut) => {
                info!("provider ended the session");
                state.send_if_modified(|session| session.identity.take().is_some());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "session listener fell behind provider events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Lifecycle coverage for the session store.
    use super::*;
    use crate::domain::ports::{AuthError, FixtureAuthProvider, MockAuthProvider};
    use crate::domain::UserId;

    fn identity(email: &str) -> UserIdentity {
        UserIdentity::new(UserId::random(), email, Some("Ada".to_owned()))
    }

    #[tokio::test]
    async fn start_restores_a_persisted_session() {
        let ada = identity("ada@example.edu");
        let provider = Arc::new(FixtureAuthProvider::new(None).with_restored(ada.clone()));

        let store = SessionStore::start(provider).await;

        assert_eq!(store.current_session(), Session::signed_in(ada));
    }

    #[tokio::test]
    async fn failed_restoration_settles_signed_out() {
        let mut provider = MockAuthProvider::new();
        let (events, _) = broadcast::channel(4);
        provider
            .expect_subscribe()
            .returning(move || events.subscribe());
        provider
            .expect_restore_session()
            .returning(|| Err(AuthError::transport("offline")));

        let store = SessionStore::start(Arc::new(provider)).await;

        assert_eq!(store.current_session(), Session::signed_out());
    }

    #[tokio::test]
    async fn sign_in_publishes_the_new_identity() {
        let ada = identity("ada@example.edu");
        let provider = Arc::new(FixtureAuthProvider::new(Some(ada.clone())));
        let store = SessionStore::start(provider).await;
        let mut observer = store.subscribe();

        let signed_in = store.sign_in_with_google().await;

        assert_eq!(signed_in, Some(ada.clone()));
        assert!(observer.has_changed().expect("sender alive"));
        assert_eq!(*observer.borrow_and_update(), Session::signed_in(ada));
    }

    #[tokio::test]
    async fn failed_sign_in_keeps_the_existing_identity() {
        let ada = identity("ada@example.edu");
        let mut provider = MockAuthProvider::new();
        let (events, _) = broadcast::channel(4);
        provider
            .expect_subscribe()
            .returning(move || events.subscribe());
        let restored = ada.clone();
        provider
            .expect_restore_session()
            .returning(move || Ok(Some(restored.clone())));
        provider
            .expect_sign_in_with_google()
            .returning(|| Err(AuthError::callback("redirect never arrived")));

        let store = SessionStore::start(Arc::new(provider)).await;

        assert_eq!(store.sign_in_with_google().await, None);
        assert_eq!(store.current_session(), Session::signed_in(ada));
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let provider =
            Arc::new(FixtureAuthProvider::new(None).with_restored(identity("ada@example.edu")));
        let store = SessionStore::start(provider).await;

        store.sign_out().await;
        store.sign_out().await;

        assert_eq!(store.current_session(), Session::signed_out());
    }

    #[tokio::test]
    async fn provider_sign_out_reaches_observers() {
        let provider =
            Arc::new(FixtureAuthProvider::new(None).with_restored(identity("ada@example.edu")));
        let store = SessionStore::start(Arc::clone(&provider) as Arc<dyn AuthProvider>).await;
        let mut observer = store.subscribe();

        provider.emit(AuthEvent::SignedOut);
        observer.changed().await.expect("session change");

        assert!(!observer.borrow().is_authenticated());
    }

    #[tokio::test]
    async fn token_refresh_updates_the_identity() {
        let provider =
            Arc::new(FixtureAuthProvider::new(None).with_restored(identity("ada@example.edu")));
        let store = SessionStore::start(Arc::clone(&provider) as Arc<dyn AuthProvider>).await;
        let mut observer = store.subscribe();
        let refreshed = identity("ada.lovelace@example.edu");

        provider.emit(AuthEvent::TokenRefreshed(refreshed.clone()));
        observer.changed().await.expect("session change");

        assert_eq!(store.current_session().identity, Some(refreshed));
    }
}

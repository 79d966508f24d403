//! GoTrue-backed auth provider using the PKCE authorisation code flow.
//!
//! Tokens never leave this adapter: it installs the access token on the
//! shared [`SupabaseClient`], persists the session through the
//! [`SessionPersistence`] port and hands identities to the domain.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::Clock;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::dto::{PkceExchangeDto, RefreshDto, TokenResponseDto, UserDto};
use super::pkce::PkcePair;
use super::SupabaseClient;
use crate::outbound::http::status_message;
use crate::domain::UserIdentity;
use crate::domain::ports::{
    AUTH_EVENT_CAPACITY, AuthError, AuthEvent, AuthProvider, SessionPersistence, StoredSession,
};

const AUTHORIZE_PATH: &str = "/auth/v1/authorize";
const TOKEN_PATH: &str = "/auth/v1/token";
const USER_PATH: &str = "/auth/v1/user";
const LOGOUT_PATH: &str = "/auth/v1/logout";
const OAUTH_PROVIDER: &str = "google";

/// Tokens expiring within this many seconds are refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

fn refresh_margin() -> chrono::Duration {
    chrono::Duration::seconds(REFRESH_MARGIN_SECS)
}

/// Receives the provider redirect carrying the authorisation code.
#[async_trait]
pub trait AuthorizationCallback: Send + Sync {
    /// Where the provider should send the browser after consent.
    fn redirect_uri(&self) -> Url;

    /// Show `authorize_url` to the user and wait for the redirect.
    ///
    /// `Ok(None)` means the user denied or abandoned the sign-in.
    async fn await_code(&self, authorize_url: &Url) -> Result<Option<String>, AuthError>;
}

/// Auth provider for a Supabase project.
pub struct SupabaseAuthProvider {
    client: SupabaseClient,
    callback: Arc<dyn AuthorizationCallback>,
    persistence: Arc<dyn SessionPersistence>,
    clock: Arc<dyn Clock>,
    session: Mutex<Option<StoredSession>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuthProvider {
    /// Provider sharing `client` with the report repository.
    pub fn new(
        client: SupabaseClient,
        callback: Arc<dyn AuthorizationCallback>,
        persistence: Arc<dyn SessionPersistence>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            client,
            callback,
            persistence,
            clock,
            session: Mutex::new(None),
            events,
        }
    }

    /// Refresh the tokens if they expire within the next minute.
    ///
    /// Success raises [`AuthEvent::TokenRefreshed`]; a refused refresh token
    /// ends the session and raises [`AuthEvent::SignedOut`].
    pub async fn refresh_if_due(&self) -> Result<(), AuthError> {
        let Some(current) = self.current() else {
            return Ok(());
        };
        if !current.expires_within(self.clock.utc(), refresh_margin()) {
            return Ok(());
        }

        match self.renew(&current).await? {
            Some(identity) => {
                debug!(user_id = %identity.id(), "access token refreshed");
                self.notify(AuthEvent::TokenRefreshed(identity));
            }
            None => self.notify(AuthEvent::SignedOut),
        }
        Ok(())
    }

    fn authorize_url(&self, pkce: &PkcePair) -> Result<Url, AuthError> {
        let mut url = self
            .client
            .endpoint(AUTHORIZE_PATH)
            .map_err(|error| AuthError::rejected(format!("invalid authorize url: {error}")))?;
        url.query_pairs_mut()
            .append_pair("provider", OAUTH_PROVIDER)
            .append_pair("redirect_to", self.callback.redirect_uri().as_str())
            .append_pair("code_challenge", pkce.challenge())
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }

    /// Exchange the refresh token; `Ok(None)` when the provider refused it.
    async fn renew(&self, current: &StoredSession) -> Result<Option<UserIdentity>, AuthError> {
        let body = RefreshDto {
            refresh_token: current.refresh_token(),
        };
        match self.token_request("refresh_token", &body).await {
            Ok(session) => Ok(Some(self.install(session))),
            Err(AuthError::Rejected { message }) => {
                info!(%message, "refresh token refused; session ended");
                self.forget();
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    async fn token_request<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<StoredSession, AuthError> {
        let url = self
            .client
            .endpoint(TOKEN_PATH)
            .map_err(|error| AuthError::rejected(format!("invalid token url: {error}")))?;
        let request = self
            .client
            .request_with_bearer(Method::POST, url, self.client.api_key())
            .query(&[("grant_type", grant_type)])
            .json(body);
        let tokens: TokenResponseDto = send_json(request).await?;

        let expires_at = tokens.expiry(self.clock.utc());
        let identity = tokens.user.into_identity().map_err(AuthError::decode)?;
        Ok(StoredSession::new(
            tokens.access_token,
            tokens.refresh_token,
            expires_at,
            identity,
        ))
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserIdentity, AuthError> {
        let url = self
            .client
            .endpoint(USER_PATH)
            .map_err(|error| AuthError::rejected(format!("invalid user url: {error}")))?;
        let request = self
            .client
            .request_with_bearer(Method::GET, url, access_token);
        let user: UserDto = send_json(request).await?;
        user.into_identity().map_err(AuthError::decode)
    }

    /// Make `session` current: bearer, memory and disk. Returns its identity.
    fn install(&self, session: StoredSession) -> UserIdentity {
        let identity = session.identity().clone();
        self.client.set_access_token(Some(session.access_token()));
        if let Err(error) = self.persistence.save(&session) {
            warn!(%error, "could not persist session; it will not survive a restart");
        }
        *self.lock() = Some(session);
        identity
    }

    fn forget(&self) {
        self.client.set_access_token(None);
        *self.lock() = None;
        if let Err(error) = self.persistence.clear() {
            warn!(%error, "could not clear persisted session");
        }
    }

    fn current(&self) -> Option<StoredSession> {
        self.lock().clone()
    }

    fn notify(&self, event: AuthEvent) {
        if self.events.send(event).is_err() {
            debug!("no session observers subscribed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthProvider {
    async fn restore_session(&self) -> Result<Option<UserIdentity>, AuthError> {
        let stored = match self.persistence.load() {
            Ok(stored) => stored,
            Err(error) => {
                self.forget();
                return Err(AuthError::storage(error.to_string()));
            }
        };
        let Some(stored) = stored else {
            return Ok(None);
        };

        if stored.expires_within(self.clock.utc(), refresh_margin()) {
            return self.renew(&stored).await;
        }
        match self.fetch_user(stored.access_token()).await {
            Ok(identity) => Ok(Some(self.install(StoredSession::new(
                stored.access_token(),
                stored.refresh_token(),
                stored.expires_at(),
                identity,
            )))),
            Err(AuthError::Rejected { .. }) => self.renew(&stored).await,
            Err(error) => Err(error),
        }
    }

    async fn sign_in_with_google(&self) -> Result<Option<UserIdentity>, AuthError> {
        let pkce = PkcePair::generate();
        let authorize_url = self.authorize_url(&pkce)?;
        let Some(code) = self.callback.await_code(&authorize_url).await? else {
            return Ok(None);
        };
        let body = PkceExchangeDto {
            auth_code: &code,
            code_verifier: pkce.verifier(),
        };
        let session = self.token_request("pkce", &body).await?;
        Ok(Some(self.install(session)))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let current = self.current();
        if let Some(current) = &current {
            match self.client.endpoint(LOGOUT_PATH) {
                Ok(url) => {
                    let outcome = self
                        .client
                        .request_with_bearer(Method::POST, url, current.access_token())
                        .send()
                        .await;
                    match outcome {
                        Ok(response) if !response.status().is_success() => {
                            warn!(status = %response.status(), "provider logout refused");
                        }
                        Ok(_) => {}
                        Err(error) => warn!(%error, "provider logout unreachable"),
                    }
                }
                Err(error) => warn!(%error, "invalid logout url"),
            }
        }
        self.forget();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, AuthError> {
    let response = request
        .send()
        .await
        .map_err(|error| AuthError::transport(error.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|error| AuthError::transport(error.to_string()))?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    serde_json::from_slice(body.as_ref())
        .map_err(|error| AuthError::decode(format!("invalid auth JSON payload: {error}")))
}

fn map_status_error(status: StatusCode, body: &[u8]) -> AuthError {
    let message = status_message(status, body);
    if status.is_client_error() && status != StatusCode::REQUEST_TIMEOUT {
        AuthError::rejected(message)
    } else {
        AuthError::transport(message)
    }
}

//! Supabase outbound adapters.
//!
//! One [`SupabaseClient`] is shared by the PostgREST report repository and
//! the GoTrue auth provider. The auth provider installs the signed-in
//! user's access token; every request carries it as the bearer so
//! row-level security applies. Without a session the anon key is sent.

mod auth;
mod dto;
mod pkce;
mod reports;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use zeroize::Zeroizing;

pub use auth::{AuthorizationCallback, SupabaseAuthProvider};
pub use reports::SupabaseReportRepository;

/// Project endpoint, API key and shared HTTP client.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base: Url,
    api_key: Arc<str>,
    access_token: Arc<Mutex<Option<Zeroizing<String>>>>,
}

impl SupabaseClient {
    /// Build a client for the project at `base` with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, api_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base,
            api_key: Arc::from(api_key),
            access_token: Arc::new(Mutex::new(None)),
        })
    }

    /// Project base URL.
    #[must_use]
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Install (or drop) the user access token sent as bearer.
    pub(crate) fn set_access_token(&self, token: Option<&str>) {
        *self.lock_token() = token.map(|value| Zeroizing::new(value.to_owned()));
    }

    #[cfg(test)]
    pub(crate) fn has_access_token(&self) -> bool {
        self.lock_token().is_some()
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    /// Request carrying `apikey` and the current bearer.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .lock_token()
            .as_ref()
            .map_or_else(|| self.api_key.to_string(), |token| token.to_string());
        self.request_with_bearer(method, url, &bearer)
    }

    /// Request carrying `apikey` and an explicit bearer.
    pub(crate) fn request_with_bearer(
        &self,
        method: Method,
        url: Url,
        bearer: &str,
    ) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<Zeroizing<String>>> {
        self.access_token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

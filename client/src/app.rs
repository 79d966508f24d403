//! Process-wide application context.
//!
//! Built once at startup from [`AppConfig`] and torn down with the process.
//! It owns the session store (the only cross-screen state) and hands the
//! screens their ports.

use std::sync::Arc;
use std::time::Duration;

use mockable::{Clock, DefaultClock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{AppConfig, BackendMode};
use crate::domain::map::Basemap;
use crate::domain::ports::{
    AuthProvider, FixtureAuthProvider, FixtureReportRepository, IpLookup, ReportRepository,
};
use crate::domain::{Session, SessionStore, UserId, UserIdentity};
use crate::outbound::ipify::IpifyLookup;
use crate::outbound::oauth_callback::{LoopbackCallback, Prompt};
use crate::outbound::session_file::SessionFile;
use crate::outbound::supabase::{
    SupabaseAuthProvider, SupabaseClient, SupabaseReportRepository,
};

/// Identifier of the scripted identity used when no backend is configured.
pub const FIXTURE_USER_ID: &str = "00000000-0000-4000-8000-000000000001";
const FIXTURE_DISPLAY_NAME: &str = "Campus Student";
const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Failures while wiring adapters.
#[derive(Debug, Error)]
pub enum AppError {
    /// An HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    /// A derived URL was malformed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// The fixture identity could not be formed.
    #[error("invalid fixture identity: {0}")]
    Identity(#[from] crate::domain::IdentityValidationError),
}

/// Ports handed to [`AppContext::from_ports`].
pub struct AppPorts {
    /// Sign-in provider.
    pub auth: Arc<dyn AuthProvider>,
    /// Report store.
    pub reports: Arc<dyn ReportRepository>,
    /// Public IP lookup.
    pub ip_lookup: Arc<dyn IpLookup>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Basemap for new map surfaces.
    pub basemap: Basemap,
}

/// Shared state and ports for the lifetime of the application.
pub struct AppContext {
    session: SessionStore,
    reports: Arc<dyn ReportRepository>,
    ip_lookup: Arc<dyn IpLookup>,
    clock: Arc<dyn Clock>,
    basemap: Basemap,
    token_refresher: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Wire adapters for `config` and restore any persisted session.
    ///
    /// `prompt` shows the sign-in URL during interactive sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error when an adapter cannot be constructed.
    pub async fn start(config: &AppConfig, prompt: Prompt) -> Result<Self, AppError> {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let basemap = Basemap::campus(config.map_style_url.as_str());
        let ip_lookup: Arc<dyn IpLookup> = Arc::new(IpifyLookup::new(
            config.ip_lookup_url.clone(),
            config.ip_lookup_timeout,
        )?);

        match &config.backend {
            BackendMode::Supabase { url, key } => {
                info!(project = %url, "using Supabase backend");
                let client = SupabaseClient::new(url.clone(), key, config.http_timeout)?;
                let callback =
                    LoopbackCallback::new(config.oauth_port, config.oauth_timeout, prompt)?;
                let auth = Arc::new(SupabaseAuthProvider::new(
                    client.clone(),
                    Arc::new(callback),
                    Arc::new(SessionFile::new(config.session_file.clone())),
                    Arc::clone(&clock),
                ));
                let ports = AppPorts {
                    auth: Arc::clone(&auth) as Arc<dyn AuthProvider>,
                    reports: Arc::new(SupabaseReportRepository::new(client)),
                    ip_lookup,
                    clock,
                    basemap,
                };
                let mut context = Self::from_ports(ports).await;
                context.token_refresher = Some(spawn_token_refresher(auth));
                Ok(context)
            }
            BackendMode::Fixture => {
                let identity = UserIdentity::new(
                    UserId::new(FIXTURE_USER_ID)?,
                    config.dev_email.clone(),
                    Some(FIXTURE_DISPLAY_NAME.to_owned()),
                );
                let auth = FixtureAuthProvider::new(Some(identity.clone())).with_restored(identity);
                let ports = AppPorts {
                    auth: Arc::new(auth),
                    reports: Arc::new(FixtureReportRepository::new(Arc::clone(&clock))),
                    ip_lookup,
                    clock,
                    basemap,
                };
                Ok(Self::from_ports(ports).await)
            }
        }
    }

    /// Context over explicit ports; restores the session before returning.
    pub async fn from_ports(ports: AppPorts) -> Self {
        let session = SessionStore::start(ports.auth).await;
        Self {
            session,
            reports: ports.reports,
            ip_lookup: ports.ip_lookup,
            clock: ports.clock,
            basemap: ports.basemap,
            token_refresher: None,
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.current_session()
    }

    /// The session store, for sign-in, sign-out and subscriptions.
    #[must_use]
    pub const fn session_store(&self) -> &SessionStore {
        &self.session
    }

    /// Report store.
    #[must_use]
    pub fn reports(&self) -> Arc<dyn ReportRepository> {
        Arc::clone(&self.reports)
    }

    /// Public IP lookup.
    #[must_use]
    pub fn ip_lookup(&self) -> Arc<dyn IpLookup> {
        Arc::clone(&self.ip_lookup)
    }

    /// Time source.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Basemap for new map surfaces.
    #[must_use]
    pub const fn basemap(&self) -> &Basemap {
        &self.basemap
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        if let Some(refresher) = self.token_refresher.take() {
            refresher.abort();
        }
    }
}

fn spawn_token_refresher(auth: Arc<SupabaseAuthProvider>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(TOKEN_REFRESH_INTERVAL);
        loop {
            ticks.tick().await;
            if let Err(error) = auth.refresh_if_due().await {
                warn!(%error, "background token refresh failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    //! Wiring coverage for fixture mode.
    use super::*;
    use mockable::MockEnv;

    fn fixture_config() -> AppConfig {
        let mut env = MockEnv::new();
        env.expect_string().returning(|name| match name {
            "HOME" => Some("/home/ada".to_owned()),
            "CAMPUS_TRACE_DEV_EMAIL" => Some("dev@example.edu".to_owned()),
            _ => None,
        });
        AppConfig::from_env(&env).expect("config")
    }

    #[tokio::test]
    async fn fixture_mode_starts_signed_in_as_the_dev_identity() {
        let context = AppContext::start(&fixture_config(), Arc::new(|_: &url::Url| {}))
            .await
            .expect("context");

        let session = context.session();
        assert!(!session.loading);
        assert_eq!(session.email(), Some("dev@example.edu"));
        assert_eq!(
            session.identity.as_ref().map(|identity| identity.id().to_string()),
            Some(FIXTURE_USER_ID.to_owned())
        );
    }

    #[tokio::test]
    async fn fixture_mode_keeps_reports_in_memory() {
        let context = AppContext::start(&fixture_config(), Arc::new(|_: &url::Url| {}))
            .await
            .expect("context");
        assert!(context.reports().list_all().await.expect("list").is_empty());
    }
}

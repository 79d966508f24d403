//! Loopback listener receiving the OAuth redirect.
//!
//! During an interactive sign-in a short-lived actix-web server listens on
//! `127.0.0.1` for exactly one request to [`CALLBACK_PATH`]. A provider
//! `error` parameter or the timeout elapsing counts as abandonment.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::http::header;
use actix_web::{App, HttpResponse, HttpServer, web};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use super::supabase::AuthorizationCallback;
use crate::domain::ports::AuthError;

/// Path the provider redirects to.
pub const CALLBACK_PATH: &str = "/auth/callback";

const SIGNED_IN_PAGE: &str = "<!doctype html><title>CampusTrace</title>\
<p>Signed in to CampusTrace. You can close this window.</p>";
const ABANDONED_PAGE: &str = "<!doctype html><title>CampusTrace</title>\
<p>Sign-in was not completed. You can close this window.</p>";

/// Shows the authorisation URL to the user.
pub type Prompt = Arc<dyn Fn(&Url) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CallbackOutcome {
    Code(String),
    Denied(String),
}

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn outcome(self) -> CallbackOutcome {
        if let Some(error) = self.error {
            let reason = self
                .error_description
                .map_or_else(|| error.clone(), |description| format!("{error}: {description}"));
            return CallbackOutcome::Denied(reason);
        }
        match self.code.filter(|code| !code.is_empty()) {
            Some(code) => CallbackOutcome::Code(code),
            None => CallbackOutcome::Denied("redirect carried no code".to_owned()),
        }
    }
}

struct CallbackSlot(Mutex<Option<oneshot::Sender<CallbackOutcome>>>);

impl CallbackSlot {
    fn new(sender: oneshot::Sender<CallbackOutcome>) -> Self {
        Self(Mutex::new(Some(sender)))
    }

    fn take(&self) -> Option<oneshot::Sender<CallbackOutcome>> {
        self.0
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
    }
}

async fn receive(
    query: web::Query<CallbackQuery>,
    slot: web::Data<CallbackSlot>,
) -> HttpResponse {
    let outcome = query.into_inner().outcome();
    let page = match &outcome {
        CallbackOutcome::Code(_) => SIGNED_IN_PAGE,
        CallbackOutcome::Denied(_) => ABANDONED_PAGE,
    };
    match slot.take() {
        Some(sender) => {
            if sender.send(outcome).is_err() {
                debug!("sign-in waiter already gone");
            }
        }
        None => debug!("ignoring repeated OAuth redirect"),
    }
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .content_type("text/html; charset=utf-8")
        .body(page)
}

/// One-shot loopback receiver for the authorisation code.
pub struct LoopbackCallback {
    port: u16,
    redirect_uri: Url,
    timeout: Duration,
    prompt: Prompt,
}

impl LoopbackCallback {
    /// Receiver on `127.0.0.1:port` waiting at most `timeout` per sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error when the redirect URI cannot be formed.
    pub fn new(port: u16, timeout: Duration, prompt: Prompt) -> Result<Self, url::ParseError> {
        let redirect_uri = Url::parse(&format!("http://127.0.0.1:{port}{CALLBACK_PATH}"))?;
        Ok(Self {
            port,
            redirect_uri,
            timeout,
            prompt,
        })
    }
}

#[async_trait]
impl AuthorizationCallback for LoopbackCallback {
    fn redirect_uri(&self) -> Url {
        self.redirect_uri.clone()
    }

    async fn await_code(&self, authorize_url: &Url) -> Result<Option<String>, AuthError> {
        let (sender, receiver) = oneshot::channel();
        let slot = web::Data::new(CallbackSlot::new(sender));
        let server = HttpServer::new(move || {
            App::new()
                .app_data(slot.clone())
                .route(CALLBACK_PATH, web::get().to(receive))
        })
        .workers(1)
        .disable_signals()
        .shutdown_timeout(1)
        .bind(("127.0.0.1", self.port))
        .map_err(|error| {
            AuthError::callback(format!("cannot listen on 127.0.0.1:{}: {error}", self.port))
        })?
        .run();
        let handle = server.handle();
        let running = tokio::spawn(server);

        (self.prompt)(authorize_url);
        let waited = tokio::time::timeout(self.timeout, receiver).await;

        handle.stop(true).await;
        match running.await {
            Ok(Err(error)) => warn!(%error, "OAuth callback listener failed"),
            Err(error) => warn!(%error, "OAuth callback listener panicked"),
            Ok(Ok(())) => {}
        }

        match waited {
            Err(_) => {
                info!(timeout_secs = self.timeout.as_secs(), "sign-in timed out");
                Ok(None)
            }
            Ok(Err(_)) => Err(AuthError::callback(
                "listener stopped before a redirect arrived",
            )),
            Ok(Ok(CallbackOutcome::Code(code))) => Ok(Some(code)),
            Ok(Ok(CallbackOutcome::Denied(reason))) => {
                info!(%reason, "sign-in denied at the provider");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Redirect parsing and handler coverage.
    use super::*;
    use actix_web::test as actix_test;
    use rstest::rstest;

    #[rstest]
    #[case(Some("abc"), None, CallbackOutcome::Code("abc".to_owned()))]
    #[case(Some("abc"), Some("access_denied"), CallbackOutcome::Denied("access_denied".to_owned()))]
    #[case(None, None, CallbackOutcome::Denied("redirect carried no code".to_owned()))]
    #[case(Some(""), None, CallbackOutcome::Denied("redirect carried no code".to_owned()))]
    fn error_parameters_win_over_codes(
        #[case] code: Option<&str>,
        #[case] error: Option<&str>,
        #[case] expected: CallbackOutcome,
    ) {
        let query = CallbackQuery {
            code: code.map(str::to_owned),
            error: error.map(str::to_owned),
            error_description: None,
        };
        assert_eq!(query.outcome(), expected);
    }

    #[actix_web::test]
    async fn handler_forwards_the_first_code_only() {
        let (sender, mut receiver) = oneshot::channel();
        let slot = web::Data::new(CallbackSlot::new(sender));
        let app = actix_test::init_service(
            App::new()
                .app_data(slot.clone())
                .route(CALLBACK_PATH, web::get().to(receive)),
        )
        .await;

        let first = actix_test::TestRequest::get()
            .uri("/auth/callback?code=first")
            .to_request();
        let res = actix_test::call_service(&app, first).await;
        assert!(res.status().is_success());
        let body = actix_test::read_body(res).await;
        assert!(std::str::from_utf8(&body).expect("utf8").contains("Signed in"));

        let second = actix_test::TestRequest::get()
            .uri("/auth/callback?code=second")
            .to_request();
        assert!(actix_test::call_service(&app, second).await.status().is_success());

        assert_eq!(
            receiver.try_recv().expect("outcome"),
            CallbackOutcome::Code("first".to_owned())
        );
    }

    #[test]
    fn redirect_uri_points_at_the_loopback_port() {
        let callback = LoopbackCallback::new(54321, Duration::from_secs(1), Arc::new(|_: &Url| {}))
            .expect("callback");
        assert_eq!(
            callback.redirect_uri().as_str(),
            "http://127.0.0.1:54321/auth/callback"
        );
    }
}

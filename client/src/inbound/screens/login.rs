//! Sign-in screen.

use std::fmt;

use crate::domain::{Session, SessionStore};
use crate::inbound::routes::Route;

/// Application title.
pub const TITLE: &str = "CampusTrace";
/// Tagline under the title.
pub const SUBTITLE: &str = "Report campus issues at VIT Vellore";
const BUTTON_LABEL: &str = "Continue with Google";
const LOADING_LABEL: &str = "Loading...";

/// What the login screen shows for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginView {
    /// Sign-in button label.
    pub button_label: &'static str,
    /// Whether the button accepts clicks.
    pub button_enabled: bool,
}

impl LoginView {
    /// View for `session`; the button is disabled while the session loads.
    #[must_use]
    pub const fn for_session(session: &Session) -> Self {
        if session.loading {
            Self {
                button_label: LOADING_LABEL,
                button_enabled: false,
            }
        } else {
            Self {
                button_label: BUTTON_LABEL,
                button_enabled: true,
            }
        }
    }
}

impl fmt::Display for LoginView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{TITLE}")?;
        writeln!(f, "{SUBTITLE}")?;
        write!(f, "[{}]", self.button_label)
    }
}

/// Run the Google sign-in. Returns where to navigate on success.
pub async fn continue_with_google(store: &SessionStore) -> Option<Route> {
    if !LoginView::for_session(&store.current_session()).button_enabled {
        return None;
    }
    store.sign_in_with_google().await.map(|_| Route::Home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixtureAuthProvider;
    use crate::domain::{UserId, UserIdentity};
    use std::sync::Arc;

    #[test]
    fn button_is_disabled_while_loading() {
        let view = LoginView::for_session(&Session {
            identity: None,
            loading: true,
        });
        assert_eq!(view.button_label, "Loading...");
        assert!(!view.button_enabled);
        assert_eq!(
            LoginView::for_session(&Session::signed_out()).button_label,
            "Continue with Google"
        );
    }

    #[tokio::test]
    async fn successful_sign_in_navigates_home() {
        let identity = UserIdentity::new(UserId::random(), "ada@example.edu", None);
        let store = SessionStore::start(Arc::new(FixtureAuthProvider::new(Some(identity)))).await;
        assert_eq!(continue_with_google(&store).await, Some(Route::Home));
    }

    #[tokio::test]
    async fn abandoned_sign_in_stays_put() {
        let store = SessionStore::start(Arc::new(FixtureAuthProvider::new(None))).await;
        assert_eq!(continue_with_google(&store).await, None);
        assert!(!store.current_session().is_authenticated());
    }
}

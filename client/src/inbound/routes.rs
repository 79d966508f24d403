//! Route table and access guards.
//!
//! `/login` is public, `/` needs a session and `/admin` needs a session
//! whose email passes the admin allow-list. The guard is evaluated against
//! the session at the moment of navigation.

use std::fmt;

use crate::domain::{Session, is_admin};

/// Navigable screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in screen.
    Login,
    /// Map with the user's own reports.
    Home,
    /// Admin dashboard.
    Admin,
}

impl Route {
    /// Resolve a path; unknown paths yield `None`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/login" => Some(Self::Login),
            "/" | "" => Some(Self::Home),
            "/admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Canonical path.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Home => "/",
            Self::Admin => "/admin",
        }
    }

    const fn requires_session(self) -> bool {
        !matches!(self, Self::Login)
    }

    const fn requires_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What navigating to a path produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// The session is still being restored.
    Loading,
    /// Navigate elsewhere instead (replacing the history entry).
    Redirect(Route),
    /// Show the screen.
    Render(Route),
    /// Signed in but not allowed; render [`AccessDenied`] in place.
    AccessDenied,
    /// No such route.
    NotFound,
}

/// Decide what `path` shows for `session`.
///
/// # Examples
/// ```
/// use campus_trace::domain::Session;
/// use campus_trace::inbound::routes::{guard, Guard, Route};
///
/// assert_eq!(guard("/admin", &Session::signed_out()), Guard::Redirect(Route::Login));
/// assert_eq!(guard("/login", &Session::signed_out()), Guard::Render(Route::Login));
/// ```
#[must_use]
pub fn guard(path: &str, session: &Session) -> Guard {
    let Some(route) = Route::from_path(path) else {
        return Guard::NotFound;
    };
    if !route.requires_session() {
        return Guard::Render(route);
    }
    if session.loading {
        return Guard::Loading;
    }
    if !session.is_authenticated() {
        return Guard::Redirect(Route::Login);
    }
    if route.requires_admin() && !is_admin(session.email()) {
        return Guard::AccessDenied;
    }
    Guard::Render(route)
}

/// In-place page shown to signed-in users who are not administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

impl AccessDenied {
    /// Heading.
    pub const TITLE: &'static str = "Access Denied";
    /// Explanation.
    pub const MESSAGE: &'static str = "You don't have permission to access the admin dashboard.";
    /// Link label.
    pub const LINK_LABEL: &'static str = "Back to Home";

    /// Where the link leads.
    #[must_use]
    pub const fn link(self) -> Route {
        Route::Home
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", Self::TITLE)?;
        writeln!(f, "{}", Self::MESSAGE)?;
        write!(f, "{} ({})", Self::LINK_LABEL, self.link())
    }
}

#[cfg(test)]
mod tests {
    //! Guard decisions for every route and session shape.
    use super::*;
    use crate::domain::{UserId, UserIdentity};
    use rstest::rstest;

    fn signed_in(email: &str) -> Session {
        Session::signed_in(UserIdentity::new(UserId::random(), email, None))
    }

    fn loading() -> Session {
        Session {
            identity: None,
            loading: true,
        }
    }

    #[rstest]
    #[case("/login", Session::signed_out(), Guard::Render(Route::Login))]
    #[case("/login", loading(), Guard::Render(Route::Login))]
    #[case("/", Session::signed_out(), Guard::Redirect(Route::Login))]
    #[case("/", loading(), Guard::Loading)]
    #[case("/", signed_in("student@example.edu"), Guard::Render(Route::Home))]
    #[case("/admin", Session::signed_out(), Guard::Redirect(Route::Login))]
    #[case("/admin", loading(), Guard::Loading)]
    #[case("/admin", signed_in("student@example.edu"), Guard::AccessDenied)]
    #[case("/admin", signed_in("KShresth2151@gmail.com"), Guard::Render(Route::Admin))]
    #[case("/reports", signed_in("student@example.edu"), Guard::NotFound)]
    fn guards_follow_the_route_table(
        #[case] path: &str,
        #[case] session: Session,
        #[case] expected: Guard,
    ) {
        assert_eq!(guard(path, &session), expected);
    }

    #[test]
    fn paths_round_trip() {
        for route in [Route::Login, Route::Home, Route::Admin] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
    }

    #[test]
    fn access_denied_links_home() {
        let text = AccessDenied.to_string();
        assert!(text.starts_with("Access Denied"));
        assert!(text.ends_with("Back to Home (/)"));
    }
}

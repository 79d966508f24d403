//! Home screen: the user's own reports on the map plus the submission flow.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::app::AppContext;
use crate::domain::map::{MapEvent, MapMode, MapSurface, SurfaceEvent};
use crate::domain::ports::{IpLookup, MapWidget, ReportRepository};
use crate::domain::{
    FeedSnapshot, Invalidation, Report, ReportFeed, ReportScope, SubmissionDialog,
    SubmissionError, UserIdentity, is_admin,
};
use crate::inbound::routes::Route;

const NAME_FALLBACK: &str = "User";

/// Header strip: who is signed in and where they may go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeHeader {
    /// Display name, or `User`.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Link to the admin dashboard, shown to administrators only.
    pub admin_link: Option<Route>,
}

impl HomeHeader {
    /// Header for `identity`, consulting the allow-list now.
    #[must_use]
    pub fn for_identity(identity: &UserIdentity) -> Self {
        Self {
            name: identity.display_name().unwrap_or(NAME_FALLBACK).to_owned(),
            email: identity.email().to_owned(),
            admin_link: is_admin(Some(identity.email())).then_some(Route::Admin),
        }
    }
}

impl fmt::Display for HomeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)?;
        if let Some(link) = self.admin_link {
            write!(f, "  [Admin Dashboard: {link}]")?;
        }
        write!(f, "  [Sign out]")
    }
}

/// Map of the signed-in user's reports with pin-to-report submission.
pub struct HomeScreen<W: MapWidget> {
    identity: UserIdentity,
    feed: ReportFeed,
    map: MapSurface<W>,
    dialog: Option<SubmissionDialog>,
    reports: Arc<dyn ReportRepository>,
    ip_lookup: Arc<dyn IpLookup>,
}

impl<W: MapWidget> HomeScreen<W> {
    /// Mount `widget` for `identity` and load their reports.
    pub async fn open(context: &AppContext, identity: UserIdentity, widget: W) -> Self {
        let reports = context.reports();
        let owner = identity.id().clone();
        let mut screen = Self {
            feed: ReportFeed::new(Arc::clone(&reports), ReportScope::Owner(owner.clone())),
            map: MapSurface::mount(widget, MapMode::SingleUser { owner }),
            identity,
            dialog: None,
            reports,
            ip_lookup: context.ip_lookup(),
        };
        screen.reload(Invalidation::IdentityChanged).await;
        screen
    }

    async fn reload(&mut self, cause: Invalidation) {
        let snapshot = self.feed.invalidate(cause).await;
        self.map.render_reports(&snapshot.reports);
    }

    /// Header for the current identity.
    #[must_use]
    pub fn header(&self) -> HomeHeader {
        HomeHeader::for_identity(&self.identity)
    }

    /// Feed one widget interaction through the screen.
    ///
    /// While the dialog is open only style loading gets through.
    pub fn handle_map_event(&mut self, event: MapEvent) {
        if self.dialog.is_some() && event != MapEvent::Loaded {
            debug!(?event, "map interaction ignored while the dialog is open");
            return;
        }
        if let Some(SurfaceEvent::LocationConfirmed(at)) = self.map.handle(event) {
            self.dialog = Some(SubmissionDialog::open(at, self.identity.id().clone()));
        }
    }

    /// The open submission dialog.
    #[must_use]
    pub const fn dialog(&self) -> Option<&SubmissionDialog> {
        self.dialog.as_ref()
    }

    /// Edit the open submission dialog.
    pub fn dialog_mut(&mut self) -> Option<&mut SubmissionDialog> {
        self.dialog.as_mut()
    }

    /// Close the dialog without submitting.
    pub fn close_dialog(&mut self) {
        self.dialog = None;
        self.map.cancel_pending();
    }

    /// Submit the open dialog. `None` when no dialog is open.
    ///
    /// Success closes the dialog and refreshes the list; failure leaves the
    /// dialog open with its message set.
    pub async fn submit(&mut self) -> Option<Result<Report, SubmissionError>> {
        let dialog = self.dialog.as_mut()?;
        let outcome = dialog
            .submit(self.ip_lookup.as_ref(), self.reports.as_ref())
            .await;
        if outcome.is_ok() {
            self.close_dialog();
            self.reload(Invalidation::Mutation).await;
        }
        Some(outcome)
    }

    /// Re-fetch on an external signal.
    pub async fn refresh(&mut self) {
        self.reload(Invalidation::External).await;
    }

    /// Follow an identity change published by the session store.
    pub async fn set_identity(&mut self, identity: UserIdentity) {
        let owner = identity.id().clone();
        let changed = self.feed.set_scope(ReportScope::Owner(owner.clone()));
        self.identity = identity;
        if changed {
            self.dialog = None;
            self.map.cancel_pending();
            self.map.set_mode(MapMode::SingleUser { owner });
            self.reload(Invalidation::IdentityChanged).await;
        }
    }

    /// Last listing.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.feed.snapshot()
    }

    /// The map surface.
    #[must_use]
    pub const fn map(&self) -> &MapSurface<W> {
        &self.map
    }

    /// The map surface, for host-driven interaction.
    pub fn map_mut(&mut self) -> &mut MapSurface<W> {
        &mut self.map
    }
}

#[cfg(test)]
mod tests {
    //! Screen-level coverage over the in-memory store and headless map.
    use super::*;
    use crate::app::AppPorts;
    use crate::domain::map::Basemap;
    use crate::domain::map::markers::OPEN_COLOR;
    use crate::domain::ports::{FixtureAuthProvider, FixtureIpLookup, FixtureReportRepository};
    use crate::domain::{Coordinates, ReportCategory, UserId};
    use crate::outbound::headless_map::HeadlessMap;
    use mockable::DefaultClock;

    fn identity(email: &str, name: Option<&str>) -> UserIdentity {
        UserIdentity::new(UserId::random(), email, name.map(str::to_owned))
    }

    async fn context(identity: &UserIdentity) -> AppContext {
        AppContext::from_ports(AppPorts {
            auth: Arc::new(FixtureAuthProvider::new(None).with_restored(identity.clone())),
            reports: Arc::new(FixtureReportRepository::new(Arc::new(DefaultClock))),
            ip_lookup: Arc::new(FixtureIpLookup::new(Some("203.0.113.9".to_owned()))),
            clock: Arc::new(DefaultClock),
            basemap: Basemap::default(),
        })
        .await
    }

    fn at(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng).expect("coords")
    }

    #[test]
    fn header_falls_back_to_user_and_hides_admin_link() {
        let header = HomeHeader::for_identity(&identity("student@example.edu", None));
        assert_eq!(header.name, "User");
        assert_eq!(header.admin_link, None);

        let admin = HomeHeader::for_identity(&identity("kshresth2151@gmail.com", Some("K")));
        assert_eq!(admin.admin_link, Some(Route::Admin));
    }

    #[tokio::test]
    async fn confirmed_pin_opens_the_dialog_and_blocks_clicks() {
        let ada = identity("ada@example.edu", Some("Ada"));
        let context = context(&ada).await;
        let mut screen = HomeScreen::open(&context, ada, HeadlessMap::default()).await;

        screen.handle_map_event(MapEvent::Loaded);
        screen.handle_map_event(MapEvent::Clicked(at(12.97, 79.16)));
        screen.handle_map_event(MapEvent::PendingPinClicked);
        assert_eq!(
            screen.dialog().map(SubmissionDialog::location),
            Some(at(12.97, 79.16))
        );

        screen.handle_map_event(MapEvent::Clicked(at(12.98, 79.17)));
        assert_eq!(screen.map().pending_pin(), None);
    }

    #[tokio::test]
    async fn submission_closes_the_dialog_and_draws_a_red_marker() {
        let ada = identity("ada@example.edu", Some("Ada"));
        let context = context(&ada).await;
        let mut screen = HomeScreen::open(&context, ada, HeadlessMap::default()).await;
        screen.handle_map_event(MapEvent::Clicked(at(12.97, 79.16)));
        screen.handle_map_event(MapEvent::PendingPinClicked);
        if let Some(dialog) = screen.dialog_mut() {
            dialog.select_category(Some(ReportCategory::Lighting));
        }

        let report = screen
            .submit()
            .await
            .expect("dialog open")
            .expect("submitted");

        assert!(screen.dialog().is_none());
        assert_eq!(screen.snapshot().reports, vec![report.clone()]);
        let marker = screen.map().marker_for(report.id()).expect("marker");
        let spec = screen.map().widget().marker(marker).expect("spec");
        assert_eq!(spec.color, OPEN_COLOR);
    }

    #[tokio::test]
    async fn submit_without_a_dialog_does_nothing() {
        let ada = identity("ada@example.edu", None);
        let context = context(&ada).await;
        let mut screen = HomeScreen::open(&context, ada, HeadlessMap::default()).await;
        assert!(screen.submit().await.is_none());
    }

    #[tokio::test]
    async fn identity_change_rescopes_the_map() {
        let ada = identity("ada@example.edu", None);
        let context = context(&ada).await;
        let mut screen = HomeScreen::open(&context, ada, HeadlessMap::default()).await;
        screen.handle_map_event(MapEvent::Clicked(at(12.97, 79.16)));
        screen.handle_map_event(MapEvent::PendingPinClicked);
        if let Some(dialog) = screen.dialog_mut() {
            dialog.select_category(Some(ReportCategory::Safety));
        }
        screen.submit().await.expect("dialog").expect("submitted");

        let bob = identity("bob@example.edu", None);
        screen.set_identity(bob.clone()).await;

        assert!(screen.snapshot().reports.is_empty());
        assert_eq!(
            screen.map().mode(),
            &MapMode::SingleUser {
                owner: bob.id().clone()
            }
        );
    }
}

//! Admin dashboard: every report, selection, resolution and CSV export.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::app::AppContext;
use crate::domain::map::{MapEvent, MapMode, MapSurface, SurfaceEvent};
use crate::domain::ports::{MapWidget, PersistenceError, ReportRepository};
use crate::domain::{
    CsvExport, CsvExportError, FeedSnapshot, Invalidation, Report, ReportFeed, ReportId,
    ReportScope, ReportStatus, UserIdentity, export_reports,
};

const NAME_FALLBACK: &str = "Admin";
/// Shown instead of the list when there are no reports.
pub const EMPTY_MESSAGE: &str = "No reports yet";
/// Shown for entries without a description.
pub const NO_DESCRIPTION: &str = "No description provided";
/// Shown when resolving fails.
pub const RESOLVE_FAILED_MESSAGE: &str = "Failed to resolve report";
const LIST_DATE_FORMAT: &str = "%b %-d, %I:%M %p";

/// `Jan 5, 02:30 PM`, in UTC.
#[must_use]
pub fn format_list_date(at: DateTime<Utc>) -> String {
    at.format(LIST_DATE_FORMAT).to_string()
}

/// Dashboard header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminHeader {
    /// Display name, or `Admin`.
    pub name: String,
    /// Sign-in email.
    pub email: String,
    /// Number of listed reports.
    pub total: usize,
}

impl fmt::Display for AdminHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} <{}>  [Back to map: /]  [Sign out]", self.name, self.email)?;
        write!(f, "{} total reports", self.total)
    }
}

/// One entry of the dashboard list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Report identifier.
    pub id: ReportId,
    /// Category label.
    pub category: &'static str,
    /// Status badge.
    pub status: ReportStatus,
    /// Owner email, when the store denormalised it.
    pub owner_email: Option<String>,
    /// Description or the placeholder.
    pub description: String,
    /// `lat, lng` to four decimals.
    pub coordinates: String,
    /// Creation date for display.
    pub date: String,
    /// Submitter IP, when recorded.
    pub ip: Option<String>,
    /// Whether the inline resolve action is offered.
    pub resolvable: bool,
    /// Whether this entry is the current selection.
    pub selected: bool,
}

impl ReportRow {
    fn new(report: &Report, selected: bool) -> Self {
        Self {
            id: report.id().clone(),
            category: report.category().as_str(),
            status: report.status(),
            owner_email: report.owner_email().map(str::to_owned),
            description: report.description().unwrap_or(NO_DESCRIPTION).to_owned(),
            coordinates: report.coordinates().to_string(),
            date: format_list_date(report.created_at()),
            ip: report.user_ip().map(str::to_owned),
            resolvable: report.is_open(),
            selected,
        }
    }
}

impl fmt::Display for ReportRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.selected { '>' } else { ' ' };
        write!(
            f,
            "{marker} #{id} [{status}] {category}",
            id = self.id,
            status = self.status,
            category = self.category
        )?;
        if let Some(email) = &self.owner_email {
            write!(f, " by {email}")?;
        }
        write!(f, "\n    {}\n    {}  {}", self.description, self.coordinates, self.date)?;
        if let Some(ip) = &self.ip {
            write!(f, "  IP: {ip}")?;
        }
        if self.resolvable {
            write!(f, "  [Resolve]")?;
        }
        Ok(())
    }
}

/// Dashboard state for one administrator.
pub struct AdminScreen<W: MapWidget> {
    identity: UserIdentity,
    feed: ReportFeed,
    map: MapSurface<W>,
    reports: Arc<dyn ReportRepository>,
    selected: Option<ReportId>,
    error: Option<String>,
}

impl<W: MapWidget> AdminScreen<W> {
    /// Mount `widget` in admin mode and load every report.
    pub async fn open(context: &AppContext, identity: UserIdentity, widget: W) -> Self {
        let reports = context.reports();
        let mut screen = Self {
            identity,
            feed: ReportFeed::new(Arc::clone(&reports), ReportScope::All),
            map: MapSurface::mount(widget, MapMode::Admin),
            reports,
            selected: None,
            error: None,
        };
        screen.reload(Invalidation::IdentityChanged).await;
        screen
    }

    async fn reload(&mut self, cause: Invalidation) {
        let snapshot = self.feed.invalidate(cause).await;
        self.map.render_reports(&snapshot.reports);
    }

    /// Header for the current administrator.
    #[must_use]
    pub fn header(&self) -> AdminHeader {
        AdminHeader {
            name: self
                .identity
                .display_name()
                .unwrap_or(NAME_FALLBACK)
                .to_owned(),
            email: self.identity.email().to_owned(),
            total: self.feed.snapshot().reports.len(),
        }
    }

    /// List entries, newest first.
    #[must_use]
    pub fn rows(&self) -> Vec<ReportRow> {
        self.feed
            .snapshot()
            .reports
            .iter()
            .map(|report| ReportRow::new(report, self.selected.as_ref() == Some(report.id())))
            .collect()
    }

    /// Placeholder shown instead of an empty list.
    #[must_use]
    pub fn empty_message(&self) -> Option<&'static str> {
        self.feed
            .snapshot()
            .reports
            .is_empty()
            .then_some(EMPTY_MESSAGE)
    }

    /// Feed one widget interaction through the dashboard.
    pub fn handle_map_event(&mut self, event: MapEvent) {
        if let Some(SurfaceEvent::ReportSelected(id)) = self.map.handle(event) {
            self.select(&id);
        }
    }

    /// Select a listed report and fly the map to it. Returns whether it was found.
    pub fn select(&mut self, id: &ReportId) -> bool {
        let Some(report) = self.feed.find(id) else {
            return false;
        };
        self.map.focus(&report);
        self.selected = Some(report.id().clone());
        true
    }

    /// Current selection.
    #[must_use]
    pub const fn selected(&self) -> Option<&ReportId> {
        self.selected.as_ref()
    }

    /// Mark a report resolved and refresh. Already resolved reports are left alone.
    ///
    /// # Errors
    ///
    /// Returns the store error; [`Self::error`] then carries the message to show.
    pub async fn resolve(&mut self, id: &ReportId) -> Result<(), PersistenceError> {
        if self.feed.find(id).is_some_and(|report| !report.is_open()) {
            return Ok(());
        }
        self.error = None;
        match self.reports.resolve(id).await {
            Ok(()) => {
                info!(report_id = %id, "report resolved");
                self.reload(Invalidation::Mutation).await;
                Ok(())
            }
            Err(error) => {
                warn!(report_id = %id, %error, "resolving report failed");
                self.error = Some(RESOLVE_FAILED_MESSAGE.to_owned());
                Err(error)
            }
        }
    }

    /// Serialise the listed reports for a download taken on `today`.
    ///
    /// # Errors
    ///
    /// Returns an error when the CSV writer fails.
    pub fn export_csv(&self, today: NaiveDate) -> Result<CsvExport, CsvExportError> {
        export_reports(&self.feed.snapshot().reports, today)
    }

    /// Message from the last failed action or listing.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error.clone().or_else(|| self.feed.snapshot().error)
    }

    /// Re-fetch on an external signal.
    pub async fn refresh(&mut self) {
        self.reload(Invalidation::External).await;
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
}

#[cfg(test)]
mod tests {
    //! Dashboard coverage over the in-memory store and headless map.
    use super::*;
    use crate::app::AppPorts;
    use crate::domain::map::markers::RESOLVED_COLOR;
    use crate::domain::map::{Basemap, FOCUS_ZOOM};
    use crate::domain::ports::{
        FixtureAuthProvider, FixtureIpLookup, FixtureReportRepository, MockReportRepository,
    };
    use crate::domain::{Coordinates, NewReport, ReportCategory, UserId};
    use crate::outbound::headless_map::HeadlessMap;
    use chrono::TimeZone;
    use mockable::DefaultClock;

    fn admin() -> UserIdentity {
        UserIdentity::new(UserId::random(), "kshresth2151@gmail.com", None)
    }

    async fn context_with(reports: Arc<dyn ReportRepository>) -> AppContext {
        AppContext::from_ports(AppPorts {
            auth: Arc::new(FixtureAuthProvider::new(None).with_restored(admin())),
            reports,
            ip_lookup: Arc::new(FixtureIpLookup::default()),
            clock: Arc::new(DefaultClock),
            basemap: Basemap::default(),
        })
        .await
    }

    async fn seeded() -> (Arc<FixtureReportRepository>, Report) {
        let store = Arc::new(FixtureReportRepository::new(Arc::new(DefaultClock)));
        let report = store
            .create(&NewReport::new(
                Coordinates::new(12.971_234, 79.159_876).expect("coords"),
                ReportCategory::Safety,
                None,
                None,
                UserId::random(),
            ))
            .await
            .expect("create");
        (store, report)
    }

    #[test]
    fn list_dates_use_short_month_and_twelve_hour_clock() {
        let at = Utc
            .with_ymd_and_hms(2025, 1, 5, 14, 30, 0)
            .single()
            .expect("time");
        assert_eq!(format_list_date(at), "Jan 5, 02:30 PM");
    }

    #[tokio::test]
    async fn empty_dashboard_says_so() {
        let store = Arc::new(FixtureReportRepository::new(Arc::new(DefaultClock)));
        let context = context_with(store).await;
        let screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;

        assert_eq!(screen.empty_message(), Some(EMPTY_MESSAGE));
        assert_eq!(screen.header().name, "Admin");
        assert_eq!(screen.header().to_string().lines().last(), Some("0 total reports"));
    }

    #[tokio::test]
    async fn rows_show_placeholders_and_rounded_coordinates() {
        let (store, report) = seeded().await;
        let context = context_with(store).await;
        let screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;

        let rows = screen.rows();
        assert_eq!(rows.len(), 1);
        let row = rows.first().expect("row");
        assert_eq!(row.id, *report.id());
        assert_eq!(row.description, NO_DESCRIPTION);
        assert_eq!(row.coordinates, "12.9712, 79.1599");
        assert!(row.resolvable);
    }

    #[tokio::test]
    async fn selecting_focuses_the_map() {
        let (store, report) = seeded().await;
        let context = context_with(store).await;
        let mut screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;

        assert!(screen.select(report.id()));
        let camera = screen.map().widget().camera().expect("camera moved");
        assert!((camera.zoom - FOCUS_ZOOM).abs() < f64::EPSILON);
        assert_eq!(camera.center, report.coordinates());
        assert!(!screen.select(&ReportId::new("missing")));
    }

    #[tokio::test]
    async fn resolving_turns_the_marker_green() {
        let (store, report) = seeded().await;
        let context = context_with(store).await;
        let mut screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;

        screen.resolve(report.id()).await.expect("resolve");

        let marker = screen.map().marker_for(report.id()).expect("marker");
        let spec = screen.map().widget().marker(marker).expect("spec");
        assert_eq!(spec.color, RESOLVED_COLOR);
        assert!(!screen.rows().iter().any(|row| row.resolvable));
    }

    #[tokio::test]
    async fn failed_resolution_is_reported() {
        let (_, report) = seeded().await;
        let listed = report.clone();
        let mut repository = MockReportRepository::new();
        repository
            .expect_list_all()
            .returning(move || Ok(vec![listed.clone()]));
        repository
            .expect_resolve()
            .returning(|_| Err(PersistenceError::transport("offline")));
        let context = context_with(Arc::new(repository)).await;
        let mut screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;

        assert!(screen.resolve(report.id()).await.is_err());
        assert_eq!(screen.error().as_deref(), Some(RESOLVE_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn export_covers_the_listed_reports() {
        let (store, _) = seeded().await;
        let context = context_with(store).await;
        let screen = AdminScreen::open(&context, admin(), HeadlessMap::default()).await;
        let today = NaiveDate::from_ymd_opt(2025, 1, 6).expect("date");

        let export = screen.export_csv(today).expect("export");

        assert_eq!(export.file_name, "campus-reports-2025-01-06.csv");
        assert_eq!(export.contents.lines().count(), 2);
    }
}

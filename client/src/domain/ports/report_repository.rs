//! Port abstraction for the `reports` store and its errors.
//!
//! Adapters delegate to the external backend. The store assigns `id`,
//! `status = open` and `created_at` on insert; callers never supply them.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::{NewReport, Report, ReportId, ReportStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Failures raised by report store adapters.
    pub enum PersistenceError {
        /// The store could not be reached.
        Transport { message: String } => "report store unreachable: {message}",
        /// The store did not answer in time.
        Timeout { message: String } => "report store timed out: {message}",
        /// The store refused the request (policy, constraint, bad input).
        Rejected { message: String } => "report store rejected the request: {message}",
        /// No report exists under the given identifier.
        NotFound { id: String } => "report {id} not found",
        /// The store answered with a payload we could not decode.
        Decode { message: String } => "report store returned malformed data: {message}",
    }
}

/// CRUD-style access to reports.
///
/// Both listing operations return the newest `created_at` first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Insert a report; the returned value carries the server-assigned fields.
    async fn create(&self, report: &NewReport) -> Result<Report, PersistenceError>;

    /// Every report, newest first.
    async fn list_all(&self) -> Result<Vec<Report>, PersistenceError>;

    /// Reports created by `owner`, newest first. Never yields a foreign report.
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Report>, PersistenceError>;

    /// Mark a report resolved. Resolving an already resolved report succeeds.
    async fn resolve(&self, id: &ReportId) -> Result<(), PersistenceError>;
}

#[derive(Default)]
struct FixtureState {
    reports: Vec<Report>,
    next_id: u64,
    unavailable: bool,
}

/// In-memory report store with the same semantics as the backend table.
///
/// Used when no backend is configured and as the store behind behaviour
/// tests. Nothing survives the process.
pub struct FixtureReportRepository {
    clock: Arc<dyn Clock>,
    state: Mutex<FixtureState>,
}

impl FixtureReportRepository {
    /// Create an empty store stamping rows with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(FixtureState::default()),
        }
    }

    /// Make every subsequent call fail with a transport error, or stop doing so.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn lock(&self) -> MutexGuard<'_, FixtureState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn available(state: &FixtureState) -> Result<(), PersistenceError> {
        if state.unavailable {
            Err(PersistenceError::transport("fixture store marked unavailable"))
        } else {
            Ok(())
        }
    }

    fn newest_first<'a>(reports: impl Iterator<Item = &'a Report>) -> Vec<Report> {
        // Later inserts win ties so equal timestamps still list newest first.
        let mut listed: Vec<Report> = reports.cloned().collect();
        listed.reverse();
        listed.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        listed
    }
}

#[async_trait]
impl ReportRepository for FixtureReportRepository {
    async fn create(&self, report: &NewReport) -> Result<Report, PersistenceError> {
        let created_at = self.clock.utc();
        let mut state = self.lock();
        Self::available(&state)?;
        state.next_id += 1;
        let id = ReportId::new(state.next_id.to_string());
        let stored = Report::new(id, report.clone(), ReportStatus::Open, created_at);
        state.reports.push(stored.clone());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<Report>, PersistenceError> {
        let state = self.lock();
        Self::available(&state)?;
        Ok(Self::newest_first(state.reports.iter()))
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Report>, PersistenceError> {
        let state = self.lock();
        Self::available(&state)?;
        Ok(Self::newest_first(
            state.reports.iter().filter(|report| report.owner_id() == owner),
        ))
    }

    async fn resolve(&self, id: &ReportId) -> Result<(), PersistenceError> {
        let mut state = self.lock();
        Self::available(&state)?;
        let report = state
            .reports
            .iter_mut()
            .find(|report| report.id() == id)
            .ok_or_else(|| PersistenceError::not_found(id.as_ref()))?;
        report.resolve();
        Ok(())
    }
}

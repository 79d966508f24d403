//! Cached report list with coalesced re-fetching.
//!
//! A screen keeps one feed. Identity changes, successful mutations and
//! external refresh signals all invalidate it through [`ReportFeed::invalidate`].
//! At most one fetch is in flight; callers that arrive while one runs wait
//! for the gate and reuse a result whose fetch began after their request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use super::ports::ReportRepository;
use super::{Report, ReportId, UserId};

/// User-visible message shown when the list cannot be loaded.
pub const LIST_FAILED_MESSAGE: &str = "Failed to load reports";

/// Which reports a feed lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportScope {
    /// Every report (admin dashboard).
    All,
    /// Reports created by one user.
    Owner(UserId),
}

/// Why a feed is being re-fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// The signed-in identity changed.
    IdentityChanged,
    /// A local create or resolve succeeded.
    Mutation,
    /// Some other component asked for fresh data.
    External,
}

/// The most recent listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedSnapshot {
    /// Reports, newest first. Empty when the last fetch failed.
    pub reports: Vec<Report>,
    /// Message describing the last failure, if it failed.
    pub error: Option<String>,
}

/// Report list for one scope.
pub struct ReportFeed {
    repository: Arc<dyn ReportRepository>,
    scope: Mutex<ReportScope>,
    snapshot: Mutex<FeedSnapshot>,
    requested: AtomicU64,
    // Holds the highest request ticket served by a completed fetch.
    gate: AsyncMutex<u64>,
}

impl ReportFeed {
    /// Empty feed over `scope`; nothing is fetched until the first refresh.
    pub fn new(repository: Arc<dyn ReportRepository>, scope: ReportScope) -> Self {
        Self {
            repository,
            scope: Mutex::new(scope),
            snapshot: Mutex::new(FeedSnapshot::default()),
            requested: AtomicU64::new(0),
            gate: AsyncMutex::new(0),
        }
    }

    /// Switch scope. Returns whether it changed; callers then invalidate.
    pub fn set_scope(&self, scope: ReportScope) -> bool {
        let mut current = lock(&self.scope);
        if *current == scope {
            return false;
        }
        *current = scope;
        true
    }

    /// Current scope.
    #[must_use]
    pub fn scope(&self) -> ReportScope {
        lock(&self.scope).clone()
    }

    /// Re-fetch because `cause` happened.
    pub async fn invalidate(&self, cause: Invalidation) -> FeedSnapshot {
        debug!(?cause, "report feed invalidated");
        self.refresh().await
    }

    /// Fetch the list, coalescing with any fetch already under way.
    pub async fn refresh(&self) -> FeedSnapshot {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let mut served = self.gate.lock().await;
        if *served >= ticket {
            return self.snapshot();
        }

        let target = self.requested.load(Ordering::SeqCst);
        let scope = self.scope();
        let result = match &scope {
            ReportScope::All => self.repository.list_all().await,
            ReportScope::Owner(owner) => self.repository.list_by_owner(owner).await,
        };

        let snapshot = match result {
            Ok(reports) => {
                debug!(count = reports.len(), ?scope, "report feed refreshed");
                FeedSnapshot {
                    reports,
                    error: None,
                }
            }
            Err(error) => {
                warn!(%error, ?scope, "report listing failed; showing an empty list");
                FeedSnapshot {
                    reports: Vec::new(),
                    error: Some(LIST_FAILED_MESSAGE.to_owned()),
                }
            }
        };
        lock(&self.snapshot).clone_from(&snapshot);
        *served = target;
        snapshot
    }

    /// Last listing without fetching.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        lock(&self.snapshot).clone()
    }

    /// Look a report up in the last listing.
    #[must_use]
    pub fn find(&self, id: &ReportId) -> Option<Report> {
        lock(&self.snapshot)
            .reports
            .iter()
            .find(|report| report.id() == id)
            .cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

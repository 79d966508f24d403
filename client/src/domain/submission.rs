//! Report submission dialog state.
//!
//! The dialog opens on a confirmed pin location for the current identity.
//! Category is mandatory and checked locally; the description is optional.
//! On submit the caller's IP is looked up best-effort before the report is
//! created. A store failure keeps the dialog open with its data intact.

use thiserror::Error;
use tracing::{debug, info, warn};

use super::ports::{IpLookup, PersistenceError, ReportRepository};
use super::{Coordinates, NewReport, Report, ReportCategory, ReportValidationError, UserId};

/// Message shown when the store refuses or cannot take the report.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit report. Please try again.";

/// Why a submission did not produce a report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    /// Local input check failed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ReportValidationError),
    /// The report store failed; the dialog can be retried.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// A submission is already in flight.
    #[error("a submission is already in progress")]
    InFlight,
}

/// Modal form for one pending report.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionDialog {
    location: Coordinates,
    owner: UserId,
    category: Option<ReportCategory>,
    description: String,
    submitting: bool,
    error: Option<String>,
}

impl SubmissionDialog {
    /// Open the dialog for `location` on behalf of `owner`.
    pub fn open(location: Coordinates, owner: UserId) -> Self {
        Self {
            location,
            owner,
            category: None,
            description: String::new(),
            submitting: false,
            error: None,
        }
    }

    /// Categories offered by the select control, in display order.
    #[must_use]
    pub const fn categories() -> &'static [ReportCategory] {
        &ReportCategory::ALL
    }

    /// Pinned location.
    #[must_use]
    pub const fn location(&self) -> Coordinates {
        self.location
    }

    /// Chosen category.
    #[must_use]
    pub const fn category(&self) -> Option<ReportCategory> {
        self.category
    }

    /// Description typed so far.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Message from the last failed attempt.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Label for the submit button.
    #[must_use]
    pub const fn submit_label(&self) -> &'static str {
        if self.submitting {
            "Submitting..."
        } else {
            "Submit Report"
        }
    }

    /// Choose (or clear) the category.
    pub fn select_category(&mut self, category: Option<ReportCategory>) {
        self.category = category;
    }

    /// Replace the description text.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Check the form without contacting anything.
    pub fn validate(&self) -> Result<ReportCategory, ReportValidationError> {
        self.category.ok_or(ReportValidationError::MissingCategory)
    }

    /// Look up the IP, then create the report.
    ///
    /// Validation failures never reach the network. On any error the form
    /// keeps its data and [`Self::error`] carries the message to show.
    pub async fn submit(
        &mut self,
        ip_lookup: &dyn IpLookup,
        repository: &dyn ReportRepository,
    ) -> Result<Report, SubmissionError> {
        if self.submitting {
            return Err(SubmissionError::InFlight);
        }
        let category = match self.validate() {
            Ok(category) => category,
            Err(error) => {
                self.error = Some(error.to_string());
                return Err(error.into());
            }
        };

        self.submitting = true;
        self.error = None;
        let user_ip = lookup_ip(ip_lookup).await;
        let ip_resolved = user_ip.is_some();
        let input = NewReport::new(
            self.location,
            category,
            Some(self.description.clone()),
            user_ip,
            self.owner.clone(),
        );
        let outcome = repository.create(&input).await;
        self.submitting = false;

        match outcome {
            Ok(report) => {
                info!(
                    report_id = %report.id(),
                    category = %category,
                    ip_resolved,
                    "report submitted"
                );
                Ok(report)
            }
            Err(error) => {
                warn!(%error, category = %category, "report submission failed");
                self.error = Some(SUBMIT_FAILED_MESSAGE.to_owned());
                Err(error.into())
            }
        }
    }
}

async fn lookup_ip(ip_lookup: &dyn IpLookup) -> Option<String> {
    match ip_lookup.public_ip().await {
        Ok(address) => Some(address),
        Err(error) => {
            debug!(%error, "public IP unavailable; submitting without it");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ports::{
        FixtureIpLookup, LookupError, MockIpLookup, MockReportRepository,
    };
    use crate::domain::{ReportId, ReportStatus};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn dialog() -> SubmissionDialog {
        SubmissionDialog::open(
            Coordinates::new(12.97, 79.16).expect("coords"),
            UserId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("uuid"),
        )
    }

    fn echo_repository() -> MockReportRepository {
        let mut repository = MockReportRepository::new();
        repository.expect_create().times(1).returning(|input| {
            Ok(Report::new(
                ReportId::new("7"),
                input.clone(),
                ReportStatus::Open,
                Utc::now(),
            ))
        });
        repository
    }

    #[rstest]
    #[tokio::test]
    async fn missing_category_blocks_without_network(mut dialog: SubmissionDialog) {
        let mut lookup = MockIpLookup::new();
        lookup.expect_public_ip().times(0);
        let mut repository = MockReportRepository::new();
        repository.expect_create().times(0);

        let err = dialog
            .submit(&lookup, &repository)
            .await
            .expect_err("validation");

        assert_eq!(
            err,
            SubmissionError::Validation(ReportValidationError::MissingCategory)
        );
        assert_eq!(dialog.error(), Some("Please select a category"));
    }

    #[rstest]
    #[tokio::test]
    async fn blank_description_is_stored_as_absent(mut dialog: SubmissionDialog) {
        dialog.select_category(Some(ReportCategory::Lighting));
        dialog.set_description("   ");
        let lookup = FixtureIpLookup::new(Some("203.0.113.9".to_owned()));

        let report = dialog
            .submit(&lookup, &echo_repository())
            .await
            .expect("submitted");

        assert_eq!(report.category(), ReportCategory::Lighting);
        assert_eq!(report.description(), None);
        assert_eq!(report.user_ip(), Some("203.0.113.9"));
        assert!(!dialog.is_submitting());
    }

    #[rstest]
    #[tokio::test]
    async fn failed_ip_lookup_still_submits(mut dialog: SubmissionDialog) {
        dialog.select_category(Some(ReportCategory::Safety));
        let mut lookup = MockIpLookup::new();
        lookup
            .expect_public_ip()
            .returning(|| Err(LookupError::timeout("3000ms elapsed")));

        let report = dialog
            .submit(&lookup, &echo_repository())
            .await
            .expect("submitted");

        assert_eq!(report.user_ip(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn store_failure_keeps_the_form_for_retry(mut dialog: SubmissionDialog) {
        dialog.select_category(Some(ReportCategory::Infrastructure));
        dialog.set_description("Broken tap");
        let mut repository = MockReportRepository::new();
        repository
            .expect_create()
            .returning(|_| Err(PersistenceError::transport("offline")));

        let err = dialog
            .submit(&FixtureIpLookup::default(), &repository)
            .await
            .expect_err("store failure");

        assert!(matches!(err, SubmissionError::Persistence(_)));
        assert_eq!(dialog.error(), Some(SUBMIT_FAILED_MESSAGE));
        assert_eq!(dialog.category(), Some(ReportCategory::Infrastructure));
        assert_eq!(dialog.description(), "Broken tap");
        assert_eq!(dialog.submit_label(), "Submit Report");
    }

    #[test]
    fn categories_follow_declaration_order() {
        assert_eq!(SubmissionDialog::categories(), &ReportCategory::ALL);
    }
}

//! PostgREST-backed report repository.
//!
//! This adapter owns transport details only: request building, status and
//! timeout mapping, and JSON decoding into domain reports.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::warn;

use super::dto::{InsertReportDto, StatusPatchDto, row_into_domain, rows_into_domain};
use super::SupabaseClient;
use crate::outbound::http::status_message;
use crate::domain::ports::{PersistenceError, ReportRepository};
use crate::domain::{NewReport, Report, ReportId, ReportStatus, UserId};

const REPORTS_PATH: &str = "/rest/v1/reports";
const NEWEST_FIRST: (&str, &str) = ("order", "created_at.desc");
const ALL_COLUMNS: (&str, &str) = ("select", "*");

/// Report repository talking to the `reports` table.
pub struct SupabaseReportRepository {
    client: SupabaseClient,
}

impl SupabaseReportRepository {
    /// Repository sharing `client` (and its bearer) with the auth provider.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    fn reports_url(&self) -> Result<Url, PersistenceError> {
        self.client
            .endpoint(REPORTS_PATH)
            .map_err(|error| PersistenceError::rejected(format!("invalid reports url: {error}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<Value>, PersistenceError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_rows(body.as_ref())
    }

    fn list_request(&self, owner: Option<&UserId>) -> Result<RequestBuilder, PersistenceError> {
        let mut request = self
            .client
            .request(Method::GET, self.reports_url()?)
            .query(&[ALL_COLUMNS, NEWEST_FIRST]);
        if let Some(owner) = owner {
            request = request.query(&[("user_id", format!("eq.{owner}"))]);
        }
        Ok(request)
    }

    async fn list(&self, owner: Option<&UserId>) -> Result<Vec<Report>, PersistenceError> {
        let rows = self.send(self.list_request(owner)?).await?;
        Ok(rows_into_domain(rows))
    }
}

#[async_trait]
impl ReportRepository for SupabaseReportRepository {
    async fn create(&self, report: &NewReport) -> Result<Report, PersistenceError> {
        let request = self
            .client
            .request(Method::POST, self.reports_url()?)
            .header("Prefer", "return=representation")
            .json(&[InsertReportDto::from(report)]);
        let row = self
            .send(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::decode("insert returned no row"))?;
        row_into_domain(row).map_err(PersistenceError::decode)
    }

    async fn list_all(&self) -> Result<Vec<Report>, PersistenceError> {
        self.list(None).await
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Report>, PersistenceError> {
        let reports = self.list(Some(owner)).await?;
        Ok(retain_owned(reports, owner))
    }

    async fn resolve(&self, id: &ReportId) -> Result<(), PersistenceError> {
        let request = self
            .client
            .request(Method::PATCH, self.reports_url()?)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&StatusPatchDto {
                status: ReportStatus::Resolved.as_str(),
            });
        let updated = self.send(request).await?;
        if updated.is_empty() {
            return Err(PersistenceError::not_found(id.as_ref()));
        }
        Ok(())
    }
}

fn parse_rows(body: &[u8]) -> Result<Vec<Value>, PersistenceError> {
    serde_json::from_slice(body).map_err(|error| {
        PersistenceError::decode(format!("invalid reports JSON payload: {error}"))
    })
}

/// Decode a listing body, skipping rows that do not decode.
fn parse_reports(body: &[u8]) -> Result<Vec<Report>, PersistenceError> {
    parse_rows(body).map(rows_into_domain)
}

/// Keep only the reports owned by `owner`.
fn retain_owned(mut reports: Vec<Report>, owner: &UserId) -> Vec<Report> {
    let before = reports.len();
    reports.retain(|report| report.owner_id() == owner);
    if reports.len() != before {
        warn!(
            dropped = before - reports.len(),
            "store returned reports owned by someone else; discarded"
        );
    }
    reports
}

fn map_transport_error(error: reqwest::Error) -> PersistenceError {
    if error.is_timeout() {
        PersistenceError::timeout(error.to_string())
    } else {
        PersistenceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PersistenceError {
    let message = status_message(status, body);
    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PersistenceError::timeout(message)
        }
        _ if status.is_client_error() => PersistenceError::rejected(message),
        _ => PersistenceError::transport(message),
    }
}

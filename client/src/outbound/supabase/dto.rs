//! DTOs for PostgREST rows and GoTrue payloads.
//!
//! Adapters decode into these transport DTOs first, then map into domain
//! values in one pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{
    Coordinates, NewReport, Report, ReportCategory, ReportId, ReportStatus, UserId, UserIdentity,
};

#[derive(Debug, Deserialize)]
pub(super) struct ReportRowDto {
    pub(super) id: ReportId,
    pub(super) lat: f64,
    pub(super) lng: f64,
    pub(super) category: String,
    #[serde(default)]
    pub(super) description: Option<String>,
    pub(super) status: String,
    #[serde(default)]
    pub(super) user_ip: Option<String>,
    pub(super) user_id: String,
    #[serde(default)]
    pub(super) user_email: Option<String>,
    pub(super) created_at: DateTime<Utc>,
}

impl ReportRowDto {
    pub(super) fn into_domain(self) -> Result<Report, String> {
        let coordinates = Coordinates::new(self.lat, self.lng)
            .map_err(|error| format!("report {}: {error}", self.id))?;
        let category: ReportCategory = self
            .category
            .parse()
            .map_err(|error| format!("report {}: {error}", self.id))?;
        let status: ReportStatus = self
            .status
            .parse()
            .map_err(|error| format!("report {}: {error}", self.id))?;
        let owner = UserId::new(&self.user_id)
            .map_err(|error| format!("report {}: {error}", self.id))?;

        let input = NewReport::new(
            coordinates,
            category,
            self.description,
            self.user_ip,
            owner,
        );
        Ok(Report::new(self.id, input, status, self.created_at).with_owner_email(self.user_email))
    }
}

/// Decode one raw row into a domain report.
pub(super) fn row_into_domain(row: serde_json::Value) -> Result<Report, String> {
    let dto: ReportRowDto =
        serde_json::from_value(row).map_err(|error| format!("invalid report row: {error}"))?;
    dto.into_domain()
}

/// Decode raw rows one by one, skipping any row that does not decode.
pub(super) fn rows_into_domain(rows: Vec<serde_json::Value>) -> Vec<Report> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match row_into_domain(row) {
            Ok(report) => Some(report),
            Err(reason) => {
                warn!(row = index, %reason, "skipping undecodable report row");
                None
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub(super) struct InsertReportDto<'a> {
    pub(super) lat: f64,
    pub(super) lng: f64,
    pub(super) category: &'a str,
    pub(super) description: Option<&'a str>,
    pub(super) status: &'a str,
    pub(super) user_ip: Option<&'a str>,
    pub(super) user_id: &'a str,
}

impl<'a> From<&'a NewReport> for InsertReportDto<'a> {
    fn from(report: &'a NewReport) -> Self {
        Self {
            lat: report.coordinates().lat(),
            lng: report.coordinates().lng(),
            category: report.category().as_str(),
            description: report.description(),
            status: ReportStatus::Open.as_str(),
            user_ip: report.user_ip(),
            user_id: report.owner_id().as_ref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StatusPatchDto {
    pub(super) status: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct PkceExchangeDto<'a> {
    pub(super) auth_code: &'a str,
    pub(super) code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshDto<'a> {
    pub(super) refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    pub(super) refresh_token: String,
    pub(super) expires_in: i64,
    #[serde(default)]
    pub(super) expires_at: Option<i64>,
    pub(super) user: UserDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserDto {
    pub(super) id: String,
    #[serde(default)]
    pub(super) email: Option<String>,
    #[serde(default)]
    pub(super) user_metadata: UserMetadataDto,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UserMetadataDto {
    #[serde(default)]
    pub(super) full_name: Option<String>,
    #[serde(default)]
    pub(super) name: Option<String>,
}

impl UserDto {
    pub(super) fn into_identity(self) -> Result<UserIdentity, String> {
        let id = UserId::new(&self.id).map_err(|error| format!("user {}: {error}", self.id))?;
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| format!("user {} has no email", self.id))?;
        let display_name = self.user_metadata.full_name.or(self.user_metadata.name);
        Ok(UserIdentity::new(id, email, display_name))
    }
}

impl TokenResponseDto {
    /// Absolute expiry, preferring the server's own timestamp.
    pub(super) fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_at
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .unwrap_or_else(|| now + chrono::Duration::seconds(self.expires_in))
    }
}

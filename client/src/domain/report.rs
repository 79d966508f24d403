//! Report data model.
//!
//! A report is a located campus issue. Coordinates, category and owner are
//! fixed at creation; the only mutation this system performs is the one-way
//! `open → resolved` status transition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::identity::UserId;

/// Validation errors raised while constructing report inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportValidationError {
    /// Latitude or longitude was NaN or infinite.
    NonFiniteCoordinate,
    /// Latitude fell outside `[-90, 90]`.
    LatitudeOutOfRange { value: f64 },
    /// Longitude fell outside `[-180, 180]`.
    LongitudeOutOfRange { value: f64 },
    /// No category was chosen.
    MissingCategory,
    /// The category label is not one of the known categories.
    UnknownCategory { value: String },
    /// The status label is neither `open` nor `resolved`.
    UnknownStatus { value: String },
}

impl fmt::Display for ReportValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteCoordinate => write!(f, "coordinates must be finite numbers"),
            Self::LatitudeOutOfRange { value } => {
                write!(f, "latitude {value} must be within [-90, 90]")
            }
            Self::LongitudeOutOfRange { value } => {
                write!(f, "longitude {value} must be within [-180, 180]")
            }
            Self::MissingCategory => write!(f, "Please select a category"),
            Self::UnknownCategory { value } => write!(f, "unknown report category '{value}'"),
            Self::UnknownStatus { value } => write!(f, "unknown report status '{value}'"),
        }
    }
}

impl std::error::Error for ReportValidationError {}

/// A WGS84 position.
///
/// ## Invariants
/// - `lat` is finite and within `[-90, 90]`.
/// - `lng` is finite and within `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Validate a latitude/longitude pair.
    ///
    /// # Examples
    /// ```
    /// use campus_trace::domain::Coordinates;
    ///
    /// let at = Coordinates::new(12.97, 79.16).unwrap();
    /// assert_eq!(at.lat(), 12.97);
    /// assert!(Coordinates::new(91.0, 0.0).is_err());
    /// ```
    pub fn new(lat: f64, lng: f64) -> Result<Self, ReportValidationError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(ReportValidationError::NonFiniteCoordinate);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ReportValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ReportValidationError::LongitudeOutOfRange { value: lng });
        }
        Ok(Self { lat, lng })
    }

    /// Build a position from literals already known to be in range.
    ///
    /// Only for compile-time constants; runtime input goes through
    /// [`Coordinates::new`].
    pub(crate) const fn from_trusted(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Issue classification chosen by the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportCategory {
    Infrastructure,
    Safety,
    Cleanliness,
    Accessibility,
    Lighting,
    Other,
}

impl ReportCategory {
    /// Every category, in the order the submission form lists them.
    pub const ALL: [Self; 6] = [
        Self::Infrastructure,
        Self::Safety,
        Self::Cleanliness,
        Self::Accessibility,
        Self::Lighting,
        Self::Other,
    ];

    /// Stable label stored in the backend and shown to users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Infrastructure => "Infrastructure",
            Self::Safety => "Safety",
            Self::Cleanliness => "Cleanliness",
            Self::Accessibility => "Accessibility",
            Self::Lighting => "Lighting",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = ReportValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ReportValidationError::MissingCategory);
        }
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ReportValidationError::UnknownCategory {
                value: trimmed.to_owned(),
            })
    }
}

impl Serialize for ReportCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReportCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Open,
    Resolved,
}

impl ReportStatus {
    /// Lowercase label used on the wire and in exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = ReportValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ReportValidationError::UnknownStatus {
                value: value.to_owned(),
            }),
        }
    }
}

/// Server-assigned report identifier.
///
/// The backend may hand out numeric or textual keys; both are held as the
/// string the backend would accept in an equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportId(String);

impl ReportId {
    /// Wrap a backend key.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl AsRef<str> for ReportId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ReportId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ReportId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Int(value) => Ok(Self(value.to_string())),
            RawId::Text(value) if value.trim().is_empty() => {
                Err(serde::de::Error::custom("report id must not be empty"))
            }
            RawId::Text(value) => Ok(Self(value)),
        }
    }
}

/// Input for creating a report on behalf of the current identity.
///
/// Blank descriptions and IP strings are normalised to `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReport {
    coordinates: Coordinates,
    category: ReportCategory,
    description: Option<String>,
    user_ip: Option<String>,
    owner_id: UserId,
}

impl NewReport {
    /// Assemble a creation request.
    pub fn new(
        coordinates: Coordinates,
        category: ReportCategory,
        description: Option<String>,
        user_ip: Option<String>,
        owner_id: UserId,
    ) -> Self {
        Self {
            coordinates,
            category,
            description: non_blank(description),
            user_ip: non_blank(user_ip),
            owner_id,
        }
    }

    /// Pinned location.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Chosen category.
    #[must_use]
    pub const fn category(&self) -> ReportCategory {
        self.category
    }

    /// Optional free text.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Submitter's public IP, if it could be resolved.
    #[must_use]
    pub fn user_ip(&self) -> Option<&str> {
        self.user_ip.as_deref()
    }

    /// Creator of the report.
    #[must_use]
    pub const fn owner_id(&self) -> &UserId {
        &self.owner_id
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// A persisted report as read back from the store.
///
/// ## Invariants
/// - `owner_id` and `coordinates` never change after construction.
/// - `status` only moves from `Open` to `Resolved`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    id: ReportId,
    coordinates: Coordinates,
    category: ReportCategory,
    description: Option<String>,
    status: ReportStatus,
    user_ip: Option<String>,
    owner_id: UserId,
    owner_email: Option<String>,
    created_at: DateTime<Utc>,
}

impl Report {
    /// Build a report from the fields the store assigns plus the creation input.
    pub fn new(
        id: ReportId,
        input: NewReport,
        status: ReportStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        let NewReport {
            coordinates,
            category,
            description,
            user_ip,
            owner_id,
        } = input;
        Self {
            id,
            coordinates,
            category,
            description,
            status,
            user_ip,
            owner_id,
            owner_email: None,
            created_at,
        }
    }

    /// Attach the denormalised owner email provided by the store.
    #[must_use]
    pub fn with_owner_email(mut self, email: Option<String>) -> Self {
        self.owner_email = non_blank(email);
        self
    }

    /// Apply the one-way resolve transition; resolving twice is a no-op.
    pub fn resolve(&mut self) {
        self.status = ReportStatus::Resolved;
    }

    /// Server-assigned identifier.
    #[must_use]
    pub const fn id(&self) -> &ReportId {
        &self.id
    }

    /// Pinned location.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    /// Issue category.
    #[must_use]
    pub const fn category(&self) -> ReportCategory {
        self.category
    }

    /// Optional free text.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> ReportStatus {
        self.status
    }

    /// Whether the report still awaits action.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == ReportStatus::Open
    }

    /// Submitter IP metadata.
    #[must_use]
    pub fn user_ip(&self) -> Option<&str> {
        self.user_ip.as_deref()
    }

    /// Creator of the report.
    #[must_use]
    pub const fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    /// Creator email when the store exposes it.
    #[must_use]
    pub fn owner_email(&self) -> Option<&str> {
        self.owner_email.as_deref()
    }

    /// Server-side creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

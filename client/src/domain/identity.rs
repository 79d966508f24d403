//! Authenticated identity and the session snapshot screens observe.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned when building identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    EmptyId,
    InvalidId,
}

impl fmt::Display for IdentityValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
        }
    }
}

impl std::error::Error for IdentityValidationError {}

/// Stable user identifier issued by the auth provider, stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    #[must_use]
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, IdentityValidationError> {
        if id.is_empty() {
            return Err(IdentityValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(IdentityValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| IdentityValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// The authenticated principal behind a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    id: UserId,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
}

impl UserIdentity {
    /// Build an identity; a blank display name is treated as absent.
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name: display_name.filter(|name| !name.trim().is_empty()),
        }
    }

    /// Provider-issued identifier.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        &self.id
    }

    /// Sign-in email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Full name from the provider profile, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}

/// Read-only view of the session store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Current identity; `None` when signed out.
    pub identity: Option<UserIdentity>,
    /// Set while restoration or interactive sign-in is pending.
    pub loading: bool,
}

impl Session {
    /// A settled, signed-in session.
    #[must_use]
    pub const fn signed_in(identity: UserIdentity) -> Self {
        Self {
            identity: Some(identity),
            loading: false,
        }
    }

    /// A settled, signed-out session.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            identity: None,
            loading: false,
        }
    }

    /// Whether an identity is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Email of the current identity.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.identity.as_ref().map(UserIdentity::email)
    }
}

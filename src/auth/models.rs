//! Auth data models.

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use uuid::Uuid;

use crate::auth::AuthServiceError;

/// Role assigned to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AuthServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(AuthServiceError::UnknownRole),
        }
    }
}

/// A stored user account.
#[derive(Debug, Clone)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Registration input, prior to normalization and validation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Persistence payload for a user row. Built by the service after
/// validation; each provisioning path fills a different subset.
#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub uuid: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
}

/// Session data used during bearer authentication.
#[derive(Debug, Clone)]
pub(crate) struct ActiveSession {
    pub user_uuid: Uuid,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
}

/// Session issuance result with the one-time raw token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
}

/// Identity claims extracted from a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleClaims {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

//! Auth service errors.

use sqlx::Error;
use thiserror::Error;

use crate::auth::{SessionTokenError, google::GoogleVerifyError, otp::OtpSendError};

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("session not found")]
    SessionNotFound,

    #[error("session has expired")]
    SessionExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("an account with this phone number already exists")]
    PhoneTaken,

    #[error("admin role required")]
    NotAdmin,

    #[error("stored role is not recognized")]
    UnknownRole,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("verification code is invalid or has expired")]
    OtpRejected,

    #[error("too many verification attempts")]
    OtpAttemptsExceeded,

    #[error("storage error")]
    Sql(#[source] Error),

    #[error("token processing error")]
    Token(#[source] SessionTokenError),

    #[error("Google token verification error")]
    Google(#[from] GoogleVerifyError),

    #[error("verification code delivery error")]
    OtpDelivery(#[from] OtpSendError),
}

impl From<Error> for AuthServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}

impl From<SessionTokenError> for AuthServiceError {
    fn from(error: SessionTokenError) -> Self {
        Self::Token(error)
    }
}

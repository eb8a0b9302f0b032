//! Settings service errors.

use sqlx::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for SettingsServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}

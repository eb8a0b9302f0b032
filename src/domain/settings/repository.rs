//! Site Settings Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::settings::models::{SiteSettings, SiteSettingsUpdate};

const GET_SETTINGS_SQL: &str = include_str!("sql/get_settings.sql");
const INIT_SETTINGS_SQL: &str = include_str!("sql/init_settings.sql");
const UPDATE_SETTINGS_SQL: &str = include_str!("sql/update_settings.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgSettingsRepository;

impl PgSettingsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Create the singleton row when it does not exist yet.
    pub(crate) async fn init_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<(), sqlx::Error> {
        query(INIT_SETTINGS_SQL).execute(&mut **tx).await?;

        Ok(())
    }

    pub(crate) async fn get_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<SiteSettings, sqlx::Error> {
        query_as::<Postgres, SiteSettings>(GET_SETTINGS_SQL)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_settings(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        update: &SiteSettingsUpdate,
    ) -> Result<SiteSettings, sqlx::Error> {
        query_as::<Postgres, SiteSettings>(UPDATE_SETTINGS_SQL)
            .bind(&update.footer_text)
            .bind(&update.contact_email)
            .bind(&update.phone)
            .bind(&update.telegram_chat_id)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for SiteSettings {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            footer_text: row.try_get("footer_text")?,
            contact_email: row.try_get("contact_email")?,
            phone: row.try_get("phone")?,
            telegram_chat_id: row.try_get("telegram_chat_id")?,
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

//! Site settings service.

use async_trait::async_trait;
use mockall::automock;

use crate::{
    database::Db,
    domain::settings::{
        errors::SettingsServiceError,
        models::{SiteSettings, SiteSettingsUpdate},
        repository::PgSettingsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgSettingsService {
    db: Db,
    repository: PgSettingsRepository,
}

impl PgSettingsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgSettingsRepository::new(),
        }
    }
}

#[async_trait]
impl SettingsService for PgSettingsService {
    async fn get_settings(&self) -> Result<SiteSettings, SettingsServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.init_settings(&mut tx).await?;
        let settings = self.repository.get_settings(&mut tx).await?;

        tx.commit().await?;

        Ok(settings)
    }

    async fn update_settings(
        &self,
        update: SiteSettingsUpdate,
    ) -> Result<SiteSettings, SettingsServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.init_settings(&mut tx).await?;
        let settings = self.repository.update_settings(&mut tx, &update).await?;

        tx.commit().await?;

        Ok(settings)
    }
}

#[automock]
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// Retrieve the settings singleton, creating it on first read.
    async fn get_settings(&self) -> Result<SiteSettings, SettingsServiceError>;

    /// Patch the settings singleton; `None` fields keep their value.
    async fn update_settings(
        &self,
        update: SiteSettingsUpdate,
    ) -> Result<SiteSettings, SettingsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn get_settings_creates_empty_singleton() -> TestResult {
        let ctx = TestContext::new().await;

        let settings = ctx.settings.get_settings().await?;

        assert!(settings.footer_text.is_none());
        assert!(settings.contact_email.is_none());
        assert!(settings.phone.is_none());
        assert!(settings.telegram_chat_id.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn update_settings_patches_only_given_fields() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.settings
            .update_settings(SiteSettingsUpdate {
                footer_text: Some("All rights reserved".to_string()),
                contact_email: Some("shop@example.com".to_string()),
                ..SiteSettingsUpdate::default()
            })
            .await?;

        let settings = ctx
            .settings
            .update_settings(SiteSettingsUpdate {
                telegram_chat_id: Some("-10012345".to_string()),
                ..SiteSettingsUpdate::default()
            })
            .await?;

        assert_eq!(settings.footer_text.as_deref(), Some("All rights reserved"));
        assert_eq!(settings.contact_email.as_deref(), Some("shop@example.com"));
        assert_eq!(settings.telegram_chat_id.as_deref(), Some("-10012345"));

        Ok(())
    }
}

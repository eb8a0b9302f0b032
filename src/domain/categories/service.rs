//! Categories service.

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::categories::{
        errors::CategoriesServiceError,
        models::{Category, CategoryUpdate, NewCategory},
        repository::PgCategoriesRepository,
    },
};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 20;

#[derive(Debug, Clone)]
pub struct PgCategoriesService {
    db: Db,
    repository: PgCategoriesRepository,
}

impl PgCategoriesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCategoriesRepository::new(),
        }
    }
}

fn validate_name(name: &str) -> Result<(), CategoriesServiceError> {
    let chars = name.chars().count();

    if chars < NAME_MIN_CHARS || chars > NAME_MAX_CHARS {
        return Err(CategoriesServiceError::InvalidName);
    }

    Ok(())
}

#[async_trait]
impl CategoriesService for PgCategoriesService {
    async fn list_categories(&self) -> Result<Vec<Category>, CategoriesServiceError> {
        let mut tx = self.db.begin().await?;

        let categories = self.repository.list_categories(&mut tx).await?;

        tx.commit().await?;

        Ok(categories)
    }

    async fn get_category(&self, category: Uuid) -> Result<Category, CategoriesServiceError> {
        let mut tx = self.db.begin().await?;

        let category = self.repository.get_category(&mut tx, category).await?;

        tx.commit().await?;

        Ok(category)
    }

    async fn create_category(
        &self,
        category: NewCategory,
    ) -> Result<Category, CategoriesServiceError> {
        validate_name(category.name.trim())?;

        let category = NewCategory {
            name: category.name.trim().to_string(),
            ..category
        };

        let mut tx = self.db.begin().await?;

        let created = self.repository.create_category(&mut tx, &category).await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_category(
        &self,
        category: Uuid,
        update: CategoryUpdate,
    ) -> Result<Category, CategoriesServiceError> {
        let update = CategoryUpdate {
            name: update.name.map(|name| name.trim().to_string()),
            ..update
        };

        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_category(&mut tx, category, &update)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_category(&self, category: Uuid) -> Result<(), CategoriesServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_category(&mut tx, category).await?;

        if rows_affected == 0 {
            return Err(CategoriesServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CategoriesService: Send + Sync {
    /// Retrieves all categories, name-ordered.
    async fn list_categories(&self) -> Result<Vec<Category>, CategoriesServiceError>;

    /// Retrieve a single category.
    async fn get_category(&self, category: Uuid) -> Result<Category, CategoriesServiceError>;

    /// Creates a new category with the given details.
    async fn create_category(
        &self,
        category: NewCategory,
    ) -> Result<Category, CategoriesServiceError>;

    /// Applies a partial update to a category.
    async fn update_category(
        &self,
        category: Uuid,
        update: CategoryUpdate,
    ) -> Result<Category, CategoriesServiceError>;

    /// Deletes a category with the given UUID.
    async fn delete_category(&self, category: Uuid) -> Result<(), CategoriesServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn create_category_returns_created_row() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = Uuid::now_v7();

        let category = ctx
            .categories
            .create_category(NewCategory {
                uuid,
                name: "Snacks".to_string(),
                image: None,
            })
            .await?;

        assert_eq!(category.uuid, uuid);
        assert_eq!(category.name, "Snacks");
        assert!(category.image.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_category_trims_name() -> TestResult {
        let ctx = TestContext::new().await;

        let category = ctx
            .categories
            .create_category(NewCategory {
                uuid: Uuid::now_v7(),
                name: "  Drinks  ".to_string(),
                image: None,
            })
            .await?;

        assert_eq!(category.name, "Drinks");

        Ok(())
    }

    #[tokio::test]
    async fn create_category_duplicate_name_returns_already_exists() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.categories
            .create_category(NewCategory {
                uuid: Uuid::now_v7(),
                name: "Snacks".to_string(),
                image: None,
            })
            .await?;

        let result = ctx
            .categories
            .create_category(NewCategory {
                uuid: Uuid::now_v7(),
                name: "Snacks".to_string(),
                image: None,
            })
            .await;

        assert!(
            matches!(result, Err(CategoriesServiceError::AlreadyExists)),
            "expected AlreadyExists, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn create_category_rejects_one_char_name() {
        let ctx = TestContext::new().await;

        let result = ctx
            .categories
            .create_category(NewCategory {
                uuid: Uuid::now_v7(),
                name: "A".to_string(),
                image: None,
            })
            .await;

        assert!(
            matches!(result, Err(CategoriesServiceError::InvalidName)),
            "expected InvalidName, got {result:?}"
        );
    }

    #[tokio::test]
    async fn update_category_changes_only_given_fields() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = Uuid::now_v7();

        ctx.categories
            .create_category(NewCategory {
                uuid,
                name: "Snacks".to_string(),
                image: Some("snacks.png".to_string()),
            })
            .await?;

        let updated = ctx
            .categories
            .update_category(
                uuid,
                CategoryUpdate {
                    name: Some("Sweets".to_string()),
                    image: None,
                },
            )
            .await?;

        assert_eq!(updated.name, "Sweets");
        assert_eq!(updated.image.as_deref(), Some("snacks.png"));

        Ok(())
    }

    #[tokio::test]
    async fn delete_category_unknown_uuid_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.categories.delete_category(Uuid::now_v7()).await;

        assert!(
            matches!(result, Err(CategoriesServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn list_categories_is_name_ordered() -> TestResult {
        let ctx = TestContext::new().await;

        for name in ["Snacks", "Drinks", "Produce"] {
            ctx.categories
                .create_category(NewCategory {
                    uuid: Uuid::now_v7(),
                    name: name.to_string(),
                    image: None,
                })
                .await?;
        }

        let names: Vec<String> = ctx
            .categories
            .list_categories()
            .await?
            .into_iter()
            .map(|category| category.name)
            .collect();

        assert_eq!(names, ["Drinks", "Produce", "Snacks"]);

        Ok(())
    }
}

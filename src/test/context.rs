//! Shared service test context.

use std::sync::Arc;

use sqlx::query;
use uuid::Uuid;

use crate::{
    database::Db,
    domain::{
        carts::PgCartsService,
        categories::{CategoriesService, CategoriesServiceError, PgCategoriesService, models::NewCategory},
        orders::{ClearCartHook, PgOrdersService},
        products::{PgProductsService, ProductsService, ProductsServiceError, models::NewProduct},
        settings::PgSettingsService,
    },
    test::TestDb,
};

/// One fresh database plus fully wired services.
///
/// `orders` carries only the cart-clearing hook; tests that exercise
/// notification hooks build their own `PgOrdersService` with mocks.
pub struct TestContext {
    pub db: Db,
    pub categories: PgCategoriesService,
    pub products: PgProductsService,
    pub carts: PgCartsService,
    pub orders: PgOrdersService,
    pub settings: PgSettingsService,
    _test_db: TestDb,
}

impl TestContext {
    pub async fn new() -> Self {
        let test_db = TestDb::new().await;
        let db = Db::new(test_db.pool.clone());

        let carts = PgCartsService::new(db.clone());
        let products = PgProductsService::new(db.clone());

        let orders = PgOrdersService::new(
            db.clone(),
            Arc::new(carts.clone()),
            Arc::new(products.clone()),
            vec![Arc::new(ClearCartHook::new(Arc::new(carts.clone())))],
        );

        Self {
            categories: PgCategoriesService::new(db.clone()),
            products,
            carts,
            orders,
            settings: PgSettingsService::new(db.clone()),
            db,
            _test_db: test_db,
        }
    }

    /// Insert a user row directly; auth flows have their own tests.
    pub async fn create_user(&self, username: &str) -> Uuid {
        let uuid = Uuid::now_v7();
        let email = format!("{username}-{}@example.com", uuid.simple());

        query("INSERT INTO users (uuid, username, email, role) VALUES ($1, $2, $3, 'user')")
            .bind(uuid)
            .bind(username)
            .bind(email)
            .execute(self.db.pool())
            .await
            .expect("Failed to insert test user");

        uuid
    }

    pub async fn create_category(&self, name: &str) -> Result<Uuid, CategoriesServiceError> {
        let category = self
            .categories
            .create_category(NewCategory {
                uuid: Uuid::now_v7(),
                name: name.to_string(),
                image: None,
            })
            .await?;

        Ok(category.uuid)
    }

    /// Create a product with explicit pricing and stock fields.
    pub async fn create_product_full(
        &self,
        category: Uuid,
        name: &str,
        price: u64,
        discount_price: Option<u64>,
        discount_active: bool,
        stock: Option<u64>,
    ) -> Result<Uuid, ProductsServiceError> {
        let product = self
            .products
            .create_product(NewProduct {
                uuid: Uuid::now_v7(),
                name: name.to_string(),
                description: None,
                image: None,
                weight_grams: None,
                category_uuid: category,
                price,
                discount_price,
                discount_active,
                stock,
            })
            .await?;

        Ok(product.uuid)
    }
}

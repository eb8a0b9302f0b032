//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    database::Db,
    domain::carts::{errors::CartsServiceError, models::Cart, repository::PgCartsRepository},
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    repository: PgCartsRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCartsRepository::new(),
        }
    }

    async fn load_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: Uuid,
    ) -> Result<Cart, CartsServiceError> {
        let mut cart = self.repository.get_cart(tx, user).await?;

        cart.items = self.repository.get_cart_items(tx, user).await?;

        Ok(cart)
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, user: Uuid) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn add_item(
        &self,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        self.repository.upsert_cart(&mut tx, user).await?;

        let inserted = self
            .repository
            .add_cart_item(&mut tx, user, product, quantity)
            .await?;

        if inserted.is_none() {
            return Err(CartsServiceError::NotFound);
        }

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn update_item_quantity(
        &self,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .update_item_quantity(&mut tx, user, product, quantity)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn remove_item(&self, user: Uuid, product: Uuid) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .remove_cart_item(&mut tx, user, product)
            .await?;

        if rows_affected == 0 {
            return Err(CartsServiceError::NotFound);
        }

        let cart = self.load_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(cart)
    }

    async fn clear_cart(&self, user: Uuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.clear_cart(&mut tx, user).await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart with resolved item snapshots.
    async fn get_cart(&self, user: Uuid) -> Result<Cart, CartsServiceError>;

    /// Add `quantity` of a product, creating the cart on first use.
    /// Adding a product already in the cart accumulates its quantity; the
    /// price snapshot is taken on first add.
    async fn add_item(
        &self,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError>;

    /// Set the quantity of an existing cart item.
    async fn update_item_quantity(
        &self,
        user: Uuid,
        product: Uuid,
        quantity: u32,
    ) -> Result<Cart, CartsServiceError>;

    /// Remove a product from the cart.
    async fn remove_item(&self, user: Uuid, product: Uuid) -> Result<Cart, CartsServiceError>;

    /// Empty the cart's items, keeping the cart itself.
    async fn clear_cart(&self, user: Uuid) -> Result<(), CartsServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;
    use uuid::Uuid;

    use crate::test::TestContext;

    use super::*;

    #[tokio::test]
    async fn get_cart_before_first_add_returns_not_found() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;

        let result = ctx.carts.get_cart(user).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_item_creates_cart_and_snapshots_price() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        let cart = ctx.carts.add_item(user, product, 2).await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_uuid, product);
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.items[0].price_at_add, 10_00);
        assert_eq!(cart.subtotal(), 20_00);

        Ok(())
    }

    #[tokio::test]
    async fn add_item_snapshots_discounted_price() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 100_00, Some(80_00), true, None)
            .await?;

        let cart = ctx.carts.add_item(user, product, 1).await?;

        assert_eq!(cart.items[0].price_at_add, 80_00);

        Ok(())
    }

    #[tokio::test]
    async fn adding_same_product_accumulates_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        ctx.carts.add_item(user, product, 2).await?;
        let cart = ctx.carts.add_item(user, product, 3).await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);

        Ok(())
    }

    #[tokio::test]
    async fn add_item_unknown_product_returns_not_found() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;

        let result = ctx.carts.add_item(user, Uuid::now_v7(), 1).await;

        assert!(
            matches!(result, Err(CartsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn add_item_zero_quantity_is_rejected() {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;

        let result = ctx.carts.add_item(user, Uuid::now_v7(), 0).await;

        assert!(
            matches!(result, Err(CartsServiceError::InvalidQuantity)),
            "expected InvalidQuantity, got {result:?}"
        );
    }

    #[tokio::test]
    async fn update_item_quantity_replaces_quantity() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        ctx.carts.add_item(user, product, 2).await?;
        let cart = ctx.carts.update_item_quantity(user, product, 7).await?;

        assert_eq!(cart.items[0].quantity, 7);

        Ok(())
    }

    #[tokio::test]
    async fn remove_item_then_cart_is_empty() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        ctx.carts.add_item(user, product, 2).await?;
        let cart = ctx.carts.remove_item(user, product).await?;

        assert!(cart.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn clear_cart_keeps_the_cart_row() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Dates", 10_00, None, false, None)
            .await?;

        ctx.carts.add_item(user, product, 2).await?;
        ctx.carts.clear_cart(user).await?;

        let cart = ctx.carts.get_cart(user).await?;

        assert!(cart.items.is_empty(), "items gone, cart still readable");

        Ok(())
    }

    #[tokio::test]
    async fn items_resolve_live_stock_snapshot() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let tracked = ctx
            .create_product_full(category, "Dates", 10_00, None, false, Some(9))
            .await?;
        let untracked = ctx
            .create_product_full(category, "Honey", 20_00, None, false, None)
            .await?;

        ctx.carts.add_item(user, tracked, 1).await?;
        let cart = ctx.carts.add_item(user, untracked, 1).await?;

        let stock_by_product: Vec<(Uuid, Option<u64>)> = cart
            .items
            .iter()
            .map(|item| (item.product_uuid, item.product_stock))
            .collect();

        assert!(stock_by_product.contains(&(tracked, Some(9))));
        assert!(stock_by_product.contains(&(untracked, None)));

        Ok(())
    }
}

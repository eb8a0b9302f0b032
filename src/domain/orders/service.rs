//! Orders service.
//!
//! `place_order` is the one multi-step write in the system. The order
//! row is committed as `pending` before any stock moves, reservations
//! run as independently durable conditional decrements, and a [`Saga`]
//! records the matching restore for each one. Confirmation is the
//! commit point; everything after it is a best-effort hook.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    database::Db,
    domain::{
        carts::{CartsService, CartsServiceError, models::Cart},
        orders::{
            errors::OrdersServiceError,
            hooks::OrderPlacedHook,
            models::{NewOrder, Order, OrderItem, OrderStatus},
            repository::PgOrdersRepository,
            saga::{RestoreStock, Saga},
        },
        products::ProductsService,
    },
};

pub struct PgOrdersService {
    db: Db,
    repository: PgOrdersRepository,
    carts: Arc<dyn CartsService>,
    products: Arc<dyn ProductsService>,
    hooks: Vec<Arc<dyn OrderPlacedHook>>,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(
        db: Db,
        carts: Arc<dyn CartsService>,
        products: Arc<dyn ProductsService>,
        hooks: Vec<Arc<dyn OrderPlacedHook>>,
    ) -> Self {
        Self {
            db,
            repository: PgOrdersRepository::new(),
            carts,
            products,
            hooks,
        }
    }

    /// Reserve stock for every tracked line, recording a restore on the
    /// saga after each success. Untracked lines are exempt.
    async fn reserve_items(
        &self,
        cart: &Cart,
        saga: &mut Saga,
    ) -> Result<(), OrdersServiceError> {
        for item in &cart.items {
            if item.product_stock.is_none() {
                continue;
            }

            let reserved = self
                .products
                .reserve_stock(item.product_uuid, item.quantity)
                .await?;

            if !reserved {
                return Err(OrdersServiceError::InsufficientStock {
                    product: item.product_uuid,
                });
            }

            saga.push(Box::new(RestoreStock {
                products: Arc::clone(&self.products),
                product: item.product_uuid,
                quantity: item.quantity,
            }));
        }

        Ok(())
    }

    async fn set_status(
        &self,
        order: Uuid,
        status: OrderStatus,
    ) -> Result<(), OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        self.repository.set_order_status(&mut tx, order, status).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Unwind `saga` and park the order in `cancelled`. The original
    /// error is what the caller must see, so a failed status write is
    /// only logged.
    async fn roll_back(&self, order: Uuid, saga: Saga) {
        let failed = saga.unwind().await;

        if failed > 0 {
            warn!(order_uuid = %order, failed, "rollback left unrestored reservations");
        }

        if let Err(error) = self.set_status(order, OrderStatus::Cancelled).await {
            warn!(order_uuid = %order, %error, "failed to mark order cancelled after rollback");
        }
    }

    async fn run_hooks(&self, order: &Order) {
        for hook in &self.hooks {
            if let Err(error) = hook.on_order_placed(order).await {
                warn!(
                    order_uuid = %order.uuid,
                    hook = hook.name(),
                    %error,
                    "post-commit hook failed"
                );
            }
        }
    }

    async fn fetch_order(&self, order: Uuid) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn place_order(
        &self,
        user: Uuid,
        address: &str,
        phone: &str,
    ) -> Result<Order, OrdersServiceError> {
        let address = address.trim();
        let phone = phone.trim();

        if address.is_empty() {
            return Err(OrdersServiceError::InvalidInput("address is required"));
        }

        if phone.is_empty() {
            return Err(OrdersServiceError::InvalidInput("phone is required"));
        }

        // A user who never added an item has no cart row at all; that is
        // the same empty-cart case to a buyer.
        let cart = match self.carts.get_cart(user).await {
            Ok(cart) => cart,
            Err(CartsServiceError::NotFound) => return Err(OrdersServiceError::EmptyCart),
            Err(error) => return Err(error.into()),
        };

        if cart.items.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        let order_uuid = Uuid::now_v7();

        let new_order = NewOrder {
            uuid: order_uuid,
            user_uuid: user,
            total: cart.subtotal(),
            address: address.to_string(),
            phone: phone.to_string(),
            status: OrderStatus::Pending,
            items: cart
                .items
                .iter()
                .map(|item| OrderItem {
                    uuid: Uuid::now_v7(),
                    product_uuid: item.product_uuid,
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    price_at_order: item.price_at_add,
                })
                .collect(),
        };

        // Commit the pending order on its own, so a failure later still
        // leaves an auditable trace.
        let mut tx = self.db.begin().await?;
        self.repository.create_order(&mut tx, &new_order).await?;
        tx.commit().await?;

        let mut saga = Saga::new();

        if let Err(error) = self.reserve_items(&cart, &mut saga).await {
            info!(order_uuid = %order_uuid, %error, "reservation failed, rolling back");
            self.roll_back(order_uuid, saga).await;

            return Err(error);
        }

        // Commit point: the order is confirmed and the reservations stand.
        match self.set_status(order_uuid, OrderStatus::Confirmed).await {
            Ok(()) => saga.complete(),
            Err(error) => {
                self.roll_back(order_uuid, saga).await;

                return Err(error);
            }
        }

        let order = self.fetch_order(order_uuid).await?;

        self.run_hooks(&order).await;

        Ok(order)
    }

    async fn get_order(&self, order: Uuid) -> Result<Order, OrdersServiceError> {
        self.fetch_order(order).await
    }

    async fn orders_for_user(&self, user: Uuid) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.repository.list_orders_by_user(&mut tx, user).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let orders = self.repository.list_orders(&mut tx).await?;

        tx.commit().await?;

        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order: Uuid,
        status: OrderStatus,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self
            .repository
            .set_order_status(&mut tx, order, status)
            .await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        let order = self.repository.get_order(&mut tx, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn delete_order(&self, order: Uuid) -> Result<(), OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_order(&mut tx, order).await?;

        if rows_affected == 0 {
            return Err(OrdersServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Place an order from the user's cart. See the module docs for the
    /// reservation and compensation contract.
    async fn place_order(
        &self,
        user: Uuid,
        address: &str,
        phone: &str,
    ) -> Result<Order, OrdersServiceError>;

    /// Fetch one order with its lines.
    async fn get_order(&self, order: Uuid) -> Result<Order, OrdersServiceError>;

    /// All orders placed by `user`, newest first.
    async fn orders_for_user(&self, user: Uuid) -> Result<Vec<Order>, OrdersServiceError>;

    /// All orders, newest first. Back-office listing.
    async fn list_orders(&self) -> Result<Vec<Order>, OrdersServiceError>;

    /// Move an order to `status`. Back-office transition.
    async fn update_order_status(
        &self,
        order: Uuid,
        status: OrderStatus,
    ) -> Result<Order, OrdersServiceError>;

    /// Remove an order and its lines. Back-office cleanup.
    async fn delete_order(&self, order: Uuid) -> Result<(), OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;
    use crate::{
        auth::{MockAuthService, User, UserRole},
        domain::orders::hooks::{ClearCartHook, NotifyHook},
        notifications::{MockChatNotifier, MockMailer, NotificationError},
        test::TestContext,
    };

    #[tokio::test]
    async fn place_order_confirms_totals_and_clears_the_cart() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;

        ctx.carts.add_item(user, product, 2).await?;

        let order = ctx.orders.place_order(user, "1 Test Lane", "+155500").await?;

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.total, 2000);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        assert_eq!(order.items[0].price_at_order, 1000);
        assert_eq!(
            order.total,
            order
                .items
                .iter()
                .map(|item| u64::from(item.quantity) * item.price_at_order)
                .sum::<u64>()
        );

        let stock = ctx.products.get_product(product).await?.stock;
        assert_eq!(stock, Some(3));

        let cart = ctx.carts.get_cart(user).await?;
        assert!(cart.items.is_empty(), "cart must be emptied on confirm");

        Ok(())
    }

    #[tokio::test]
    async fn insufficient_stock_cancels_and_leaves_everything_intact() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;

        ctx.carts.add_item(user, product, 10).await?;

        let result = ctx.orders.place_order(user, "1 Test Lane", "+155500").await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::InsufficientStock { product: failed }) if failed == product
            ),
            "expected InsufficientStock, got {result:?}"
        );

        let stock = ctx.products.get_product(product).await?.stock;
        assert_eq!(stock, Some(5), "stock must be untouched");

        let orders = ctx.orders.orders_for_user(user).await?;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Cancelled);

        let cart = ctx.carts.get_cart(user).await?;
        assert_eq!(cart.items.len(), 1, "cart must survive a failed placement");

        Ok(())
    }

    #[tokio::test]
    async fn partial_reservation_is_rolled_back_exactly() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let covered = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;
        let scarce = ctx
            .create_product_full(category, "Dip", 500, None, false, Some(1))
            .await?;

        ctx.carts.add_item(user, covered, 2).await?;
        ctx.carts.add_item(user, scarce, 3).await?;

        let result = ctx.orders.place_order(user, "1 Test Lane", "+155500").await;

        assert!(
            matches!(result, Err(OrdersServiceError::InsufficientStock { .. })),
            "expected InsufficientStock, got {result:?}"
        );

        // The successful reservation for the first product was compensated.
        assert_eq!(ctx.products.get_product(covered).await?.stock, Some(5));
        assert_eq!(ctx.products.get_product(scarce).await?.stock, Some(1));

        let orders = ctx.orders.orders_for_user(user).await?;
        assert_eq!(orders[0].status, OrderStatus::Cancelled);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_creating_an_order() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;

        let result = ctx.orders.place_order(user, "1 Test Lane", "+155500").await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );

        let orders = ctx.orders.orders_for_user(user).await?;
        assert!(orders.is_empty(), "no order row may be written");

        Ok(())
    }

    #[tokio::test]
    async fn blank_address_or_phone_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;

        let no_address = ctx.orders.place_order(user, "  ", "+155500").await;

        assert!(
            matches!(no_address, Err(OrdersServiceError::InvalidInput(_))),
            "expected InvalidInput, got {no_address:?}"
        );

        let no_phone = ctx.orders.place_order(user, "1 Test Lane", "").await;

        assert!(
            matches!(no_phone, Err(OrdersServiceError::InvalidInput(_))),
            "expected InvalidInput, got {no_phone:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn untracked_stock_is_exempt_from_reservation() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let tracked = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;
        let untracked = ctx
            .create_product_full(category, "Gift Wrap", 200, None, false, None)
            .await?;

        ctx.carts.add_item(user, tracked, 2).await?;
        ctx.carts.add_item(user, untracked, 4).await?;

        let order = ctx.orders.place_order(user, "1 Test Lane", "+155500").await?;

        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(ctx.products.get_product(tracked).await?.stock, Some(3));
        assert_eq!(ctx.products.get_product(untracked).await?.stock, None);

        Ok(())
    }

    fn confirmed_user(user: Uuid) -> User {
        let now = jiff::Timestamp::now();

        User {
            uuid: user,
            username: "shopper".to_string(),
            email: Some("shopper@example.com".to_string()),
            phone: None,
            google_id: None,
            avatar: None,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn notification_failure_leaves_the_order_confirmed() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;

        ctx.carts.add_item(user, product, 1).await?;

        let mut auth = MockAuthService::new();
        auth.expect_profile()
            .returning(move |uuid| Ok(confirmed_user(uuid)));

        let mut mailer = MockMailer::new();
        mailer.expect_send_order_confirmation().returning(|_, _| {
            Err(NotificationError::UnexpectedResponse(
                "mail provider down".to_string(),
            ))
        });

        let orders = PgOrdersService::new(
            ctx.db.clone(),
            Arc::new(ctx.carts.clone()),
            Arc::new(ctx.products.clone()),
            vec![
                Arc::new(ClearCartHook::new(Arc::new(ctx.carts.clone()))),
                Arc::new(NotifyHook::new(
                    Arc::new(auth),
                    Arc::new(ctx.settings.clone()),
                    Arc::new(mailer),
                    Arc::new(MockChatNotifier::new()),
                )),
            ],
        );

        let order = orders.place_order(user, "1 Test Lane", "+155500").await?;

        assert_eq!(order.status, OrderStatus::Confirmed);

        let cart = ctx.carts.get_cart(user).await?;
        assert!(cart.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn back_office_status_transitions_and_deletion() -> TestResult {
        let ctx = TestContext::new().await;
        let user = ctx.create_user("shopper").await;
        let category = ctx.create_category("Snacks").await?;
        let product = ctx
            .create_product_full(category, "Crisps", 1000, None, false, Some(5))
            .await?;

        ctx.carts.add_item(user, product, 1).await?;

        let placed = ctx.orders.place_order(user, "1 Test Lane", "+155500").await?;

        let shipped = ctx
            .orders
            .update_order_status(placed.uuid, OrderStatus::Shipped)
            .await?;
        assert_eq!(shipped.status, OrderStatus::Shipped);

        ctx.orders.delete_order(placed.uuid).await?;

        let result = ctx.orders.get_order(placed.uuid).await;
        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );

        let missing = ctx.orders.delete_order(placed.uuid).await;
        assert!(
            matches!(missing, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {missing:?}"
        );

        Ok(())
    }
}

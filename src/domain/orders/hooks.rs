//! Post-commit hooks for placed orders.
//!
//! Hooks run after an order reaches `confirmed`, in registration order.
//! The orchestrator logs and swallows every hook failure: by the time a
//! hook runs, the order's outcome is settled.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    auth::{AuthService, AuthServiceError, User},
    domain::{
        carts::{CartsService, CartsServiceError},
        orders::models::Order,
        settings::{SettingsService, SettingsServiceError},
    },
    notifications::{ChatNotifier, Mailer, NotificationError, OrderDetails, OrderLine},
};

/// A side effect to run once an order is confirmed.
#[async_trait]
pub trait OrderPlacedHook: Send + Sync {
    /// Short label used when a failed hook is logged.
    fn name(&self) -> &'static str;

    /// React to `order` having reached `confirmed`.
    async fn on_order_placed(&self, order: &Order) -> Result<(), OrderHookError>;
}

/// Errors surfaced by hooks; always logged, never propagated.
#[derive(Debug, Error)]
pub enum OrderHookError {
    #[error("cart error")]
    Carts(#[from] CartsServiceError),

    #[error("user lookup error")]
    Auth(#[from] AuthServiceError),

    #[error("settings error")]
    Settings(#[from] SettingsServiceError),

    #[error("notification error")]
    Notification(#[from] NotificationError),
}

/// Empties the buyer's cart. Runs post-commit, so the cart survives
/// intact on every failed placement.
pub struct ClearCartHook {
    carts: Arc<dyn CartsService>,
}

impl ClearCartHook {
    #[must_use]
    pub fn new(carts: Arc<dyn CartsService>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl OrderPlacedHook for ClearCartHook {
    fn name(&self) -> &'static str {
        "clear-cart"
    }

    async fn on_order_placed(&self, order: &Order) -> Result<(), OrderHookError> {
        self.carts.clear_cart(order.user_uuid).await?;

        Ok(())
    }
}

/// Dispatches the confirmation email and the staff chat alert. Both
/// channels are attempted even if the first fails; the first error is
/// reported.
pub struct NotifyHook {
    auth: Arc<dyn AuthService>,
    settings: Arc<dyn SettingsService>,
    mailer: Arc<dyn Mailer>,
    chat: Arc<dyn ChatNotifier>,
}

impl NotifyHook {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthService>,
        settings: Arc<dyn SettingsService>,
        mailer: Arc<dyn Mailer>,
        chat: Arc<dyn ChatNotifier>,
    ) -> Self {
        Self {
            auth,
            settings,
            mailer,
            chat,
        }
    }
}

#[async_trait]
impl OrderPlacedHook for NotifyHook {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn on_order_placed(&self, order: &Order) -> Result<(), OrderHookError> {
        let user = self.auth.profile(order.user_uuid).await?;
        let details = order_details(order, &user);

        let mut first_error = None;

        if let Some(email) = user.email.as_deref() {
            if let Err(error) = self.mailer.send_order_confirmation(email, &details).await {
                first_error = Some(OrderHookError::from(error));
            }
        }

        match self.settings.get_settings().await {
            Ok(settings) => {
                if let Some(chat_id) = settings.telegram_chat_id.as_deref() {
                    if let Err(error) = self.chat.send_order_notification(chat_id, &details).await {
                        first_error.get_or_insert(OrderHookError::from(error));
                    }
                }
            }
            Err(error) => {
                first_error.get_or_insert(OrderHookError::from(error));
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn order_details(order: &Order, user: &User) -> OrderDetails {
    OrderDetails {
        order_uuid: order.uuid,
        customer_name: user.username.clone(),
        address: order.address.clone(),
        phone: order.phone.clone(),
        total: order.total,
        status: order.status.to_string(),
        items: order
            .items
            .iter()
            .map(|item| OrderLine {
                name: item.name.clone(),
                quantity: item.quantity,
                price_at_order: item.price_at_order,
            })
            .collect(),
    }
}

//! Best-effort order notifications (email and chat).
//!
//! Senders are trait seams so the order orchestrator can be exercised
//! without any outbound traffic; failures here never affect an order's
//! outcome.

pub mod mailer;
pub mod telegram;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use mailer::{MailApiClient, MailApiConfig, Mailer, MockMailer};
pub use telegram::{ChatNotifier, MockChatNotifier, TelegramClient, TelegramConfig};

/// Snapshot of a placed order, shaped for human-facing messages.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order_uuid: Uuid,
    pub customer_name: String,
    pub address: String,
    pub phone: String,
    pub total: u64,
    pub status: String,
    pub items: Vec<OrderLine>,
}

/// One line of an order confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub name: String,
    pub quantity: u32,
    pub price_at_order: u64,
}

/// Errors from notification delivery. Always caught by the dispatching
/// hook; never surfaced to the order's caller.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider returned a non-2xx response or unexpected body.
    #[error("unexpected response from notification provider: {0}")]
    UnexpectedResponse(String),
}

/// Render minor units as a decimal amount, e.g. `1250` → `"12.50"`.
pub(crate) fn format_amount(minor_units: u64) -> String {
    format!("{}.{:02}", minor_units / 100, minor_units % 100)
}

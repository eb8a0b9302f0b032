//! Telegram notifications for back-office staff.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;

use super::{NotificationError, OrderDetails, format_amount};

/// Pushes order alerts to a staff chat.
#[automock]
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    /// Announce a newly placed order in `chat_id`.
    ///
    /// # Errors
    ///
    /// Returns an error on HTTP failure or a non-2xx provider response.
    async fn send_order_notification(
        &self,
        chat_id: &str,
        details: &OrderDetails,
    ) -> Result<(), NotificationError>;
}

/// Configuration for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API base, normally `"https://api.telegram.org"`.
    pub api_base: String,

    /// Bot token issued by BotFather.
    pub bot_token: String,
}

/// HTTP client for the Telegram `sendMessage` endpoint.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    config: TelegramConfig,
    http: Client,
}

impl TelegramClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn render_alert(details: &OrderDetails) -> String {
        let mut text = format!(
            "New order {}\nCustomer: {}\nPhone: {}\nAddress: {}\n",
            details.order_uuid, details.customer_name, details.phone, details.address,
        );

        for item in &details.items {
            text.push_str(&format!(
                "- {} x{} @ {}\n",
                item.name,
                item.quantity,
                format_amount(item.price_at_order),
            ));
        }

        text.push_str(&format!("Total: {}", format_amount(details.total)));
        text
    }
}

#[async_trait]
impl ChatNotifier for TelegramClient {
    async fn send_order_notification(
        &self,
        chat_id: &str,
        details: &OrderDetails,
    ) -> Result<(), NotificationError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        );

        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": Self::render_alert(details),
        });

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(NotificationError::UnexpectedResponse(format!(
                "sendMessage failed with status {status}: {text}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::notifications::OrderLine;

    #[test]
    fn alert_lists_every_line() {
        let details = OrderDetails {
            order_uuid: Uuid::now_v7(),
            customer_name: "Grace".to_string(),
            address: "2 Harbour Way".to_string(),
            phone: "+1000000001".to_string(),
            total: 700,
            status: "confirmed".to_string(),
            items: vec![
                OrderLine {
                    name: "Sencha".to_string(),
                    quantity: 1,
                    price_at_order: 500,
                },
                OrderLine {
                    name: "Matcha".to_string(),
                    quantity: 2,
                    price_at_order: 100,
                },
            ],
        };

        let text = TelegramClient::render_alert(&details);

        assert!(text.contains("Sencha x1 @ 5.00"));
        assert!(text.contains("Matcha x2 @ 1.00"));
        assert!(text.contains("Total: 7.00"));
    }
}

//! Transactional email delivery via an HTTP mail API.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;

use super::{NotificationError, OrderDetails, format_amount};

/// Sends order-related email to customers.
#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an order confirmation to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error on HTTP failure or a non-2xx provider response.
    async fn send_order_confirmation(
        &self,
        to: &str,
        details: &OrderDetails,
    ) -> Result<(), NotificationError>;
}

/// Configuration for the HTTP mail provider.
#[derive(Debug, Clone)]
pub struct MailApiConfig {
    /// Provider send endpoint, e.g. `"https://api.mail.example/v1/send"`.
    pub endpoint: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Sender address placed in the `from` field.
    pub sender: String,
}

/// HTTP client for a JSON mail-send API.
#[derive(Debug, Clone)]
pub struct MailApiClient {
    config: MailApiConfig,
    http: Client,
}

impl MailApiClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: MailApiConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn render_confirmation(details: &OrderDetails) -> String {
        let mut lines = String::new();

        for item in &details.items {
            lines.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                item.name,
                item.quantity,
                format_amount(item.price_at_order),
            ));
        }

        format!(
            "<h1>Thank you for your order, {}!</h1>\
             <p>Order reference: {}</p>\
             <table><tr><th>Item</th><th>Qty</th><th>Price</th></tr>{lines}</table>\
             <p>Total: {}</p>\
             <p>Delivery address: {}</p>",
            details.customer_name,
            details.order_uuid,
            format_amount(details.total),
            details.address,
        )
    }
}

#[async_trait]
impl Mailer for MailApiClient {
    async fn send_order_confirmation(
        &self,
        to: &str,
        details: &OrderDetails,
    ) -> Result<(), NotificationError> {
        let body = serde_json::json!({
            "from": self.config.sender,
            "to": to,
            "subject": format!("Order confirmation {}", details.order_uuid),
            "html": Self::render_confirmation(details),
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(NotificationError::UnexpectedResponse(format!(
                "mail send failed with status {status}: {text}"
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
    fn confirmation_includes_items_and_total() {
        let details = OrderDetails {
            order_uuid: Uuid::now_v7(),
            customer_name: "Ada".to_string(),
            address: "1 Test Lane".to_string(),
            phone: "+1000000000".to_string(),
            total: 2598,
            status: "confirmed".to_string(),
            items: vec![OrderLine {
                name: "Earl Grey".to_string(),
                quantity: 2,
                price_at_order: 1299,
            }],
        };

        let html = MailApiClient::render_confirmation(&details);

        assert!(html.contains("Ada"));
        assert!(html.contains("Earl Grey"));
        assert!(html.contains("12.99"));
        assert!(html.contains("25.98"));
        assert!(html.contains("1 Test Lane"));
    }
}

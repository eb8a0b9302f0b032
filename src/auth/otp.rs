//! One-time verification codes for phone sign-in.

use async_trait::async_trait;
use mockall::automock;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of digits in a verification code.
pub const OTP_CODE_DIGITS: u32 = 6;

/// Lifetime of a challenge, in minutes.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Verification attempts allowed before a challenge burns.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

/// Delivers verification codes to phones.
#[automock]
#[async_trait]
pub trait OtpSender: Send + Sync {
    /// Deliver `code` to `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error on HTTP failure or a non-2xx provider response.
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), OtpSendError>;
}

/// Generate a random zero-padded numeric code.
#[must_use]
pub fn generate_otp_code() -> String {
    let bound = 10_u32.pow(OTP_CODE_DIGITS);
    let code = rand::thread_rng().gen_range(0..bound);

    format!("{code:0width$}", width = OTP_CODE_DIGITS as usize)
}

/// Compute the stored digest for a code, bound to the phone it was
/// issued for.
#[must_use]
pub fn hash_otp_code(phone: &str, code: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";

    let digest = Sha256::new()
        .chain_update(phone.as_bytes())
        .chain_update(b":")
        .chain_update(code.as_bytes())
        .finalize();

    let mut encoded = String::with_capacity(digest.len() * 2);

    for byte in digest {
        encoded.push(HEX[(byte >> 4) as usize] as char);
        encoded.push(HEX[(byte & 0x0f) as usize] as char);
    }

    encoded
}

/// Configuration for an SMS gateway.
#[derive(Debug, Clone)]
pub struct SmsGatewayConfig {
    /// Gateway send endpoint.
    pub endpoint: String,

    /// API key sent as a bearer token.
    pub api_key: String,

    /// Sender name or number.
    pub sender: String,
}

/// HTTP client for a JSON SMS gateway.
#[derive(Debug, Clone)]
pub struct SmsGatewayClient {
    config: SmsGatewayConfig,
    http: Client,
}

impl SmsGatewayClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: SmsGatewayConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl OtpSender for SmsGatewayClient {
    async fn send_code(&self, phone: &str, code: &str) -> Result<(), OtpSendError> {
        let body = serde_json::json!({
            "from": self.config.sender,
            "to": phone,
            "text": format!("Your verification code is {code}"),
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

            return Err(OtpSendError::UnexpectedResponse(format!(
                "sms send failed with status {status}: {text}"
            )));
        }

        Ok(())
    }
}

/// Errors that can occur when dispatching a verification code.
#[derive(Debug, Error)]
pub enum OtpSendError {
    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned a non-2xx response or unexpected body.
    #[error("unexpected response from sms gateway: {0}")]
    UnexpectedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_fixed_width() {
        for _ in 0..64 {
            let code = generate_otp_code();

            assert_eq!(code.len(), OTP_CODE_DIGITS as usize);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn hash_binds_code_to_phone() {
        let hash_a = hash_otp_code("+1000000000", "123456");
        let hash_b = hash_otp_code("+1000000001", "123456");

        assert_ne!(hash_a, hash_b);
        assert_eq!(hash_a, hash_otp_code("+1000000000", "123456"));
    }
}

//! Google ID token verification via the tokeninfo endpoint.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::models::GoogleClaims;

/// Verifies Google ID tokens and extracts identity claims.
#[automock]
#[async_trait]
pub trait GoogleTokenVerifier: Send + Sync {
    /// Verify `id_token` and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleVerifyError::Rejected`] for invalid, expired, or
    /// wrong-audience tokens, and transport errors otherwise.
    async fn verify(&self, id_token: &str) -> Result<GoogleClaims, GoogleVerifyError>;
}

/// Configuration for Google tokeninfo verification.
#[derive(Debug, Clone)]
pub struct GoogleVerifierConfig {
    /// Tokeninfo endpoint, normally `"https://oauth2.googleapis.com/tokeninfo"`.
    pub endpoint: String,

    /// OAuth client ID the token's audience must match.
    pub client_id: String,
}

/// HTTP client for the Google tokeninfo endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTokenInfoClient {
    config: GoogleVerifierConfig,
    http: Client,
}

impl GoogleTokenInfoClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: GoogleVerifierConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl GoogleTokenVerifier for GoogleTokenInfoClient {
    async fn verify(&self, id_token: &str) -> Result<GoogleClaims, GoogleVerifyError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        // Google answers 4xx for invalid or expired tokens.
        if response.status().is_client_error() {
            return Err(GoogleVerifyError::Rejected);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(GoogleVerifyError::UnexpectedResponse(format!(
                "tokeninfo request failed with status {status}: {text}"
            )));
        }

        let parsed: TokenInfoResponse = response.json().await?;

        if parsed.aud != self.config.client_id {
            return Err(GoogleVerifyError::Rejected);
        }

        if parsed.email_verified.as_deref() != Some("true") {
            return Err(GoogleVerifyError::Rejected);
        }

        Ok(GoogleClaims {
            subject: parsed.sub,
            email: parsed.email,
            name: parsed.name,
            picture: parsed.picture,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    aud: String,
    sub: String,
    email: String,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Errors that can occur during Google ID token verification.
#[derive(Debug, Error)]
pub enum GoogleVerifyError {
    /// The token is invalid, expired, or issued for another audience.
    #[error("google id token was rejected")]
    Rejected,

    /// An HTTP transport or serialization error occurred.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google returned a non-2xx response or unexpected body.
    #[error("unexpected response from tokeninfo: {0}")]
    UnexpectedResponse(String),
}

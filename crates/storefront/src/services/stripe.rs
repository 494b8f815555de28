//! Stripe tokenization client.
//!
//! Exchanges a one-time client token for a durable card reference plus
//! display metadata. The raw token is consumed by the exchange: it is never
//! logged, never persisted, and never re-sent - a transport retry needs a
//! fresh token from the caller, since the provider may already have burned
//! this one.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;

/// Provider error category whose messages are safe to show end users.
const CARD_ERROR_CATEGORY: &str = "card_error";

/// Errors that can occur when talking to the tokenization provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider was unreachable, timed out, or returned an unreadable
    /// response.
    #[error("provider transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with an error payload.
    #[error("provider error ({category}): {message}")]
    Api {
        /// Provider-assigned category tag.
        category: String,
        /// Human-readable message. Only user-safe for `card_error`.
        message: String,
    },
}

impl ProviderError {
    /// The provider's message, when the provider guarantees it is safe to
    /// show end users (the `card_error` category). Everything else stays
    /// opaque.
    #[must_use]
    pub fn user_safe_message(&self) -> Option<&str> {
        match self {
            Self::Api { category, message } if category == CARD_ERROR_CATEGORY => Some(message),
            _ => None,
        }
    }
}

/// A durable card reference plus display metadata from the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCard {
    /// Durable provider-issued reference; never the raw card number.
    pub reference: String,
    /// Card brand (e.g. "Visa").
    pub brand: String,
    /// Last four digits.
    pub last4: String,
    /// Expiry month (1-12).
    pub exp_month: i16,
    /// Expiry year.
    pub exp_year: i16,
}

/// The token exchange capability consumed by the payment workflow.
#[async_trait]
pub trait TokenizationProvider: Send + Sync {
    /// Exchange a one-time token for a durable card reference.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Api`] for provider-reported rejections,
    /// [`ProviderError::Transport`] when the provider is unreachable.
    async fn exchange_token(
        &self,
        one_time_token: &SecretString,
    ) -> Result<ProviderCard, ProviderError>;
}

/// HTTP client for the Stripe API.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    /// Create a new client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl TokenizationProvider for StripeClient {
    async fn exchange_token(
        &self,
        one_time_token: &SecretString,
    ) -> Result<ProviderCard, ProviderError> {
        let url = format!("{}/v1/sources", self.api_base);

        tracing::debug!("exchanging one-time payment token");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key.expose_secret())
            .form(&[("source", one_time_token.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorResponse = response.json().await?;
            return Err(ProviderError::Api {
                category: body.error.error_type,
                message: body.error.message,
            });
        }

        let source: SourceResponse = response.json().await?;
        Ok(ProviderCard {
            reference: source.id,
            brand: source.card.brand,
            last4: source.card.last4,
            exp_month: source.card.exp_month,
            exp_year: source.card.exp_year,
        })
    }
}

/// Error envelope in provider responses.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

/// Source resource from a successful exchange.
#[derive(Debug, Deserialize)]
struct SourceResponse {
    id: String,
    card: CardDetails,
}

#[derive(Debug, Deserialize)]
struct CardDetails {
    brand: String,
    last4: String,
    exp_month: i16,
    exp_year: i16,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_deserializes() {
        let body = r#"{"error": {"type": "card_error", "message": "Your card was declined."}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.error_type, "card_error");
        assert_eq!(parsed.error.message, "Your card was declined.");
    }

    #[test]
    fn test_source_payload_deserializes() {
        let body = r#"{
            "id": "src_1abc",
            "object": "source",
            "card": {"brand": "Visa", "last4": "4242", "exp_month": 8, "exp_year": 2030}
        }"#;
        let parsed: SourceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.id, "src_1abc");
        assert_eq!(parsed.card.brand, "Visa");
        assert_eq!(parsed.card.last4, "4242");
    }

    #[test]
    fn test_only_card_errors_are_user_safe() {
        let card = ProviderError::Api {
            category: "card_error".to_string(),
            message: "Your card was declined.".to_string(),
        };
        assert_eq!(card.user_safe_message(), Some("Your card was declined."));

        let other = ProviderError::Api {
            category: "api_error".to_string(),
            message: "internal key rotation failed at shard 7".to_string(),
        };
        assert_eq!(other.user_safe_message(), None);
    }
}

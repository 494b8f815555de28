//! Unified error handling for the account workflows.
//!
//! Provides a unified `AppError` that the request layer converts into a
//! response. The message policy lives here in one place: causes the user
//! can act on get specific text (the geographic mismatch, a provider card
//! rejection), everything else gets generic text, and internal diagnostics
//! never leak.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::account::AccountError;
use crate::services::addresses::AddressError;
use crate::services::cart::CartError;
use crate::services::email_change::EmailChangeError;
use crate::services::payments::PaymentError;

/// Application-level error type for the account workflows.
#[derive(Debug, Error)]
pub enum AppError {
    /// Address workflow failed.
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Payment workflow failed.
    #[error("payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Email change workflow failed.
    #[error("email change error: {0}")]
    EmailChange(#[from] EmailChangeError),

    /// Profile workflow failed.
    #[error("account error: {0}")]
    Account(#[from] AccountError),

    /// Cart projection failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Database operation failed outside a workflow.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}

impl AppError {
    /// Whether the user can fix this by correcting their input.
    #[must_use]
    pub const fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::Address(
                AddressError::Validation(_) | AddressError::InvalidProvinceCountryPair
            ) | Self::Payment(PaymentError::CardRejected(_) | PaymentError::MissingToken)
                | Self::EmailChange(EmailChangeError::InvalidEmail(_))
        )
    }

    /// The message shown to the end user.
    ///
    /// Specific and actionable when the cause is known, generic otherwise.
    /// Internal diagnostics (database text, provider internals) are never
    /// part of the result.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Address(err) => match err {
                AddressError::Validation(_) => "Some address information was invalid.".to_string(),
                AddressError::InvalidProvinceCountryPair => {
                    "The province or state you selected isn't in the country you selected."
                        .to_string()
                }
                AddressError::NotFound => "That address could not be found.".to_string(),
                AddressError::Repository(_) => {
                    "An unknown error occurred while saving the address.".to_string()
                }
            },
            Self::Payment(err) => match err {
                PaymentError::MissingToken => {
                    "Some credit card information is invalid.".to_string()
                }
                // The provider guarantees card_error messages are user-safe.
                PaymentError::CardRejected(message) => message.clone(),
                PaymentError::ProviderRejected | PaymentError::ServiceUnavailable => {
                    "An error occurred while talking to one of our payment backends. Sorry!"
                        .to_string()
                }
                PaymentError::MemberNotFound => "Please sign in again.".to_string(),
                PaymentError::Repository(_) => {
                    "An unknown error occurred while saving the card.".to_string()
                }
            },
            Self::EmailChange(err) => match err {
                EmailChangeError::InvalidEmail(_) => {
                    "That email address doesn't look valid.".to_string()
                }
                EmailChangeError::MemberNotFound => "Please sign in again.".to_string(),
                EmailChangeError::PersistenceFailure(_)
                | EmailChangeError::NotificationFailure
                | EmailChangeError::SessionInvalidation => {
                    "Your email address was not changed. Please try again.".to_string()
                }
            },
            Self::Account(err) => match err {
                AccountError::MemberNotFound => "Please sign in again.".to_string(),
                AccountError::Repository(_) => {
                    "An unknown error occurred while updating your profile.".to_string()
                }
            },
            Self::Cart(_) | Self::Database(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

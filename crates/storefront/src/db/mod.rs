//! Persistence boundary for the member account subsystem.
//!
//! # Database: `gamehaven`
//!
//! ## Tables
//!
//! - `storefront.member` - Member profiles (name, email, phone, preferences)
//! - `storefront.mailing_address` - Member addresses; `(province_code,
//!   country_code)` is a composite foreign key into `storefront.province`
//! - `storefront.country` / `storefront.province` - Geographic reference
//!   data, read-only from this subsystem; a province code is unique only
//!   within its country
//! - `storefront.stored_payment_method` - Cards on file, keyed by the
//!   provider-issued card reference
//! - `storefront.cart_item` - Read here only for the cart quantity
//!   projection
//!
//! # Error classification
//!
//! The store reports constraint violations generically: a failure code plus
//! diagnostic text. [`classify_write_error`] is the one place that
//! reverse-engineers the cause, turning a foreign-key violation whose
//! diagnostics reference both geographic code columns into
//! [`RepositoryError::ReferenceViolation`] and leaving everything else
//! untyped. Services must never inspect database diagnostics themselves.

pub mod members;
pub mod memory;
pub mod reference;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use gamehaven_core::{AddressId, CountryCode, Email, MemberId, ProvinceCode};

pub use members::PgMemberStore;
pub use memory::{MemoryMemberStore, MemoryReferenceData};
pub use reference::PgReferenceData;

use crate::models::{Country, MailingAddress, Member, ProfileChanges, Province, StoredPaymentMethod};

/// Column names of the composite foreign key from addresses into the
/// province relation. The classification rule matches on both.
const PROVINCE_CODE_COLUMN: &str = "province_code";
const COUNTRY_CODE_COLUMN: &str = "country_code";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Uniqueness violation (e.g. a card reference stored twice).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The `(province_code, country_code)` pair does not exist in the
    /// reference data.
    #[error("province/country reference violation ({constraint})")]
    ReferenceViolation {
        /// Name of the violated constraint, for diagnostics.
        constraint: String,
    },
}

/// Classify a write failure into the typed taxonomy.
///
/// A foreign-key-class violation whose constraint name or diagnostic text
/// references both the province-code and country-code columns means the
/// submitted pair does not exist in the reference data. Unique violations
/// become [`RepositoryError::Conflict`]. Everything else stays a generic
/// [`RepositoryError::Database`] so unrelated failures are never
/// misreported as a geographic mismatch.
pub(crate) fn classify_write_error(err: sqlx::Error) -> RepositoryError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            let diagnostic = format!("{constraint} {}", db_err.message());
            if references_province_country(&diagnostic) {
                return RepositoryError::ReferenceViolation { constraint };
            }
        }
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(db_err.message().to_string());
        }
    }
    RepositoryError::Database(err)
}

/// The column-matching rule behind [`classify_write_error`], kept pure so it
/// can be tested against diagnostic strings without a database.
pub(crate) fn references_province_country(diagnostic: &str) -> bool {
    diagnostic.contains(PROVINCE_CODE_COLUMN) && diagnostic.contains(COUNTRY_CODE_COLUMN)
}

/// Persistence boundary for members and everything they own.
///
/// Each call is one logical unit of work: it either commits fully or leaves
/// the store unchanged. Implementations are not shared transaction objects;
/// every request obtains its own scoped view.
#[async_trait]
pub trait MemberStore: Send + Sync {
    /// Look up a member by id.
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError>;

    /// Apply profile changes to an existing member.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the member does not exist.
    async fn update_profile(
        &self,
        id: MemberId,
        changes: &ProfileChanges,
    ) -> Result<(), RepositoryError>;

    /// Atomically set a member's email and mark it unconfirmed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the member does not exist.
    async fn commit_email_change(
        &self,
        id: MemberId,
        new_email: &Email,
    ) -> Result<(), RepositoryError>;

    /// Restore a member's email and confirmation flag to a prior value.
    /// Compensation path for a failed email change.
    async fn restore_email(
        &self,
        id: MemberId,
        email: &Email,
        confirmed: bool,
    ) -> Result<(), RepositoryError>;

    /// Look up an address by id.
    async fn find_address(&self, id: AddressId) -> Result<Option<MailingAddress>, RepositoryError>;

    /// All addresses owned by a member.
    async fn list_addresses(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<MailingAddress>, RepositoryError>;

    /// Durably store a new address.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ReferenceViolation`] when the geographic
    /// pair does not exist in the reference data.
    async fn insert_address(&self, address: &MailingAddress) -> Result<(), RepositoryError>;

    /// Overwrite an existing address.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the address does not exist,
    /// [`RepositoryError::ReferenceViolation`] on a bad geographic pair.
    async fn update_address(&self, address: &MailingAddress) -> Result<(), RepositoryError>;

    /// All payment methods owned by a member, oldest first.
    async fn list_payment_methods(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<StoredPaymentMethod>, RepositoryError>;

    /// Append a payment method to the member's set.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the card reference is
    /// already stored.
    async fn insert_payment_method(
        &self,
        card: &StoredPaymentMethod,
    ) -> Result<(), RepositoryError>;

    /// Number of items in the member's cart, or `None` when the member does
    /// not exist (so a broken identity lookup is never silently a zero).
    async fn cart_item_count(&self, member_id: MemberId) -> Result<Option<u32>, RepositoryError>;
}

/// Read-only access to the Country/Province reference data.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// All countries, for address form display.
    async fn countries(&self) -> Result<Vec<Country>, RepositoryError>;

    /// All provinces of one country.
    async fn provinces(&self, country: &CountryCode) -> Result<Vec<Province>, RepositoryError>;

    /// Whether the `(province, country)` pair exists.
    async fn province_exists(
        &self,
        province: &ProvinceCode,
        country: &CountryCode,
    ) -> Result<bool, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_matches_composite_fk_constraint_name() {
        assert!(references_province_country(
            "mailing_address_province_code_country_code_fkey \
             insert or update on table \"mailing_address\" violates foreign key constraint"
        ));
    }

    #[test]
    fn test_rule_matches_columns_in_message_text() {
        assert!(references_province_country(
            "Key (province_code, country_code)=(ON, US) is not present in table \"province\"."
        ));
    }

    #[test]
    fn test_rule_ignores_other_fk_violations() {
        // A member FK violation mentions neither geographic column together.
        assert!(!references_province_country(
            "mailing_address_member_id_fkey Key (member_id)=(42) is not present in table \"member\"."
        ));
    }

    #[test]
    fn test_rule_requires_both_columns() {
        assert!(!references_province_country(
            "province_pkey Key (province_code)=(ON) already exists."
        ));
        assert!(!references_province_country(
            "country_pkey Key (country_code)=(CA) already exists."
        ));
    }

    #[test]
    fn test_rule_ignores_unrelated_text() {
        assert!(!references_province_country("deadlock detected"));
        assert!(!references_province_country(""));
    }
}

//! Stored payment method domain type.

use chrono::{DateTime, Utc};

use gamehaven_core::MemberId;

/// A payment card on file.
///
/// Identified by the durable reference issued by the tokenization provider.
/// Holds display metadata only; a raw card number or one-time client token
/// never reaches persistence. Records are append-only: replacing a card
/// means storing a new record.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredPaymentMethod {
    /// Provider-issued durable card reference (identity).
    pub card_reference: String,
    /// The member who owns the card.
    pub member_id: MemberId,
    /// Card brand as reported by the provider (e.g. "Visa").
    pub brand: String,
    /// Last four digits, for display.
    pub last4: String,
    /// Expiry month (1-12).
    pub expiry_month: i16,
    /// Expiry year (four digits).
    pub expiry_year: i16,
    /// When the card was stored.
    pub created_at: DateTime<Utc>,
}

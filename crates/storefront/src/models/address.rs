//! Mailing address and geographic reference types.

use gamehaven_core::{AddressId, CountryCode, MemberId, ProvinceCode};

/// A member's mailing address (billing or shipping).
///
/// The `(province_code, country_code)` pair must exist in the reference
/// data; the store enforces it as a composite foreign key on the province
/// table and reports violations generically.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MailingAddress {
    /// The ID for this address entry.
    pub id: AddressId,
    /// The member whose address this is.
    pub member_id: MemberId,
    /// Street address, including apartment number.
    pub street_address: String,
    /// Optional post office box number.
    pub po_box: Option<String>,
    /// City.
    pub city: String,
    /// Postal or zip code, normalized to the country's canonical format.
    pub postal_code: String,
    /// Province code; unique only within the country.
    pub province_code: ProvinceCode,
    /// Country code.
    pub country_code: CountryCode,
}

/// A country in the reference data. Immutable from this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Country {
    /// Two-letter country code.
    pub code: CountryCode,
    /// Display name.
    pub name: String,
}

/// A province or state in the reference data, keyed by `(code, country_code)`.
/// Immutable from this subsystem.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Province {
    /// Two-letter province code.
    pub code: ProvinceCode,
    /// Country the province belongs to.
    pub country_code: CountryCode,
    /// Display name.
    pub name: String,
}

//! Address consistency workflows.
//!
//! Creating or editing a mailing address runs in a fixed order for both
//! paths: structural validation first (nothing touches the store on a
//! validation failure), postal code normalization, then persistence, with
//! constraint violations classified into the typed taxonomy. Pre-validation
//! against the reference data is a fast path only; a stale read there still
//! ends in a correctly classified persistence failure.

use std::sync::Arc;

use thiserror::Error;

use gamehaven_core::{AddressId, CodeError, CountryCode, MemberId, ProvinceCode};

use crate::db::{MemberStore, ReferenceData, RepositoryError};
use crate::models::{Country, MailingAddress, Province};
use crate::services::postal::FormatterRegistry;

/// A field-level validation problem, keyed by the submitted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the offending form field.
    pub field: &'static str,
    /// Human-readable message for that field.
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Errors that can occur in the address workflows.
#[derive(Debug, Error)]
pub enum AddressError {
    /// One or more fields failed structural validation; nothing was
    /// persisted.
    #[error("address validation failed")]
    Validation(Vec<FieldError>),

    /// The submitted province/country pair does not exist in the reference
    /// data.
    #[error("the province/country pair does not exist")]
    InvalidProvinceCountryPair,

    /// The address to edit does not exist.
    #[error("address not found")]
    NotFound,

    /// Unclassified persistence failure.
    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

/// Raw address fields as submitted by the member.
#[derive(Debug, Clone, Default)]
pub struct AddressForm {
    pub street_address: String,
    pub po_box: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub province_code: String,
    pub country_code: String,
}

/// An [`AddressForm`] that passed structural validation.
struct ValidatedAddress {
    street_address: String,
    po_box: Option<String>,
    city: String,
    postal_code: String,
    province_code: ProvinceCode,
    country_code: CountryCode,
}

impl AddressForm {
    /// Structural validation: required fields and code shapes. Collects
    /// every problem rather than stopping at the first, and normalizes the
    /// postal code once the country is known.
    fn validate(&self, formatters: &FormatterRegistry) -> Result<ValidatedAddress, Vec<FieldError>> {
        let mut errors = Vec::new();

        let street_address = self.street_address.trim();
        if street_address.is_empty() {
            errors.push(FieldError::new("street_address", "street address is required"));
        }

        let city = self.city.trim();
        if city.is_empty() {
            errors.push(FieldError::new("city", "city is required"));
        }

        let postal_code = self.postal_code.trim();
        if postal_code.is_empty() {
            errors.push(FieldError::new("postal_code", "postal code is required"));
        }

        let province_code = ProvinceCode::parse(&self.province_code)
            .map_err(|e: CodeError| errors.push(FieldError::new("province_code", e.to_string())))
            .ok();
        let country_code = CountryCode::parse(&self.country_code)
            .map_err(|e: CodeError| errors.push(FieldError::new("country_code", e.to_string())))
            .ok();

        let (Some(province_code), Some(country_code)) = (province_code, country_code) else {
            return Err(errors);
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidatedAddress {
            street_address: street_address.to_string(),
            po_box: self
                .po_box
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string),
            city: city.to_string(),
            postal_code: formatters.format(&country_code, postal_code),
            province_code,
            country_code,
        })
    }
}

/// Manages a member's mailing addresses against the geographic reference
/// data.
pub struct AddressService<S, R> {
    store: Arc<S>,
    reference: Arc<R>,
    formatters: FormatterRegistry,
}

impl<S: MemberStore, R: ReferenceData> AddressService<S, R> {
    /// Create a service with the built-in postal code rules.
    #[must_use]
    pub fn new(store: Arc<S>, reference: Arc<R>) -> Self {
        Self::with_formatters(store, reference, FormatterRegistry::default())
    }

    /// Create a service with a custom formatter registry.
    #[must_use]
    pub const fn with_formatters(
        store: Arc<S>,
        reference: Arc<R>,
        formatters: FormatterRegistry,
    ) -> Self {
        Self {
            store,
            reference,
            formatters,
        }
    }

    /// Create a new address for the member.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Validation`] before any persistence attempt,
    /// [`AddressError::InvalidProvinceCountryPair`] when the geographic pair
    /// does not exist, and [`AddressError::Repository`] for anything else.
    /// On any error, nothing was persisted.
    pub async fn create_address(
        &self,
        member_id: MemberId,
        form: &AddressForm,
    ) -> Result<AddressId, AddressError> {
        let validated = form
            .validate(&self.formatters)
            .map_err(AddressError::Validation)?;

        self.ensure_pair_exists(&validated).await?;

        let address = MailingAddress {
            id: AddressId::generate(),
            member_id,
            street_address: validated.street_address,
            po_box: validated.po_box,
            city: validated.city,
            postal_code: validated.postal_code,
            province_code: validated.province_code,
            country_code: validated.country_code,
        };

        self.store
            .insert_address(&address)
            .await
            .map_err(map_store_error)?;

        tracing::info!(member_id = %member_id, address_id = %address.id, "address created");
        Ok(address.id)
    }

    /// Overwrite an existing address with new fields.
    ///
    /// Editing with the same payload twice leaves the same stored state.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::create_address`], plus
    /// [`AddressError::NotFound`] when the address id is unknown.
    /// Validation runs strictly before any lookup or persistence.
    pub async fn edit_address(
        &self,
        address_id: AddressId,
        form: &AddressForm,
    ) -> Result<(), AddressError> {
        let validated = form
            .validate(&self.formatters)
            .map_err(AddressError::Validation)?;

        let existing = self
            .store
            .find_address(address_id)
            .await
            .map_err(map_store_error)?
            .ok_or(AddressError::NotFound)?;

        self.ensure_pair_exists(&validated).await?;

        let updated = MailingAddress {
            id: existing.id,
            member_id: existing.member_id,
            street_address: validated.street_address,
            po_box: validated.po_box,
            city: validated.city,
            postal_code: validated.postal_code,
            province_code: validated.province_code,
            country_code: validated.country_code,
        };

        self.store
            .update_address(&updated)
            .await
            .map_err(map_store_error)?;

        tracing::info!(address_id = %address_id, "address updated");
        Ok(())
    }

    /// All addresses owned by the member, for the manage page.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Repository`] if the query fails.
    pub async fn list_addresses(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<MailingAddress>, AddressError> {
        self.store
            .list_addresses(member_id)
            .await
            .map_err(map_store_error)
    }

    /// Countries for the address form.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Repository`] if the query fails.
    pub async fn countries(&self) -> Result<Vec<Country>, AddressError> {
        self.reference.countries().await.map_err(map_store_error)
    }

    /// Provinces of one country for the address form.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Repository`] if the query fails.
    pub async fn provinces(&self, country: &CountryCode) -> Result<Vec<Province>, AddressError> {
        self.reference
            .provinces(country)
            .await
            .map_err(map_store_error)
    }

    /// Fast-path check against the reference data. The store still enforces
    /// the pair as a foreign key, so a stale answer here only changes which
    /// layer reports the mismatch.
    async fn ensure_pair_exists(&self, validated: &ValidatedAddress) -> Result<(), AddressError> {
        let exists = self
            .reference
            .province_exists(&validated.province_code, &validated.country_code)
            .await
            .map_err(map_store_error)?;

        if exists {
            Ok(())
        } else {
            Err(AddressError::InvalidProvinceCountryPair)
        }
    }
}

/// Fold repository errors into the address taxonomy. The classification of
/// geographic violations happened at the repository boundary; here it only
/// changes shape.
fn map_store_error(err: RepositoryError) -> AddressError {
    match err {
        RepositoryError::ReferenceViolation { constraint } => {
            tracing::warn!(constraint = %constraint, "address rejected by geographic foreign key");
            AddressError::InvalidProvinceCountryPair
        }
        RepositoryError::NotFound => AddressError::NotFound,
        other => AddressError::Repository(other),
    }
}

//! In-memory implementations of the persistence boundary.
//!
//! Used by the service tests. The store emulates the composite geographic
//! foreign key (so late-arriving reference violations can be exercised) and
//! supports injecting a failure into the next write, which is how rollback
//! paths are driven without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use gamehaven_core::{AddressId, CountryCode, Email, MemberId, ProvinceCode};

use super::{MemberStore, ReferenceData, RepositoryError};
use crate::models::{Country, MailingAddress, Member, ProfileChanges, Province, StoredPaymentMethod};

/// Constraint name the in-memory store reports for geographic violations,
/// mirroring what the classification adapter extracts from the real store.
const PROVINCE_FK_CONSTRAINT: &str = "mailing_address_province_code_country_code_fkey";

#[derive(Default)]
struct State {
    members: HashMap<MemberId, Member>,
    addresses: HashMap<AddressId, MailingAddress>,
    cards: Vec<StoredPaymentMethod>,
    cart_counts: HashMap<MemberId, u32>,
    known_pairs: HashSet<(ProvinceCode, CountryCode)>,
    fail_next_write: Option<RepositoryError>,
}

/// In-memory member store.
#[derive(Default)]
pub struct MemoryMemberStore {
    state: Mutex<State>,
}

impl MemoryMemberStore {
    /// Empty store with no known geographic pairs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose emulated foreign key accepts the given pairs.
    #[must_use]
    pub fn with_reference_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ProvinceCode, CountryCode)>,
    {
        let store = Self::default();
        store.state().known_pairs = pairs.into_iter().collect();
        store
    }

    /// Seed a member.
    pub fn add_member(&self, member: Member) {
        self.state().members.insert(member.id, member);
    }

    /// Seed a cart item count for a member.
    pub fn set_cart_count(&self, member_id: MemberId, count: u32) {
        self.state().cart_counts.insert(member_id, count);
    }

    /// Make the next write operation fail with the given error.
    pub fn fail_next_write(&self, err: RepositoryError) {
        self.state().fail_next_write = Some(err);
    }

    /// Snapshot of a member's current state, for assertions.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<Member> {
        self.state().members.get(&id).cloned()
    }

    /// Snapshot of every stored card, for assertions.
    #[must_use]
    pub fn stored_cards(&self) -> Vec<StoredPaymentMethod> {
        self.state().cards.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("state mutex poisoned")
    }
}

impl State {
    fn take_injected_failure(&mut self) -> Result<(), RepositoryError> {
        match self.fail_next_write.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_pair(
        &self,
        province: &ProvinceCode,
        country: &CountryCode,
    ) -> Result<(), RepositoryError> {
        if self
            .known_pairs
            .contains(&(province.clone(), country.clone()))
        {
            Ok(())
        } else {
            Err(RepositoryError::ReferenceViolation {
                constraint: PROVINCE_FK_CONSTRAINT.to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl MemberStore for MemoryMemberStore {
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>, RepositoryError> {
        Ok(self.state().members.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: MemberId,
        changes: &ProfileChanges,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;

        let member = state.members.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        member.first_name = changes.first_name.clone();
        member.last_name = changes.last_name.clone();
        member.phone = changes.phone.clone();
        member.wishlist_visibility = changes.wishlist_visibility;
        member.receive_promotional_emails = changes.receive_promotional_emails;
        member.updated_at = Utc::now();
        Ok(())
    }

    async fn commit_email_change(
        &self,
        id: MemberId,
        new_email: &Email,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;

        let member = state.members.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        member.email = new_email.clone();
        member.email_confirmed = false;
        member.updated_at = Utc::now();
        Ok(())
    }

    async fn restore_email(
        &self,
        id: MemberId,
        email: &Email,
        confirmed: bool,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;

        let member = state.members.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        member.email = email.clone();
        member.email_confirmed = confirmed;
        member.updated_at = Utc::now();
        Ok(())
    }

    async fn find_address(&self, id: AddressId) -> Result<Option<MailingAddress>, RepositoryError> {
        Ok(self.state().addresses.get(&id).cloned())
    }

    async fn list_addresses(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<MailingAddress>, RepositoryError> {
        Ok(self
            .state()
            .addresses
            .values()
            .filter(|a| a.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn insert_address(&self, address: &MailingAddress) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;
        state.check_pair(&address.province_code, &address.country_code)?;

        if state.addresses.contains_key(&address.id) {
            return Err(RepositoryError::Conflict("duplicate address id".to_string()));
        }
        state.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn update_address(&self, address: &MailingAddress) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;
        state.check_pair(&address.province_code, &address.country_code)?;

        match state.addresses.get_mut(&address.id) {
            Some(existing) if existing.member_id == address.member_id => {
                *existing = address.clone();
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    async fn list_payment_methods(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<StoredPaymentMethod>, RepositoryError> {
        Ok(self
            .state()
            .cards
            .iter()
            .filter(|c| c.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn insert_payment_method(
        &self,
        card: &StoredPaymentMethod,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state();
        state.take_injected_failure()?;

        if state
            .cards
            .iter()
            .any(|c| c.card_reference == card.card_reference)
        {
            return Err(RepositoryError::Conflict(
                "duplicate card reference".to_string(),
            ));
        }
        state.cards.push(card.clone());
        Ok(())
    }

    async fn cart_item_count(&self, member_id: MemberId) -> Result<Option<u32>, RepositoryError> {
        let state = self.state();
        if !state.members.contains_key(&member_id) {
            return Ok(None);
        }
        Ok(Some(state.cart_counts.get(&member_id).copied().unwrap_or(0)))
    }
}

/// In-memory geographic reference data.
#[derive(Default)]
pub struct MemoryReferenceData {
    countries: Vec<Country>,
    provinces: Vec<Province>,
}

impl MemoryReferenceData {
    /// Build reference data from a province list; countries are derived.
    #[must_use]
    pub fn new(countries: Vec<Country>, provinces: Vec<Province>) -> Self {
        Self {
            countries,
            provinces,
        }
    }

    /// The `(province, country)` pairs this data set contains, in the shape
    /// [`MemoryMemberStore::with_reference_pairs`] expects.
    #[must_use]
    pub fn pairs(&self) -> Vec<(ProvinceCode, CountryCode)> {
        self.provinces
            .iter()
            .map(|p| (p.code.clone(), p.country_code.clone()))
            .collect()
    }
}

#[async_trait::async_trait]
impl ReferenceData for MemoryReferenceData {
    async fn countries(&self) -> Result<Vec<Country>, RepositoryError> {
        Ok(self.countries.clone())
    }

    async fn provinces(&self, country: &CountryCode) -> Result<Vec<Province>, RepositoryError> {
        Ok(self
            .provinces
            .iter()
            .filter(|p| &p.country_code == country)
            .cloned()
            .collect())
    }

    async fn province_exists(
        &self,
        province: &ProvinceCode,
        country: &CountryCode,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .provinces
            .iter()
            .any(|p| &p.code == province && &p.country_code == country))
    }
}

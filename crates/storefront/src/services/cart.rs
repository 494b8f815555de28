//! Cart quantity projection.
//!
//! A pure read: the item count is handed back for the caller to cache (the
//! request layer keeps it in the session for the header badge). A missing
//! member is an error, never a zero, so a broken identity lookup cannot
//! hide behind an empty cart.

use std::sync::Arc;

use thiserror::Error;

use gamehaven_core::MemberId;

use crate::db::{MemberStore, RepositoryError};

/// Errors that can occur when projecting the cart quantity.
#[derive(Debug, Error)]
pub enum CartError {
    /// The member does not exist.
    #[error("member not found")]
    MemberNotFound,

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Read-only projections over a member's cart.
pub struct CartService<S> {
    store: Arc<S>,
}

impl<S: MemberStore> CartService<S> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Number of items currently in the member's cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::MemberNotFound`] when the member id resolves to
    /// nothing.
    pub async fn project_cart_quantity(&self, member_id: MemberId) -> Result<u32, CartError> {
        self.store
            .cart_item_count(member_id)
            .await?
            .ok_or(CartError::MemberNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use gamehaven_core::{Email, WishlistVisibility};

    use super::*;
    use crate::db::MemoryMemberStore;
    use crate::models::Member;

    fn member() -> Member {
        Member {
            id: MemberId::generate(),
            first_name: "Drew".to_string(),
            last_name: "Matheson".to_string(),
            email: Email::parse("drew@example.com").unwrap(),
            email_confirmed: true,
            phone: None,
            wishlist_visibility: WishlistVisibility::Private,
            receive_promotional_emails: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_counts_cart_items() {
        let store = Arc::new(MemoryMemberStore::new());
        let m = member();
        let member_id = m.id;
        store.add_member(m);
        store.set_cart_count(member_id, 3);

        let service = CartService::new(store);
        assert_eq!(service.project_cart_quantity(member_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_empty_cart_is_zero() {
        let store = Arc::new(MemoryMemberStore::new());
        let m = member();
        let member_id = m.id;
        store.add_member(m);

        let service = CartService::new(store);
        assert_eq!(service.project_cart_quantity(member_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_member_is_an_error_not_zero() {
        let store = Arc::new(MemoryMemberStore::new());
        let service = CartService::new(store);

        let err = service
            .project_cart_quantity(MemberId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::MemberNotFound));
    }
}

//! Payment method workflows.
//!
//! Attaching a card exchanges a one-time client token with the tokenization
//! provider for a durable reference, then appends the stored card to the
//! member's set. The workflow never retries the exchange: the provider may
//! have consumed the token even when the response was lost, so recovering
//! from a transport failure requires a fresh token from the caller.

use std::sync::Arc;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use gamehaven_core::MemberId;

use crate::db::{MemberStore, RepositoryError};
use crate::models::StoredPaymentMethod;
use crate::services::stripe::{ProviderError, TokenizationProvider};

/// Errors that can occur when attaching a payment method.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// No token was supplied.
    #[error("no payment token was supplied")]
    MissingToken,

    /// The provider rejected the card; the message is user-safe and comes
    /// from the provider verbatim.
    #[error("{0}")]
    CardRejected(String),

    /// The provider rejected the request for a reason that must stay
    /// opaque to the user.
    #[error("the payment provider rejected the request")]
    ProviderRejected,

    /// The provider was unreachable or timed out.
    #[error("the payment service is unavailable")]
    ServiceUnavailable,

    /// The member does not exist.
    #[error("member not found")]
    MemberNotFound,

    /// Persistence failed after a successful exchange; the member's card
    /// set is unchanged.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Manages a member's stored payment methods.
pub struct PaymentService<S, P> {
    store: Arc<S>,
    provider: Arc<P>,
}

impl<S: MemberStore, P: TokenizationProvider> PaymentService<S, P> {
    /// Create a new payment service.
    #[must_use]
    pub const fn new(store: Arc<S>, provider: Arc<P>) -> Self {
        Self { store, provider }
    }

    /// Exchange a one-time token for a durable card and attach it to the
    /// member.
    ///
    /// On success exactly one new [`StoredPaymentMethod`] is committed; on
    /// any failure the member's payment method set is unchanged.
    ///
    /// # Errors
    ///
    /// [`PaymentError::CardRejected`] carries the provider's user-safe
    /// message verbatim; every other provider failure is opaque.
    pub async fn attach_card(
        &self,
        member_id: MemberId,
        one_time_token: &SecretString,
    ) -> Result<StoredPaymentMethod, PaymentError> {
        if one_time_token.expose_secret().trim().is_empty() {
            return Err(PaymentError::MissingToken);
        }

        self.store
            .find_member(member_id)
            .await?
            .ok_or(PaymentError::MemberNotFound)?;

        let provider_card = self
            .provider
            .exchange_token(one_time_token)
            .await
            .map_err(map_provider_error)?;

        let card = StoredPaymentMethod {
            card_reference: provider_card.reference,
            member_id,
            brand: provider_card.brand,
            last4: provider_card.last4,
            expiry_month: provider_card.exp_month,
            expiry_year: provider_card.exp_year,
            created_at: Utc::now(),
        };

        self.store.insert_payment_method(&card).await?;

        tracing::info!(
            member_id = %member_id,
            brand = %card.brand,
            last4 = %card.last4,
            "payment method attached"
        );
        Ok(card)
    }

    /// The member's stored cards, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Repository`] if the query fails.
    pub async fn list_cards(
        &self,
        member_id: MemberId,
    ) -> Result<Vec<StoredPaymentMethod>, PaymentError> {
        Ok(self.store.list_payment_methods(member_id).await?)
    }
}

/// Fold provider errors into the payment taxonomy. Card errors surface
/// verbatim; everything else is logged here and reported opaquely.
fn map_provider_error(err: ProviderError) -> PaymentError {
    if let Some(message) = err.user_safe_message() {
        return PaymentError::CardRejected(message.to_string());
    }

    match err {
        ProviderError::Api { category, .. } => {
            tracing::error!(category = %category, "provider rejected token exchange");
            PaymentError::ProviderRejected
        }
        ProviderError::Transport(e) => {
            tracing::error!(error = %e, "tokenization provider unreachable");
            PaymentError::ServiceUnavailable
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use gamehaven_core::{Email, WishlistVisibility};

    use super::*;
    use crate::db::MemoryMemberStore;
    use crate::models::Member;
    use crate::services::stripe::ProviderCard;

    /// Scripted provider: pops one canned response per call.
    #[derive(Default)]
    struct FakeProvider {
        responses: Mutex<VecDeque<Result<ProviderCard, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn respond_with(self, response: Result<ProviderCard, ProviderError>) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push_back(response);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenizationProvider for FakeProvider {
        async fn exchange_token(
            &self,
            _one_time_token: &SecretString,
        ) -> Result<ProviderCard, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected exchange_token call")
        }
    }

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

    fn visa(reference: &str) -> ProviderCard {
        ProviderCard {
            reference: reference.to_string(),
            brand: "Visa".to_string(),
            last4: "4242".to_string(),
            exp_month: 8,
            exp_year: 2030,
        }
    }

    fn token() -> SecretString {
        SecretString::from("tok_1N3T00LkdIwHu7ix0snN0B15")
    }

    fn setup(
        provider: FakeProvider,
    ) -> (
        Arc<MemoryMemberStore>,
        Arc<FakeProvider>,
        PaymentService<MemoryMemberStore, FakeProvider>,
        MemberId,
    ) {
        let store = Arc::new(MemoryMemberStore::new());
        let m = member();
        let member_id = m.id;
        store.add_member(m);
        let provider = Arc::new(provider);
        let service = PaymentService::new(Arc::clone(&store), Arc::clone(&provider));
        (store, provider, service, member_id)
    }

    #[tokio::test]
    async fn test_empty_token_never_reaches_the_provider() {
        let (_, provider, service, member_id) = setup(FakeProvider::default());

        let err = service
            .attach_card(member_id, &SecretString::from("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MissingToken));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_member_never_reaches_the_provider() {
        let (_, provider, service, _) = setup(FakeProvider::default());

        let err = service
            .attach_card(MemberId::generate(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MemberNotFound));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_successful_attach_stores_provider_metadata() {
        let (store, _, service, member_id) =
            setup(FakeProvider::default().respond_with(Ok(visa("card_ref_1"))));

        let card = service.attach_card(member_id, &token()).await.unwrap();

        assert_eq!(card.card_reference, "card_ref_1");
        assert_eq!(card.brand, "Visa");
        assert_eq!(card.last4, "4242");

        let stored = store.stored_cards();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], card);
    }

    #[tokio::test]
    async fn test_raw_token_never_appears_in_persisted_state() {
        let (store, _, service, member_id) =
            setup(FakeProvider::default().respond_with(Ok(visa("card_ref_1"))));

        let token = token();
        service.attach_card(member_id, &token).await.unwrap();

        let persisted = format!("{:?}", store.stored_cards());
        assert!(!persisted.contains(token.expose_secret()));
    }

    #[tokio::test]
    async fn test_card_error_message_surfaces_verbatim() {
        let (store, _, service, member_id) = setup(FakeProvider::default().respond_with(Err(
            ProviderError::Api {
                category: "card_error".to_string(),
                message: "Your card was declined.".to_string(),
            },
        )));

        let err = service.attach_card(member_id, &token()).await.unwrap_err();
        let PaymentError::CardRejected(message) = err else {
            panic!("expected CardRejected, got {err:?}");
        };
        assert_eq!(message, "Your card was declined.");
        assert!(store.stored_cards().is_empty());
    }

    #[tokio::test]
    async fn test_other_provider_categories_stay_opaque() {
        let (store, _, service, member_id) = setup(FakeProvider::default().respond_with(Err(
            ProviderError::Api {
                category: "authentication_error".to_string(),
                message: "Invalid API key sk_live_xyz provided".to_string(),
            },
        )));

        let err = service.attach_card(member_id, &token()).await.unwrap_err();
        assert!(matches!(err, PaymentError::ProviderRejected));
        assert!(!err.to_string().contains("sk_live"));
        assert!(store.stored_cards().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_service_unavailable() {
        // A real connection failure, so the mapped error carries the same
        // shape production would see.
        let transport_err = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(250))
            .build()
            .unwrap()
            .get("http://127.0.0.1:9/unreachable")
            .send()
            .await
            .unwrap_err();

        let (store, _, service, member_id) = setup(
            FakeProvider::default().respond_with(Err(ProviderError::Transport(transport_err))),
        );

        let err = service.attach_card(member_id, &token()).await.unwrap_err();
        assert!(matches!(err, PaymentError::ServiceUnavailable));
        assert!(store.stored_cards().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_after_exchange_leaves_set_unchanged() {
        let (store, _, service, member_id) =
            setup(FakeProvider::default().respond_with(Ok(visa("card_ref_1"))));
        store.fail_next_write(RepositoryError::DataCorruption("tablespace gone".to_string()));

        let err = service.attach_card(member_id, &token()).await.unwrap_err();
        assert!(matches!(err, PaymentError::Repository(_)));
        assert!(store.stored_cards().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_attaches_yield_distinct_records() {
        let (store, _, service, member_id) = setup(
            FakeProvider::default()
                .respond_with(Ok(visa("card_ref_1")))
                .respond_with(Ok(visa("card_ref_2"))),
        );

        service.attach_card(member_id, &token()).await.unwrap();
        service
            .attach_card(member_id, &SecretString::from("tok_second"))
            .await
            .unwrap();

        let cards = service.list_cards(member_id).await.unwrap();
        assert_eq!(cards.len(), 2);
        assert_ne!(cards[0].card_reference, cards[1].card_reference);

        assert_eq!(store.stored_cards().len(), 2);
    }
}

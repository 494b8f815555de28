//! Transactional email change.
//!
//! Changing the login email spans a durable write and two identity-provider
//! calls. Rather than wrapping an external call inside a database
//! transaction, the workflow runs an explicit compensating-action sequence:
//!
//! 1. dispatch the confirmation first, while nothing durable has changed -
//!    a failure or timeout here needs no cleanup;
//! 2. persist the new email (marked unconfirmed) in one atomic write;
//! 3. invalidate the session last - if that fails, the durable write is
//!    reverted so the caller observes no change at all.
//!
//! The confirmation code is bound to the member id, not to the stored email
//! row, which is what makes dispatching before the write safe: an orphaned
//! code from a rolled-back attempt redeems against nothing.
//!
//! Seen from the caller the workflow is `Idle -> Pending -> Committed`
//! or `Idle -> Pending -> RolledBack`; there is no partially-applied state.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use gamehaven_core::{Email, EmailError, MemberId};

use crate::db::{MemberStore, RepositoryError};
use crate::services::identity::{ConfirmationCode, IdentityProvider};

/// Errors that can occur during an email change.
///
/// Every variant except a successful commit leaves the member's email and
/// session exactly as they were. `PersistenceFailure` and
/// `NotificationFailure` roll back identically; they are distinct only so
/// operators can tell which collaborator misbehaved.
#[derive(Debug, Error)]
pub enum EmailChangeError {
    /// The member does not exist.
    #[error("member not found")]
    MemberNotFound,

    /// The new email failed validation; nothing was attempted.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The durable write failed.
    #[error("email change could not be persisted")]
    PersistenceFailure(#[source] RepositoryError),

    /// The confirmation message could not be dispatched (or timed out).
    #[error("confirmation message could not be dispatched")]
    NotificationFailure,

    /// The session could not be invalidated; the email change was reverted.
    #[error("session invalidation failed; the change was reverted")]
    SessionInvalidation,
}

/// The pending (old, new) pair during one workflow invocation. Never
/// persisted; it exists so the compensation path knows what to restore.
struct EmailChangeRequest {
    old_email: Email,
    old_confirmed: bool,
    new_email: Email,
}

/// Coordinates the atomic email change workflow.
pub struct EmailChangeService<S, I> {
    store: Arc<S>,
    identity: Arc<I>,
    /// Bound on each identity-provider call; an elapsed timeout is a step
    /// failure and rolls the workflow back.
    provider_timeout: Duration,
}

impl<S: MemberStore, I: IdentityProvider> EmailChangeService<S, I> {
    /// Create a new coordinator.
    #[must_use]
    pub const fn new(store: Arc<S>, identity: Arc<I>, provider_timeout: Duration) -> Self {
        Self {
            store,
            identity,
            provider_timeout,
        }
    }

    /// Change the member's login email.
    ///
    /// On success the new email is durable and unconfirmed, a confirmation
    /// carrying a single-use code has been dispatched, and the member's
    /// session is invalidated - the caller must force re-authentication.
    ///
    /// # Errors
    ///
    /// On any error the member's email and session are unchanged.
    pub async fn request_email_change(
        &self,
        member_id: MemberId,
        new_email: &str,
    ) -> Result<(), EmailChangeError> {
        let new_email = Email::parse(new_email)?;

        let member = self
            .store
            .find_member(member_id)
            .await
            .map_err(EmailChangeError::PersistenceFailure)?
            .ok_or(EmailChangeError::MemberNotFound)?;

        let request = EmailChangeRequest {
            old_email: member.email,
            old_confirmed: member.email_confirmed,
            new_email,
        };
        let code = ConfirmationCode::generate();

        // Dispatch before any durable write.
        let dispatch = tokio::time::timeout(
            self.provider_timeout,
            self.identity.send_confirmation(member_id, &code),
        )
        .await;
        match dispatch {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(member_id = %member_id, error = %err, "confirmation dispatch failed");
                return Err(EmailChangeError::NotificationFailure);
            }
            Err(_elapsed) => {
                tracing::error!(member_id = %member_id, "confirmation dispatch timed out");
                return Err(EmailChangeError::NotificationFailure);
            }
        }

        self.store
            .commit_email_change(member_id, &request.new_email)
            .await
            .map_err(EmailChangeError::PersistenceFailure)?;

        // Session invalidation is the last step; on failure the durable
        // write is compensated so no partial state survives.
        let invalidation = tokio::time::timeout(
            self.provider_timeout,
            self.identity.invalidate_session(member_id),
        )
        .await;
        let failure = match invalidation {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(err.to_string()),
            Err(_elapsed) => Some("timed out".to_string()),
        };

        if let Some(reason) = failure {
            tracing::warn!(
                member_id = %member_id,
                reason = %reason,
                "session invalidation failed, reverting email change"
            );
            self.store
                .restore_email(member_id, &request.old_email, request.old_confirmed)
                .await
                .map_err(EmailChangeError::PersistenceFailure)?;
            return Err(EmailChangeError::SessionInvalidation);
        }

        tracing::info!(member_id = %member_id, "email change committed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use gamehaven_core::WishlistVisibility;

    use super::*;
    use crate::db::MemoryMemberStore;
    use crate::models::Member;
    use crate::services::identity::IdentityError;

    /// Identity provider double that records calls and can be told to fail
    /// or hang.
    #[derive(Default)]
    struct FakeIdentity {
        sent: Mutex<Vec<(MemberId, String)>>,
        invalidated: Mutex<Vec<MemberId>>,
        fail_send: AtomicBool,
        hang_send: AtomicBool,
        fail_invalidate: AtomicBool,
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn invalidate_session(&self, member_id: MemberId) -> Result<(), IdentityError> {
            if self.fail_invalidate.load(Ordering::SeqCst) {
                return Err(IdentityError::Provider("session store down".to_string()));
            }
            self.invalidated.lock().unwrap().push(member_id);
            Ok(())
        }

        async fn send_confirmation(
            &self,
            member_id: MemberId,
            code: &ConfirmationCode,
        ) -> Result<(), IdentityError> {
            if self.hang_send.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(IdentityError::Provider("smtp relay rejected".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((member_id, code.as_str().to_string()));
            Ok(())
        }
    }

    fn member_with_email(email: &str) -> Member {
        Member {
            id: MemberId::generate(),
            first_name: "Drew".to_string(),
            last_name: "Matheson".to_string(),
            email: Email::parse(email).unwrap(),
            email_confirmed: true,
            phone: None,
            wishlist_visibility: WishlistVisibility::Private,
            receive_promotional_emails: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn setup(
        email: &str,
    ) -> (
        Arc<MemoryMemberStore>,
        Arc<FakeIdentity>,
        EmailChangeService<MemoryMemberStore, FakeIdentity>,
        MemberId,
    ) {
        let store = Arc::new(MemoryMemberStore::new());
        let m = member_with_email(email);
        let member_id = m.id;
        store.add_member(m);
        let identity = Arc::new(FakeIdentity::default());
        let service = EmailChangeService::new(
            Arc::clone(&store),
            Arc::clone(&identity),
            Duration::from_secs(10),
        );
        (store, identity, service, member_id)
    }

    #[tokio::test]
    async fn test_successful_change_commits_everything() {
        let (store, identity, service, member_id) = setup("old@x.com");

        service
            .request_email_change(member_id, "new@x.com")
            .await
            .unwrap();

        let member = store.member(member_id).unwrap();
        assert_eq!(member.email.as_str(), "new@x.com");
        assert!(!member.email_confirmed);

        let sent = identity.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, member_id);
        assert!(!sent[0].1.is_empty());

        assert_eq!(*identity.invalidated.lock().unwrap(), vec![member_id]);
    }

    #[tokio::test]
    async fn test_invalid_email_attempts_nothing() {
        let (store, identity, service, member_id) = setup("old@x.com");

        let err = service
            .request_email_change(member_id, "not-an-email")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::InvalidEmail(_)));

        assert_eq!(store.member(member_id).unwrap().email.as_str(), "old@x.com");
        assert!(identity.sent.lock().unwrap().is_empty());
        assert!(identity.invalidated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_member_attempts_nothing() {
        let (_, identity, service, _) = setup("old@x.com");

        let err = service
            .request_email_change(MemberId::generate(), "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::MemberNotFound));
        assert!(identity.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_rolls_back() {
        let (store, identity, service, member_id) = setup("old@x.com");
        identity.fail_send.store(true, Ordering::SeqCst);

        let err = service
            .request_email_change(member_id, "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::NotificationFailure));

        let member = store.member(member_id).unwrap();
        assert_eq!(member.email.as_str(), "old@x.com");
        assert!(member.email_confirmed);
        assert!(identity.invalidated.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_timeout_rolls_back() {
        let (store, identity, service, member_id) = setup("old@x.com");
        identity.hang_send.store(true, Ordering::SeqCst);

        let err = service
            .request_email_change(member_id, "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::NotificationFailure));

        assert_eq!(store.member(member_id).unwrap().email.as_str(), "old@x.com");
        assert!(identity.invalidated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_session_alone() {
        let (store, identity, service, member_id) = setup("old@x.com");
        store.fail_next_write(RepositoryError::DataCorruption("wal full".to_string()));

        let err = service
            .request_email_change(member_id, "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::PersistenceFailure(_)));

        assert_eq!(store.member(member_id).unwrap().email.as_str(), "old@x.com");
        assert!(identity.invalidated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalidation_failure_reverts_the_durable_write() {
        let (store, identity, service, member_id) = setup("old@x.com");
        identity.fail_invalidate.store(true, Ordering::SeqCst);

        let err = service
            .request_email_change(member_id, "new@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailChangeError::SessionInvalidation));

        let member = store.member(member_id).unwrap();
        assert_eq!(member.email.as_str(), "old@x.com");
        assert!(member.email_confirmed);
    }

    #[tokio::test]
    async fn test_each_request_sends_a_fresh_code() {
        let (_, identity, service, member_id) = setup("old@x.com");

        service
            .request_email_change(member_id, "first@x.com")
            .await
            .unwrap();
        service
            .request_email_change(member_id, "second@x.com")
            .await
            .unwrap();

        let sent = identity.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].1, sent[1].1);
    }
}

//! Member profile workflows.

use std::sync::Arc;

use thiserror::Error;

use gamehaven_core::MemberId;

use crate::db::{MemberStore, RepositoryError};
use crate::models::{Member, ProfileChanges};

/// Errors that can occur in the profile workflows.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The member does not exist. A stale but still-authenticated session
    /// can produce this; the caller should sign the user out.
    #[error("member not found")]
    MemberNotFound,

    /// Repository/database error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Manages a member's profile fields.
pub struct AccountService<S> {
    store: Arc<S>,
}

impl<S: MemberStore> AccountService<S> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The member's current profile, for the manage page.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::MemberNotFound`] when the id resolves to
    /// nothing.
    pub async fn account_overview(&self, member_id: MemberId) -> Result<Member, AccountError> {
        self.store
            .find_member(member_id)
            .await?
            .ok_or(AccountError::MemberNotFound)
    }

    /// Apply profile changes.
    ///
    /// The login email is not part of [`ProfileChanges`]; callers that
    /// detect an email difference route it through the email change
    /// workflow instead.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::MemberNotFound`] when the member does not
    /// exist.
    pub async fn update_profile(
        &self,
        member_id: MemberId,
        changes: &ProfileChanges,
    ) -> Result<(), AccountError> {
        self.store
            .update_profile(member_id, changes)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => AccountError::MemberNotFound,
                other => AccountError::Repository(other),
            })?;

        tracing::info!(member_id = %member_id, "profile updated");
        Ok(())
    }
}

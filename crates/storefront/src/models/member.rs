//! Member domain types.

use chrono::{DateTime, Utc};

use gamehaven_core::{Email, MemberId, WishlistVisibility};

/// A storefront member (domain type).
///
/// Owns mailing addresses and stored payment methods, reached through the
/// repository by [`MemberId`].
#[derive(Debug, Clone)]
pub struct Member {
    /// Unique member ID.
    pub id: MemberId,
    /// Member's first name.
    pub first_name: String,
    /// Member's last name.
    pub last_name: String,
    /// Login email address.
    pub email: Email,
    /// Whether the email has been confirmed. Cleared when the email changes.
    pub email_confirmed: bool,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Who can see the member's wishlist.
    pub wishlist_visibility: WishlistVisibility,
    /// Whether the member opted into promotional emails.
    pub receive_promotional_emails: bool,
    /// When the member registered.
    pub created_at: DateTime<Utc>,
    /// When the member was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a member can change from the manage page.
///
/// The email is deliberately absent: email changes go through the email
/// change workflow, which invalidates the session and dispatches a
/// confirmation.
#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub wishlist_visibility: WishlistVisibility,
    pub receive_promotional_emails: bool,
}

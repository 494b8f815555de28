//! Domain models for the member account subsystem.
//!
//! These types represent validated domain objects separate from database row
//! types. Relationships are expressed as identifier foreign keys resolved
//! through the repository, never as live object graphs.

pub mod address;
pub mod member;
pub mod payment;

pub use address::{Country, MailingAddress, Province};
pub use member::{Member, ProfileChanges};
pub use payment::StoredPaymentMethod;

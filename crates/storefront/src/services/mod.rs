//! Account workflow services.
//!
//! One service per user action; each owns a single unit of work and commits
//! at most once per successful workflow.

pub mod account;
pub mod addresses;
pub mod cart;
pub mod email_change;
pub mod identity;
pub mod payments;
pub mod postal;
pub mod stripe;

//! GameHaven Core - Shared types library.
//!
//! This crate provides the validated domain types used across GameHaven
//! components:
//! - `storefront` - Member accounts, addresses, and stored payment methods
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and the
//!   two-letter geographic codes addresses are validated against

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! GameHaven Storefront - member account subsystem.
//!
//! This crate owns the workflows that mutate a member's account: profile
//! updates, mailing addresses, stored payment methods, and the transactional
//! email change. The HTTP request layer, page rendering, and session cookie
//! plumbing live elsewhere and consume this crate as a library.
//!
//! Each workflow is a service over two kinds of collaborators:
//!
//! - the persistence boundary ([`db::MemberStore`], [`db::ReferenceData`]),
//!   implemented for `PostgreSQL` and in memory for tests
//! - consumed capabilities the storefront calls but does not implement:
//!   the payment tokenization provider ([`services::stripe`]) and the
//!   identity provider ([`services::identity`])
//!
//! Every workflow either fully commits or leaves no partial state behind;
//! the error types in [`error`] carry the user-facing message policy.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

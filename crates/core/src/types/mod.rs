//! Core domain types.

pub mod email;
pub mod geo;
pub mod id;
pub mod visibility;

pub use email::{Email, EmailError};
pub use geo::{CodeError, CountryCode, ProvinceCode};
pub use id::{AddressId, MemberId};
pub use visibility::WishlistVisibility;

//! Identity provider capability.
//!
//! The storefront consumes these operations but does not implement them;
//! session storage and message delivery belong to the identity layer. The
//! email change workflow drives both and treats any failure, including a
//! timeout, as a reason to roll the whole workflow back.

use async_trait::async_trait;
use thiserror::Error;

use gamehaven_core::MemberId;

/// Errors reported by the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider did not answer in time.
    #[error("identity provider timed out")]
    Timeout,

    /// The provider answered with a failure.
    #[error("identity provider failure: {0}")]
    Provider(String),
}

/// A single-use confirmation code bound to a member id.
///
/// The code is delivered out of band and redeemed by the identity layer;
/// this subsystem only generates and forwards it. `Debug` is redacted so
/// the code never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    /// Length of generated codes.
    const LENGTH: usize = 32;

    /// Generate a fresh random code.
    #[must_use]
    pub fn generate() -> Self {
        use rand::distr::{Alphanumeric, SampleString};

        Self(Alphanumeric.sample_string(&mut rand::rng(), Self::LENGTH))
    }

    /// The code itself, for handing to the identity provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ConfirmationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ConfirmationCode([REDACTED])")
    }
}

/// Operations the identity layer performs on this subsystem's behalf.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Invalidate the member's current authenticated session, forcing
    /// re-authentication.
    async fn invalidate_session(&self, member_id: MemberId) -> Result<(), IdentityError>;

    /// Dispatch a confirmation message carrying a single-use code bound to
    /// the member.
    async fn send_confirmation(
        &self,
        member_id: MemberId,
        code: &ConfirmationCode,
    ) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_sized() {
        let a = ConfirmationCode::generate();
        let b = ConfirmationCode::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), ConfirmationCode::LENGTH);
    }

    #[test]
    fn test_debug_never_shows_the_code() {
        let code = ConfirmationCode::generate();
        let debug = format!("{code:?}");
        assert!(!debug.contains(code.as_str()));
        assert!(debug.contains("REDACTED"));
    }
}

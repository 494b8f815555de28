//! Two-letter geographic codes.
//!
//! Addresses reference the Country/Province lookup tables by ISO-style
//! two-letter codes. A province code is only unique within its country, so
//! both codes travel together everywhere an address is validated.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CountryCode`] or [`ProvinceCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The input is not exactly two characters long.
    #[error("code must be exactly 2 characters")]
    WrongLength,
    /// The input contains non-alphabetic characters.
    #[error("code must contain only letters")]
    NotAlphabetic,
}

macro_rules! define_code {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        ///
        /// Always exactly two ASCII letters, stored uppercase. Parsing accepts
        /// lowercase input and surrounding whitespace.
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse a code from a string.
            ///
            /// # Errors
            ///
            /// Returns [`CodeError`] if the input is not exactly two ASCII
            /// letters after trimming.
            pub fn parse(s: &str) -> Result<Self, CodeError> {
                let s = s.trim();

                if s.chars().count() != 2 {
                    return Err(CodeError::WrongLength);
                }

                if !s.chars().all(|c| c.is_ascii_alphabetic()) {
                    return Err(CodeError::NotAlphabetic);
                }

                Ok(Self(s.to_ascii_uppercase()))
            }

            /// Returns the code as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                // Database values are assumed valid
                Ok(Self(s))
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_code!(CountryCode, "A two-letter country code (e.g. `CA`, `US`).");
define_code!(
    ProvinceCode,
    "A two-letter province or state code (e.g. `ON`, `NY`), unique only within a country."
);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercases() {
        let code = CountryCode::parse("ca").unwrap();
        assert_eq!(code.as_str(), "CA");
    }

    #[test]
    fn test_parse_trims() {
        let code = ProvinceCode::parse(" on ").unwrap();
        assert_eq!(code.as_str(), "ON");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(CountryCode::parse(""), Err(CodeError::WrongLength));
        assert_eq!(CountryCode::parse("C"), Err(CodeError::WrongLength));
        assert_eq!(CountryCode::parse("CAN"), Err(CodeError::WrongLength));
    }

    #[test]
    fn test_parse_not_alphabetic() {
        assert_eq!(ProvinceCode::parse("0N"), Err(CodeError::NotAlphabetic));
        assert_eq!(ProvinceCode::parse("!!"), Err(CodeError::NotAlphabetic));
    }

    #[test]
    fn test_province_codes_compare_within_country_only() {
        // `ON` parses fine regardless of country; existence against a country
        // is the reference data's job, not the type's.
        let on = ProvinceCode::parse("ON").unwrap();
        assert_eq!(on, ProvinceCode::parse("on").unwrap());
    }

    #[test]
    fn test_from_str() {
        let code: CountryCode = "us".parse().unwrap();
        assert_eq!(code.as_str(), "US");
    }
}

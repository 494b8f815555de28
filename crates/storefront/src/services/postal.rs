//! Per-country postal code normalization.
//!
//! Postal codes are normalized to the destination country's canonical
//! format before persistence. Only one rule ships built in - the 6-character
//! alphanumeric format used by Canada - and further countries are a
//! registration away.

use std::collections::HashMap;
use std::sync::Arc;

use gamehaven_core::CountryCode;

/// Formats a raw postal code into a country's canonical form.
///
/// Formatters never reject input; structural validation happens before
/// formatting, and codes the rule does not recognize pass through cleaned.
pub trait PostalCodeFormatter: Send + Sync {
    /// Normalize a raw postal code.
    fn format(&self, raw: &str) -> String;
}

/// Uppercase, with a single interior space: `k1a0b1` becomes `K1A 0B1`.
///
/// Applies only to codes that are exactly six alphanumeric characters after
/// stripping whitespace; anything else passes through uppercased.
pub struct SixCharPostalFormatter;

impl PostalCodeFormatter for SixCharPostalFormatter {
    fn format(&self, raw: &str) -> String {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        if cleaned.len() == 6 && cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
            let (left, right) = cleaned.split_at(3);
            format!("{left} {right}")
        } else {
            cleaned
        }
    }
}

/// Registry of per-country formatters.
///
/// Countries without a registered formatter get their codes trimmed and
/// otherwise left alone.
pub struct FormatterRegistry {
    by_country: HashMap<CountryCode, Arc<dyn PostalCodeFormatter>>,
}

impl FormatterRegistry {
    /// Empty registry; no country-specific rules.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_country: HashMap::new(),
        }
    }

    /// Register a formatter for a country, replacing any existing one.
    pub fn register(&mut self, country: CountryCode, formatter: Arc<dyn PostalCodeFormatter>) {
        self.by_country.insert(country, formatter);
    }

    /// Normalize a postal code for the given country.
    #[must_use]
    pub fn format(&self, country: &CountryCode, raw: &str) -> String {
        self.by_country.get(country).map_or_else(
            || raw.trim().to_string(),
            |formatter| formatter.format(raw),
        )
    }
}

impl Default for FormatterRegistry {
    /// The built-in rules: Canada's 6-character format.
    fn default() -> Self {
        let mut registry = Self::empty();
        if let Ok(ca) = CountryCode::parse("CA") {
            registry.register(ca, Arc::new(SixCharPostalFormatter));
        }
        registry
    }
}

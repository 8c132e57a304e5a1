//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// - `Money(85000)` is a value object
/// - `Product { id: ProductId(...), .. }` is an entity
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Monetary amount in the smallest currency unit (two decimal places).
///
/// The marketplace is single-currency, so no currency code is carried.
/// `Money(80000)` is `800.00`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    /// Largest accepted price: `99999999.99`.
    pub const MAX_PRICE: Money = Money(9_999_999_999);

    pub fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Whole currency units (e.g. `Money::from_major(700)` is `700.00`).
    pub fn from_major(major: u64) -> Self {
        Self(major.saturating_mul(100))
    }

    pub fn minor(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Floating representation for JSON output (two-decimal intent).
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Parse a decimal amount such as `"700"`, `"12.5"` or `"12.50"`.
    ///
    /// At most two fractional digits are accepted; negative amounts are rejected
    /// with the same message as zero so callers see one rule: price must be positive.
    /// Amounts above [`Money::MAX_PRICE`] are rejected.
    pub fn parse_decimal(raw: &str) -> Result<Self, DomainError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(DomainError::validation("Price is required"));
        }
        if s.starts_with('-') {
            return Err(DomainError::validation("Price must be greater than zero"));
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(DomainError::validation(format!("Invalid price: {raw}")));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation(format!("Invalid price: {raw}")));
        }
        if frac.len() > 2 {
            return Err(DomainError::validation(
                "Price must have at most two decimal places",
            ));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            // digits only, so the parse can only overflow
            whole
                .parse()
                .map_err(|_| DomainError::validation("Price is too large"))?
        };
        let frac_minor: u64 = match frac.len() {
            0 => 0,
            1 => u64::from(frac.as_bytes()[0] - b'0') * 10,
            _ => frac
                .parse()
                .map_err(|_| DomainError::validation(format!("Invalid price: {raw}")))?,
        };

        whole
            .checked_mul(100)
            .and_then(|m| m.checked_add(frac_minor))
            .map(Money)
            .filter(|m| *m <= Self::MAX_PRICE)
            .ok_or_else(|| DomainError::validation("Price is too large"))
    }

    /// Sum of `amounts`; `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional_amounts() {
        assert_eq!(Money::parse_decimal("700").unwrap(), Money::from_minor(70000));
        assert_eq!(Money::parse_decimal("12.5").unwrap(), Money::from_minor(1250));
        assert_eq!(Money::parse_decimal("12.05").unwrap(), Money::from_minor(1205));
        assert_eq!(Money::parse_decimal(" .99 ").unwrap(), Money::from_minor(99));
        assert_eq!(Money::parse_decimal("3.").unwrap(), Money::from_minor(300));
    }

    #[test]
    fn rejects_malformed_amounts() {
        for raw in ["", "abc", "1.234", "1,00", "1.2.3", ".", "1e3"] {
            assert!(
                matches!(Money::parse_decimal(raw), Err(DomainError::Validation(_))),
                "expected validation error for {raw:?}"
            );
        }
    }

    #[test]
    fn negative_amounts_are_rejected_as_non_positive() {
        let err = Money::parse_decimal("-5").unwrap_err();
        assert_eq!(err, DomainError::validation("Price must be greater than zero"));
    }

    #[test]
    fn display_has_two_decimals() {
        assert_eq!(Money::from_minor(80000).to_string(), "800.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_major(3).to_f64(), 3.0);
    }

    #[test]
    fn checked_sum_adds_minor_units() {
        let total = Money::checked_sum([Money::from_major(500), Money::from_major(300)]);
        assert_eq!(total, Some(Money::from_major(800)));
        assert_eq!(Money::checked_sum([]), Some(Money::ZERO));
    }

    #[test]
    fn checked_sum_reports_overflow() {
        assert_eq!(Money::checked_sum([Money::from_minor(u64::MAX), Money::from_minor(1)]), None);
    }

    #[test]
    fn prices_above_the_cap_are_rejected() {
        assert_eq!(Money::parse_decimal("99999999.99").unwrap(), Money::MAX_PRICE);
        for raw in ["100000000", "100000000000000000", "99999999999999999999999"] {
            assert_eq!(
                Money::parse_decimal(raw).unwrap_err(),
                DomainError::validation("Price is too large"),
                "{raw}"
            );
        }
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: Display output parses back to the same amount.
            #[test]
            fn display_parses_back(minor in 0u64..=9_999_999_999) {
                let m = Money::from_minor(minor);
                prop_assert_eq!(Money::parse_decimal(&m.to_string()).unwrap(), m);
            }
        }
    }
}

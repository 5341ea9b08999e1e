use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{TypeError, TypeResult};

/// A number attribute, kept as decimal text.
///
/// The store transmits numbers as strings so that no precision is lost in
/// transit. A `Number` always holds text that parses as a decimal literal:
/// an optional sign, digits with an optional fractional part, and an
/// optional exponent (`-12`, `3.25`, `6.02e23`).
///
/// Equality and ordering are textual. Use [`Number::cmp_numeric`] when the
/// numeric order matters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Number(String);

impl Number {
    /// Validate `text` as a decimal literal.
    pub fn parse(text: &str) -> TypeResult<Self> {
        let trimmed = text.trim();
        if is_decimal_literal(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(TypeError::InvalidNumber(text.to_string()))
        }
    }

    pub fn from_i128(value: i128) -> Self {
        Self(value.to_string())
    }

    pub fn from_u128(value: u128) -> Self {
        Self(value.to_string())
    }

    /// Returns an error for NaN and the infinities, which the store cannot hold.
    pub fn from_f64(value: f64) -> TypeResult<Self> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(TypeError::NonFinite(value.to_string()))
        }
    }

    pub fn from_f32(value: f32) -> TypeResult<Self> {
        if value.is_finite() {
            Ok(Self(value.to_string()))
        } else {
            Err(TypeError::NonFinite(value.to_string()))
        }
    }

    /// The decimal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the text into any `FromStr` numeric type.
    ///
    /// Integer targets reject fractional text and out-of-range values, which
    /// is what makes narrowing reads bounds-checked.
    pub fn parse_as<T: FromStr>(&self) -> Result<T, T::Err> {
        self.0.parse::<T>()
    }

    /// Approximate numeric value.
    pub fn to_f64(&self) -> f64 {
        // The literal grammar is a subset of what f64 parsing accepts.
        self.0.parse::<f64>().unwrap_or(f64::NAN)
    }

    /// Exact decimal value, if the number fits in 28 significant digits.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.0.contains(['e', 'E']) {
            Decimal::from_scientific(&self.0).ok()
        } else {
            Decimal::from_str_exact(&self.0).ok()
        }
    }

    /// Exact sum. `None` when the result cannot be represented without
    /// rounding.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        if let (Ok(a), Ok(b)) = (self.parse_as::<i128>(), other.parse_as::<i128>()) {
            return a.checked_add(b).map(Self::from_i128);
        }
        let sum = self.to_decimal()?.checked_add(other.to_decimal()?)?;
        Some(Self(sum.normalize().to_string()))
    }

    /// Compare by numeric value rather than by text.
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        if let (Ok(a), Ok(b)) = (self.parse_as::<i128>(), other.parse_as::<i128>()) {
            return a.cmp(&b);
        }
        if let (Some(a), Some(b)) = (self.to_decimal(), other.to_decimal()) {
            return a.cmp(&b);
        }
        self.to_f64()
            .partial_cmp(&other.to_f64())
            .unwrap_or(Ordering::Equal)
    }
}

fn is_decimal_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut mantissa_digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        mantissa_digits += i - frac_start;
    }
    if mantissa_digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

impl FromStr for Number {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number({})", self.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_decimal_literals() {
        for text in ["0", "-12", "+7", "3.25", ".5", "5.", "6.02e23", "1E-9", " 42 "] {
            assert!(Number::parse(text).is_ok(), "{text} should parse");
        }
    }

    #[test]
    fn rejects_non_decimal_text() {
        for text in ["", "-", ".", "1.2.3", "abc", "1e", "1e+", "0x10", "NaN", "inf"] {
            assert_eq!(
                Number::parse(text),
                Err(TypeError::InvalidNumber(text.to_string())),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn parse_trims_whitespace() {
        assert_eq!(Number::parse(" 42 ").unwrap().as_str(), "42");
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(Number::from_f64(f64::NAN).is_err());
        assert!(Number::from_f64(f64::INFINITY).is_err());
        assert!(Number::from_f32(f32::NEG_INFINITY).is_err());
    }

    #[test]
    fn narrowing_parse_is_bounds_checked() {
        let n = Number::from(300i64);
        assert!(n.parse_as::<u8>().is_err());
        assert_eq!(n.parse_as::<u16>().unwrap(), 300);
        assert!(Number::parse("1.5").unwrap().parse_as::<i64>().is_err());
    }

    #[test]
    fn numeric_ordering_differs_from_textual() {
        let nine = Number::from(9i64);
        let ten = Number::from(10i64);
        assert!(ten < nine, "textual order");
        assert_eq!(nine.cmp_numeric(&ten), Ordering::Less);
        let half = Number::parse("0.5").unwrap();
        assert_eq!(half.cmp_numeric(&Number::from(1i64)), Ordering::Less);
    }

    #[test]
    fn decimal_addition_is_exact() {
        let sum = |a: &str, b: &str| {
            Number::parse(a)
                .unwrap()
                .checked_add(&Number::parse(b).unwrap())
                .map(|n| n.as_str().to_string())
        };
        assert_eq!(sum("0.1", "0.2").as_deref(), Some("0.3"));
        assert_eq!(
            sum("12345678901234567890.5", "1").as_deref(),
            Some("12345678901234567891.5")
        );
        assert_eq!(sum("-2.50", "1.25").as_deref(), Some("-1.25"));
        assert_eq!(sum("40", "2").as_deref(), Some("42"));
        assert_eq!(sum("1.5e3", "0.5").as_deref(), Some("1500.5"));
    }

    #[test]
    fn sums_past_decimal_precision_are_refused() {
        let huge = Number::parse("0.12345678901234567890123456789012345").unwrap();
        assert_eq!(huge.checked_add(&Number::parse("0.5").unwrap()), None);
        let max = Number::from_i128(i128::MAX);
        assert_eq!(max.checked_add(&Number::from(1i64)), None);
    }

    #[test]
    fn decimals_compare_exactly() {
        let a = Number::parse("12345678901234567890.1").unwrap();
        let b = Number::parse("12345678901234567890.2").unwrap();
        assert_eq!(a.cmp_numeric(&b), Ordering::Less);
        assert_eq!(
            Number::parse("1.0").unwrap().cmp_numeric(&Number::from(1i64)),
            Ordering::Equal
        );
    }

    #[test]
    fn serde_uses_plain_string() {
        let n = Number::parse("3.25").unwrap();
        assert_eq!(serde_json::to_string(&n).unwrap(), "\"3.25\"");
        let back: Number = serde_json::from_str("\"3.25\"").unwrap();
        assert_eq!(back, n);
        assert!(serde_json::from_str::<Number>("\"x\"").is_err());
    }

    proptest! {
        #[test]
        fn finite_floats_survive_text(v in proptest::num::f64::NORMAL | proptest::num::f64::ZERO) {
            let n = Number::from_f64(v).unwrap();
            prop_assert_eq!(n.parse_as::<f64>().unwrap(), v);
        }

        #[test]
        fn integers_survive_text(v in any::<i64>()) {
            let n = Number::from(v);
            prop_assert_eq!(n.parse_as::<i64>().unwrap(), v);
        }
    }
}

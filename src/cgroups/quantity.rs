//! Resource quantities as they appear in pod specs
//!
//! A `Quantity` stores its amount in milli-units so that both CPU
//! (`100m` = a tenth of a core) and memory (`100Mi` bytes) share one exact
//! integer representation.
//!
//! ```text
//! "100m"  → 100 milli       milli_value() = 100     value() = 1
//! "2"     → 2000 milli      milli_value() = 2000    value() = 2
//! "100Mi" → 104857600000    milli_value() = ...     value() = 104857600
//! ```

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::QuantityError;

/// Milli-units per whole unit
const MILLI: i128 = 1000;

/// Binary suffixes, largest first so Display picks the widest exact one
const BINARY_SUFFIXES: [(&str, i128); 6] = [
    ("Ei", 1 << 60),
    ("Pi", 1 << 50),
    ("Ti", 1 << 40),
    ("Gi", 1 << 30),
    ("Mi", 1 << 20),
    ("Ki", 1 << 10),
];

/// Decimal SI suffixes
const DECIMAL_SUFFIXES: [(&str, i128); 6] = [
    ("E", 1_000_000_000_000_000_000),
    ("P", 1_000_000_000_000_000),
    ("T", 1_000_000_000_000),
    ("G", 1_000_000_000),
    ("M", 1_000_000),
    ("k", 1_000),
];

/// A non-negative resource amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity {
    milli: i64,
}

impl Quantity {
    /// The zero quantity
    pub const ZERO: Quantity = Quantity { milli: 0 };

    /// Build from milli-units. Negative input is clamped to zero.
    pub fn from_milli(milli: i64) -> Self {
        Self {
            milli: milli.max(0),
        }
    }

    /// Build from whole units (cores, bytes). Saturates on overflow.
    pub fn from_value(value: i64) -> Self {
        Self::from_milli(value.saturating_mul(MILLI as i64))
    }

    /// Amount in milli-units, e.g. `250` for `250m`.
    pub fn milli_value(&self) -> i64 {
        self.milli
    }

    /// Amount in whole units, rounded up.
    pub fn value(&self) -> i64 {
        // milli is never negative, so this is a ceiling division
        self.milli / MILLI as i64 + i64::from(self.milli % MILLI as i64 != 0)
    }

    pub fn is_zero(&self) -> bool {
        self.milli == 0
    }

    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity {
            milli: self.milli.saturating_add(other.milli),
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, other: Quantity) -> Quantity {
        self.saturating_add(other)
    }
}

/// Scale of a suffix as a fraction `(numerator, denominator)` of
/// milli-units per unit of the number in front of it
fn suffix_multiplier(suffix: &str) -> Option<Result<(i128, i128), ()>> {
    match suffix {
        "" => Some(Ok((MILLI, 1))),
        "m" => Some(Ok((1, 1))),
        _ => {
            if let Some(exp) = decimal_exponent(suffix) {
                return Some(exponent_multiplier(exp));
            }
            BINARY_SUFFIXES
                .iter()
                .chain(DECIMAL_SUFFIXES.iter())
                .find(|(s, _)| *s == suffix)
                .map(|(_, factor)| Ok((factor * MILLI, 1)))
        }
    }
}

/// `e3`, `E-2`: a decimal exponent. A bare `E` is the exa suffix.
fn decimal_exponent(suffix: &str) -> Option<i32> {
    let digits = suffix.strip_prefix(|c: char| c == 'e' || c == 'E')?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn exponent_multiplier(exp: i32) -> Result<(i128, i128), ()> {
    // Milli-units add three to the exponent
    let exp = exp.checked_add(3).ok_or(())?;
    let power = |e: i32| 10_i128.checked_pow(e.unsigned_abs()).ok_or(());
    if exp >= 0 {
        Ok((power(exp)?, 1))
    } else {
        Ok((1, power(exp)?))
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() {
            return Err(QuantityError::Empty);
        }
        if s.starts_with('-') {
            return Err(QuantityError::Negative(input.to_string()));
        }
        let s = s.strip_prefix('+').unwrap_or(s);
        let overflow = || QuantityError::Overflow(input.to_string());
        let invalid = || QuantityError::InvalidNumber(input.to_string());

        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, suffix) = s.split_at(split);

        let (num, den) = suffix_multiplier(suffix)
            .ok_or_else(|| QuantityError::UnknownSuffix {
                input: input.to_string(),
                suffix: suffix.to_string(),
            })?
            .map_err(|()| overflow())?;

        let (whole, fraction) = match number.split_once('.') {
            Some((w, f)) => (w, f),
            None => (number, ""),
        };
        if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
            return Err(invalid());
        }
        let parse = |digits: &str| -> Result<i128, QuantityError> {
            if digits.is_empty() {
                Ok(0)
            } else {
                digits.parse().map_err(|_| invalid())
            }
        };

        // whole.fraction == mantissa / scale
        let digits = u32::try_from(fraction.len()).map_err(|_| overflow())?;
        let scale = 10_i128.checked_pow(digits).ok_or_else(overflow)?;
        let fraction = parse(fraction)?;
        let mantissa = parse(whole)?
            .checked_mul(scale)
            .and_then(|w| w.checked_add(fraction))
            .ok_or_else(overflow)?;

        let numerator = mantissa.checked_mul(num).ok_or_else(overflow)?;
        let denominator = scale.checked_mul(den).ok_or_else(overflow)?;
        // Anything finer than a milli-unit rounds up
        let milli = numerator / denominator + i128::from(numerator % denominator != 0);

        let milli = i64::try_from(milli).map_err(|_| overflow())?;
        Ok(Quantity { milli })
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let milli = i128::from(self.milli);
        if milli % MILLI != 0 {
            return write!(f, "{}m", milli);
        }
        let value = milli / MILLI;
        for (suffix, factor) in BINARY_SUFFIXES {
            if value >= factor && value % factor == 0 {
                return write!(f, "{}{}", value / factor, suffix);
            }
        }
        write!(f, "{}", value)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quantity such as \"100m\", \"2\" or \"10Gi\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        let v = i64::try_from(v).map_err(E::custom)?;
        Ok(Quantity::from_value(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
        if !v.is_finite() {
            return Err(E::custom(QuantityError::InvalidNumber(v.to_string())));
        }
        // f64 Display never uses exponent notation, so the string parser
        // handles it exactly
        v.to_string().parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        if v < 0 {
            return Err(E::custom(QuantityError::Negative(v.to_string())));
        }
        Ok(Quantity::from_value(v))
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

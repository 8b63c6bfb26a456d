//! Fixed-point math utilities for deterministic rules evaluation.
//!
//! Damage multipliers, ranges and distances use fixed-point arithmetic
//! so that two machines resolving the same attack agree bit for bit.
//! Designer-facing tunables are stored as integer percentages and
//! converted here.

use fixed::types::I32F32;

/// Fixed-point number type for all rules math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Convert an integer percentage into a fixed-point fraction (`150` -> `1.5`).
#[must_use]
pub fn percent(value: i32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Round a fixed-point value to the nearest integer, clamped at zero.
#[must_use]
pub fn round_to_u32(value: Fixed) -> u32 {
    if value <= Fixed::ZERO {
        return 0;
    }
    let rounded: i64 = value.round().to_num();
    rounded.clamp(0, i64::from(u32::MAX)) as u32
}

/// Computes the square root of a fixed-point number.
///
/// Works on the raw bits so perfect squares come out exact and the result
/// is the floor of the true root at fixed-point resolution.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }
    // sqrt(bits / 2^32) * 2^32 == sqrt(bits * 2^32)
    let scaled = (value.to_bits() as u128) << Fixed::FRAC_NBITS;
    let root = isqrt(scaled);
    Fixed::from_bits(i64::try_from(root).unwrap_or(i64::MAX))
}

/// Integer square root (floor) by Newton iteration.
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let shift = (128 - n.leading_zeros()).div_ceil(2);
    let mut x = 1u128 << shift;
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

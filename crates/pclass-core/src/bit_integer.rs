//! Integers with an explicit serialized bit width.
//!
//! [`BitInteger<N, SIGNED>`] stores an `N`-bit two's complement (or unsigned)
//! integer. Its value is always kept within range: construction from a wider
//! integer wraps to the low `N` bits, the way a native narrowing conversion
//! would. The aliases [`Bi`] and [`Bui`] name the signed and unsigned forms.

use std::fmt;

/// An `N`-bit integer, `1 <= N <= 64`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitInteger<const N: u32, const SIGNED: bool> {
    /// Raw bits; only the low `N` bits may be set.
    bits: u64,
}

/// A signed `N`-bit integer.
pub type Bi<const N: u32> = BitInteger<N, true>;

/// An unsigned `N`-bit integer.
pub type Bui<const N: u32> = BitInteger<N, false>;

impl<const N: u32, const SIGNED: bool> BitInteger<N, SIGNED> {
    /// Serialized width in bits.
    pub const BITS: u32 = N;

    /// Mask covering the low `N` bits.
    pub const MASK: u64 = if N >= 64 { u64::MAX } else { (1u64 << N) - 1 };

    /// Build from raw bits, discarding everything above bit `N`.
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self { bits: bits & Self::MASK }
    }

    /// Build from a signed integer, wrapping to `N` bits.
    #[inline]
    pub const fn from_i64(value: i64) -> Self {
        Self::from_bits(value as u64)
    }

    /// Build from an unsigned integer, wrapping to `N` bits.
    #[inline]
    pub const fn from_u64(value: u64) -> Self {
        Self::from_bits(value)
    }

    /// The raw `N` bits.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.bits
    }

    /// The value as a signed integer (sign-extended when `SIGNED`).
    #[inline]
    pub const fn to_i64(self) -> i64 {
        if SIGNED && N < 64 {
            let shift = 64 - N;
            ((self.bits << shift) as i64) >> shift
        } else {
            self.bits as i64
        }
    }

    /// The value as an unsigned integer.
    ///
    /// Negative signed values are sign-extended first, like `i64 as u64`.
    #[inline]
    pub const fn to_u64(self) -> u64 {
        self.to_i64() as u64
    }

    /// Smallest representable value.
    pub const fn min_value() -> i64 {
        if SIGNED { Self::from_bits(1u64 << (N - 1)).to_i64() } else { 0 }
    }

    /// Largest representable value, as raw bits.
    pub const fn max_value() -> u64 {
        if SIGNED { Self::MASK >> 1 } else { Self::MASK }
    }
}

impl<const N: u32, const SIGNED: bool> fmt::Debug for BitInteger<N, SIGNED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if SIGNED { "bi" } else { "bui" };
        if SIGNED {
            write!(f, "{prefix}{N}({})", self.to_i64())
        } else {
            write!(f, "{prefix}{N}({})", self.bits)
        }
    }
}

impl<const N: u32, const SIGNED: bool> fmt::Display for BitInteger<N, SIGNED> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if SIGNED {
            write!(f, "{}", self.to_i64())
        } else {
            write!(f, "{}", self.bits)
        }
    }
}

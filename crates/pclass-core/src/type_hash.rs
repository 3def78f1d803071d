//! Deterministic hash-based type identity.
//!
//! This module provides [`TypeHash`], the 32-bit identity every registered
//! type carries on the wire. Hashes are computed from the type name by a
//! [`HashCalculator`] owned by the [`TypeSystem`](crate::TypeSystem), so that
//! two independently built programs agree on the identity of a type as long
//! as they agree on its name and on the calculator.
//!
//! # Hash Computation
//!
//! The default calculator is [`XxHashCalculator`] (XXH32). The
//! [`LegacyHashCalculator`] reproduces the shift/xor string hash used by
//! older data files and clients.
//!
//! # Examples
//!
//! ```
//! use pclass_core::{HashCalculator, XxHashCalculator};
//!
//! let calc = XxHashCalculator;
//! let a = calc.calculate_type_hash("class Foo");
//! let b = calc.calculate_type_hash("class Foo");
//! assert_eq!(a, b); // Deterministic
//! ```

use std::fmt;
use xxhash_rust::xxh32::xxh32;

/// Seed mixed into every XXH32 type hash.
pub const TYPE_HASH_SEED: u32 = 0x2fac_10b6;

/// A deterministic 32-bit hash identifying a registered type.
///
/// The value `0` is reserved: it encodes a null object in serialized data and
/// is never assigned to a registered type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u32);

impl TypeHash {
    /// The null-object sentinel.
    pub const NULL: TypeHash = TypeHash(0);

    /// Check if this is the null sentinel.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#010x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for TypeHash {
    fn from(value: u32) -> Self {
        TypeHash(value)
    }
}

/// Strategy turning type names into [`TypeHash`] values.
///
/// A [`TypeSystem`](crate::TypeSystem) owns exactly one calculator for its
/// whole lifetime; every type it registers is hashed with it.
pub trait HashCalculator: Send + Sync {
    /// Compute the hash of a type name.
    fn calculate_type_hash(&self, name: &str) -> TypeHash;
}

/// The default calculator, built on XXH32.
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHashCalculator;

impl HashCalculator for XxHashCalculator {
    #[inline]
    fn calculate_type_hash(&self, name: &str) -> TypeHash {
        TypeHash(xxh32(name.as_bytes(), TYPE_HASH_SEED))
    }
}

/// The shift/xor string hash found in legacy data files.
///
/// Each character (offset by 32) is folded into the accumulator at a
/// rotating 5-bit stride; the result is made non-negative at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyHashCalculator;

impl HashCalculator for LegacyHashCalculator {
    fn calculate_type_hash(&self, name: &str) -> TypeHash {
        let mut result: i32 = 0;
        let mut a: i32 = 0;
        let mut b: i32 = 32;

        for byte in name.bytes() {
            let ch = i32::from(byte) - 32;
            result ^= ch.wrapping_shl(a as u32);
            if a > 24 {
                result ^= ch.wrapping_shr(b as u32);
                if a >= 27 {
                    a -= 32;
                    b += 32;
                }
            }
            a += 5;
            b -= 5;
        }

        if result < 0 {
            result = result.wrapping_neg();
        }
        TypeHash(result as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xxhash_is_deterministic() {
        let calc = XxHashCalculator;
        assert_eq!(calc.calculate_type_hash("int"), calc.calculate_type_hash("int"));
        assert_ne!(calc.calculate_type_hash("int"), calc.calculate_type_hash("float"));
    }

    #[test]
    fn legacy_hash_is_deterministic_and_non_negative() {
        let calc = LegacyHashCalculator;
        let names = ["class Foo", "class ClientObject", "std::string", "unsigned int", ""];
        for name in names {
            let hash = calc.calculate_type_hash(name);
            assert_eq!(hash, calc.calculate_type_hash(name));
            assert!(hash.0 <= i32::MAX as u32 + 1, "{name} hashed to {hash}");
        }
    }

    #[test]
    fn legacy_hash_of_empty_name_is_null() {
        assert!(LegacyHashCalculator.calculate_type_hash("").is_null());
    }

    #[test]
    fn legacy_hash_single_character() {
        // 'A' - 32 = 33, folded in at shift 0.
        assert_eq!(LegacyHashCalculator.calculate_type_hash("A"), TypeHash(33));
        // 'A' then 'B': 33 ^ (34 << 5)
        assert_eq!(
            LegacyHashCalculator.calculate_type_hash("AB"),
            TypeHash(33 ^ (34 << 5))
        );
    }

    #[test]
    fn display_and_debug() {
        let hash = TypeHash(0x1234);
        assert_eq!(format!("{}", hash), "0x00001234");
        assert_eq!(format!("{:?}", hash), "TypeHash(0x00001234)");
    }

    #[test]
    fn null_sentinel() {
        assert!(TypeHash::NULL.is_null());
        assert!(!TypeHash(1).is_null());
        assert_eq!(TypeHash::default(), TypeHash::NULL);
    }
}

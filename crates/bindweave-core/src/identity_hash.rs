//! Deterministic hash-based identities.
//!
//! [`IdentityHash`] is a 64-bit hash computed from names and argument
//! lists. The same (class, arguments) pair always hashes the same way, in
//! every run and on every machine. The instantiation graph keys its memo
//! table by this hash.
//!
//! # Hash Computation
//!
//! Uses XXHash64 over the class name, folded with one mixing constant per
//! argument position so argument order matters.
//!
//! # Examples
//!
//! ```
//! use bindweave_core::{IdentityHash, TemplateArg};
//!
//! let a = IdentityHash::from_instance("AbstractMesh", &[TemplateArg::Int(2), TemplateArg::Int(3)]);
//! let b = IdentityHash::from_instance("AbstractMesh", &[TemplateArg::Int(3), TemplateArg::Int(2)]);
//! assert_ne!(a, b); // argument order matters
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

use crate::TemplateArg;

/// Mixing constants for hash computation.
mod hash_constants {
    /// Separator constant for sequence components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for class names.
    pub const CLASS: u64 = 0x2fac10b63a6cc57c;

    /// Position mixing constants. Each position gets its own constant so
    /// that order matters.
    pub const POSITION_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct IdentityHash(pub u64);

impl IdentityHash {
    /// Hash a bare class name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        IdentityHash(hash_constants::CLASS ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash a concrete instantiation: class name plus ordered arguments.
    ///
    /// A non-generic class hashes the same as [`IdentityHash::from_name`].
    #[inline]
    pub fn from_instance(class: &str, args: &[TemplateArg]) -> Self {
        let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Self::from_name(class).mix(&parts)
    }

    fn mix(self, parts: &[String]) -> Self {
        let mut hash = self.0;
        for (i, part) in parts.iter().enumerate() {
            let marker = hash_constants::POSITION_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::POSITION_MARKERS[0].wrapping_add(i as u64));
            // wrapping_mul keeps the fold non-commutative
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(marker ^ xxh64(part.as_bytes(), 0));
        }
        IdentityHash(hash)
    }
}

impl fmt::Debug for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityHash({:#018x})", self.0)
    }
}

impl fmt::Display for IdentityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

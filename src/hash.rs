// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! The family of hash functions used to pick bit positions.
use std::hash::Hasher;

use siphasher::sip::SipHasher13;

/// Derives `nhashes` bit positions in `[0, nbits)` from an item.
///
/// The `i`-th function is SipHash-1-3 keyed with `(i, 0)`, so every function
/// in the family is an independently seeded instance of the same hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashFamily {
    nhashes: usize,
    nbits: u64,
}

impl HashFamily {
    /// Create a family of `nhashes` functions over a bit array of `nbits` bits.
    ///
    /// # Panics
    ///
    /// Panics if `nbits` is zero.
    pub fn new(nhashes: usize, nbits: usize) -> Self {
        assert!(nbits > 0, "a hash family needs at least one bit position");

        Self {
            nhashes,
            nbits: nbits as u64,
        }
    }

    /// Number of functions in the family (`k`).
    pub fn len(&self) -> usize {
        self.nhashes
    }

    /// Whether the family has no functions.
    pub fn is_empty(&self) -> bool {
        self.nhashes == 0
    }

    /// Position chosen for `item` by the function with the given seed.
    pub fn index(&self, item: &[u8], seed: u64) -> usize {
        (hash(item, seed) % self.nbits) as usize
    }

    /// Positions chosen for `item` by every function in the family, in seed order.
    pub fn indexes<'a>(&self, item: &'a [u8]) -> impl Iterator<Item = usize> + 'a {
        let family = *self;
        (0..self.nhashes as u64).map(move |seed| family.index(item, seed))
    }
}

/// Seeded 64-bit hash of a byte string.
pub fn hash(item: &[u8], seed: u64) -> u64 {
    let mut sip = SipHasher13::new_with_keys(seed, 0);
    sip.write(item);
    sip.finish()
}

// Copyright (c) 2020 Helge Wrede, Alexander Schultheiß, Lukas Simon
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Bit vector functionality.
use std::fmt::Debug;

use crate::error::{Error, Result};

/// A packed bit vector.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
/// first. This is also the serialized layout.
#[derive(Clone, PartialEq, Eq)]
pub struct BitVec {
    bytes: Vec<u8>,
    nbits: usize,
}

impl BitVec {
    /// Create a new bit vector of the given length, in bits. All bits are zero.
    pub fn new(nbits: usize) -> Self {
        Self {
            nbits,
            bytes: vec![0; byte_len(nbits)],
        }
    }

    /// Reconstruct a bit vector of exactly `nbits` bits from packed bytes.
    ///
    /// Bytes past `⌈nbits / 8⌉` and padding bits in the last byte are ignored.
    /// Fails if there are fewer than `⌈nbits / 8⌉` bytes.
    pub fn from_bytes(bytes: &[u8], nbits: usize) -> Result<Self> {
        let len = byte_len(nbits);
        if bytes.len() < len {
            return Err(Error::format(format!(
                "expected at least {} bytes for {} bits, got {}",
                len,
                nbits,
                bytes.len()
            )));
        }
        let mut bytes = bytes[..len].to_vec();
        let tail = nbits % 8;

        if tail != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }
        Ok(Self { bytes, nbits })
    }

    /// Get the length in bits of the vector.
    pub fn len(&self) -> usize {
        self.nbits
    }

    /// Check whether this vector is empty, ie. has a length of zero.
    pub fn is_empty(&self) -> bool {
        self.nbits == 0
    }

    /// Get the value of a single bit.
    pub fn get(&self, index: usize) -> Result<bool> {
        self.check(index)?;
        Ok(self.is_set(index))
    }

    /// Set a single bit to `value`.
    pub fn set(&mut self, index: usize, value: bool) -> Result<()> {
        self.check(index)?;

        let mask = 0x01 << (index % 8);
        if value {
            self.bytes[index / 8] |= mask;
        } else {
            self.bytes[index / 8] &= !mask;
        }
        Ok(())
    }

    /// Count the number of `1` bits.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Count the number of `0` bits.
    pub fn count_zeros(&self) -> usize {
        self.len() - self.count_ones()
    }

    /// Return the underlying bytes storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Return the packed bytes, with the last byte zero-padded.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Set a bit whose index is known to be in range.
    pub(crate) fn insert(&mut self, index: usize) {
        debug_assert!(index < self.nbits);
        self.bytes[index / 8] |= 0x01 << (index % 8);
    }

    /// Check a bit whose index is known to be in range.
    pub(crate) fn is_set(&self, index: usize) -> bool {
        debug_assert!(index < self.nbits);
        let mask = 0x01 << (index % 8);
        self.bytes[index / 8] & mask == mask
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.nbits {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.nbits,
            });
        }
        Ok(())
    }
}

/// Number of bytes needed to hold `nbits` bits.
pub(crate) fn byte_len(nbits: usize) -> usize {
    nbits.div_ceil(8)
}

impl Debug for BitVec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BitVec(len={}, ones={})", self.nbits, self.count_ones())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitvec_with_length() {
        let bitvec = BitVec::new(1);
        assert_eq!(1, bitvec.len());
        assert_eq!(1, bitvec.bytes.len());

        let bitvec = BitVec::new(8);
        assert_eq!(8, bitvec.len());
        assert_eq!(1, bitvec.bytes.len());

        let bitvec = BitVec::new(9);
        assert_eq!(9, bitvec.len());
        assert_eq!(2, bitvec.bytes.len());

        assert!(BitVec::new(0).is_empty());
    }

    #[test]
    fn set_first_bit_only() {
        let mut bitvec = BitVec::new(3);
        bitvec.set(0, true).unwrap();
        assert_eq!(true, bitvec.get(0).unwrap());
        assert_eq!(false, bitvec.get(1).unwrap());
        assert_eq!(false, bitvec.get(2).unwrap());
    }

    #[test]
    fn set_last_bit_only() {
        let mut bitvec = BitVec::new(9);
        bitvec.set(8, true).unwrap();
        for i in 0..8 {
            assert_eq!(false, bitvec.get(i).unwrap());
        }
        assert_eq!(true, bitvec.get(8).unwrap());
    }

    #[test]
    fn set_and_unset() {
        let mut bitvec = BitVec::new(24);
        bitvec.set(7, true).unwrap();
        bitvec.set(23, true).unwrap();
        assert_eq!(2, bitvec.count_ones());

        bitvec.set(7, false).unwrap();
        assert_eq!(false, bitvec.get(7).unwrap());
        assert_eq!(true, bitvec.get(23).unwrap());
        assert_eq!(1, bitvec.count_ones());
        assert_eq!(23, bitvec.count_zeros());
    }

    #[test]
    fn must_set_with_correct_index() {
        let err = BitVec::new(5).set(5, true).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 5, len: 5 }));
    }

    #[test]
    fn must_get_with_correct_index() {
        let err = BitVec::new(12).get(12).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 12, len: 12 }));
    }

    #[test]
    fn to_bytes_is_lsb_first() {
        let mut bitvec = BitVec::new(10);
        bitvec.set(0, true).unwrap();
        bitvec.set(3, true).unwrap();
        bitvec.set(9, true).unwrap();

        assert_eq!(bitvec.to_bytes(), vec![0b0000_1001, 0b0000_0010]);
    }

    #[test]
    fn from_bytes_ignores_padding() {
        let bitvec = BitVec::from_bytes(&[0xff, 0xff, 0xab], 12).unwrap();

        assert_eq!(12, bitvec.len());
        assert_eq!(12, bitvec.count_ones());
        assert_eq!(bitvec.to_bytes(), vec![0xff, 0x0f]);
    }

    #[test]
    fn from_bytes_too_short() {
        let err = BitVec::from_bytes(&[0xff], 9).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn bytes_round_trip() {
        let rng = fastrand::Rng::with_seed(7);
        let mut bitvec = BitVec::new(1001);
        for _ in 0..300 {
            bitvec.set(rng.usize(..1001), true).unwrap();
        }
        let restored = BitVec::from_bytes(&bitvec.to_bytes(), 1001).unwrap();

        assert_eq!(bitvec, restored);
    }
}

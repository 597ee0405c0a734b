// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! A fixed-capacity Bloom filter with seeded hash functions.

use std::f64;
use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::bitvec::{byte_len, BitVec};
use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::hash::HashFamily;

/// The default false positive probability value, one in a million.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 1e-6;

/// Size of the serialized header, in bytes.
pub const HEADER_LEN: usize = 5 * 8;

/// `ln` squared.
const LN_SQR: f64 = f64::consts::LN_2 * f64::consts::LN_2;

/// A Bloom filter holding up to a fixed number of distinct items.
///
/// Items are byte strings. Once [`BloomFilter::capacity`] items have been
/// accepted the filter is *sealed*, and further calls to [`BloomFilter::add`]
/// do nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilter {
    bits: BitVec,
    hashers: HashFamily,
    capacity: usize,
    fp_rate: f64,
    count: usize,
}

impl BloomFilter {
    /// Return a new Bloom filter with a given item capacity.
    /// The false positive probability is set to [`DEFAULT_FALSE_POSITIVE_RATE`].
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> BloomFilter {
        BloomFilter::with_rate(capacity, DEFAULT_FALSE_POSITIVE_RATE)
    }

    /// Return a new Bloom filter with a given item capacity
    /// and a desired false positive rate at that capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or `fp_rate` is not strictly between 0 and 1.
    pub fn with_rate(capacity: usize, fp_rate: f64) -> BloomFilter {
        assert!(capacity > 0, "capacity must be greater than 0");
        assert!(
            fp_rate > 0. && fp_rate < 1.,
            "fp_rate must be between 0.0 and 1.0 (exclusive), got {}",
            fp_rate
        );
        let nbits = optimal_bits(capacity, fp_rate);
        let nhashes = optimal_hashes(nbits, capacity);

        BloomFilter {
            bits: BitVec::new(nbits),
            hashers: HashFamily::new(nhashes, nbits),
            capacity,
            fp_rate,
            count: 0,
        }
    }

    /// Add an item to the Bloom filter.
    ///
    /// Returns `true` if the item was accepted. Nothing happens, and `false` is
    /// returned, if the item already tests positive or if the filter is full.
    pub fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) -> bool {
        let item = item.as_ref();

        if self.is_full() || self.contains(item) {
            return false;
        }
        for index in self.hashers.indexes(item) {
            self.bits.insert(index);
        }
        self.count += 1;

        if self.is_full() {
            trace!(capacity = self.capacity, "Bloom filter sealed");
        }
        true
    }

    /// Return whether or not a given item is likely in the Bloom filter or not. There is a
    /// possibility for a false positive with the probability being around the Bloom filter's `p`
    /// value, but a false negative will never occur.
    pub fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        self.hashers
            .indexes(item.as_ref())
            .all(|index| self.bits.is_set(index))
    }

    /// Number of items accepted so far.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no item has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether the filter has reached its capacity and accepts no more items.
    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Maximum number of items this filter accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Target false positive probability at full capacity.
    pub fn fp_rate(&self) -> f64 {
        self.fp_rate
    }

    /// Return the number of bits in this filter.
    pub fn bits(&self) -> usize {
        self.bits.len()
    }

    /// Number of hashes used (`k` parameter).
    pub fn hashes(&self) -> usize {
        self.hashers.len()
    }

    /// Fraction of bits set to `1`.
    pub fn fill_ratio(&self) -> f64 {
        self.bits.count_ones() as f64 / self.bits.len() as f64
    }

    /// Expected false positive probability given the number of items accepted so far.
    ///
    /// `(1 - e^(-kn/m))^k`
    pub fn estimated_fp_rate(&self) -> f64 {
        let k = self.hashes() as f64;
        let n = self.count as f64;
        let m = self.bits() as f64;

        (1. - (-k * n / m).exp()).powf(k)
    }

    /// Length in bytes of the serialized filter.
    pub fn record_len(&self) -> usize {
        HEADER_LEN + byte_len(self.bits.len())
    }

    /// Serialize the filter: a fixed header followed by the packed bits.
    ///
    /// ```text
    /// fp_rate: f64 | count: u64 | capacity: u64 | nbits: u64 | nhashes: u64 | bits
    /// ```
    ///
    /// All fields are little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(self.record_len());

        enc.write_f64_le(self.fp_rate);
        enc.write_u64_le(self.count as u64);
        enc.write_u64_le(self.capacity as u64);
        enc.write_u64_le(self.bits.len() as u64);
        enc.write_u64_le(self.hashes() as u64);
        enc.write(self.bits.as_bytes());

        enc.into_bytes()
    }

    /// Write the serialized filter to `writer`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;

        debug!(
            nbits = self.bits(),
            count = self.count,
            "Saved Bloom filter"
        );
        Ok(())
    }

    /// Read a filter written by [`BloomFilter::save`].
    ///
    /// If `byte_count` is given, exactly that many bytes (header included) are
    /// consumed from `reader`. Otherwise the rest of `reader` is consumed.
    pub fn load<R: Read + ?Sized>(reader: &mut R, byte_count: Option<u64>) -> Result<BloomFilter> {
        let mut dec = Decoder::new(reader);

        let fp_rate = dec.read_f64_le("fp_rate")?;
        let count = dec.read_u64_le("count")?;
        let capacity = dec.read_u64_le("capacity")?;
        let nbits = dec.read_u64_le("nbits")?;
        let nhashes = dec.read_u64_le("nhashes")?;

        if !(fp_rate > 0. && fp_rate < 1.) {
            return Err(Error::format(format!("invalid fp_rate {}", fp_rate)));
        }
        if capacity == 0 || nbits == 0 || nhashes == 0 {
            return Err(Error::format(format!(
                "zero-sized filter: capacity={}, nbits={}, nhashes={}",
                capacity, nbits, nhashes
            )));
        }
        if count > capacity {
            return Err(Error::format(format!(
                "count {} exceeds capacity {}",
                count, capacity
            )));
        }
        if nhashes > nbits {
            return Err(Error::format(format!(
                "nhashes {} exceeds nbits {}",
                nhashes, nbits
            )));
        }
        let nbits = to_usize(nbits, "nbits")?;
        let expected = byte_len(nbits);

        let payload = match byte_count {
            Some(total) => {
                let len = total.checked_sub(HEADER_LEN as u64).ok_or_else(|| {
                    Error::format(format!(
                        "record length {} is shorter than the {} byte header",
                        total, HEADER_LEN
                    ))
                })?;
                let len = to_usize(len, "record length")?;
                if len != expected {
                    return Err(bit_length_mismatch(nbits, len));
                }
                dec.read_bytes(len, "bits")?
            }
            None => dec.read_to_end()?,
        };
        if payload.len() != expected {
            return Err(bit_length_mismatch(nbits, payload.len()));
        }
        let bits = BitVec::from_bytes(&payload, nbits)?;

        debug!(nbits, count, capacity, "Loaded Bloom filter");

        Ok(BloomFilter {
            bits,
            hashers: HashFamily::new(to_usize(nhashes, "nhashes")?, nbits),
            capacity: to_usize(capacity, "capacity")?,
            fp_rate,
            count: to_usize(count, "count")?,
        })
    }

    /// Deserialize a filter from a complete record.
    pub fn from_bytes(bytes: &[u8]) -> Result<BloomFilter> {
        let mut reader = bytes;
        BloomFilter::load(&mut reader, Some(bytes.len() as u64))
    }
}

fn bit_length_mismatch(nbits: usize, payload: usize) -> Error {
    Error::format(format!(
        "bit payload of {} bytes does not hold {} bits",
        payload, nbits
    ))
}

fn to_usize(n: u64, field: &'static str) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::format(format!("{} out of range: {}", field, n)))
}

/// Return the optimal bit vector size for a Bloom filter given an approximate
/// size and a desired false positive rate.
pub fn optimal_bits(capacity: usize, fp_rate: f64) -> usize {
    (-((fp_rate.ln() * (capacity as f64)) / LN_SQR)).ceil() as usize
}

/// Return the optimal number of hash functions for a Bloom filter given a
/// bit vector size and an approximate set size. Never less than one.
///
/// Also called `k`.
pub fn optimal_hashes(nbits: usize, capacity: usize) -> usize {
    let k = ((nbits as f64) * f64::consts::LN_2 / (capacity as f64)).round() as usize;
    k.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::iter;

    fn key(rng: &fastrand::Rng) -> String {
        iter::repeat_with(|| rng.alphanumeric()).take(32).collect()
    }

    fn items(rng: &fastrand::Rng, size: usize) -> Vec<String> {
        let mut items = HashSet::<String>::new();
        while items.len() < size {
            items.insert(key(rng));
        }
        items.into_iter().collect()
    }

    #[test]
    fn test_bloom_filter() {
        let rng = fastrand::Rng::new();
        let n = 1024;
        let items = items(&rng, n);
        let mut bf = BloomFilter::new(items.len());

        // Test inclusion.
        for item in items.iter() {
            bf.add(item);

            assert_eq!(
                bf.contains(item),
                true,
                "item {} should result in a positive inclusion",
                item,
            );
        }

        // Test false negatives.
        for item in items.iter() {
            assert_eq!(bf.contains(item), true, "item {} resulted in a false negative", item);
        }
        assert!(bf.len() <= n);
    }

    #[test]
    fn test_sizing_example() {
        let mut bf = BloomFilter::with_rate(1000, 1e-6);

        assert_eq!(bf.bits(), 28756);
        assert_eq!(bf.hashes(), 20);
        assert_eq!(bf.capacity(), 1000);
        assert_eq!(bf.fp_rate(), 1e-6);

        assert!(bf.add("dog"));
        assert!(bf.contains("dog"));
        assert!(!bf.contains("zzz-not-inserted"));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut bf = BloomFilter::with_rate(10, 0.01);

        assert!(bf.add("cat"));
        let snapshot = bf.clone();

        assert!(!bf.add("cat"));
        assert_eq!(bf, snapshot);
        assert_eq!(bf.len(), 1);
    }

    #[test]
    fn test_capacity_bound() {
        let mut bf = BloomFilter::with_rate(5, 1e-4);

        for i in 0..50 {
            bf.add(&format!("item-{}", i));
            assert!(bf.len() <= bf.capacity());
        }
        assert!(bf.is_full());
        assert_eq!(bf.len(), 5);

        // A sealed filter ignores new items.
        let before = bf.clone();
        assert!(!bf.add("one-more"));
        assert_eq!(bf, before);
    }

    #[test]
    fn test_false_positive_rate() {
        let rng = fastrand::Rng::with_seed(42);
        let capacity = 1000;
        let p = 0.01;
        let mut bf = BloomFilter::with_rate(capacity, p);

        for item in items(&rng, capacity) {
            bf.add(&format!("in-{}", item));
        }
        let trials = 20_000;
        let false_positives = (0..trials)
            .filter(|_| bf.contains(&format!("out-{}", key(&rng))))
            .count();
        let observed = false_positives as f64 / trials as f64;

        assert!(observed < p * 5., "observed false positive rate {}", observed);
    }

    #[test]
    fn test_statistics() {
        let mut bf = BloomFilter::with_rate(100, 0.01);
        assert_eq!(bf.fill_ratio(), 0.0);
        assert_eq!(bf.estimated_fp_rate(), 0.0);
        assert!(bf.is_empty());

        for i in 0..100 {
            bf.add(&i.to_string());
        }
        assert!(bf.fill_ratio() > 0.3 && bf.fill_ratio() < 0.7);

        let estimate = bf.estimated_fp_rate();
        assert!(estimate > 0.005 && estimate < 0.02, "estimate {}", estimate);
    }

    #[test]
    fn test_optimal_bits() {
        assert_eq!(optimal_bits(10, 0.04), 67);
        assert_eq!(optimal_bits(5000, 0.01), 47926);
        assert_eq!(optimal_bits(100000, 0.01), 958506);
        assert_eq!(optimal_bits(1000, 1e-6), 28756);
    }

    #[test]
    fn test_optimal_hashes() {
        assert_eq!(optimal_hashes(67, 10), 5);
        assert_eq!(optimal_hashes(47926, 5000), 7);
        assert_eq!(optimal_hashes(958506, 100000), 7);
        assert_eq!(optimal_hashes(28756, 1000), 20);
        assert_eq!(optimal_hashes(1, 1000), 1);
    }

    #[test]
    fn test_header_layout() {
        let mut bf = BloomFilter::with_rate(10, 0.5);
        bf.add("a");
        let bytes = bf.to_bytes();

        assert_eq!(bytes.len(), bf.record_len());
        assert_eq!(&bytes[0..8], &0.5f64.to_le_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &10u64.to_le_bytes());
        assert_eq!(&bytes[24..32], &(bf.bits() as u64).to_le_bytes());
        assert_eq!(&bytes[32..40], &(bf.hashes() as u64).to_le_bytes());
        assert_eq!(bytes.len() - HEADER_LEN, (bf.bits() + 7) / 8);
    }

    #[test]
    fn test_save_load() {
        let rng = fastrand::Rng::new();
        let items = items(&rng, 200);
        let mut bf = BloomFilter::with_rate(300, 1e-3);
        for item in &items {
            bf.add(item);
        }

        let mut buf = Vec::new();
        bf.save(&mut buf).unwrap();

        let restored = BloomFilter::load(&mut buf.as_slice(), None).unwrap();
        assert_eq!(bf, restored);
        for item in &items {
            assert!(restored.contains(item));
        }

        let restored = BloomFilter::load(&mut buf.as_slice(), Some(buf.len() as u64)).unwrap();
        assert_eq!(bf, restored);
        assert_eq!(BloomFilter::from_bytes(&buf).unwrap(), bf);
    }

    #[test]
    fn test_load_with_byte_count_leaves_rest() {
        let mut a = BloomFilter::with_rate(20, 0.1);
        a.add("a");
        let mut b = BloomFilter::with_rate(40, 0.01);
        b.add("b");

        let mut buf = a.to_bytes();
        buf.extend(b.to_bytes());

        let mut reader = buf.as_slice();
        let first = BloomFilter::load(&mut reader, Some(a.record_len() as u64)).unwrap();
        let second = BloomFilter::load(&mut reader, None).unwrap();

        assert_eq!(first, a);
        assert_eq!(second, b);
    }

    #[test]
    fn test_load_truncated_header() {
        let bf = BloomFilter::new(10);
        let bytes = bf.to_bytes();

        let err = BloomFilter::from_bytes(&bytes[..HEADER_LEN - 3]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_load_bit_length_mismatch() {
        let bf = BloomFilter::new(10);
        let mut bytes = bf.to_bytes();

        bytes.pop();
        assert!(matches!(
            BloomFilter::from_bytes(&bytes).unwrap_err(),
            Error::Format(_)
        ));
        assert!(matches!(
            BloomFilter::load(&mut bytes.as_slice(), None).unwrap_err(),
            Error::Format(_)
        ));

        bytes.extend([0, 0]);
        assert!(matches!(
            BloomFilter::from_bytes(&bytes).unwrap_err(),
            Error::Format(_)
        ));
    }

    #[test]
    fn test_load_short_byte_count() {
        let bf = BloomFilter::new(10);
        let bytes = bf.to_bytes();

        let err = BloomFilter::load(&mut bytes.as_slice(), Some(8)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_load_rejects_inconsistent_header() {
        let mut bf = BloomFilter::with_rate(2, 0.1);
        bf.add("x");
        let bytes = bf.to_bytes();

        // count > capacity
        let mut bad = bytes.clone();
        bad[8..16].copy_from_slice(&3u64.to_le_bytes());
        assert!(matches!(BloomFilter::from_bytes(&bad), Err(Error::Format(_))));

        // zero hashes
        let mut bad = bytes.clone();
        bad[32..40].copy_from_slice(&0u64.to_le_bytes());
        assert!(matches!(BloomFilter::from_bytes(&bad), Err(Error::Format(_))));

        // more hashes than bits
        let mut bad = bytes.clone();
        bad[32..40].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(
            BloomFilter::from_bytes(&bad),
            Err(Error::Format(ref msg)) if msg.contains("nhashes")
        ));

        // fp_rate out of range
        let mut bad = bytes;
        bad[0..8].copy_from_slice(&1.5f64.to_le_bytes());
        assert!(matches!(BloomFilter::from_bytes(&bad), Err(Error::Format(_))));
    }

    #[test]
    fn test_load_huge_bit_count_without_payload() {
        let nbits = 1u64 << 50;
        let mut header = Vec::with_capacity(HEADER_LEN);
        header.extend(0.01f64.to_le_bytes());
        header.extend(0u64.to_le_bytes());
        header.extend(1u64.to_le_bytes());
        header.extend(nbits.to_le_bytes());
        header.extend(1u64.to_le_bytes());

        let total = HEADER_LEN as u64 + nbits / 8;
        let err = BloomFilter::load(&mut header.as_slice(), Some(total)).unwrap_err();
        assert!(matches!(err, Error::Format(_)));

        let err = BloomFilter::load(&mut header.as_slice(), None).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than 0")]
    fn test_zero_capacity() {
        BloomFilter::new(0);
    }

    #[test]
    #[should_panic(expected = "fp_rate must be between")]
    fn test_invalid_fp_rate() {
        BloomFilter::with_rate(100, 1.5);
    }
}

// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Operations shared by every filter in this crate.
use std::io::{Read, Write};

use crate::bloom::BloomFilter;
use crate::error::Result;
use crate::scalable::ScalableBloomFilter;

/// A probabilistic set of byte strings that can be persisted.
///
/// Lets callers be written once for both [`BloomFilter`] and
/// [`ScalableBloomFilter`].
///
/// ```
/// use scalebloom::{BloomFilter, Filter, ScalableBloomFilter};
///
/// fn dedup<F: Filter>(filter: &mut F, words: &[&str]) -> usize {
///     words.iter().filter(|w| filter.add(*w)).count()
/// }
///
/// let words = ["dog", "cat", "dog"];
/// assert_eq!(dedup(&mut BloomFilter::new(10), &words), 2);
/// assert_eq!(dedup(&mut ScalableBloomFilter::new(1, 0.01), &words), 2);
/// ```
pub trait Filter: Sized {
    /// Add an item, returning whether it was accepted.
    fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) -> bool;

    /// Whether the item is likely in the set.
    fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool;

    /// Number of items accepted.
    fn len(&self) -> usize;

    /// Whether no item has been accepted.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Target false positive probability.
    fn fp_rate(&self) -> f64;

    /// Write the filter to `writer`.
    fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()>;

    /// Read a filter previously written with [`Filter::save`].
    ///
    /// A [`BloomFilter`] record carries no length of its own, so it consumes the
    /// rest of `reader`. A [`ScalableBloomFilter`] stops at the end of its
    /// record, leaving any following bytes unread.
    fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self>;
}

impl Filter for BloomFilter {
    fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) -> bool {
        BloomFilter::add(self, item)
    }

    fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        BloomFilter::contains(self, item)
    }

    fn len(&self) -> usize {
        BloomFilter::len(self)
    }

    fn fp_rate(&self) -> f64 {
        BloomFilter::fp_rate(self)
    }

    fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        BloomFilter::save(self, writer)
    }

    fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        BloomFilter::load(reader, None)
    }
}

impl Filter for ScalableBloomFilter {
    fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) -> bool {
        ScalableBloomFilter::add(self, item)
    }

    fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        ScalableBloomFilter::contains(self, item)
    }

    fn len(&self) -> usize {
        ScalableBloomFilter::len(self)
    }

    fn fp_rate(&self) -> f64 {
        ScalableBloomFilter::fp_rate(self)
    }

    fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        ScalableBloomFilter::save(self, writer)
    }

    fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        ScalableBloomFilter::load(reader)
    }
}

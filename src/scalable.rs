// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! A Bloom filter without a fixed capacity.
//!
//! A [`ScalableBloomFilter`] is a chain of [`BloomFilter`]s. Items go into the
//! newest filter; when it is full, a larger filter with a tighter false
//! positive rate is appended. Filter `i` has capacity `c₀·sⁱ` and false
//! positive rate `p₀·rⁱ`, where `s` is the growth rate and `r` the decay rate,
//! so the false positive rate of the whole chain converges as it grows.

use std::io::{Read, Write};

use tracing::debug;

use crate::bloom::BloomFilter;
use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result};

/// Default growth rate of the capacity of successive filters.
pub const DEFAULT_GROWTH_RATE: GrowthRate = GrowthRate::Small;

/// Default factor applied to the false positive rate of successive filters.
pub const DEFAULT_FP_DECAY_RATE: f64 = 0.9;

/// Size of the serialized header, in bytes, not counting the length table.
pub const HEADER_LEN: usize = 5 * 8;

/// Upper bound on filters pre-allocated while loading, whatever the header claims.
const MAX_PREALLOCATED_FILTERS: usize = 64;

/// How fast the capacity of successive filters grows.
///
/// Any multiplier can be passed where a growth rate is expected; these are the
/// two commonly used ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthRate {
    /// Each filter holds twice as many items as the previous one.
    Small,
    /// Each filter holds four times as many items as the previous one.
    Large,
}

impl From<GrowthRate> for u64 {
    fn from(rate: GrowthRate) -> u64 {
        match rate {
            GrowthRate::Small => 2,
            GrowthRate::Large => 4,
        }
    }
}

/// Configures and creates a [`ScalableBloomFilter`].
#[derive(Clone, Debug)]
pub struct Builder {
    initial_capacity: usize,
    initial_fp_rate: f64,
    growth_rate: u64,
    fp_decay_rate: f64,
}

impl Builder {
    /// Start from the capacity and false positive rate of the first filter.
    pub fn new(initial_capacity: usize, initial_fp_rate: f64) -> Self {
        Self {
            initial_capacity,
            initial_fp_rate,
            growth_rate: DEFAULT_GROWTH_RATE.into(),
            fp_decay_rate: DEFAULT_FP_DECAY_RATE,
        }
    }

    /// Set the capacity multiplier applied to each new filter.
    pub fn growth_rate(mut self, rate: impl Into<u64>) -> Self {
        self.growth_rate = rate.into();
        self
    }

    /// Set the factor applied to the false positive rate of each new filter.
    /// The rate never drops below [`f64::MIN_POSITIVE`].
    pub fn fp_decay_rate(mut self, rate: f64) -> Self {
        self.fp_decay_rate = rate;
        self
    }

    /// Build the filter, with its first sub-filter already allocated.
    ///
    /// # Panics
    ///
    /// Panics if the initial capacity is zero, if the initial false positive rate
    /// or the decay rate is not strictly between 0 and 1, or if the growth rate
    /// is zero.
    pub fn build(self) -> ScalableBloomFilter {
        assert!(self.growth_rate >= 1, "growth_rate must be at least 1");
        assert!(
            self.fp_decay_rate > 0. && self.fp_decay_rate < 1.,
            "fp_decay_rate must be between 0.0 and 1.0 (exclusive), got {}",
            self.fp_decay_rate
        );
        let first = BloomFilter::with_rate(self.initial_capacity, self.initial_fp_rate);

        ScalableBloomFilter {
            filters: vec![first],
            initial_capacity: self.initial_capacity,
            initial_fp_rate: self.initial_fp_rate,
            growth_rate: self.growth_rate,
            fp_decay_rate: self.fp_decay_rate,
        }
    }
}

/// A Bloom filter that grows as items are added.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalableBloomFilter {
    /// Oldest first. Never empty.
    filters: Vec<BloomFilter>,
    initial_capacity: usize,
    initial_fp_rate: f64,
    growth_rate: u64,
    fp_decay_rate: f64,
}

impl ScalableBloomFilter {
    /// Return a new filter using [`DEFAULT_GROWTH_RATE`] and [`DEFAULT_FP_DECAY_RATE`].
    ///
    /// # Panics
    ///
    /// See [`Builder::build`].
    pub fn new(initial_capacity: usize, initial_fp_rate: f64) -> Self {
        Builder::new(initial_capacity, initial_fp_rate).build()
    }

    /// Return a builder for a filter with a custom growth policy.
    ///
    /// ```
    /// use scalebloom::{GrowthRate, ScalableBloomFilter};
    ///
    /// let filter = ScalableBloomFilter::builder(100, 1e-7)
    ///     .growth_rate(GrowthRate::Large)
    ///     .fp_decay_rate(0.9)
    ///     .build();
    ///
    /// assert_eq!(filter.num_filters(), 1);
    /// ```
    pub fn builder(initial_capacity: usize, initial_fp_rate: f64) -> Builder {
        Builder::new(initial_capacity, initial_fp_rate)
    }

    /// Add an item.
    ///
    /// Returns `false` without changing anything if the item already tests
    /// positive. Otherwise the item goes into the newest filter, after a new
    /// one is appended if the newest is full.
    pub fn add<T: AsRef<[u8]> + ?Sized>(&mut self, item: &T) -> bool {
        let item = item.as_ref();

        if self.contains(item) {
            return false;
        }
        if self.last().is_full() {
            self.grow();
        }
        let last = self.filters.len() - 1;
        self.filters[last].add(item)
    }

    /// Whether the item is likely in the filter. Never returns a false negative.
    pub fn contains<T: AsRef<[u8]> + ?Sized>(&self, item: &T) -> bool {
        let item = item.as_ref();
        // Recently added items are the most likely to be queried.
        self.filters.iter().rev().any(|f| f.contains(item))
    }

    /// Number of items accepted across all filters.
    pub fn len(&self) -> usize {
        self.filters.iter().map(BloomFilter::len).sum()
    }

    /// Whether no item has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.filters.iter().all(BloomFilter::is_empty)
    }

    /// Number of items the current chain can hold before growing again.
    pub fn capacity(&self) -> usize {
        self.filters.iter().map(BloomFilter::capacity).sum()
    }

    /// Total number of bits across all filters.
    pub fn bits(&self) -> usize {
        self.filters.iter().map(BloomFilter::bits).sum()
    }

    /// Probability that at least one filter in the chain reports a false positive.
    ///
    /// `1 - Π(1 - pᵢ)`, computed as `1 - exp(Σ ln(1 - pᵢ))`.
    pub fn fp_rate(&self) -> f64 {
        let log_miss: f64 = self.filters.iter().map(|f| (-f.fp_rate()).ln_1p()).sum();
        -log_miss.exp_m1()
    }

    /// Number of filters in the chain.
    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    /// The filters in the chain, oldest first.
    pub fn filters(&self) -> &[BloomFilter] {
        &self.filters
    }

    /// Capacity of the first filter.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// False positive rate of the first filter.
    pub fn initial_fp_rate(&self) -> f64 {
        self.initial_fp_rate
    }

    /// Capacity multiplier between successive filters.
    pub fn growth_rate(&self) -> u64 {
        self.growth_rate
    }

    /// False positive rate multiplier between successive filters.
    pub fn fp_decay_rate(&self) -> f64 {
        self.fp_decay_rate
    }

    /// Serialize the chain: a header, the length of every filter record, then
    /// the records themselves, oldest first.
    ///
    /// ```text
    /// initial_capacity: u64 | initial_fp_rate: f64 | growth_rate: u64 |
    /// fp_decay_rate: f64 | filter_count: u64 | lengths: [u64] | records
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let records: usize = self.filters.iter().map(BloomFilter::record_len).sum();
        let mut enc = Encoder::with_capacity(HEADER_LEN + 8 * self.filters.len() + records);

        enc.write_u64_le(self.initial_capacity as u64);
        enc.write_f64_le(self.initial_fp_rate);
        enc.write_u64_le(self.growth_rate);
        enc.write_f64_le(self.fp_decay_rate);
        enc.write_u64_le(self.filters.len() as u64);

        for filter in &self.filters {
            enc.write_u64_le(filter.record_len() as u64);
        }
        for filter in &self.filters {
            enc.write(&filter.to_bytes());
        }
        enc.into_bytes()
    }

    /// Write the serialized chain to `writer` in a single pass.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;

        debug!(
            filters = self.filters.len(),
            count = self.len(),
            "Saved scalable Bloom filter"
        );
        Ok(())
    }

    /// Read a chain written by [`ScalableBloomFilter::save`].
    pub fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut dec = Decoder::new(&mut *reader);

        let initial_capacity = dec.read_u64_le("initial_capacity")?;
        let initial_fp_rate = dec.read_f64_le("initial_fp_rate")?;
        let growth_rate = dec.read_u64_le("growth_rate")?;
        let fp_decay_rate = dec.read_f64_le("fp_decay_rate")?;
        let filter_count = dec.read_u64_le("filter_count")?;

        if initial_capacity == 0 || growth_rate == 0 || filter_count == 0 {
            return Err(Error::format(format!(
                "zero-valued field: initial_capacity={}, growth_rate={}, filter_count={}",
                initial_capacity, growth_rate, filter_count
            )));
        }
        if !(initial_fp_rate > 0. && initial_fp_rate < 1.) {
            return Err(Error::format(format!(
                "invalid initial_fp_rate {}",
                initial_fp_rate
            )));
        }
        if !(fp_decay_rate > 0. && fp_decay_rate < 1.) {
            return Err(Error::format(format!(
                "invalid fp_decay_rate {}",
                fp_decay_rate
            )));
        }
        let initial_capacity = usize::try_from(initial_capacity)
            .map_err(|_| Error::format("initial_capacity out of range"))?;

        let mut lengths = Vec::with_capacity(MAX_PREALLOCATED_FILTERS.min(filter_count as usize));
        for _ in 0..filter_count {
            lengths.push(dec.read_u64_le("filter length table")?);
        }

        let mut filters = Vec::with_capacity(lengths.len());
        for (i, len) in lengths.into_iter().enumerate() {
            let filter = BloomFilter::load(&mut *reader, Some(len)).map_err(|e| match e {
                Error::Format(msg) => Error::format(format!("filter {}: {}", i, msg)),
                other => other,
            })?;
            filters.push(filter);
        }

        debug!(
            filters = filters.len(),
            initial_capacity,
            growth_rate,
            "Loaded scalable Bloom filter"
        );

        Ok(ScalableBloomFilter {
            filters,
            initial_capacity,
            initial_fp_rate,
            growth_rate,
            fp_decay_rate,
        })
    }

    /// Deserialize a chain from a complete record. Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let filter = Self::load(&mut reader)?;

        if !reader.is_empty() {
            return Err(Error::format(format!(
                "{} trailing bytes after the last filter",
                reader.len()
            )));
        }
        Ok(filter)
    }

    fn last(&self) -> &BloomFilter {
        // The chain is seeded with one filter and never shrinks.
        &self.filters[self.filters.len() - 1]
    }

    fn grow(&mut self) {
        let last = self.last();
        let capacity = last.capacity().saturating_mul(self.growth_rate as usize);
        // A long chain with a small decay underflows toward zero.
        let fp_rate = (last.fp_rate() * self.fp_decay_rate).max(f64::MIN_POSITIVE);

        self.filters.push(BloomFilter::with_rate(capacity, fp_rate));

        debug!(
            capacity,
            fp_rate,
            filters = self.filters.len(),
            "Scalable Bloom filter grew"
        );
    }
}

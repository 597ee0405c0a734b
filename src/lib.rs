//! A simple implementation of a Bloom filter, a space-efficient probabilistic
//! data structure, and of a Scalable Bloom filter built on top of it.
//!
//! # Bloom Filters
//!
//! A Bloom filter is a space-efficient probabilistic data structure that is
//! used to test whether an element is a member of a set. It allows for queries
//! to return: "possibly in set" or "definitely not in set". Elements can be
//! added to the set, but not removed; the more elements that are added to the
//! set, the larger the probability of false positives.
//!
//! A [`BloomFilter`] is created for a fixed number of items `n` and a false
//! positive probability `p`. It uses `m = ⌈-n·ln(p) / ln(2)²⌉` bits and
//! `k = round(m·ln(2) / n)` hash functions. Once `n` items have been accepted,
//! the filter is sealed and ignores further insertions.
//!
//! # Scalable Bloom Filters
//!
//! A [`ScalableBloomFilter`] lifts the capacity limit by appending a new,
//! larger filter with a smaller false positive probability each time the
//! newest one fills up, following Almeida et al., *Scalable Bloom Filters*.
//!
//! # Hashing
//!
//! Items are byte strings. The `i`-th of the `k` hash functions is SipHash-1-3
//! seeded with `i`, so bit positions, and hence saved filters, do not depend on
//! the platform or on Rust's `Hash` implementations.
//!
//! # Example
//!
//! ```
//! use scalebloom::{BloomFilter, ScalableBloomFilter};
//!
//! let mut filter = BloomFilter::with_rate(1000, 1e-6);
//!
//! filter.add("foo");
//! filter.add("bar");
//!
//! assert!(filter.contains("foo"));
//! assert!(filter.contains("bar"));
//! assert_eq!(filter.len(), 2);
//!
//! let mut bytes = Vec::new();
//! filter.save(&mut bytes).unwrap();
//! let restored = BloomFilter::load(&mut bytes.as_slice(), None).unwrap();
//! assert!(restored.contains("foo"));
//!
//! let mut chain = ScalableBloomFilter::new(2, 0.01);
//! for word in ["a", "b", "c", "d", "e"] {
//!     chain.add(word);
//! }
//! assert_eq!(chain.num_filters(), 2);
//! ```
#![warn(missing_docs)]
#![allow(clippy::bool_assert_comparison)]

pub mod bitvec;
pub mod bloom;
mod codec;
pub mod error;
pub mod filter;
pub mod hash;
pub mod scalable;

pub use bloom::BloomFilter;
pub use error::{Error, Result};
pub use filter::Filter;
pub use scalable::{GrowthRate, ScalableBloomFilter};

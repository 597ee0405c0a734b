// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Error types.
use std::io;

use thiserror::Error;

/// Errors returned by bit vector access and by loading serialized filters.
///
/// Running out of capacity is not an error: adding to a full filter is a no-op.
#[derive(Debug, Error)]
pub enum Error {
    /// A bit index was past the end of a bit vector.
    #[error("index out of bounds: the len is {len} but the index is {index}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the bit vector, in bits.
        len: usize,
    },

    /// Serialized data is truncated or structurally inconsistent.
    #[error("malformed filter data: {0}")]
    Format(String),

    /// The underlying reader or writer failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn insufficient_data(field: &'static str) -> Self {
        Self::Format(format!("insufficient data: {field}"))
    }
}

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

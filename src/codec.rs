// Copyright (c) 2018 Aleksandr Bezobchuk
// Copyright (c) 2022 Alexis Sellier
//
// Licensed under the MIT license.

//! Little-endian encoding helpers for the on-disk filter formats.
use std::io::{self, Read};

use crate::error::{Error, Result};

/// An in-memory record being encoded.
pub(crate) struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_u64_le(&mut self, n: u64) {
        self.write(&n.to_le_bytes());
    }

    pub fn write_f64_le(&mut self, n: f64) {
        self.write(&n.to_le_bytes());
    }
}

/// Reads fields from a byte source.
///
/// A source that ends early yields [`Error::Format`] naming the field that
/// could not be read; any other I/O failure is passed through as [`Error::Io`].
pub(crate) struct Decoder<'a, R: ?Sized> {
    reader: &'a mut R,
}

impl<'a, R: Read + ?Sized> Decoder<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Self { reader }
    }

    pub fn read_exact(&mut self, buf: &mut [u8], field: &'static str) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::insufficient_data(field),
            _ => Error::Io(e),
        })
    }

    pub fn read_u64_le(&mut self, field: &'static str) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf, field)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64_le(&mut self, field: &'static str) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf, field)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Read exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<Vec<u8>> {
        // Grows with the bytes actually present, not with the claimed length.
        let mut buf = Vec::new();
        (&mut *self.reader).take(len as u64).read_to_end(&mut buf)?;

        if buf.len() < len {
            return Err(Error::insufficient_data(field));
        }
        Ok(buf)
    }

    /// Read until the source is exhausted.
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

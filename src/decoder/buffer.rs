//! Borrowed view over the caller's input bytes.

use crate::decoder::common::error::{DecodeError, Result};

/// Byte order of a multi-byte field inside a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// Immutable, non-owning view over a raw file held in memory.
///
/// The lifetime ties the view to the caller's allocation for the duration of a decode
/// call. Nothing produced by the decoder borrows from it, so any retention past the call
/// has to be an explicit copy made by the caller.
#[derive(Debug, Clone, Copy)]
pub struct RawBuffer<'a> {
    data: &'a [u8],
}

impl<'a> RawBuffer<'a> {
    /// Wraps `data`, rejecting an empty range.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(DecodeError::InvalidBuffer("buffer is empty"));
        }
        Ok(Self { data })
    }

    /// Wraps an optional range, as handed over by callers that may pass no buffer at all.
    pub fn from_option(data: Option<&'a [u8]>) -> Result<Self> {
        match data {
            Some(data) => Self::new(data),
            None => Err(DecodeError::InvalidBuffer("no buffer supplied")),
        }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true when the bytes at `offset` equal `magic`.
    pub fn has_magic_at(&self, offset: usize, magic: &[u8]) -> bool {
        self.data
            .get(offset..offset.saturating_add(magic.len()))
            .is_some_and(|window| window == magic)
    }

    /// Reads a `u32` at `offset`, or `None` when it runs past the end of the buffer.
    pub fn u32_at(&self, offset: usize, order: ByteOrder) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(match order {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        })
    }

    /// Returns true when a field of `size` bytes starting at `offset` lies inside the buffer.
    pub fn contains_range(&self, offset: usize, size: usize) -> bool {
        offset.checked_add(size).is_some_and(|end| end <= self.data.len())
    }
}

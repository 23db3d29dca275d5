//! Fixed-capacity byte buffer
//!
//! Storage is allocated once, one byte larger than the capacity, so the
//! content is always followed by a NUL. Appends that would not fit are
//! refused instead of growing or truncating.

use thiserror::Error;

/// Append refused because the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer full: {needed} bytes needed, {available} available")]
pub struct BufferFull {
    /// Bytes the append asked for
    pub needed: usize,
    /// Bytes still free
    pub available: usize,
}

/// Byte buffer with a hard capacity
#[derive(Debug, Clone)]
pub struct FixedBuf {
    data: Box<[u8]>,
    len: usize,
}

impl FixedBuf {
    /// Allocate a buffer holding up to `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        FixedBuf {
            data: vec![0u8; capacity + 1].into_boxed_slice(),
            len: 0,
        }
    }

    /// Maximum number of content bytes
    pub fn capacity(&self) -> usize {
        self.data.len() - 1
    }

    /// Number of content bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if there is no content
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be appended
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Drop all content
    pub fn clear(&mut self) {
        self.len = 0;
        self.data[0] = 0;
    }

    /// Append `bytes` in full, or nothing at all.
    pub fn try_extend(&mut self, bytes: &[u8]) -> Result<(), BufferFull> {
        if bytes.len() > self.remaining() {
            return Err(BufferFull {
                needed: bytes.len(),
                available: self.remaining(),
            });
        }
        let end = self.len + bytes.len();
        self.data[self.len..end].copy_from_slice(bytes);
        self.len = end;
        self.data[end] = 0;
        Ok(())
    }

    /// Append a string in full, or nothing at all.
    pub fn try_push_str(&mut self, s: &str) -> Result<(), BufferFull> {
        self.try_extend(s.as_bytes())
    }

    /// Content bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Content bytes, mutable in place
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// Content followed by its NUL terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.data[..=self.len]
    }

    /// Content as UTF-8, if it is valid
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// Write the NUL terminator after the content.
    pub fn terminate(&mut self) {
        self.data[self.len] = 0;
    }
}

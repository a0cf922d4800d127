//! Fixed-capacity byte buffers
//!
//! A `Buffer` never grows past the capacity it was created with. Transfers
//! that do not fit are truncated and the short count is returned; that is how
//! "buffer full" and "end of data" are reported.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Point-in-time view of a buffer's cursors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferInfo {
    /// Fixed capacity in bytes
    pub capacity: u64,
    /// Bytes written so far
    pub length: u64,
    /// Position the next sequential read starts from
    pub read_position: u64,
}

/// Owned byte storage with a logical length and a read cursor
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    capacity: usize,
    read_pos: usize,
    released: bool,
}

impl Buffer {
    /// Reserve storage for `capacity` bytes.
    ///
    /// Uses fallible reservation so an unsatisfiable request surfaces as
    /// `AllocationFailed` rather than aborting the process.
    pub fn with_capacity(capacity: u64) -> Result<Self> {
        let size = usize::try_from(capacity).map_err(|_| Error::AllocationFailed {
            requested: capacity,
            reason: "capacity exceeds the platform address space".to_string(),
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| Error::AllocationFailed {
                requested: capacity,
                reason: e.to_string(),
            })?;

        Ok(Self {
            data,
            capacity: size,
            read_pos: 0,
            released: false,
        })
    }

    pub fn capacity(&self) -> u64 {
        self.capacity as u64
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes that can still be appended
    pub fn remaining(&self) -> u64 {
        (self.capacity - self.data.len()) as u64
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn info(&self) -> BufferInfo {
        BufferInfo {
            capacity: self.capacity(),
            length: self.len(),
            read_position: self.read_pos as u64,
        }
    }

    /// Append as much of `src` as fits, returning the number of bytes taken.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.capacity - self.data.len());
        self.data.extend_from_slice(&src[..count]);
        count
    }

    /// Copy unread bytes into `dst` and advance the read cursor.
    ///
    /// Returns 0 once every written byte has been read.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let available = &self.data[self.read_pos..];
        let count = available.len().min(dst.len());
        dst[..count].copy_from_slice(&available[..count]);
        self.read_pos += count;
        count
    }

    /// Copy bytes starting at `offset` into `dst` without moving the cursor.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let start = self.check_offset(offset)?;
        let available = &self.data[start..];
        let count = available.len().min(dst.len());
        dst[..count].copy_from_slice(&available[..count]);
        Ok(count)
    }

    /// Write `src` at `offset`, overwriting existing bytes and extending the
    /// length where the write runs past it.
    ///
    /// `offset` may be at most the current length so no unwritten gap can
    /// appear inside the valid region.
    pub fn write_at(&mut self, offset: u64, src: &[u8]) -> Result<usize> {
        let start = self.check_offset(offset)?;
        let count = src.len().min(self.capacity - start);
        let overlap = count.min(self.data.len() - start);

        self.data[start..start + overlap].copy_from_slice(&src[..overlap]);
        self.data.extend_from_slice(&src[overlap..count]);
        Ok(count)
    }

    /// Move the read cursor back to the start
    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    /// Drop all written bytes, keeping the reserved storage
    pub fn clear(&mut self) {
        self.data.clear();
        self.read_pos = 0;
    }

    /// Tombstone the buffer and give its storage back to the allocator.
    pub(crate) fn release(&mut self) {
        self.released = true;
        self.capacity = 0;
        self.read_pos = 0;
        self.data = Vec::new();
    }

    fn check_offset(&self, offset: u64) -> Result<usize> {
        match usize::try_from(offset) {
            Ok(start) if start <= self.data.len() => Ok(start),
            _ => Err(Error::InvalidOffset {
                offset,
                length: self.len(),
            }),
        }
    }
}

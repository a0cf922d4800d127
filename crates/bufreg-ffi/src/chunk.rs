//! Caller-owned memory regions
//!
//! A `BufferChunk` borrows foreign memory for exactly one call. The registry
//! never keeps `ptr` past the return of the call that received it, and every
//! copy goes through a slice bounded by the chunk's declared sizes:
//! `ptr[..len]` when the chunk is a write source, `ptr[..capacity]` when it
//! is a read destination.

use thiserror::Error;

/// Descriptor of a caller-owned memory region
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferChunk {
    /// Start of the region
    pub ptr: *mut u8,
    /// Meaningful bytes at `ptr`
    pub len: u64,
    /// Total addressable bytes at `ptr`
    pub capacity: u64,
}

/// Ways a chunk descriptor can be malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// `len` is larger than `capacity`
    #[error("chunk len {len} exceeds its capacity {capacity}")]
    LengthExceedsCapacity {
        /// Declared meaningful bytes
        len: u64,
        /// Declared region size
        capacity: u64,
    },

    /// `ptr` is null while the region is non-empty
    #[error("chunk pointer is null but capacity is {capacity}")]
    NullPointer {
        /// Declared region size
        capacity: u64,
    },

    /// `capacity` cannot be addressed as a single slice
    #[error("chunk capacity {capacity} exceeds the addressable range")]
    TooLarge {
        /// Declared region size
        capacity: u64,
    },
}

impl BufferChunk {
    /// Describe `data` as a write source.
    ///
    /// The registry never writes through a source chunk, so the `*mut` is
    /// only a matter of the C layout.
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            ptr: data.as_ptr() as *mut u8,
            len: data.len() as u64,
            capacity: data.len() as u64,
        }
    }

    /// Describe `data` as a read destination with nothing meaningful in it yet
    pub fn from_mut_slice(data: &mut [u8]) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: 0,
            capacity: data.len() as u64,
        }
    }

    /// Same region with a different `len`
    pub fn with_len(self, len: u64) -> Self {
        Self { len, ..self }
    }

    /// Check the descriptor before either field is trusted
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.len > self.capacity {
            return Err(ChunkError::LengthExceedsCapacity {
                len: self.len,
                capacity: self.capacity,
            });
        }
        if self.capacity > isize::MAX as u64 {
            return Err(ChunkError::TooLarge {
                capacity: self.capacity,
            });
        }
        if self.ptr.is_null() && self.capacity > 0 {
            return Err(ChunkError::NullPointer {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// View the meaningful bytes, `ptr[..len]`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `len` bytes for the lifetime `'a`,
    /// and must not be written through by anyone else during it.
    pub unsafe fn as_source<'a>(&self) -> Result<&'a [u8], ChunkError> {
        self.validate()?;
        if self.len == 0 {
            return Ok(&[]);
        }
        Ok(std::slice::from_raw_parts(self.ptr, self.len as usize))
    }

    /// View the whole region, `ptr[..capacity]`, for the registry to fill.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `capacity` bytes for the lifetime
    /// `'a`, and must not be accessed by anyone else during it.
    pub unsafe fn as_destination<'a>(&self) -> Result<&'a mut [u8], ChunkError> {
        self.validate()?;
        if self.capacity == 0 {
            return Ok(&mut []);
        }
        Ok(std::slice::from_raw_parts_mut(self.ptr, self.capacity as usize))
    }
}

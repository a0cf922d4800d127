//! Bufreg FFI - C ABI for the handle-based buffer registry
//!
//! This crate exposes the `bufreg-core` registry to foreign callers through
//! `extern "C"` functions. Callers create buffers, move bytes in and out of
//! them through caller-owned chunks, and destroy them, holding nothing but
//! opaque `BufferHandle` values.
//!
//! # Safety
//!
//! Functions taking a `BufferChunk` are `unsafe`: the caller must ensure
//! `chunk.ptr` is valid for the declared `len` (writes into the registry)
//! or `capacity` (reads out of it) for the duration of the call. Handles are
//! never dereferenced as pointers, so a stale or forged handle only ever
//! yields `Failed`.
//!
//! Every entry point is safe to call concurrently from multiple threads.
//! Error messages are kept per thread.

#![warn(missing_docs)]

#[macro_use]
mod error;
mod api;
mod chunk;
mod global;
mod memory;
mod types;

// Re-export public API
pub use api::*;
pub use bufreg_core::{BufferHandle, BufferInfo, InternKey};
pub use chunk::{BufferChunk, ChunkError};
pub use memory::{bufreg_clear_error, bufreg_get_last_error, bufreg_string_free};
pub use types::{
    BufferCreationResult, BufferDestructionResult, BufferInfoResult, BufferReadResult,
    BufferStatus, BufferWriteResult, FailureVariant,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(bufreg_version()) };
        assert!(version.to_str().unwrap().starts_with("bufreg-ffi "));
    }
}

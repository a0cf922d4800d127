//! FFI-safe result types
//!
//! Every entry point returns one of these closed tagged unions. The `Failed`
//! variant carries no payload; the reason is available from
//! `bufreg_get_last_error` on the calling thread.

use bufreg_core::{BufferHandle, BufferInfo};

use crate::chunk::BufferChunk;

/// Outcome of creating a buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferCreationResult {
    /// The new buffer's handle
    Created(BufferHandle),
    /// No buffer was created and no state was retained
    Failed,
}

/// Outcome of destroying a buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferDestructionResult {
    /// The buffer was freed and its handle is now dead
    Destroyed,
    /// The handle was unknown or already destroyed; nothing changed
    Failed,
}

/// Outcome of reading into a caller chunk
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferReadResult {
    /// The caller's chunk with `len` set to the number of bytes copied
    Read(BufferChunk),
    /// Nothing was copied
    Failed,
}

/// Outcome of writing from a caller chunk
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferWriteResult {
    /// Number of bytes taken from the chunk; short when the buffer filled up
    Written(u64),
    /// Nothing was copied
    Failed,
}

/// Outcome of querying a buffer's cursors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferInfoResult {
    /// Snapshot of the buffer
    Info(BufferInfo),
    /// The handle did not resolve
    Failed,
}

/// Outcome of operations with no payload
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferStatus {
    /// Operation completed
    Succeeded,
    /// Operation failed; see the last error
    Failed,
}

/// Result types that have a payload-free failure variant
pub trait FailureVariant: Copy {
    /// The `Failed` variant of this result
    const FAILED: Self;

    /// Whether this value is the `Failed` variant
    fn is_failed(&self) -> bool;
}

macro_rules! failure_variant {
    ($($ty:ident),* $(,)?) => {
        $(
            impl FailureVariant for $ty {
                const FAILED: Self = $ty::Failed;

                fn is_failed(&self) -> bool {
                    matches!(self, $ty::Failed)
                }
            }
        )*
    };
}

failure_variant!(
    BufferCreationResult,
    BufferDestructionResult,
    BufferReadResult,
    BufferWriteResult,
    BufferInfoResult,
    BufferStatus,
);

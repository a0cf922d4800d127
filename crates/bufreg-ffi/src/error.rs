//! Error handling for FFI boundary
//!
//! Nothing may unwind into the caller. Every entry point runs its body
//! through `guard`, which turns both returned errors and panics into the
//! operation's `Failed` variant and records the reason as the thread's last
//! error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;

use crate::chunk::ChunkError;
use crate::memory::set_last_error;
use crate::types::FailureVariant;

/// Everything that can make a boundary call fail
#[derive(Debug, Error)]
pub enum FfiError {
    #[error(transparent)]
    Core(#[from] bufreg_core::Error),

    #[error("Invalid chunk: {0}")]
    Chunk(#[from] ChunkError),

    #[error("{0} is null")]
    NullPointer(&'static str),

    #[error("{0} is not valid UTF-8")]
    Utf8(&'static str),
}

/// Record `error` for `bufreg_get_last_error` and log it
pub fn map_error(operation: &str, error: FfiError) {
    match &error {
        // Stale handles are an expected caller condition, not a fault.
        FfiError::Core(core) if core.is_unknown_handle() => {
            tracing::debug!(operation, error = %error, "Boundary call failed");
        }
        _ => tracing::warn!(operation, error = %error, "Boundary call failed"),
    }
    set_last_error(format!("{}: {}", operation, error));
}

/// Safely execute a closure that might panic
///
/// Returns `None` when the closure panicked, after recording the panic
/// message as the last error.
pub fn catch_panic<F, R>(f: F) -> Option<R>
where
    F: FnOnce() -> R,
{
    // Registry locks do not poison, so state stays usable after a panic.
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => Some(result),
        Err(panic_info) => {
            let msg = get_panic_message(&panic_info);
            tracing::error!(panic = %msg, "Panic caught at FFI boundary");
            set_last_error(format!("Panic occurred: {}", msg));
            None
        }
    }
}

/// Run a boundary body, mapping errors and panics to `R::FAILED`
pub fn guard<R, F>(operation: &str, f: F) -> R
where
    R: FailureVariant,
    F: FnOnce() -> Result<R, FfiError>,
{
    match catch_panic(f) {
        Some(Ok(result)) => result,
        Some(Err(error)) => {
            map_error(operation, error);
            R::FAILED
        }
        None => R::FAILED,
    }
}

/// Extract a message from panic info
fn get_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}

/// Macro for safely executing FFI functions
///
/// `ffi_boundary!("op", { ... })` evaluates the block (which yields
/// `Result<R, FfiError>`) under `guard`.
#[macro_export]
macro_rules! ffi_boundary {
    ($operation:expr, $body:expr) => {{
        $crate::memory::clear_last_error();
        $crate::error::guard($operation, || $body)
    }};
}

/// Validate that a pointer is not null
pub fn validate_ptr<T>(ptr: *const T, name: &'static str) -> Result<(), FfiError> {
    if ptr.is_null() {
        Err(FfiError::NullPointer(name))
    } else {
        Ok(())
    }
}

//! FFI API function definitions
//!
//! This module contains the extern "C" functions that form the public API
//! of the bufreg FFI layer. The four core operations are
//! `bufreg_create_buffer`, `bufreg_destroy_buffer`, `bufreg_read_buffer` and
//! `bufreg_write_buffer`; the rest are conveniences built on the same
//! registry.

use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

use bufreg_core::{init_logging, BufferHandle, RegistryConfig};

use crate::chunk::BufferChunk;
use crate::error::{catch_panic, map_error, validate_ptr, FfiError};
use crate::global;
use crate::memory::{allocate_string, c_str_to_string, clear_last_error, set_last_error};
use crate::types::{
    BufferCreationResult, BufferDestructionResult, BufferInfoResult, BufferReadResult,
    BufferStatus, BufferWriteResult, FailureVariant,
};

/// Create a buffer able to hold `capacity` bytes
///
/// # Returns
/// `Created(handle)` with an empty buffer, or `Failed` when the capacity
/// cannot be satisfied (configured limits or allocation failure).
#[no_mangle]
pub extern "C" fn bufreg_create_buffer(capacity: u64) -> BufferCreationResult {
    ffi_boundary!("create_buffer", {
        let handle = global::registry().create(capacity)?;
        Ok(BufferCreationResult::Created(handle))
    })
}

/// Destroy the buffer behind `handle`
///
/// Safe to call on an unknown or already destroyed handle: that reports
/// `Failed` and changes nothing.
#[no_mangle]
pub extern "C" fn bufreg_destroy_buffer(handle: BufferHandle) -> BufferDestructionResult {
    ffi_boundary!("destroy_buffer", {
        global::registry().invalidate(&handle)?;
        Ok(BufferDestructionResult::Destroyed)
    })
}

/// Copy unread bytes from the buffer into `chunk`
///
/// At most `chunk.capacity` bytes are copied. The returned chunk has `len`
/// set to the count; 0 means every written byte has been read.
///
/// # Safety
/// `chunk.ptr` must be valid for writes of `chunk.capacity` bytes for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn bufreg_read_buffer(
    handle: BufferHandle,
    chunk: BufferChunk,
) -> BufferReadResult {
    ffi_boundary!("read_buffer", {
        let dst = chunk.as_destination()?;
        let read = global::registry().read(&handle, dst)?;
        Ok(BufferReadResult::Read(chunk.with_len(read as u64)))
    })
}

/// Append the first `chunk.len` bytes of `chunk` to the buffer
///
/// Returns the number of bytes taken, which is short when the buffer fills
/// up.
///
/// # Safety
/// `chunk.ptr` must be valid for reads of `chunk.len` bytes for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn bufreg_write_buffer(
    handle: BufferHandle,
    chunk: BufferChunk,
) -> BufferWriteResult {
    ffi_boundary!("write_buffer", {
        let src = chunk.as_source()?;
        let written = global::registry().write(&handle, src)?;
        Ok(BufferWriteResult::Written(written as u64))
    })
}

/// Copy bytes starting at `offset` into `chunk` without moving the read cursor
///
/// # Safety
/// Same contract as `bufreg_read_buffer`.
#[no_mangle]
pub unsafe extern "C" fn bufreg_read_buffer_at(
    handle: BufferHandle,
    offset: u64,
    chunk: BufferChunk,
) -> BufferReadResult {
    ffi_boundary!("read_buffer_at", {
        let dst = chunk.as_destination()?;
        let read = global::registry().read_at(&handle, offset, dst)?;
        Ok(BufferReadResult::Read(chunk.with_len(read as u64)))
    })
}

/// Write `chunk` at `offset`, which may be at most the buffer's length
///
/// # Safety
/// Same contract as `bufreg_write_buffer`.
#[no_mangle]
pub unsafe extern "C" fn bufreg_write_buffer_at(
    handle: BufferHandle,
    offset: u64,
    chunk: BufferChunk,
) -> BufferWriteResult {
    ffi_boundary!("write_buffer_at", {
        let src = chunk.as_source()?;
        let written = global::registry().write_at(&handle, offset, src)?;
        Ok(BufferWriteResult::Written(written as u64))
    })
}

/// Move the buffer's read cursor back to the start
#[no_mangle]
pub extern "C" fn bufreg_rewind_buffer(handle: BufferHandle) -> BufferStatus {
    ffi_boundary!("rewind_buffer", {
        global::registry().rewind(&handle)?;
        Ok(BufferStatus::Succeeded)
    })
}

/// Discard the buffer's contents, keeping its capacity
#[no_mangle]
pub extern "C" fn bufreg_clear_buffer(handle: BufferHandle) -> BufferStatus {
    ffi_boundary!("clear_buffer", {
        global::registry().clear(&handle)?;
        Ok(BufferStatus::Succeeded)
    })
}

/// Capacity, length, and read position of the buffer
#[no_mangle]
pub extern "C" fn bufreg_buffer_info(handle: BufferHandle) -> BufferInfoResult {
    ffi_boundary!("buffer_info", {
        let info = global::registry().info(&handle)?;
        Ok(BufferInfoResult::Info(info))
    })
}

/// Initialize the registry, optionally from a TOML configuration file
///
/// Must be called before any other bufreg function if it is called at all;
/// otherwise the registry is built from defaults on first use. On success it
/// also installs a stderr log subscriber unless the host already has one; a
/// failed call changes nothing.
///
/// # Safety
/// `config_path` must be null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bufreg_init(config_path: *const c_char) -> BufferStatus {
    ffi_boundary!("init", {
        let path = match c_str_to_string(config_path) {
            None => None,
            Some(Ok(path)) => Some(PathBuf::from(path)),
            Some(Err(_)) => return Err(FfiError::Utf8("config_path")),
        };

        let config = RegistryConfig::load(path.as_deref())?;
        // Logging is only touched once the registry is ours.
        global::init(&config)?;
        if let Err(e) = init_logging(&config.logging) {
            tracing::debug!(error = %e, "Keeping existing tracing subscriber");
        }
        Ok(BufferStatus::Succeeded)
    })
}

/// Destroy every live buffer, returning how many were destroyed
///
/// Outstanding handles become dead. The registry itself stays usable.
#[no_mangle]
pub extern "C" fn bufreg_shutdown() -> u64 {
    clear_last_error();
    if !global::is_initialized() {
        return 0;
    }
    catch_panic(|| global::registry().shutdown() as u64).unwrap_or(0)
}

/// Registry counters as a JSON object
///
/// Returns null on failure. The string must be freed with
/// `bufreg_string_free`.
#[no_mangle]
pub extern "C" fn bufreg_stats_json() -> *mut c_char {
    clear_last_error();
    match catch_panic(|| serde_json::to_string(&global::registry().stats())) {
        Some(Ok(json)) => allocate_string(&json),
        Some(Err(e)) => {
            set_last_error(format!("stats_json: {}", e));
            ptr::null_mut()
        }
        None => ptr::null_mut(),
    }
}

/// Get version information
///
/// The returned string is static and must NOT be freed.
#[no_mangle]
pub extern "C" fn bufreg_version() -> *const c_char {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Write `value()` through `result`, failing early on null pointers.
///
/// A non-null `result` is always fully written, on every path.
unsafe fn write_through<R: FailureVariant>(
    operation: &'static str,
    handle: *const BufferHandle,
    result: *mut R,
    value: impl FnOnce(BufferHandle) -> R,
) {
    if result.is_null() {
        set_last_error(format!("{}: result is null", operation));
        return;
    }

    let outcome = match validate_ptr(handle, "handle") {
        Ok(()) => value(*handle),
        Err(e) => {
            map_error(operation, e);
            R::FAILED
        }
    };
    result.write(outcome);
}

/// Out-parameter form of `bufreg_create_buffer`
///
/// # Safety
/// `result` must be null or valid for a write of `BufferCreationResult`.
#[no_mangle]
pub unsafe extern "C" fn bufreg_create_buffer_handle(
    capacity: u64,
    result: *mut BufferCreationResult,
) {
    if result.is_null() {
        set_last_error("create_buffer_handle: result is null");
        return;
    }
    result.write(bufreg_create_buffer(capacity));
}

/// Out-parameter form of `bufreg_destroy_buffer`
///
/// # Safety
/// `handle` must be null or point to a `BufferHandle`; `result` must be null
/// or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn bufreg_destroy_buffer_handle(
    handle: *const BufferHandle,
    result: *mut BufferDestructionResult,
) {
    write_through("destroy_buffer_handle", handle, result, |handle| {
        bufreg_destroy_buffer(handle)
    });
}

/// Out-parameter form of `bufreg_read_buffer`
///
/// # Safety
/// As `bufreg_read_buffer`, plus `handle` must be null or point to a
/// `BufferHandle` and `result` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn bufreg_read_buffer_handle(
    handle: *const BufferHandle,
    chunk: BufferChunk,
    result: *mut BufferReadResult,
) {
    write_through("read_buffer_handle", handle, result, |handle| {
        bufreg_read_buffer(handle, chunk)
    });
}

/// Out-parameter form of `bufreg_write_buffer`
///
/// # Safety
/// As `bufreg_write_buffer`, plus `handle` must be null or point to a
/// `BufferHandle` and `result` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn bufreg_write_buffer_handle(
    handle: *const BufferHandle,
    chunk: BufferChunk,
    result: *mut BufferWriteResult,
) {
    write_through("write_buffer_handle", handle, result, |handle| {
        bufreg_write_buffer(handle, chunk)
    });
}

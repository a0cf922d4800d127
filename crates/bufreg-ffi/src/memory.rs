//! Memory management utilities for FFI
//!
//! Owns the per-thread last-error slot and the strings handed out to
//! callers.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn to_c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "\\0")).unwrap_or_default()
}

/// Set the last error message for the current thread
pub fn set_last_error<S: Into<String>>(err: S) {
    let error_string = to_c_string(&err.into());
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(error_string);
    });
}

/// Clear the last error message
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Allocate a new string for FFI return
///
/// The caller must free this string using `bufreg_string_free`
pub fn allocate_string(s: &str) -> *mut c_char {
    to_c_string(s).into_raw()
}

/// Free a string allocated by bufreg
///
/// # Safety
/// The pointer must have been returned by a bufreg function documented as
/// requiring `bufreg_string_free`, and must not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn bufreg_string_free(s: *mut c_char) {
    if s.is_null() {
        return;
    }

    // Reconstruct the CString and let it drop
    drop(CString::from_raw(s));
}

/// Convert a C string to a Rust string
///
/// # Safety
/// The pointer must be null or a valid null-terminated C string
pub unsafe fn c_str_to_string(s: *const c_char) -> Option<Result<String, std::str::Utf8Error>> {
    if s.is_null() {
        return None;
    }
    Some(CStr::from_ptr(s).to_str().map(str::to_string))
}

/// Get the last error message for the calling thread
///
/// Returns null when no error is recorded. The pointer stays valid until the
/// next bufreg call on the same thread and must NOT be freed by the caller.
#[no_mangle]
pub extern "C" fn bufreg_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(err) => err.as_ptr(),
        None => ptr::null(),
    })
}

/// Clear the last error message
#[no_mangle]
pub extern "C" fn bufreg_clear_error() {
    clear_last_error();
}

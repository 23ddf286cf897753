//! Small helpers over the raw `libsqlite3-sys` bindings.

use libsqlite3_sys as sys;
use std::ffi::{CStr, c_int};

pub use sys::{sqlite3, sqlite3_stmt};

/// Version string of the linked SQLite library, e.g. `"3.46.0"`.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe {
        CStr::from_ptr(sys::sqlite3_libversion())
            .to_str()
            .unwrap_or("unknown")
    }
}

/// Numeric version of the linked SQLite library, e.g. `3046000`.
pub fn version_number() -> i32 {
    // SAFETY: no arguments, no side effects
    unsafe { sys::sqlite3_libversion_number() }
}

/// English description of a result code.
pub fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a static string for any code
    unsafe {
        let ptr = sys::sqlite3_errstr(code);
        if ptr.is_null() {
            return format!("SQLite error {code}");
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Most recent error message on a handle.
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub unsafe fn errmsg(db: *mut sqlite3) -> String {
    // SAFETY: caller guarantees db is valid
    unsafe {
        let ptr = sys::sqlite3_errmsg(db);
        if ptr.is_null() {
            return String::new();
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Most recent extended result code on a handle.
///
/// # Safety
/// `db` must be a valid, open connection handle.
pub unsafe fn extended_errcode(db: *mut sqlite3) -> c_int {
    // SAFETY: caller guarantees db is valid
    unsafe { sys::sqlite3_extended_errcode(db) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(version().starts_with('3'));
        assert!(version_number() >= 3_000_000);
    }

    #[test]
    fn test_error_string() {
        assert_eq!(error_string(sys::SQLITE_OK), "not an error");
        assert!(!error_string(sys::SQLITE_CONSTRAINT).is_empty());
    }
}

//! Conversion between `Value` and SQLite's storage classes.
//!
//! | Value | SQLite |
//! |-------|--------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Json` | TEXT |

use crate::ffi::sqlite3_stmt;
use libsqlite3_sys as sys;
use sqldispatch_core::Value;
use std::ffi::{CStr, c_int};

/// Bind a value to a statement parameter. Returns the SQLite result code.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` is 1-based and must be within the statement's parameter count
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub unsafe fn bind_value(stmt: *mut sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: caller guarantees stmt and index; SQLITE_TRANSIENT makes SQLite
    // copy text and blob data before this function returns
    unsafe {
        match value {
            Value::Null => sys::sqlite3_bind_null(stmt, index),
            Value::Bool(b) => sys::sqlite3_bind_int(stmt, index, c_int::from(*b)),
            Value::Int(v) => sys::sqlite3_bind_int(stmt, index, *v),
            Value::BigInt(v) => sys::sqlite3_bind_int64(stmt, index, *v),
            Value::Double(v) => sys::sqlite3_bind_double(stmt, index, *v),
            Value::Text(s) => sys::sqlite3_bind_text(
                stmt,
                index,
                s.as_ptr().cast(),
                s.len() as c_int,
                sys::SQLITE_TRANSIENT(),
            ),
            Value::Bytes(b) => sys::sqlite3_bind_blob(
                stmt,
                index,
                b.as_ptr().cast(),
                b.len() as c_int,
                sys::SQLITE_TRANSIENT(),
            ),
            Value::Json(json) => {
                let s = json.to_string();
                sys::sqlite3_bind_text(
                    stmt,
                    index,
                    s.as_ptr().cast(),
                    s.len() as c_int,
                    sys::SQLITE_TRANSIENT(),
                )
            }
        }
    }
}

/// Read a column value from the current result row.
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned `SQLITE_ROW`
/// - `index` must be a valid 0-based column index
#[allow(clippy::cast_sign_loss)]
pub unsafe fn read_column(stmt: *mut sqlite3_stmt, index: c_int) -> Value {
    // SAFETY: caller guarantees stmt is positioned on a row
    unsafe {
        match sys::sqlite3_column_type(stmt, index) {
            sys::SQLITE_INTEGER => {
                let v = sys::sqlite3_column_int64(stmt, index);
                // Choose the smallest representation
                match i32::try_from(v) {
                    Ok(small) => Value::Int(small),
                    Err(_) => Value::BigInt(v),
                }
            }
            sys::SQLITE_FLOAT => Value::Double(sys::sqlite3_column_double(stmt, index)),
            sys::SQLITE_TEXT => {
                let ptr = sys::sqlite3_column_text(stmt, index);
                let len = sys::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() {
                    Value::Null
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Text(String::from_utf8_lossy(slice).into_owned())
                }
            }
            sys::SQLITE_BLOB => {
                let ptr = sys::sqlite3_column_blob(stmt, index);
                let len = sys::sqlite3_column_bytes(stmt, index);
                if ptr.is_null() || len == 0 {
                    Value::Bytes(Vec::new())
                } else {
                    let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize);
                    Value::Bytes(slice.to_vec())
                }
            }
            _ => Value::Null,
        }
    }
}

/// Name of a result column.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut sqlite3_stmt, index: c_int) -> String {
    // SAFETY: caller guarantees stmt and index
    unsafe {
        let ptr = sys::sqlite3_column_name(stmt, index);
        if ptr.is_null() {
            format!("column{index}")
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }
}

//! SQLite connection handle.

use crate::ffi::{self, sqlite3, sqlite3_stmt};
use crate::types;
use libsqlite3_sys as sys;
use sqldispatch_core::error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind};
use sqldispatch_core::row::ColumnInfo;
use sqldispatch_core::{
    ConnectionSettings, Error, Executor, RawConnection, Result, Row, TransactionErrorKind, Value,
};
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::Arc;

/// Path SQLite treats as a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Busy timeout used when `options.timeout` is not set.
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Whether `path` names an in-memory database rather than a file.
pub fn is_memory_path(path: &str) -> bool {
    path.is_empty() || path == MEMORY_PATH || path.starts_with("file::memory:")
}

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Create the database if it doesn't exist (ignored when read-only).
    pub create: bool,
    /// Interpret the path as a `file:` URI.
    pub uri: bool,
}

impl OpenFlags {
    /// Read-write access, creating the file if needed.
    pub fn create_read_write() -> Self {
        Self {
            create: true,
            ..Default::default()
        }
    }

    /// Read-only access to an existing database.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = if self.read_only {
            sys::SQLITE_OPEN_READONLY
        } else {
            let mut rw = sys::SQLITE_OPEN_READWRITE;
            if self.create {
                rw |= sys::SQLITE_OPEN_CREATE;
            }
            rw
        };
        if self.uri {
            flags |= sys::SQLITE_OPEN_URI;
        }
        flags
    }
}

/// Configuration for opening a SQLite connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Open flags.
    pub flags: OpenFlags,
    /// How long to wait on a locked database, in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl SqliteConfig {
    /// Config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Config for a private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Derive a config from connection settings.
    ///
    /// Recognized options: `timeout` (seconds), `read_only` and `uri`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        let path = if settings.name.trim().is_empty() {
            MEMORY_PATH.to_string()
        } else {
            settings.name.clone()
        };
        let busy_timeout_ms = settings
            .option_f64("timeout")
            .map_or(DEFAULT_BUSY_TIMEOUT_MS, |secs| {
                (secs.max(0.0) * 1000.0).min(f64::from(u32::MAX)) as u32
            });
        let flags = OpenFlags {
            read_only: settings.option_bool("read_only").unwrap_or(false),
            create: true,
            uri: settings.option_bool("uri").unwrap_or(false),
        };
        Self {
            path,
            flags,
            busy_timeout_ms,
        }
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// An open SQLite database handle.
///
/// Owned by exactly one connection wrapper at a time; every operation takes
/// `&mut self`.
pub struct SqliteConnection {
    db: *mut sqlite3,
    path: String,
}

// SAFETY: the bundled library is built threadsafe, and the handle is only
// reachable through `&mut self`, so it is never used from two threads at once.
unsafe impl Send for SqliteConnection {}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("autocommit", &self.is_autocommit())
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a connection with the given configuration.
    #[allow(clippy::cast_possible_wrap)]
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { sys::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != sys::SQLITE_OK {
            let msg = if db.is_null() {
                ffi::error_string(rc)
            } else {
                // SAFETY: db was allocated by sqlite3_open_v2 and must be closed
                unsafe {
                    let msg = ffi::errmsg(db);
                    sys::sqlite3_close(db);
                    msg
                }
            };
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database '{}': {msg}", config.path),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
            // SAFETY: db is valid
            unsafe {
                sys::sqlite3_busy_timeout(db, ms);
            }
        }

        tracing::debug!(path = %config.path, "Opened SQLite connection");

        Ok(Self {
            db,
            path: config.path.clone(),
        })
    }

    /// Open a private in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database, creating it if needed.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    /// The database path this handle was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute one or more statements without parameters (DDL, scripts).
    pub fn execute_raw(&mut self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;
        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            sys::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg)
        };

        if rc != sys::SQLITE_OK {
            let msg = if errmsg.is_null() {
                ffi::error_string(rc)
            } else {
                // SAFETY: errmsg was allocated by SQLite and must be freed with sqlite3_free
                unsafe {
                    let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
                    sys::sqlite3_free(errmsg.cast());
                    msg
                }
            };
            return Err(query_error(rc, sql, msg));
        }
        Ok(())
    }

    /// Rows changed by the most recent statement.
    pub fn changes(&self) -> u64 {
        // SAFETY: db is valid
        let n = unsafe { sys::sqlite3_changes(self.db) };
        u64::try_from(n).unwrap_or(0)
    }

    /// Rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { sys::sqlite3_last_insert_rowid(self.db) }
    }

    /// Whether SQLite itself is in autocommit mode.
    pub fn is_autocommit(&self) -> bool {
        // SAFETY: db is valid
        unsafe { sys::sqlite3_get_autocommit(self.db) != 0 }
    }

    fn run(
        &mut self,
        sql: &str,
        params: &[Value],
        mut on_row: impl FnMut(*mut sqlite3_stmt),
    ) -> Result<()> {
        let stmt = Statement::prepare(self.db, sql)?;
        stmt.bind_all(self.db, sql, params)?;
        loop {
            // SAFETY: stmt is a valid prepared statement
            let rc = unsafe { sys::sqlite3_step(stmt.raw) };
            match rc {
                sys::SQLITE_ROW => on_row(stmt.raw),
                sys::SQLITE_DONE => return Ok(()),
                _ => return Err(self.last_error(sql)),
            }
        }
    }

    fn last_error(&self, sql: &str) -> Error {
        // SAFETY: db is valid
        let (code, msg) = unsafe { (ffi::extended_errcode(self.db), ffi::errmsg(self.db)) };
        query_error(code, sql, msg)
    }
}

impl Executor for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.run(sql, params, |_| {})?;
        Ok(self.changes())
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut columns: Option<Arc<ColumnInfo>> = None;
        let mut rows = Vec::new();
        self.run(sql, params, |stmt| {
            // SAFETY: stmt has just returned SQLITE_ROW
            unsafe {
                let count = sys::sqlite3_column_count(stmt);
                let info = columns.get_or_insert_with(|| {
                    Arc::new(ColumnInfo::new(
                        (0..count).map(|i| types::column_name(stmt, i)).collect(),
                    ))
                });
                let values = (0..count).map(|i| types::read_column(stmt, i)).collect();
                rows.push(Row::with_columns(Arc::clone(info), values));
            }
        })?;
        Ok(rows)
    }
}

impl RawConnection for SqliteConnection {
    fn begin(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(Error::transaction(
                TransactionErrorKind::AlreadyInTransaction,
                "Already in a transaction",
            ));
        }
        self.execute_raw("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        if !self.in_transaction() {
            return Err(Error::transaction(
                TransactionErrorKind::NotInTransaction,
                "Not in a transaction",
            ));
        }
        self.execute_raw("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        if !self.in_transaction() {
            return Err(Error::transaction(
                TransactionErrorKind::NotInTransaction,
                "Not in a transaction",
            ));
        }
        self.execute_raw("ROLLBACK")
    }

    /// Read from SQLite rather than tracked, since some errors (SQLITE_FULL,
    /// SQLITE_IOERR, SQLITE_BUSY, SQLITE_NOMEM) end the transaction on their own.
    fn in_transaction(&self) -> bool {
        !self.is_autocommit()
    }

    fn last_insert_id(&mut self) -> Option<i64> {
        Some(self.last_insert_rowid())
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        let db = std::mem::replace(&mut self.db, ptr::null_mut());
        // SAFETY: db came from sqlite3_open_v2 and is closed exactly once
        let rc = unsafe { sys::sqlite3_close(db) };
        tracing::debug!(path = %self.path, "Closed SQLite connection");
        if rc == sys::SQLITE_OK {
            Ok(())
        } else {
            Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Close,
                message: format!("Failed to close database: {}", ffi::error_string(rc)),
                source: None,
            }))
        }
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if !self.db.is_null() {
            // SAFETY: db is valid and has not been closed
            unsafe {
                sys::sqlite3_close(self.db);
            }
        }
    }
}

/// A prepared statement, finalized on drop.
struct Statement {
    raw: *mut sqlite3_stmt,
}

impl Statement {
    fn prepare(db: *mut sqlite3, sql: &str) -> Result<Self> {
        let c_sql = CString::new(sql).map_err(|_| nul_error(sql))?;
        let len = c_int::try_from(c_sql.as_bytes().len()).map_err(|_| {
            query_error(sys::SQLITE_TOOBIG, sql, "SQL text too long".to_string())
        })?;
        let mut raw: *mut sqlite3_stmt = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            sys::sqlite3_prepare_v2(db, c_sql.as_ptr(), len, &mut raw, ptr::null_mut())
        };
        if rc != sys::SQLITE_OK {
            // SAFETY: db is valid
            let msg = unsafe { ffi::errmsg(db) };
            return Err(query_error(rc, sql, msg));
        }
        if raw.is_null() {
            // Empty statement (whitespace or comment only)
            return Err(query_error(
                sys::SQLITE_MISUSE,
                sql,
                "empty SQL statement".to_string(),
            ));
        }
        Ok(Self { raw })
    }

    fn bind_all(&self, db: *mut sqlite3, sql: &str, params: &[Value]) -> Result<()> {
        // SAFETY: raw is a valid prepared statement
        let expected = unsafe { sys::sqlite3_bind_parameter_count(self.raw) };
        if usize::try_from(expected).ok() != Some(params.len()) {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Bind,
                sql: Some(sql.to_string()),
                code: Some(sys::SQLITE_RANGE),
                message: format!(
                    "Incorrect number of bindings supplied: statement uses {expected}, {} supplied",
                    params.len()
                ),
                source: None,
            }));
        }
        for (i, value) in params.iter().enumerate() {
            let index = c_int::try_from(i + 1).unwrap_or(c_int::MAX);
            // SAFETY: raw is valid and index is within the parameter count
            let rc = unsafe { types::bind_value(self.raw, index, value) };
            if rc != sys::SQLITE_OK {
                // SAFETY: db is valid
                let msg = unsafe { ffi::errmsg(db) };
                return Err(Error::Query(QueryError {
                    kind: QueryErrorKind::Bind,
                    sql: Some(sql.to_string()),
                    code: Some(rc),
                    message: format!("Failed to bind parameter {}: {msg}", i + 1),
                    source: None,
                }));
            }
        }
        Ok(())
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: raw is a valid statement finalized exactly once
        unsafe {
            sys::sqlite3_finalize(self.raw);
        }
    }
}

fn nul_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        code: None,
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn query_error(code: c_int, sql: &str, message: String) -> Error {
    Error::Query(QueryError {
        kind: error_code_to_kind(code, &message),
        sql: Some(sql.to_string()),
        code: Some(code),
        message,
        source: None,
    })
}

/// Classify a (possibly extended) result code.
fn error_code_to_kind(code: c_int, message: &str) -> QueryErrorKind {
    match code & 0xff {
        sys::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        sys::SQLITE_BUSY | sys::SQLITE_LOCKED => QueryErrorKind::Busy,
        sys::SQLITE_PERM | sys::SQLITE_AUTH | sys::SQLITE_READONLY => QueryErrorKind::Permission,
        sys::SQLITE_RANGE | sys::SQLITE_MISMATCH => QueryErrorKind::Bind,
        sys::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        sys::SQLITE_ERROR if message.starts_with("no such ") => QueryErrorKind::NotFound,
        sys::SQLITE_ERROR if message.contains("syntax error") => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    }
}

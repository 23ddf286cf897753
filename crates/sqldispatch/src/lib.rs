//! Pluggable database backends with a request-scoped connection lifecycle.
//!
//! `sqldispatch` turns a configured engine name into a working database:
//!
//! 1. The engine is resolved against a [`BackendRegistry`]: built-ins first
//!    (`dummy`, and `sqlite3` with the `sqlite` feature), then plugins added
//!    with [`BackendRegistry::register`]. Unknown names produce a
//!    configuration error listing the built-in choices.
//! 2. A [`Database`] owns the resolved backend and exactly one
//!    [`ConnectionWrapper`]. The wrapper opens its driver handle lazily and
//!    records executed statements when `debug` is on.
//! 3. [`Database::handle_request`] drives the request lifecycle: the query
//!    log is reset when a request starts, the handle is closed when it
//!    finishes, and an open managed transaction is rolled back when the
//!    request fails.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqldispatch::prelude::*;
//!
//! let settings = Settings::new("sqlite3").name("app.db").debug(true);
//! let db = Database::from_settings(settings)?;
//!
//! db.handle_request(|db| {
//!     let mut conn = db.connection();
//!     conn.execute("CREATE TABLE IF NOT EXISTS hits (at TEXT)", &[])?;
//!     conn.execute("INSERT INTO hits VALUES (datetime('now'))", &[])?;
//!     Ok(())
//! })?;
//! ```
//!
//! # Plugins
//!
//! ```rust,ignore
//! let mut registry = BackendRegistry::new();
//! registry.register("acme.oracle", Arc::new(OracleBackend::default()))?;
//! let db = Database::with_registry(Settings::new("acme.oracle"), &registry)?;
//! ```

pub mod backends;
pub mod database;
pub mod global;
pub mod lifecycle;
pub mod registry;
pub mod resolve;
pub mod transaction;
pub mod wrapper;

pub use database::Database;
pub use global::{database, has_database, install, install_from_env};
pub use lifecycle::{Hook, RequestEvent, RequestHooks};
pub use registry::BackendRegistry;
pub use resolve::{BackendSource, ResolvedBackend, resolve_backend};
pub use transaction::TransactionState;
pub use wrapper::ConnectionWrapper;

pub use sqldispatch_core::{
    Backend, BaseBackend, ClientBackend, ColumnDescription, ConfigError, ConnectionError,
    ConnectionErrorKind, ConnectionSettings, CreationBackend, DEFAULT_ENGINE, Error, ErrorClass,
    Executor, FromValue, IndexInfo, IntrospectionBackend, LoadError, QueryError, QueryErrorKind,
    QueryLog, QueryRecord, RawConnection, Relation, Result, Row, Settings, TransactionError,
    TransactionErrorKind, Value,
};

#[cfg(feature = "sqlite")]
pub use sqldispatch_sqlite::SqliteBackend;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        BackendRegistry, ConnectionWrapper, Database, Error, ErrorClass, Executor, RequestEvent,
        Result, Row, Settings, Value,
    };
}

//! Core types and traits for sqldispatch.
//!
//! This crate defines what a database backend is and what it exchanges with
//! the framework:
//!
//! - `Backend` and its submodule traits (`BaseBackend`, `CreationBackend`,
//!   `IntrospectionBackend`, `ClientBackend`)
//! - `RawConnection` / `Executor` for running statements
//! - `Value` and `Row` for parameters and results
//! - `Error` with the `DatabaseError` / `IntegrityError` classification
//! - `Settings` for engine selection and connection options
//! - `QueryLog` for the per-request record of executed statements

pub mod backend;
pub mod connection;
pub mod error;
pub mod identifiers;
pub mod introspection;
pub mod query_log;
pub mod row;
pub mod settings;
pub mod value;

pub use backend::{
    Backend, BaseBackend, ClientBackend, CreationBackend, IntrospectionBackend, LoadError,
};
pub use connection::{Executor, RawConnection};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, ErrorClass, QueryError,
    QueryErrorKind, Result, TransactionError, TransactionErrorKind,
};
pub use identifiers::{is_valid_backend_name, quote_ident, sanitize_identifier};
pub use introspection::{ColumnDescription, IndexInfo, Relation};
pub use query_log::{QueryLog, QueryRecord};
pub use row::{FromValue, Row};
pub use settings::{ConnectionSettings, DEFAULT_ENGINE, Settings};
pub use value::Value;

//! Built-in SQLite backend for sqldispatch.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! Registered under the name `sqlite3`. All four submodules are provided:
//!
//! - base: [`SqliteBase`] opens a [`SqliteConnection`] on `settings.name`
//!   (`:memory:` when empty) with the busy timeout taken from
//!   `options.timeout` in seconds
//! - creation: [`SqliteCreation`] with the column type table and test
//!   database handling
//! - introspection: [`SqliteIntrospection`] over `sqlite_master` and `PRAGMA`s
//! - client: [`SqliteClient`] runs the `sqlite3` shell
//!
//! Constraint violations (`UNIQUE`, `NOT NULL`, `FOREIGN KEY`, `CHECK`) are
//! reported as integrity errors; everything else is a database error.

pub mod base;
pub mod client;
pub mod connection;
pub mod creation;
pub mod ffi;
pub mod introspection;
pub mod types;

pub use base::SqliteBase;
pub use client::SqliteClient;
pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};
pub use creation::SqliteCreation;
pub use introspection::SqliteIntrospection;

use sqldispatch_core::{
    Backend, BaseBackend, ClientBackend, CreationBackend, IntrospectionBackend, LoadError,
};
use std::sync::Arc;

/// Name the backend is registered under.
pub const BACKEND_NAME: &str = "sqlite3";

/// The `sqlite3` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteBackend;

impl Backend for SqliteBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn base(&self) -> Result<Arc<dyn BaseBackend>, LoadError> {
        Ok(Arc::new(SqliteBase))
    }

    fn creation(&self) -> Result<Arc<dyn CreationBackend>, LoadError> {
        Ok(Arc::new(SqliteCreation))
    }

    fn introspection(&self) -> Result<Arc<dyn IntrospectionBackend>, LoadError> {
        Ok(Arc::new(SqliteIntrospection))
    }

    fn client(&self) -> Result<Arc<dyn ClientBackend>, LoadError> {
        Ok(Arc::new(SqliteClient))
    }
}

/// Get the linked SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_submodules_load() {
        let backend = SqliteBackend;
        assert_eq!(backend.name(), "sqlite3");
        assert_eq!(backend.base().unwrap().vendor(), "sqlite");
        assert!(!backend.creation().unwrap().data_types().is_empty());
        assert!(backend.introspection().is_ok());
        assert!(backend.client().is_ok());
    }

    #[test]
    fn test_sqlite_version() {
        assert!(sqlite_version().starts_with("3."));
    }
}

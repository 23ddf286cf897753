//! Database connection traits.
//!
//! - [`Executor`] - anything that can run a statement: a raw driver handle
//!   or the framework-level connection wrapper built on top of one
//! - [`RawConnection`] - an open driver handle, produced by
//!   [`BaseBackend::connect`](crate::backend::BaseBackend::connect)
//!
//! All operations are synchronous. A handle serves one request at a time.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Statement execution shared by raw handles and connection wrappers.
pub trait Executor {
    /// Execute a statement (INSERT, UPDATE, DELETE, DDL) and return rows affected.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Execute a query and return all rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }
}

/// An open driver handle.
///
/// Handles start in autocommit mode. `begin` opens an explicit transaction
/// that stays open until `commit` or `rollback`.
pub trait RawConnection: Executor + Send {
    /// Open an explicit transaction.
    fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Whether an explicit transaction is open.
    fn in_transaction(&self) -> bool;

    /// Row id generated by the most recent INSERT, if the driver tracks one.
    fn last_insert_id(&mut self) -> Option<i64> {
        None
    }

    /// Close the handle, releasing its resources.
    fn close(self: Box<Self>) -> Result<()>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        (**self).query(sql, params)
    }
}

//! The connection wrapper shared by everything in a [`Database`](crate::Database).
//!
//! The wrapper owns at most one raw driver handle. The handle is opened on
//! first use and dropped by [`ConnectionWrapper::close`]; the next statement
//! opens a fresh one. Statements are recorded in the query log when the
//! settings have `debug` enabled.

use crate::transaction::TransactionState;
use sqldispatch_core::{
    BaseBackend, ConnectionSettings, Executor, QueryLog, QueryRecord, RawConnection, Result, Row,
    Value,
};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Framework-level connection over a backend's raw handle.
pub struct ConnectionWrapper {
    base: Arc<dyn BaseBackend>,
    settings: ConnectionSettings,
    debug: bool,
    raw: Option<Box<dyn RawConnection>>,
    queries: QueryLog,
    open_count: u64,
    close_count: u64,
    pub(crate) transactions: TransactionState,
}

impl fmt::Debug for ConnectionWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWrapper")
            .field("vendor", &self.base.vendor())
            .field("open", &self.raw.is_some())
            .field("debug", &self.debug)
            .field("queries", &self.queries.len())
            .field("transactions", &self.transactions)
            .finish_non_exhaustive()
    }
}

impl ConnectionWrapper {
    /// Create a wrapper. No handle is opened until the first statement.
    pub fn new(base: Arc<dyn BaseBackend>, settings: ConnectionSettings, debug: bool) -> Self {
        Self {
            base,
            settings,
            debug,
            raw: None,
            queries: QueryLog::new(),
            open_count: 0,
            close_count: 0,
            transactions: TransactionState::default(),
        }
    }

    /// Vendor of the backend this wrapper talks to.
    pub fn vendor(&self) -> &'static str {
        self.base.vendor()
    }

    /// The backend's driver submodule.
    pub fn base(&self) -> &Arc<dyn BaseBackend> {
        &self.base
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Whether statements are recorded in the query log.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Whether a raw handle is currently open.
    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// How many times a raw handle has been opened.
    pub fn open_count(&self) -> u64 {
        self.open_count
    }

    /// How many times an open raw handle has been closed.
    pub fn close_count(&self) -> u64 {
        self.close_count
    }

    /// Statements recorded since the last reset.
    pub fn queries(&self) -> &QueryLog {
        &self.queries
    }

    /// Empty the query log.
    pub fn reset_queries(&mut self) {
        self.queries.clear();
    }

    /// Whether the open handle has a driver transaction in progress.
    pub fn in_transaction(&self) -> bool {
        self.raw.as_ref().is_some_and(|raw| raw.in_transaction())
    }

    /// Close the raw handle if one is open.
    ///
    /// An open driver transaction is rolled back first, and transaction
    /// management is reset so the next handle starts in autocommit mode.
    /// Closing a wrapper that never opened a handle is a no-op. The handle
    /// is dropped even when the driver reports an error while closing.
    pub fn close(&mut self) -> Result<()> {
        self.transactions.reset();
        let Some(mut raw) = self.raw.take() else {
            return Ok(());
        };
        if raw.in_transaction() {
            tracing::warn!(
                vendor = self.vendor(),
                "Closing connection with an open transaction; rolling back"
            );
            if let Err(err) = raw.rollback() {
                tracing::warn!(error = %err, "Rollback before close failed");
            }
        }
        self.close_count += 1;
        tracing::debug!(vendor = self.vendor(), "Closing database connection");
        raw.close()
    }

    /// Run an INSERT and return the generated row id, if the driver reports one.
    pub fn insert(&mut self, sql: &str, params: &[Value]) -> Result<Option<i64>> {
        self.execute(sql, params)?;
        Ok(self.raw_mut()?.last_insert_id())
    }

    /// The open raw handle, opening one first if needed.
    pub(crate) fn raw_mut(&mut self) -> Result<&mut dyn RawConnection> {
        let raw = match self.raw.take() {
            Some(raw) => raw,
            None => {
                let raw = self.base.connect(&self.settings)?;
                self.open_count += 1;
                tracing::debug!(
                    vendor = self.vendor(),
                    database = %self.settings.name,
                    "Opened database connection"
                );
                raw
            }
        };
        Ok(&mut **self.raw.insert(raw))
    }

    /// The open raw handle, without opening one.
    pub(crate) fn raw_if_open(&mut self) -> Option<&mut (dyn RawConnection + '_)> {
        match self.raw.as_mut() {
            Some(raw) => Some(&mut **raw),
            None => None,
        }
    }

    fn run<T>(
        &mut self,
        sql: &str,
        params: &[Value],
        op: impl FnOnce(&mut dyn RawConnection) -> Result<T>,
    ) -> Result<T> {
        let managed = self.transactions.is_managed();
        let raw = self.raw_mut()?;
        if managed && !raw.in_transaction() {
            tracing::debug!("Opening managed transaction");
            raw.begin()?;
        }

        let start = Instant::now();
        let result = op(raw);
        let elapsed = start.elapsed();

        tracing::trace!(
            sql = %sql,
            params = params.len(),
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            ok = result.is_ok(),
            "Executed statement"
        );
        if self.debug {
            self.queries.push(QueryRecord::new(sql, params, elapsed));
        }
        result
    }
}

impl Executor for ConnectionWrapper {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let affected = self.run(sql, params, |raw| raw.execute(sql, params))?;
        self.transactions.mark_write();
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run(sql, params, |raw| raw.query(sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::DummyBackend;
    use sqldispatch_core::Backend;

    fn dummy_wrapper(debug: bool) -> ConnectionWrapper {
        let base = DummyBackend.base().unwrap();
        ConnectionWrapper::new(base, ConnectionSettings::default(), debug)
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut conn = dummy_wrapper(false);
        assert!(!conn.is_open());
        conn.close().unwrap();
        assert_eq!(conn.close_count(), 0);
        assert_eq!(conn.open_count(), 0);
    }

    #[test]
    fn test_handle_reopens_after_close() {
        let mut conn = dummy_wrapper(false);
        assert!(conn.execute("SELECT 1", &[]).is_err());
        assert!(conn.is_open());
        conn.close().unwrap();
        assert!(!conn.is_open());
        assert!(conn.query("SELECT 1", &[]).is_err());
        assert_eq!(conn.open_count(), 2);
        assert_eq!(conn.close_count(), 1);
    }

    #[test]
    fn test_failed_statements_are_logged_in_debug() {
        let mut conn = dummy_wrapper(true);
        let _ = conn.execute("SELECT 1", &[Value::Int(1)]);
        assert_eq!(conn.queries().len(), 1);
        let record = conn.queries().iter().next().unwrap();
        assert_eq!(record.sql, "SELECT 1");
        assert_eq!(record.params, vec![Value::Int(1)]);

        conn.reset_queries();
        assert!(conn.queries().is_empty());
    }

    #[test]
    fn test_no_log_without_debug() {
        let mut conn = dummy_wrapper(false);
        let _ = conn.execute("SELECT 1", &[]);
        assert!(conn.queries().is_empty());
    }
}

//! Managed transactions on a [`ConnectionWrapper`].
//!
//! Outside transaction management every statement autocommits. Inside a
//! managed block the first statement opens a driver transaction, writes
//! mark the block dirty, and the caller is responsible for committing or
//! rolling back before leaving:
//!
//! ```rust,ignore
//! conn.enter_transaction_management();
//! conn.managed(true)?;
//! conn.execute("UPDATE account SET balance = balance - 10 WHERE id = 1", &[])?;
//! conn.commit()?;
//! conn.leave_transaction_management()?;
//! ```
//!
//! [`ConnectionWrapper::commit_on_success`] wraps that pattern.

use crate::wrapper::ConnectionWrapper;
use sqldispatch_core::{Error, Result, TransactionErrorKind};

/// Managed-flag stack and dirty flag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionState {
    managed: Vec<bool>,
    dirty: bool,
}

impl TransactionState {
    pub(crate) fn is_managed(&self) -> bool {
        self.managed.last().copied().unwrap_or(false)
    }

    fn under_management(&self) -> bool {
        !self.managed.is_empty()
    }

    /// Drop every management block and the dirty flag.
    pub(crate) fn reset(&mut self) {
        if self.under_management() || self.dirty {
            tracing::debug!(
                depth = self.managed.len(),
                dirty = self.dirty,
                "Resetting transaction management"
            );
        }
        self.managed.clear();
        self.dirty = false;
    }

    /// A write succeeded; only tracked inside a managed block.
    pub(crate) fn mark_write(&mut self) {
        if self.under_management() {
            self.dirty = true;
        }
    }
}

fn not_managed() -> Error {
    Error::transaction(
        TransactionErrorKind::NotManaged,
        "This code isn't under transaction management",
    )
}

impl ConnectionWrapper {
    /// Start a transaction management block. The new block inherits the
    /// managed flag of the enclosing one (unmanaged at the outermost level).
    pub fn enter_transaction_management(&mut self) {
        let inherited = self.transactions.is_managed();
        self.transactions.managed.push(inherited);
        tracing::debug!(
            depth = self.transactions.managed.len(),
            managed = inherited,
            "Entered transaction management"
        );
    }

    /// End the innermost transaction management block.
    ///
    /// Leaving with uncommitted changes rolls them back and reports an error.
    pub fn leave_transaction_management(&mut self) -> Result<()> {
        if self.transactions.managed.pop().is_none() {
            return Err(not_managed());
        }
        tracing::debug!(
            depth = self.transactions.managed.len(),
            "Left transaction management"
        );

        if self.transactions.dirty {
            self.rollback()?;
            return Err(Error::transaction(
                TransactionErrorKind::PendingOnLeave,
                "Transaction managed block ended with pending COMMIT/ROLLBACK",
            ));
        }

        // A clean block may still hold a read transaction open
        if !self.transactions.is_managed() {
            if let Some(raw) = self.raw_if_open().filter(|raw| raw.in_transaction()) {
                raw.commit()?;
            }
        }
        Ok(())
    }

    /// Switch the innermost block between managed and autocommit mode.
    ///
    /// Turning management off commits pending changes.
    pub fn managed(&mut self, flag: bool) -> Result<()> {
        let Some(top) = self.transactions.managed.last_mut() else {
            return Err(not_managed());
        };
        *top = flag;
        if !flag && self.transactions.dirty {
            self.commit()?;
        }
        Ok(())
    }

    /// Whether statements currently run inside a managed transaction.
    pub fn is_managed(&self) -> bool {
        self.transactions.is_managed()
    }

    /// Whether the current block has uncommitted writes.
    pub fn is_dirty(&self) -> bool {
        self.transactions.dirty
    }

    /// Mark the current block as having uncommitted writes.
    pub fn set_dirty(&mut self) -> Result<()> {
        if !self.transactions.under_management() {
            return Err(not_managed());
        }
        self.transactions.dirty = true;
        Ok(())
    }

    /// Mark the current block as having nothing to commit.
    pub fn set_clean(&mut self) -> Result<()> {
        if !self.transactions.under_management() {
            return Err(not_managed());
        }
        self.transactions.dirty = false;
        Ok(())
    }

    /// Commit the driver transaction, if one is open.
    pub fn commit(&mut self) -> Result<()> {
        if let Some(raw) = self.raw_if_open().filter(|raw| raw.in_transaction()) {
            raw.commit()?;
            tracing::debug!("Committed transaction");
        }
        self.transactions.dirty = false;
        Ok(())
    }

    /// Roll back the driver transaction, if one is open.
    pub fn rollback(&mut self) -> Result<()> {
        if let Some(raw) = self.raw_if_open().filter(|raw| raw.in_transaction()) {
            raw.rollback()?;
            tracing::debug!("Rolled back transaction");
        }
        self.transactions.dirty = false;
        Ok(())
    }

    /// Abandon all transaction management blocks, rolling back any open
    /// driver transaction. The wrapper is back in autocommit mode.
    pub fn reset_transaction_state(&mut self) -> Result<()> {
        let rolled_back = self.rollback();
        self.transactions.reset();
        rolled_back
    }

    /// Commit unless a managed block is in charge; then just mark it dirty.
    pub fn commit_unless_managed(&mut self) -> Result<()> {
        if self.is_managed() {
            self.transactions.mark_write();
            Ok(())
        } else {
            self.commit()
        }
    }

    /// Roll back unless a managed block is in charge; then just mark it dirty.
    pub fn rollback_unless_managed(&mut self) -> Result<()> {
        if self.is_managed() {
            self.transactions.mark_write();
            Ok(())
        } else {
            self.rollback()
        }
    }

    /// Run `f` in a managed block: commit if it returns `Ok`, roll back if
    /// it returns `Err`.
    pub fn commit_on_success<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.enter_transaction_management();
        self.managed(true)?;

        let outcome = match f(self) {
            Ok(value) => match self.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    if let Err(rollback_err) = self.rollback() {
                        tracing::warn!(
                            error = %rollback_err,
                            "Rollback after failed commit failed"
                        );
                    }
                    Err(err)
                }
            },
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    tracing::warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        };

        let left = self.leave_transaction_management();
        let value = outcome?;
        left?;
        Ok(value)
    }
}

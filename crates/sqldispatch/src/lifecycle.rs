//! Request lifecycle hooks.
//!
//! Each [`RequestEvent`] has an ordered list of hooks. Dispatch runs them on
//! the calling thread in registration order and stops at the first error.
//!
//! [`RequestHooks::with_defaults`] installs the three hooks every database
//! needs:
//!
//! | Event | Hook | Effect |
//! |-------|------|--------|
//! | `RequestStarted` | [`reset_queries`] | query log emptied |
//! | `RequestFinished` | [`close_connection`] | raw handle closed |
//! | `GotRequestException` | [`rollback_on_exception`] | open managed transaction rolled back |

use crate::wrapper::ConnectionWrapper;
use sqldispatch_core::Result;
use std::fmt;

/// Points in a request's life that hooks can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestEvent {
    RequestStarted,
    RequestFinished,
    GotRequestException,
}

impl RequestEvent {
    pub const ALL: [RequestEvent; 3] = [
        RequestEvent::RequestStarted,
        RequestEvent::RequestFinished,
        RequestEvent::GotRequestException,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestEvent::RequestStarted => "request_started",
            RequestEvent::RequestFinished => "request_finished",
            RequestEvent::GotRequestException => "got_request_exception",
        }
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook run against the database's connection wrapper.
pub type Hook = Box<dyn Fn(&mut ConnectionWrapper) -> Result<()> + Send + Sync>;

struct NamedHook {
    name: String,
    hook: Hook,
}

/// Ordered hooks per request event.
#[derive(Default)]
pub struct RequestHooks {
    started: Vec<NamedHook>,
    finished: Vec<NamedHook>,
    exception: Vec<NamedHook>,
}

impl fmt::Debug for RequestHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |hooks: &[NamedHook]| {
            hooks.iter().map(|h| h.name.clone()).collect::<Vec<_>>()
        };
        f.debug_struct("RequestHooks")
            .field("started", &names(&self.started))
            .field("finished", &names(&self.finished))
            .field("exception", &names(&self.exception))
            .finish()
    }
}

impl RequestHooks {
    /// No hooks at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard reset / close / rollback subscriptions.
    pub fn with_defaults() -> Self {
        let mut hooks = Self::new();
        hooks.on(RequestEvent::RequestStarted, "reset_queries", reset_queries);
        hooks.on(RequestEvent::RequestFinished, "close_connection", close_connection);
        hooks.on(
            RequestEvent::GotRequestException,
            "rollback_on_exception",
            rollback_on_exception,
        );
        hooks
    }

    fn list(&self, event: RequestEvent) -> &[NamedHook] {
        match event {
            RequestEvent::RequestStarted => &self.started,
            RequestEvent::RequestFinished => &self.finished,
            RequestEvent::GotRequestException => &self.exception,
        }
    }

    /// Append a hook for `event`. It runs after every hook already registered.
    pub fn on<F>(&mut self, event: RequestEvent, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut ConnectionWrapper) -> Result<()> + Send + Sync + 'static,
    {
        let entry = NamedHook {
            name: name.into(),
            hook: Box::new(hook),
        };
        tracing::debug!(event = %event, hook = %entry.name, "Registered request hook");
        match event {
            RequestEvent::RequestStarted => self.started.push(entry),
            RequestEvent::RequestFinished => self.finished.push(entry),
            RequestEvent::GotRequestException => self.exception.push(entry),
        }
    }

    /// Names of the hooks for `event`, in run order.
    pub fn names(&self, event: RequestEvent) -> Vec<&str> {
        self.list(event).iter().map(|h| h.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.started.len() + self.finished.len() + self.exception.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the hooks for `event` in order, stopping at the first error.
    pub fn dispatch(&self, event: RequestEvent, conn: &mut ConnectionWrapper) -> Result<()> {
        for entry in self.list(event) {
            tracing::trace!(event = %event, hook = %entry.name, "Running request hook");
            (entry.hook)(conn).inspect_err(|err| {
                tracing::debug!(
                    event = %event,
                    hook = %entry.name,
                    error = %err,
                    "Request hook failed"
                );
            })?;
        }
        Ok(())
    }
}

/// Empty the query log.
pub fn reset_queries(conn: &mut ConnectionWrapper) -> Result<()> {
    conn.reset_queries();
    Ok(())
}

/// Close the raw handle; the next request reopens it.
pub fn close_connection(conn: &mut ConnectionWrapper) -> Result<()> {
    conn.close()
}

/// Roll back when a managed transaction is open, then leave transaction
/// management so the next request starts in autocommit mode.
pub fn rollback_on_exception(conn: &mut ConnectionWrapper) -> Result<()> {
    if conn.is_managed() && conn.in_transaction() {
        tracing::debug!("Rolling back managed transaction after request error");
        return conn.reset_transaction_state();
    }
    conn.transactions.reset();
    Ok(())
}

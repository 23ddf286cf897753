//! Optional process-wide database.
//!
//! Most code should pass a [`Database`] explicitly. Applications that want
//! ambient access install one instance at startup:
//!
//! ```rust,ignore
//! sqldispatch::install(Database::from_env()?);
//!
//! // anywhere later
//! let db = sqldispatch::database().expect("installed at startup");
//! ```

use crate::database::Database;
use sqldispatch_core::Result;
use std::sync::OnceLock;

static GLOBAL_DATABASE: OnceLock<Database> = OnceLock::new();

/// Install the process-wide database. Only the first call has an effect;
/// later databases are dropped and the installed one is returned.
pub fn install(database: Database) -> &'static Database {
    if let Some(existing) = GLOBAL_DATABASE.get() {
        tracing::debug!(
            engine = %existing.engine(),
            ignored = %database.engine(),
            "Global database already installed"
        );
        return existing;
    }
    GLOBAL_DATABASE.get_or_init(move || database)
}

/// Build a database from `DATABASE_*` environment variables and install it.
pub fn install_from_env() -> Result<&'static Database> {
    if let Some(db) = GLOBAL_DATABASE.get() {
        return Ok(db);
    }
    let database = Database::from_env()?;
    Ok(install(database))
}

/// The process-wide database, if one was installed.
pub fn database() -> Option<&'static Database> {
    GLOBAL_DATABASE.get()
}

/// Check if a process-wide database is installed.
pub fn has_database() -> bool {
    GLOBAL_DATABASE.get().is_some()
}

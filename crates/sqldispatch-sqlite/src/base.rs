//! Driver submodule of the `sqlite3` backend.

use crate::connection::{SqliteConfig, SqliteConnection};
use sqldispatch_core::{BaseBackend, ConnectionSettings, RawConnection, Result};

/// Opens [`SqliteConnection`]s from connection settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteBase;

impl BaseBackend for SqliteBase {
    fn vendor(&self) -> &'static str {
        "sqlite"
    }

    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RawConnection>> {
        let config = SqliteConfig::from_settings(settings);
        Ok(Box::new(SqliteConnection::open(&config)?))
    }
}

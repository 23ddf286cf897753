//! Column types and test-database lifecycle for SQLite.

use crate::connection::{MEMORY_PATH, is_memory_path};
use sqldispatch_core::{ConnectionSettings, CreationBackend, Error, Result};
use std::path::Path;

/// Field kind to SQLite column type.
///
/// SQLite does not enforce lengths, but `%(max_length)s` is kept so that
/// introspection can recover the declared size.
pub const DATA_TYPES: &[(&str, &str)] = &[
    ("AutoField", "integer"),
    ("BooleanField", "bool"),
    ("CharField", "varchar(%(max_length)s)"),
    ("CommaSeparatedIntegerField", "varchar(%(max_length)s)"),
    ("DateField", "date"),
    ("DateTimeField", "datetime"),
    ("DecimalField", "decimal"),
    ("FileField", "varchar(%(max_length)s)"),
    ("FilePathField", "varchar(%(max_length)s)"),
    ("FloatField", "real"),
    ("IntegerField", "integer"),
    ("IPAddressField", "char(15)"),
    ("NullBooleanField", "bool"),
    ("OneToOneField", "integer"),
    ("PositiveIntegerField", "integer unsigned"),
    ("PositiveSmallIntegerField", "smallint unsigned"),
    ("SlugField", "varchar(%(max_length)s)"),
    ("SmallIntegerField", "smallint"),
    ("TextField", "text"),
    ("TimeField", "time"),
];

/// Creation submodule of the `sqlite3` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteCreation;

impl CreationBackend for SqliteCreation {
    fn data_types(&self) -> &'static [(&'static str, &'static str)] {
        DATA_TYPES
    }

    fn test_database_name(&self, settings: &ConnectionSettings) -> String {
        match settings.test_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => MEMORY_PATH.to_string(),
        }
    }

    fn create_test_db(
        &self,
        settings: &ConnectionSettings,
        autoclobber: bool,
    ) -> Result<ConnectionSettings> {
        let name = self.test_database_name(settings);
        tracing::info!(database = %name, "Creating test database");

        if !is_memory_path(&name) && Path::new(&name).exists() {
            if !autoclobber {
                return Err(Error::config(format!(
                    "Test database '{name}' already exists; pass autoclobber to replace it"
                )));
            }
            tracing::warn!(database = %name, "Destroying old test database");
            std::fs::remove_file(&name)?;
        }

        let mut test_settings = settings.clone();
        test_settings.name = name;
        Ok(test_settings)
    }

    fn destroy_test_db(&self, test_settings: &ConnectionSettings) -> Result<()> {
        let name = test_settings.name.as_str();
        tracing::info!(database = %name, "Destroying test database");
        if is_memory_path(name) {
            return Ok(());
        }
        match std::fs::remove_file(name) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

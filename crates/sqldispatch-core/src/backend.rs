//! The contract every database backend fulfils.
//!
//! A backend is a bundle of "submodules", each handed out by [`Backend`]:
//!
//! | Submodule | Trait | Required |
//! |-----------|-------|----------|
//! | base | [`BaseBackend`] | yes |
//! | creation | [`CreationBackend`] | yes |
//! | introspection | [`IntrospectionBackend`] | no |
//! | client | [`ClientBackend`] | no |
//!
//! The resolver loads `base` and `creation` when the backend is selected.
//! `introspection` and `client` are only loaded when somebody asks for them,
//! so a backend whose shell client is unavailable still serves requests.

use crate::connection::{Executor, RawConnection};
use crate::error::{Error, Result};
use crate::identifiers::quote_ident;
use crate::introspection::{ColumnDescription, IndexInfo, Relation};
use crate::settings::ConnectionSettings;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

/// Why a submodule could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The backend does not provide this submodule.
    Missing {
        backend: String,
        module: &'static str,
    },
    /// The submodule exists but failed to initialize.
    Broken(Error),
}

impl LoadError {
    pub fn missing(backend: impl Into<String>, module: &'static str) -> Self {
        LoadError::Missing {
            backend: backend.into(),
            module,
        }
    }

    /// Whether this is a plain "not provided" failure.
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadError::Missing { .. })
    }

    /// Convert into the error surfaced to callers.
    pub fn into_error(self) -> Error {
        match self {
            LoadError::Missing { backend, module } => Error::config(format!(
                "The '{backend}' database backend has no {module} module"
            )),
            LoadError::Broken(err) => err,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Missing { backend, module } => {
                write!(f, "backend '{backend}' has no {module} module")
            }
            LoadError::Broken(err) => write!(f, "{err}"),
        }
    }
}

impl From<Error> for LoadError {
    fn from(err: Error) -> Self {
        LoadError::Broken(err)
    }
}

/// A pluggable database backend.
pub trait Backend: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Load the connection/driver submodule.
    fn base(&self) -> std::result::Result<Arc<dyn BaseBackend>, LoadError>;

    /// Load the schema/test-database creation submodule.
    fn creation(&self) -> std::result::Result<Arc<dyn CreationBackend>, LoadError>;

    /// Load the introspection submodule.
    fn introspection(&self) -> std::result::Result<Arc<dyn IntrospectionBackend>, LoadError> {
        Err(LoadError::missing(self.name(), "introspection"))
    }

    /// Load the interactive shell client submodule.
    fn client(&self) -> std::result::Result<Arc<dyn ClientBackend>, LoadError> {
        Err(LoadError::missing(self.name(), "client"))
    }
}

/// Connection and driver operations.
pub trait BaseBackend: Send + Sync {
    /// Vendor name, e.g. `"sqlite"`.
    fn vendor(&self) -> &'static str;

    /// Open a new handle.
    fn connect(&self, settings: &ConnectionSettings) -> Result<Box<dyn RawConnection>>;

    /// Quote a table or column name for this backend.
    fn quote_name(&self, name: &str) -> String {
        if name.starts_with('"') && name.ends_with('"') && name.len() >= 2 {
            return name.to_string();
        }
        quote_ident(name)
    }
}

/// Schema and test-database creation.
pub trait CreationBackend: Send + Sync {
    /// Mapping from field kind (`"CharField"`, `"IntegerField"`, ...) to a
    /// column type template. `%(max_length)s`-style placeholders are filled
    /// in by [`CreationBackend::column_type`].
    fn data_types(&self) -> &'static [(&'static str, &'static str)];

    /// Column type for a field kind, with `max_length` substituted.
    fn column_type(&self, field_kind: &str, max_length: Option<u32>) -> Option<String> {
        let template = self
            .data_types()
            .iter()
            .find(|(kind, _)| *kind == field_kind)
            .map(|(_, column)| *column)?;
        Some(match max_length {
            Some(n) => template.replace("%(max_length)s", &n.to_string()),
            None => template.to_string(),
        })
    }

    /// Name of the database the test runner will use.
    fn test_database_name(&self, settings: &ConnectionSettings) -> String;

    /// Create the test database and return the settings that point at it.
    ///
    /// With `autoclobber`, an existing test database is destroyed first;
    /// otherwise its presence is an error.
    fn create_test_db(
        &self,
        settings: &ConnectionSettings,
        autoclobber: bool,
    ) -> Result<ConnectionSettings>;

    /// Destroy the test database described by `test_settings`.
    fn destroy_test_db(&self, test_settings: &ConnectionSettings) -> Result<()>;
}

/// Schema introspection of a live database.
pub trait IntrospectionBackend: Send + Sync {
    /// Names of all user tables, sorted.
    fn table_names(&self, conn: &mut dyn Executor) -> Result<Vec<String>>;

    /// Column descriptions for a table, in declaration order.
    fn table_description(
        &self,
        conn: &mut dyn Executor,
        table: &str,
    ) -> Result<Vec<ColumnDescription>>;

    /// Indexes defined on a table.
    fn indexes(&self, conn: &mut dyn Executor, table: &str) -> Result<Vec<IndexInfo>>;

    /// Foreign-key relations from a table to others.
    fn relations(&self, conn: &mut dyn Executor, table: &str) -> Result<Vec<Relation>>;

    /// Field kind best matching a column type reported by the database.
    fn field_kind(&self, sql_type: &str) -> Option<&'static str>;
}

/// Interactive command-line client.
pub trait ClientBackend: Send + Sync {
    /// Build the shell command for the configured database.
    fn shell_command(&self, settings: &ConnectionSettings) -> Result<Command>;

    /// Run the shell and wait for it to exit.
    fn runshell(&self, settings: &ConnectionSettings) -> Result<()> {
        let mut command = self.shell_command(settings)?;
        tracing::debug!(command = ?command, "Starting database shell");
        let status = command.status()?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Custom(format!("database shell exited with {status}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Types;

    impl CreationBackend for Types {
        fn data_types(&self) -> &'static [(&'static str, &'static str)] {
            &[
                ("CharField", "varchar(%(max_length)s)"),
                ("IntegerField", "integer"),
            ]
        }

        fn test_database_name(&self, _settings: &ConnectionSettings) -> String {
            "test".to_string()
        }

        fn create_test_db(
            &self,
            settings: &ConnectionSettings,
            _autoclobber: bool,
        ) -> Result<ConnectionSettings> {
            Ok(settings.clone())
        }

        fn destroy_test_db(&self, _test_settings: &ConnectionSettings) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn column_type_substitutes_max_length() {
        assert_eq!(
            Types.column_type("CharField", Some(30)).as_deref(),
            Some("varchar(30)")
        );
        assert_eq!(
            Types.column_type("IntegerField", None).as_deref(),
            Some("integer")
        );
        assert!(Types.column_type("ImageField", None).is_none());
    }

    #[test]
    fn missing_module_becomes_config_error() {
        let err = LoadError::missing("acme", "client");
        assert!(err.is_missing());
        let err = err.into_error();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("has no client module"));
    }

    #[test]
    fn broken_module_keeps_original_error() {
        let err = LoadError::from(Error::Custom("driver library too old".into()));
        assert!(!err.is_missing());
        assert_eq!(err.into_error().to_string(), "driver library too old");
    }
}

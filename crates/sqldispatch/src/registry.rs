//! Table of known backends.
//!
//! Built-ins are fixed at compile time: `dummy`, plus `sqlite3` when the
//! `sqlite` feature is enabled. Anything else has to be handed to
//! [`BackendRegistry::register`] before the [`Database`](crate::Database) is
//! built.

use crate::backends::DummyBackend;
use sqldispatch_core::{Backend, Error, Result, is_valid_backend_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

fn builtin_backends() -> Vec<(&'static str, Arc<dyn Backend>)> {
    let dummy: Arc<dyn Backend> = Arc::new(DummyBackend);
    let mut table = vec![(crate::backends::dummy::BACKEND_NAME, dummy)];
    #[cfg(feature = "sqlite")]
    table.push((
        sqldispatch_sqlite::BACKEND_NAME,
        Arc::new(sqldispatch_sqlite::SqliteBackend),
    ));
    table
}

/// Built-in backends and externally registered plugins.
#[derive(Clone)]
pub struct BackendRegistry {
    builtins: BTreeMap<String, Arc<dyn Backend>>,
    plugins: BTreeMap<String, Arc<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .field("plugins", &self.plugins.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BackendRegistry {
    /// Registry holding the built-in backends and no plugins.
    pub fn new() -> Self {
        Self {
            builtins: builtin_backends()
                .into_iter()
                .map(|(name, backend)| (name.to_string(), backend))
                .collect(),
            plugins: BTreeMap::new(),
        }
    }

    /// Register a backend distributed outside this crate.
    ///
    /// A built-in with the same name is still preferred at resolution time.
    /// Registering a name twice replaces the earlier plugin.
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn Backend>) -> Result<()> {
        let name = name.into();
        if !is_valid_backend_name(&name) {
            return Err(Error::config(format!(
                "'{name}' is not a valid database backend name"
            )));
        }
        if self.builtins.contains_key(&name) {
            tracing::warn!(backend = %name, "Plugin shadowed by built-in backend of the same name");
        }
        if self.plugins.insert(name.clone(), backend).is_some() {
            tracing::warn!(backend = %name, "Replaced previously registered plugin");
        }
        tracing::info!(backend = %name, "Database backend registered");
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_plugin(
        mut self,
        name: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        self.register(name, backend)?;
        Ok(self)
    }

    /// Look up a built-in backend.
    pub fn builtin(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.builtins.get(name)
    }

    /// Look up a registered plugin.
    pub fn plugin(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.plugins.get(name)
    }

    /// Built-in names offered to users, sorted. Names starting with `_` or
    /// `.` are private and left out.
    pub fn builtin_names(&self) -> Vec<&str> {
        self.builtins
            .keys()
            .map(String::as_str)
            .filter(|name| !name.starts_with('_') && !name.starts_with('.'))
            .collect()
    }

    /// Registered plugin names, sorted.
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    #[cfg(test)]
    pub(crate) fn insert_builtin(&mut self, name: &str, backend: Arc<dyn Backend>) {
        self.builtins.insert(name.to_string(), backend);
    }
}

//! Backend resolution.
//!
//! A name is looked up among the built-ins first and among registered
//! plugins second. Loading a backend means loading its `base` and
//! `creation` submodules; a backend missing either one counts as not found.
//!
//! When both lookups come up empty the caller gets a configuration error
//! listing the built-in names. A backend that was found but failed to load
//! for any other reason surfaces its own error unchanged.

use crate::registry::BackendRegistry;
use sqldispatch_core::{Backend, BaseBackend, CreationBackend, Error, LoadError, Result};
use sqldispatch_core::{DEFAULT_ENGINE, is_valid_backend_name};
use std::fmt;
use std::sync::Arc;

/// Where a resolved backend came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendSource {
    Builtin,
    Plugin,
}

/// A backend whose required submodules loaded successfully.
#[derive(Clone)]
pub struct ResolvedBackend {
    pub name: String,
    pub source: BackendSource,
    pub backend: Arc<dyn Backend>,
    pub base: Arc<dyn BaseBackend>,
    pub creation: Arc<dyn CreationBackend>,
}

impl fmt::Debug for ResolvedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedBackend")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("vendor", &self.base.vendor())
            .finish_non_exhaustive()
    }
}

enum Attempt {
    Loaded(ResolvedBackend),
    /// Nothing registered under the name.
    Absent,
    /// Registered, but a required submodule is not provided.
    Missing(LoadError),
    /// Registered, but loading failed.
    Broken(Error),
}

fn attempt(name: &str, source: BackendSource, backend: Option<&Arc<dyn Backend>>) -> Attempt {
    let Some(backend) = backend else {
        return Attempt::Absent;
    };
    let loaded = backend
        .base()
        .and_then(|base| backend.creation().map(|creation| (base, creation)));
    match loaded {
        Ok((base, creation)) => Attempt::Loaded(ResolvedBackend {
            name: name.to_string(),
            source,
            backend: Arc::clone(backend),
            base,
            creation,
        }),
        Err(err) if err.is_missing() => Attempt::Missing(err),
        Err(err) => Attempt::Broken(err.into_error()),
    }
}

/// Error for a name that is neither a built-in nor a plugin.
pub fn unavailable_backend_error(name: &str, registry: &BackendRegistry) -> Error {
    let available = registry
        .builtin_names()
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ");
    Error::config(format!(
        "'{name}' isn't an available database backend. Available options are: {available}"
    ))
}

/// Resolve `engine` against `registry`. An empty engine means `dummy`.
#[tracing::instrument(level = "debug", skip(registry))]
pub fn resolve_backend(registry: &BackendRegistry, engine: &str) -> Result<ResolvedBackend> {
    let name = match engine.trim() {
        "" => DEFAULT_ENGINE,
        name => name,
    };
    if !is_valid_backend_name(name) {
        return Err(unavailable_backend_error(name, registry));
    }

    let builtin = match attempt(name, BackendSource::Builtin, registry.builtin(name)) {
        Attempt::Loaded(resolved) => {
            tracing::debug!(
                backend = %name,
                vendor = resolved.base.vendor(),
                "Resolved built-in backend"
            );
            return Ok(resolved);
        }
        other => other,
    };

    match attempt(name, BackendSource::Plugin, registry.plugin(name)) {
        Attempt::Loaded(resolved) => {
            if let Attempt::Broken(err) = &builtin {
                tracing::warn!(
                    backend = %name,
                    error = %err,
                    "Built-in backend failed to load; using plugin"
                );
            }
            tracing::debug!(
                backend = %name,
                vendor = resolved.base.vendor(),
                "Resolved plugin backend"
            );
            Ok(resolved)
        }
        Attempt::Broken(err) => Err(err),
        Attempt::Absent | Attempt::Missing(_) => match builtin {
            Attempt::Broken(err) => Err(err),
            Attempt::Missing(err) => Err(err.into_error()),
            Attempt::Absent | Attempt::Loaded(_) => Err(unavailable_backend_error(name, registry)),
        },
    }
}

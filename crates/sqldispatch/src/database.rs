//! The database context: one resolved backend, one connection wrapper and
//! the request hooks wired to it.

use crate::lifecycle::{RequestEvent, RequestHooks};
use crate::registry::BackendRegistry;
use crate::resolve::{BackendSource, ResolvedBackend, resolve_backend};
use crate::wrapper::ConnectionWrapper;
use sqldispatch_core::{
    Backend, ClientBackend, CreationBackend, IntrospectionBackend, LoadError, Result, Settings,
};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// A configured database.
///
/// Construction resolves the backend named by the settings and builds the
/// single [`ConnectionWrapper`] every caller shares. The `introspection` and
/// `client` submodules are loaded the first time they are asked for.
pub struct Database {
    settings: Settings,
    resolved: ResolvedBackend,
    connection: Mutex<ConnectionWrapper>,
    introspection: OnceLock<Arc<dyn IntrospectionBackend>>,
    client: OnceLock<Arc<dyn ClientBackend>>,
    hooks: RequestHooks,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("engine", &self.engine())
            .field("source", &self.resolved.source)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Build from settings using the built-in backends only.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        Self::with_registry(settings, &BackendRegistry::new())
    }

    /// Build from settings, resolving the engine against `registry`.
    pub fn with_registry(settings: Settings, registry: &BackendRegistry) -> Result<Self> {
        let resolved = resolve_backend(registry, &settings.engine)?;
        let connection = ConnectionWrapper::new(
            Arc::clone(&resolved.base),
            settings.connection.clone(),
            settings.debug,
        );
        tracing::info!(
            engine = %resolved.name,
            vendor = resolved.base.vendor(),
            debug = settings.debug,
            "Database configured"
        );
        Ok(Self {
            settings,
            resolved,
            connection: Mutex::new(connection),
            introspection: OnceLock::new(),
            client: OnceLock::new(),
            hooks: RequestHooks::with_defaults(),
        })
    }

    /// Read settings from `DATABASE_*` environment variables and build.
    pub fn from_env() -> Result<Self> {
        Self::from_settings(Settings::from_env()?)
    }

    /// Name of the resolved backend.
    pub fn engine(&self) -> &str {
        &self.resolved.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether the backend is a built-in or a registered plugin.
    pub fn source(&self) -> BackendSource {
        self.resolved.source
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.resolved.backend
    }

    /// The shared connection wrapper.
    ///
    /// Every call returns the same wrapper. Hold the guard only for the
    /// duration of the work; request hooks lock it too.
    pub fn connection(&self) -> MutexGuard<'_, ConnectionWrapper> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The creation submodule, loaded at resolution time.
    pub fn creation(&self) -> Arc<dyn CreationBackend> {
        Arc::clone(&self.resolved.creation)
    }

    /// The introspection submodule, loaded on first use.
    pub fn introspection(&self) -> Result<Arc<dyn IntrospectionBackend>> {
        if let Some(module) = self.introspection.get() {
            return Ok(Arc::clone(module));
        }
        let module = self
            .resolved
            .backend
            .introspection()
            .map_err(LoadError::into_error)?;
        tracing::debug!(engine = %self.engine(), "Loaded introspection module");
        Ok(Arc::clone(self.introspection.get_or_init(|| module)))
    }

    /// The client submodule, loaded on first use.
    pub fn client(&self) -> Result<Arc<dyn ClientBackend>> {
        if let Some(module) = self.client.get() {
            return Ok(Arc::clone(module));
        }
        let module = self
            .resolved
            .backend
            .client()
            .map_err(LoadError::into_error)?;
        tracing::debug!(engine = %self.engine(), "Loaded client module");
        Ok(Arc::clone(self.client.get_or_init(|| module)))
    }

    /// Run the backend's interactive shell against the configured database.
    pub fn runshell(&self) -> Result<()> {
        self.client()?.runshell(&self.settings.connection)
    }

    /// Append a request hook. Hooks can only be added before the database
    /// is shared.
    pub fn add_hook<F>(&mut self, event: RequestEvent, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut ConnectionWrapper) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.on(event, name, hook);
    }

    pub fn hooks(&self) -> &RequestHooks {
        &self.hooks
    }

    /// Fire `event` against the connection wrapper.
    pub fn dispatch(&self, event: RequestEvent) -> Result<()> {
        let mut conn = self.connection();
        self.hooks.dispatch(event, &mut conn)
    }

    /// Drive one request through the lifecycle.
    ///
    /// Fires `RequestStarted`, runs `handler`, fires `GotRequestException`
    /// if anything failed and always fires `RequestFinished`. The handler's
    /// error takes precedence; a failing exception hook is only logged.
    pub fn handle_request<T, F>(&self, handler: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let result = self
            .dispatch(RequestEvent::RequestStarted)
            .and_then(|()| handler(self));

        if let Err(err) = &result {
            tracing::debug!(error = %err, "Request failed");
            if let Err(hook_err) = self.dispatch(RequestEvent::GotRequestException) {
                tracing::warn!(error = %hook_err, "Rollback after request error failed");
            }
        }

        let finished = self.dispatch(RequestEvent::RequestFinished);
        let value = result?;
        finished?;
        Ok(value)
    }
}

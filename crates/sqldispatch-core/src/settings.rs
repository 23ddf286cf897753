//! Database settings.
//!
//! [`Settings`] carries the backend identifier (`DATABASE_ENGINE`) together
//! with the [`ConnectionSettings`] every backend receives when it opens a
//! handle. Settings can be built in code, deserialized from JSON, or read
//! from the process environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DATABASE_ENGINE` | `engine` |
//! | `DATABASE_NAME` | `connection.name` |
//! | `DATABASE_USER` | `connection.user` |
//! | `DATABASE_PASSWORD` | `connection.password` |
//! | `DATABASE_HOST` | `connection.host` |
//! | `DATABASE_PORT` | `connection.port` |
//! | `TEST_DATABASE_NAME` | `connection.test_name` |
//! | `DATABASE_OPTIONS` | `connection.options` (JSON object) |
//! | `DEBUG` | `debug` |

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Backend used when no engine is configured.
pub const DEFAULT_ENGINE: &str = "dummy";

/// Top-level database configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Backend identifier. Empty means [`DEFAULT_ENGINE`].
    #[serde(alias = "DATABASE_ENGINE")]
    pub engine: String,
    /// Record executed statements in the connection's query log.
    #[serde(alias = "DEBUG")]
    pub debug: bool,
    /// Options handed to the backend when connecting.
    #[serde(flatten)]
    pub connection: ConnectionSettings,
}

/// Everything a backend needs to open (and re-open) a handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Database name; a file path for file-based backends.
    #[serde(alias = "DATABASE_NAME")]
    pub name: String,
    #[serde(alias = "DATABASE_USER")]
    pub user: String,
    #[serde(alias = "DATABASE_PASSWORD")]
    pub password: String,
    #[serde(alias = "DATABASE_HOST")]
    pub host: String,
    #[serde(alias = "DATABASE_PORT")]
    pub port: Option<u16>,
    /// Name of the database created by the test runner.
    #[serde(alias = "TEST_DATABASE_NAME")]
    pub test_name: Option<String>,
    /// Driver-specific keyword options (`DATABASE_OPTIONS`).
    #[serde(alias = "DATABASE_OPTIONS")]
    pub options: Map<String, JsonValue>,
}

impl Settings {
    /// Create settings for the given engine.
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            ..Default::default()
        }
    }

    /// Parse settings from a JSON document.
    ///
    /// Both the field names and the `DATABASE_*` spellings are accepted.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid database settings: {e}")))
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(engine) = lookup("DATABASE_ENGINE") {
            settings.engine = engine;
        }
        if let Some(debug) = lookup("DEBUG") {
            settings.debug = parse_flag(&debug);
        }

        let conn = &mut settings.connection;
        if let Some(name) = lookup("DATABASE_NAME") {
            conn.name = name;
        }
        if let Some(user) = lookup("DATABASE_USER") {
            conn.user = user;
        }
        if let Some(password) = lookup("DATABASE_PASSWORD") {
            conn.password = password;
        }
        if let Some(host) = lookup("DATABASE_HOST") {
            conn.host = host;
        }
        if let Some(port) = lookup("DATABASE_PORT").filter(|p| !p.trim().is_empty()) {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::config(format!("DATABASE_PORT must be a port number, got '{port}'")))?;
            conn.port = Some(port);
        }
        conn.test_name = lookup("TEST_DATABASE_NAME").filter(|n| !n.is_empty());
        if let Some(options) = lookup("DATABASE_OPTIONS").filter(|o| !o.trim().is_empty()) {
            conn.options = match serde_json::from_str(&options) {
                Ok(JsonValue::Object(map)) => map,
                Ok(_) => {
                    return Err(Error::config("DATABASE_OPTIONS must be a JSON object"));
                }
                Err(e) => {
                    return Err(Error::config(format!("DATABASE_OPTIONS is not valid JSON: {e}")));
                }
            };
        }

        Ok(settings)
    }

    /// The engine actually used, falling back to [`DEFAULT_ENGINE`].
    pub fn effective_engine(&self) -> &str {
        let engine = self.engine.trim();
        if engine.is_empty() {
            DEFAULT_ENGINE
        } else {
            engine
        }
    }

    /// Enable or disable the query log.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the database name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.connection.name = name.into();
        self
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.connection.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.connection.password = password.into();
        self
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.connection.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.connection.port = Some(port);
        self
    }

    /// Set the test database name.
    pub fn test_name(mut self, name: impl Into<String>) -> Self {
        self.connection.test_name = Some(name.into());
        self
    }

    /// Set a driver-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.connection.options.insert(key.into(), value.into());
        self
    }
}

impl ConnectionSettings {
    /// Look up a string option.
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(JsonValue::as_str)
    }

    /// Look up a numeric option.
    pub fn option_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(JsonValue::as_f64)
    }

    /// Look up a boolean option.
    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(JsonValue::as_bool)
    }
}

fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "1" || v == "true" || v == "yes" || v == "on"
}

//! Interactive `sqlite3` shell.

use crate::connection::MEMORY_PATH;
use sqldispatch_core::{ClientBackend, ConnectionSettings, Result};
use std::process::Command;

/// Shell executable, looked up on `PATH`.
pub const SHELL_PROGRAM: &str = "sqlite3";

/// Client submodule of the `sqlite3` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteClient;

impl ClientBackend for SqliteClient {
    fn shell_command(&self, settings: &ConnectionSettings) -> Result<Command> {
        let name = if settings.name.trim().is_empty() {
            MEMORY_PATH
        } else {
            settings.name.as_str()
        };
        let mut command = Command::new(SHELL_PROGRAM);
        command.arg(name);
        Ok(command)
    }
}

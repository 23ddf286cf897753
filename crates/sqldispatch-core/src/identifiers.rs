//! Identifier quoting and validation.

use regex::Regex;
use std::sync::OnceLock;

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them (`"` → `""`).
///
/// ```
/// use sqldispatch_core::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("user\"name"), "\"user\"\"name\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Strip everything but ASCII alphanumerics and underscores.
///
/// For statements that cannot take a quoted identifier (SQLite `PRAGMA`s).
#[inline]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn backend_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("backend name pattern is valid")
    })
}

/// Whether `name` is a well-formed backend identifier: dot-separated
/// segments of letters, digits and underscores, none starting with a digit.
///
/// ```
/// use sqldispatch_core::is_valid_backend_name;
///
/// assert!(is_valid_backend_name("sqlite3"));
/// assert!(is_valid_backend_name("acme.backends.oracle"));
/// assert!(!is_valid_backend_name("../etc/passwd"));
/// ```
pub fn is_valid_backend_name(name: &str) -> bool {
    backend_name_pattern().is_match(name)
}

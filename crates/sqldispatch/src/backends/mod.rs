//! Backends that ship with sqldispatch itself.
//!
//! `sqlite3` lives in its own crate and is pulled in by the `sqlite` feature.

pub mod dummy;

pub use dummy::DummyBackend;

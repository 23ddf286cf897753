//! Placeholder backend used when no engine is configured.
//!
//! Resolving it always succeeds so that a project without a database can
//! still start. Anything that needs a real database fails with a
//! configuration error; closing and rolling back are no-ops.

use sqldispatch_core::{
    Backend, BaseBackend, ConnectionSettings, CreationBackend, Error, Executor, LoadError,
    RawConnection, Result, Row, Value,
};
use std::sync::Arc;

/// Name the backend is registered under.
pub const BACKEND_NAME: &str = "dummy";

const NOT_CONFIGURED: &str = "You haven't set the DATABASE_ENGINE setting yet.";

fn complain<T>() -> Result<T> {
    Err(Error::config(NOT_CONFIGURED))
}

/// The `dummy` backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyBackend;

impl Backend for DummyBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn base(&self) -> std::result::Result<Arc<dyn BaseBackend>, LoadError> {
        Ok(Arc::new(DummyBase))
    }

    fn creation(&self) -> std::result::Result<Arc<dyn CreationBackend>, LoadError> {
        Ok(Arc::new(DummyCreation))
    }
}

#[derive(Debug)]
struct DummyBase;

impl BaseBackend for DummyBase {
    fn vendor(&self) -> &'static str {
        "dummy"
    }

    fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn RawConnection>> {
        Ok(Box::new(DummyConnection))
    }
}

#[derive(Debug)]
struct DummyConnection;

impl Executor for DummyConnection {
    fn execute(&mut self, _sql: &str, _params: &[Value]) -> Result<u64> {
        complain()
    }

    fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        complain()
    }
}

impl RawConnection for DummyConnection {
    fn begin(&mut self) -> Result<()> {
        complain()
    }

    fn commit(&mut self) -> Result<()> {
        complain()
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        false
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct DummyCreation;

impl CreationBackend for DummyCreation {
    fn data_types(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    fn test_database_name(&self, settings: &ConnectionSettings) -> String {
        settings.test_name.clone().unwrap_or_default()
    }

    fn create_test_db(
        &self,
        _settings: &ConnectionSettings,
        _autoclobber: bool,
    ) -> Result<ConnectionSettings> {
        complain()
    }

    fn destroy_test_db(&self, _test_settings: &ConnectionSettings) -> Result<()> {
        complain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_operations_are_not_configured() {
        let base = DummyBackend.base().unwrap();
        let mut conn = base.connect(&ConnectionSettings::default()).unwrap();

        let err = conn.execute("SELECT 1", &[]).unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains(NOT_CONFIGURED));
        assert!(conn.query("SELECT 1", &[]).is_err());
        assert!(conn.begin().is_err());
        assert!(conn.commit().is_err());

        assert!(conn.rollback().is_ok());
        assert!(conn.close().is_ok());
    }

    #[test]
    fn test_creation_has_no_types() {
        let creation = DummyBackend.creation().unwrap();
        assert!(creation.data_types().is_empty());
        assert!(creation.column_type("CharField", Some(10)).is_none());
        assert!(
            creation
                .create_test_db(&ConnectionSettings::default(), true)
                .is_err()
        );
    }

    #[test]
    fn test_optional_modules_missing() {
        assert!(matches!(DummyBackend.introspection(), Err(e) if e.is_missing()));
        assert!(matches!(DummyBackend.client(), Err(e) if e.is_missing()));
    }
}

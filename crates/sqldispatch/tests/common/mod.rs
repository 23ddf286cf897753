//! A plugin backend that counts what the framework does to its handles.

#![allow(dead_code)]

use sqldispatch::{
    Backend, BaseBackend, ConnectionSettings, CreationBackend, Error, Executor, LoadError,
    RawConnection, Result, Row, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    pub statements: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        Self::get(&self.opens)
    }

    pub fn closes(&self) -> usize {
        Self::get(&self.closes)
    }

    pub fn begins(&self) -> usize {
        Self::get(&self.begins)
    }

    pub fn commits(&self) -> usize {
        Self::get(&self.commits)
    }

    pub fn rollbacks(&self) -> usize {
        Self::get(&self.rollbacks)
    }

    pub fn statements(&self) -> usize {
        Self::get(&self.statements)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[derive(Debug, Clone, Default)]
pub struct CountingBackend {
    pub counters: Arc<Counters>,
}

impl CountingBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for CountingBackend {
    fn name(&self) -> &str {
        "tests.counting"
    }

    fn base(&self) -> std::result::Result<Arc<dyn BaseBackend>, LoadError> {
        Ok(Arc::new(CountingBase {
            counters: Arc::clone(&self.counters),
        }))
    }

    fn creation(&self) -> std::result::Result<Arc<dyn CreationBackend>, LoadError> {
        Ok(Arc::new(CountingCreation))
    }
}

struct CountingBase {
    counters: Arc<Counters>,
}

impl BaseBackend for CountingBase {
    fn vendor(&self) -> &'static str {
        "counting"
    }

    fn connect(&self, _settings: &ConnectionSettings) -> Result<Box<dyn RawConnection>> {
        bump(&self.counters.opens);
        Ok(Box::new(CountingConnection {
            counters: Arc::clone(&self.counters),
            in_transaction: false,
        }))
    }
}

struct CountingConnection {
    counters: Arc<Counters>,
    in_transaction: bool,
}

impl Executor for CountingConnection {
    fn execute(&mut self, sql: &str, _params: &[Value]) -> Result<u64> {
        bump(&self.counters.statements);
        if sql.starts_with("FAIL") {
            return Err(Error::Custom(format!("refused: {sql}")));
        }
        Ok(1)
    }

    fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
        bump(&self.counters.statements);
        Ok(vec![Row::new(vec!["one".into()], vec![Value::Int(1)])])
    }
}

impl RawConnection for CountingConnection {
    fn begin(&mut self) -> Result<()> {
        bump(&self.counters.begins);
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        bump(&self.counters.commits);
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        bump(&self.counters.rollbacks);
        self.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn close(self: Box<Self>) -> Result<()> {
        bump(&self.counters.closes);
        Ok(())
    }
}

struct CountingCreation;

impl CreationBackend for CountingCreation {
    fn data_types(&self) -> &'static [(&'static str, &'static str)] {
        &[("IntegerField", "integer")]
    }

    fn test_database_name(&self, settings: &ConnectionSettings) -> String {
        format!("test_{}", settings.name)
    }

    fn create_test_db(
        &self,
        settings: &ConnectionSettings,
        _autoclobber: bool,
    ) -> Result<ConnectionSettings> {
        let mut test = settings.clone();
        test.name = self.test_database_name(settings);
        Ok(test)
    }

    fn destroy_test_db(&self, _test_settings: &ConnectionSettings) -> Result<()> {
        Ok(())
    }
}

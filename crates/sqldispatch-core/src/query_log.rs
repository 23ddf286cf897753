//! Ordered log of executed statements.

use crate::value::Value;
use serde::Serialize;
use std::time::Duration;

/// One executed statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    /// SQL text as sent to the backend
    pub sql: String,
    /// Bound parameters
    pub params: Vec<Value>,
    /// Wall-clock execution time in seconds
    pub time: f64,
}

impl QueryRecord {
    pub fn new(sql: impl Into<String>, params: &[Value], elapsed: Duration) -> Self {
        Self {
            sql: sql.into(),
            params: params.to_vec(),
            time: elapsed.as_secs_f64(),
        }
    }
}

/// The statements executed since the log was last reset, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct QueryLog {
    records: Vec<QueryRecord>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: QueryRecord) {
        self.records.push(record);
    }

    /// Forget every recorded statement.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[QueryRecord] {
        &self.records
    }

    /// Total time spent in recorded statements, in seconds.
    pub fn total_time(&self) -> f64 {
        self.records.iter().map(|r| r.time).sum()
    }
}

impl<'a> IntoIterator for &'a QueryLog {
    type Item = &'a QueryRecord;
    type IntoIter = std::slice::Iter<'a, QueryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_order_and_clears() {
        let mut log = QueryLog::new();
        log.push(QueryRecord::new("SELECT 1", &[], Duration::from_millis(2)));
        log.push(QueryRecord::new(
            "SELECT ?",
            &[Value::BigInt(2)],
            Duration::from_millis(3),
        ));

        let sql: Vec<&str> = log.iter().map(|r| r.sql.as_str()).collect();
        assert_eq!(sql, ["SELECT 1", "SELECT ?"]);
        assert!((log.total_time() - 0.005).abs() < 1e-9);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_log_serializes_as_list() {
        let mut log = QueryLog::new();
        log.push(QueryRecord::new("SELECT 1", &[], Duration::ZERO));
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json[0]["sql"], "SELECT 1");
        assert_eq!(json[0]["time"], 0.0);
    }
}

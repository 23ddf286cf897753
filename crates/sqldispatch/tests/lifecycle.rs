mod common;

use common::CountingBackend;
use sqldispatch::{
    BackendRegistry, Database, Error, Executor, RequestEvent, Settings, TransactionErrorKind,
};
use std::sync::{Arc, Mutex};

fn counting_database(debug: bool) -> (Database, CountingBackend) {
    let backend = CountingBackend::new();
    let registry = BackendRegistry::new()
        .with_plugin("tests.counting", Arc::new(backend.clone()))
        .unwrap();
    let settings = Settings::new("tests.counting").name("app").debug(debug);
    let db = Database::with_registry(settings, &registry).unwrap();
    (db, backend)
}

#[test]
fn wrapper_is_constructed_once() {
    let (db, backend) = counting_database(false);

    let first = {
        let conn = db.connection();
        std::ptr::from_ref::<sqldispatch::ConnectionWrapper>(&conn)
    };
    for _ in 0..3 {
        db.handle_request(|db| db.connection().execute("UPDATE t SET x = 1", &[]))
            .unwrap();
        let again = {
            let conn = db.connection();
            std::ptr::from_ref::<sqldispatch::ConnectionWrapper>(&conn)
        };
        assert!(std::ptr::eq(first, again));
    }

    // One wrapper, one handle per request
    assert_eq!(backend.counters.opens(), 3);
    assert_eq!(db.connection().open_count(), 3);
}

#[test]
fn request_started_clears_queries() {
    let (db, _) = counting_database(true);
    {
        let mut conn = db.connection();
        conn.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
        conn.query("SELECT 1", &[]).unwrap();
        assert_eq!(conn.queries().len(), 2);
    }

    db.dispatch(RequestEvent::RequestStarted).unwrap();
    assert!(db.connection().queries().is_empty());

    let logged = db
        .handle_request(|db| {
            db.connection().query("SELECT 1", &[])?;
            Ok(db.connection().queries().len())
        })
        .unwrap();
    assert_eq!(logged, 1);
}

#[test]
fn request_finished_closes_exactly_once() {
    let (db, backend) = counting_database(false);

    db.handle_request(|db| {
        let mut conn = db.connection();
        conn.execute("INSERT INTO t VALUES (1)", &[])?;
        conn.execute("INSERT INTO t VALUES (2)", &[])?;
        Ok(())
    })
    .unwrap();
    assert_eq!(backend.counters.closes(), 1);
    assert!(!db.connection().is_open());

    // A request that never touches the database has nothing to close
    db.handle_request(|_| Ok(())).unwrap();
    assert_eq!(backend.counters.closes(), 1);

    db.handle_request(|db| db.connection().query("SELECT 1", &[]).map(|_| ()))
        .unwrap();
    assert_eq!(backend.counters.closes(), 2);
}

#[test]
fn failed_request_still_closes() {
    let (db, backend) = counting_database(false);
    let err = db
        .handle_request(|db| db.connection().execute("FAIL please", &[]))
        .unwrap_err();
    assert_eq!(err.to_string(), "refused: FAIL please");
    assert_eq!(backend.counters.closes(), 1);
    assert_eq!(backend.counters.rollbacks(), 0);
}

#[test]
fn exception_rolls_back_managed_transaction() {
    let (db, backend) = counting_database(false);

    let err = db
        .handle_request(|db| {
            let mut conn = db.connection();
            conn.enter_transaction_management();
            conn.managed(true)?;
            conn.execute("INSERT INTO t VALUES (1)", &[])?;
            conn.execute("FAIL here", &[])
        })
        .unwrap_err();
    assert!(err.to_string().starts_with("refused"));

    assert_eq!(backend.counters.begins(), 1);
    assert_eq!(backend.counters.rollbacks(), 1);
    assert_eq!(backend.counters.commits(), 0);
    assert_eq!(backend.counters.closes(), 1);
}

#[test]
fn failed_managed_request_does_not_leak_into_next_request() {
    let (db, backend) = counting_database(false);

    let _ = db.handle_request(|db| {
        let mut conn = db.connection();
        conn.enter_transaction_management();
        conn.managed(true)?;
        conn.execute("INSERT INTO t VALUES (1)", &[])?;
        Err::<(), _>(Error::Custom("view failed".into()))
    });
    assert!(!db.connection().is_managed());
    assert!(!db.connection().is_dirty());
    assert_eq!(backend.counters.begins(), 1);
    assert_eq!(backend.counters.rollbacks(), 1);

    // Plain write, no BEGIN and nothing left to roll back at close
    db.handle_request(|db| db.connection().execute("INSERT INTO t VALUES (2)", &[]))
        .unwrap();
    assert_eq!(backend.counters.begins(), 1);
    assert_eq!(backend.counters.rollbacks(), 1);
    assert_eq!(backend.counters.closes(), 2);
}

#[test]
fn close_rolls_back_open_transaction_and_resets_management() {
    let (db, backend) = counting_database(false);
    let mut conn = db.connection();
    conn.enter_transaction_management();
    conn.managed(true).unwrap();
    conn.execute("INSERT INTO t VALUES (1)", &[]).unwrap();
    assert!(conn.in_transaction());

    conn.close().unwrap();
    assert_eq!(backend.counters.rollbacks(), 1);
    assert_eq!(backend.counters.commits(), 0);
    assert!(!conn.is_managed());
    assert!(!conn.is_dirty());
    assert!(conn.leave_transaction_management().is_err());

    conn.execute("INSERT INTO t VALUES (2)", &[]).unwrap();
    assert_eq!(backend.counters.begins(), 1);
}

#[test]
fn exception_without_managed_transaction_does_not_roll_back() {
    let (db, backend) = counting_database(false);

    let _ = db.handle_request(|db| {
        db.connection().execute("INSERT INTO t VALUES (1)", &[])?;
        Err::<(), _>(Error::Custom("view failed".into()))
    });
    assert_eq!(backend.counters.rollbacks(), 0);

    // Managed, but nothing executed yet: no driver transaction to roll back
    let _ = db.handle_request(|db| {
        let mut conn = db.connection();
        conn.enter_transaction_management();
        conn.managed(true)?;
        Err::<(), _>(Error::Custom("view failed".into()))
    });
    assert_eq!(backend.counters.rollbacks(), 0);
    assert_eq!(backend.counters.begins(), 0);
}

#[test]
fn commit_on_success_inside_request() {
    let (db, backend) = counting_database(false);

    db.handle_request(|db| {
        db.connection()
            .commit_on_success(|conn| conn.execute("INSERT INTO t VALUES (1)", &[]))
    })
    .unwrap();
    assert_eq!(backend.counters.begins(), 1);
    assert_eq!(backend.counters.commits(), 1);
    assert_eq!(backend.counters.rollbacks(), 0);
}

#[test]
fn leaving_dirty_block_is_an_error() {
    let (db, backend) = counting_database(false);
    let mut conn = db.connection();
    conn.enter_transaction_management();
    conn.managed(true).unwrap();
    conn.execute("INSERT INTO t VALUES (1)", &[]).unwrap();

    let err = conn.leave_transaction_management().unwrap_err();
    match err {
        Error::Transaction(t) => assert_eq!(t.kind, TransactionErrorKind::PendingOnLeave),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(backend.counters.rollbacks(), 1);
}

#[test]
fn custom_hooks_run_after_defaults() {
    let (mut db, _) = counting_database(false);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&seen);
    db.add_hook(RequestEvent::RequestFinished, "audit", move |conn| {
        log.lock().unwrap().push(conn.is_open());
        Ok(())
    });
    assert_eq!(
        db.hooks().names(RequestEvent::RequestFinished),
        vec!["close_connection", "audit"]
    );

    db.handle_request(|db| db.connection().query("SELECT 1", &[]).map(|_| ()))
        .unwrap();
    // The default close hook ran first
    assert_eq!(*seen.lock().unwrap(), vec![false]);
}

#[test]
fn failing_exception_hook_does_not_skip_close() {
    let (mut db, backend) = counting_database(false);
    db.add_hook(RequestEvent::GotRequestException, "broken", |_| {
        Err(Error::Custom("hook failed".into()))
    });

    let err = db
        .handle_request(|db| db.connection().execute("FAIL now", &[]))
        .unwrap_err();
    assert_eq!(err.to_string(), "refused: FAIL now");
    assert_eq!(backend.counters.closes(), 1);
}

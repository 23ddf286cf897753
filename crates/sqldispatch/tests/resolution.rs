mod common;

use common::CountingBackend;
use sqldispatch::{BackendRegistry, BackendSource, Database, Settings};
use std::sync::Arc;

#[test]
fn unknown_backend_lists_sorted_builtins() {
    let err = Database::from_settings(Settings::new("doesnotexist")).unwrap_err();
    assert!(err.is_config_error());
    assert!(!err.is_database_error());

    let msg = err.to_string();
    assert!(msg.contains("'doesnotexist' isn't an available database backend"));
    assert!(msg.contains("'dummy'"));

    let registry = BackendRegistry::new();
    let listed = registry
        .builtin_names()
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ");
    assert!(msg.ends_with(&format!("Available options are: {listed}")));

    let mut sorted = registry.builtin_names();
    sorted.sort_unstable();
    assert_eq!(sorted, registry.builtin_names());
}

#[test]
fn settings_json_selects_plugin() {
    let backend = CountingBackend::new();
    let registry = BackendRegistry::new()
        .with_plugin("tests.counting", Arc::new(backend))
        .unwrap();

    let settings = Settings::from_json(
        r#"{"DATABASE_ENGINE": "tests.counting", "DATABASE_NAME": "app", "DEBUG": true}"#,
    )
    .unwrap();
    let db = Database::with_registry(settings, &registry).unwrap();
    assert_eq!(db.engine(), "tests.counting");
    assert_eq!(db.source(), BackendSource::Plugin);
    assert!(db.connection().is_debug());

    let creation = db.creation();
    assert_eq!(
        creation.column_type("IntegerField", None).as_deref(),
        Some("integer")
    );
    let test = creation
        .create_test_db(&db.settings().connection, false)
        .unwrap();
    assert_eq!(test.name, "test_app");
}

#[test]
fn plugin_is_not_visible_without_registration() {
    let err = Database::from_settings(Settings::new("tests.counting")).unwrap_err();
    assert!(
        err.to_string()
            .contains("isn't an available database backend")
    );
}

#[test]
fn missing_optional_modules_fail_lazily() {
    let registry = BackendRegistry::new()
        .with_plugin("tests.counting", Arc::new(CountingBackend::new()))
        .unwrap();
    let db = Database::with_registry(Settings::new("tests.counting"), &registry).unwrap();

    // Resolution succeeded; only asking for the module fails
    let err = db.introspection().err().unwrap();
    assert!(err.to_string().contains("has no introspection module"));
    assert!(db.runshell().is_err());
}

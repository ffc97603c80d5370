//! Batches executed with `run` against a persisted store.

use anystore_core::{Config, KeyValue, Store, StoreError, StoreResult, Value};
use std::path::Path;
use tempfile::tempdir;

fn open(path: &Path) -> Store {
    Store::open(Config::new().persistence(true).path(path)).unwrap()
}

#[test]
fn batch_sees_own_writes_and_deletes() {
    let dir = tempdir().unwrap();
    let store = open(&dir.path().join("db"));
    store.store("old", 0).unwrap();

    store
        .run(|kv| -> StoreResult<()> {
            kv.store("a", 1)?;
            assert_eq!(kv.load("a")?, Some(Value::from(1)));
            assert!(kv.has_key("a"));
            assert_eq!(kv.len()?, 2);

            kv.delete("old")?;
            assert_eq!(kv.len()?, 1);
            assert_eq!(kv.keys()?, vec![Value::from("a")]);
            Ok(())
        })
        .unwrap();

    assert_eq!(open(&dir.path().join("db")).keys().unwrap(), vec![Value::from("a")]);
}

#[test]
fn batch_error_keeps_earlier_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db");
    let store = open(&path);

    let result = store.run(|kv| -> StoreResult<()> {
        kv.store("written", true)?;
        Err(StoreError::not_found("deliberate"))
    });

    assert!(matches!(result, Err(StoreError::NotFound { key }) if key == "deliberate"));
    assert_eq!(open(&path).load("written").unwrap(), Some(Value::Bool(true)));
}

#[test]
fn custom_error_type_passes_through() {
    #[derive(Debug, PartialEq)]
    enum BatchError {
        Store(String),
        Rejected(i64),
    }

    let dir = tempdir().unwrap();
    let store = open(&dir.path().join("db"));
    store.store("limit", 3).unwrap();

    let result = store.run(|kv| {
        let limit = kv
            .load("limit")
            .map_err(|e| BatchError::Store(e.to_string()))?
            .and_then(|v| v.as_integer())
            .unwrap_or(0);
        if limit < 10 {
            return Err(BatchError::Rejected(limit));
        }
        Ok(limit)
    });

    assert_eq!(result, Err(BatchError::Rejected(3)));
}

#[test]
fn nested_run_executes_immediately() {
    let dir = tempdir().unwrap();
    let store = open(&dir.path().join("db"));

    let value = store
        .run(|outer| {
            outer.run(|inner| {
                inner.store("nested", "yes")?;
                inner.load("nested")
            })
        })
        .unwrap();

    assert_eq!(value, Some(Value::from("yes")));
}

#[test]
fn batch_returns_a_value() {
    let dir = tempdir().unwrap();
    let store = open(&dir.path().join("db"));
    for i in 0..5 {
        store.store(i, i * i).unwrap();
    }

    let sum: i64 = store
        .run(|kv| -> StoreResult<i64> {
            let mut sum = 0;
            for key in kv.keys()? {
                sum += kv.load(key)?.and_then(|v| v.as_integer()).unwrap_or(0);
            }
            Ok(sum)
        })
        .unwrap();

    assert_eq!(sum, 30);
}

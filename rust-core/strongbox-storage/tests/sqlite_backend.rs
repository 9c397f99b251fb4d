// SPDX-License-Identifier: PMPL-1.0-or-later
//! SQLite through the SQL backend, against the shared contract

#![cfg(feature = "sql")]

mod common;

use common::Profile;
use strongbox_core::{Backend, Entity, StorageEngine};
use strongbox_storage::{SqlBackend, SqlDialect};
use tempfile::TempDir;

fn engine() -> (StorageEngine, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let backend = SqlBackend::new(url, 2).unwrap();
    assert_eq!(backend.dialect(), SqlDialect::Sqlite);
    let engine = StorageEngine::new(backend);
    engine.connect().unwrap();
    (engine, dir)
}

#[test]
fn test_contract() {
    let (engine, _dir) = engine();
    common::run_contract(&engine);
    engine.close_connection().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_contract() {
    let (engine, _dir) = tokio::task::spawn_blocking(engine).await.unwrap();
    common::run_async_contract(&engine).await;
}

#[test]
fn test_non_finite_floats() {
    let (engine, _dir) = engine();
    common::infinities_round_trip(&engine);
    // SQLite turns a bound NaN into NULL, so it is refused up front.
    common::unstorable_float_is_refused(&engine, f64::NAN);
}

#[test]
fn test_requires_connect() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let engine = StorageEngine::new(SqlBackend::new(url, 1).unwrap());

    let err = engine
        .save_or_update_sync(&Profile::new("u1", 1, &[]))
        .unwrap_err();
    assert!(err.is_not_connected());
    assert!(engine.load_by_id_sync::<Profile>("u1").unwrap_err().is_not_connected());
    assert!(engine.delete_by_id_sync::<Profile>("u1").is_err());

    engine.connect().unwrap();
    engine
        .save_or_update_sync(&Profile::new("u1", 1, &[]))
        .unwrap();
    engine.close_connection().unwrap();
    engine.close_connection().unwrap();
    assert!(!engine.is_connected());
}

#[test]
fn test_data_survives_reconnect() {
    let (engine, _dir) = engine();
    engine
        .save_or_update_sync(&Profile::new("kept", 9, &["x"]))
        .unwrap();
    engine.close_connection().unwrap();

    engine.connect().unwrap();
    assert_eq!(
        engine.load_by_id_sync::<Profile>("kept").unwrap(),
        Some(Profile::new("kept", 9, &["x"]))
    );
}

#[test]
fn test_one_row_per_identifier() {
    let (engine, _dir) = engine();
    for points in 0..3 {
        engine
            .save_or_update_sync(&Profile::new("same", points, &[]))
            .unwrap();
    }
    let ids = engine
        .backend()
        .list_ids(Profile::schema_info())
        .unwrap();
    assert_eq!(ids, vec!["same".to_string()]);
}

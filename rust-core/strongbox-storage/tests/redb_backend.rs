// SPDX-License-Identifier: PMPL-1.0-or-later
//! redb backend against the shared contract

#![cfg(feature = "redb-backend")]

mod common;

use common::Profile;
use strongbox_core::StorageEngine;
use strongbox_storage::RedbBackend;
use tempfile::tempdir;

#[test]
fn test_contract() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::new(RedbBackend::open(dir.path().join("store.redb")).unwrap());
    common::run_contract(&engine);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_contract() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::new(RedbBackend::open(dir.path().join("store.redb")).unwrap());
    common::run_async_contract(&engine).await;
}

#[test]
fn test_non_finite_floats() {
    let dir = tempdir().unwrap();
    let engine = StorageEngine::new(RedbBackend::open(dir.path().join("store.redb")).unwrap());
    common::infinities_round_trip(&engine);
    common::nan_round_trips(&engine);
}

#[test]
fn test_reopen_keeps_objects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.redb");
    {
        let engine = StorageEngine::new(RedbBackend::open(&path).unwrap());
        engine
            .save_or_update_sync(&Profile::new("u1", 10, &["a", "b"]))
            .unwrap();
    }
    let engine = StorageEngine::new(RedbBackend::open(&path).unwrap());
    assert_eq!(
        engine.load_by_id_sync::<Profile>("u1").unwrap(),
        Some(Profile::new("u1", 10, &["a", "b"]))
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn acquire_writes_owner_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("writer.lock");

    let lock = WriterLock::acquire(&path, "daemon-1", dir.path(), 1_000).unwrap();
    assert_eq!(lock.owner().owner_id, "daemon-1");
    assert_eq!(lock.owner().acquired_at_ms, 1_000);

    let on_disk: WriterLockOwner =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(&on_disk, lock.owner());
}

#[test]
fn second_acquisition_is_busy_with_incumbent_metadata() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("writer.lock");

    let _held = WriterLock::acquire(&path, "daemon-1", dir.path(), 1_000).unwrap();
    match WriterLock::acquire(&path, "daemon-2", dir.path(), 2_000) {
        Err(WriterLockError::Busy { owner: Some(owner) }) => {
            assert_eq!(owner.owner_id, "daemon-1");
            assert_eq!(owner.acquired_at_ms, 1_000);
        }
        other => panic!("expected busy, got {other:?}"),
    }
}

#[test]
fn release_deletes_the_lock_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("writer.lock");

    let lock = WriterLock::acquire(&path, "daemon-1", dir.path(), 1_000).unwrap();
    lock.release().unwrap();
    assert!(!path.exists());

    // Re-acquirable after release
    let _lock = WriterLock::acquire(&path, "daemon-2", dir.path(), 2_000).unwrap();
}

#[test]
fn drop_releases_the_lock() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("writer.lock");

    {
        let _lock = WriterLock::acquire(&path, "daemon-1", dir.path(), 1_000).unwrap();
        assert!(path.exists());
    }
    assert!(!path.exists());
}

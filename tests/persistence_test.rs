//! Persistence tests: on-disk round trips and rejection of damaged files.

use std::fs;
use std::path::Path;
use storex::persistence::{FORMAT_VERSION, MAGIC};
use storex::{Metadata, MetadataValue, VectorDbError, VectorStore};
use tempfile::TempDir;

fn populated_store(path: &Path) -> VectorStore {
    let mut store = VectorStore::with_storage(path, false);
    let mut meta = Metadata::new();
    meta.insert("title".into(), "first".into());
    meta.insert("score".into(), MetadataValue::Float(0.75));
    meta.insert("count".into(), MetadataValue::Int(-3));
    meta.insert("flag".into(), MetadataValue::Bool(true));
    meta.insert("none".into(), MetadataValue::Null);
    store.insert(vec![0.5, -1.5, 2.25], meta).unwrap();
    store.insert(vec![1.0, 1.0, 1.0], Metadata::new()).unwrap();
    store
}

#[test]
fn test_round_trip_preserves_everything() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");

    let store = populated_store(&path);
    assert!(store.save());

    let mut loaded = VectorStore::with_storage(&path, false);
    assert!(loaded.load());
    assert_eq!(loaded.get_all(), store.get_all());
    assert_eq!(loaded.dimension(), Some(3));
}

#[test]
fn test_empty_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.db");

    let store = VectorStore::with_storage(&path, false);
    store.try_save().unwrap();

    let mut loaded = VectorStore::with_storage(&path, false);
    loaded.try_load().unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.dimension(), None);

    // Any dimension is accepted after loading an unlocked store
    loaded.insert(vec![1.0; 7], Metadata::new()).unwrap();
}

#[test]
fn test_file_starts_with_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    populated_store(&path).try_save().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &MAGIC);
    assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), FORMAT_VERSION);
}

#[test]
fn test_save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    populated_store(&path).try_save().unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["store.db".to_string()]);
}

#[test]
fn test_flipped_byte_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    populated_store(&path).try_save().unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let mut store = VectorStore::with_storage(&path, false);
    assert!(matches!(store.try_load(), Err(VectorDbError::CorruptData(_))));
    assert!(!store.load());
}

#[test]
fn test_truncated_file_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    populated_store(&path).try_save().unwrap();

    let bytes = fs::read(&path).unwrap();
    for len in [0, 3, 10, bytes.len() - 1] {
        fs::write(&path, &bytes[..len]).unwrap();
        let mut store = VectorStore::with_storage(&path, false);
        assert!(
            matches!(store.try_load(), Err(VectorDbError::CorruptData(_))),
            "truncated to {} bytes",
            len
        );
    }
}

#[test]
fn test_future_version_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    populated_store(&path).try_save().unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[4..6].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut store = VectorStore::with_storage(&path, false);
    match store.try_load() {
        Err(VectorDbError::UnsupportedVersion { found, supported }) => {
            assert_eq!(found, FORMAT_VERSION + 1);
            assert_eq!(supported, FORMAT_VERSION);
        }
        other => panic!("expected UnsupportedVersion, got {:?}", other),
    }
}

#[test]
fn test_foreign_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"{\"documents\": []} and some more text").unwrap();

    let mut store = VectorStore::with_storage(&path, false);
    assert!(matches!(store.try_load(), Err(VectorDbError::CorruptData(_))));
}

#[test]
fn test_failed_load_keeps_current_content() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    fs::write(&path, b"garbage").unwrap();

    let mut store = VectorStore::with_storage(&path, false);
    store.insert(vec![1.0, 2.0], Metadata::new()).unwrap();
    let before = store.get_all();

    assert!(!store.load());
    assert_eq!(store.get_all(), before);
    assert_eq!(store.dimension(), Some(2));
    assert_eq!(store.insert(vec![3.0, 4.0], Metadata::new()).unwrap(), 1);
}

#[test]
fn test_failed_save_keeps_previous_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    let mut store = populated_store(&path);
    assert!(store.save());

    // A directory squatting on the temp name makes the next save fail
    fs::create_dir(storex::persistence::snapshot::temp_path(&path)).unwrap();
    store.insert(vec![0.0, 0.0, 1.0], Metadata::new()).unwrap();
    assert!(!store.save());
    assert!(matches!(store.try_save(), Err(VectorDbError::IoError(_))));

    let reopened = VectorStore::open(&path, false).unwrap();
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.get_all(), store.get_all()[..2].to_vec());
}

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let mut store = VectorStore::with_storage(dir.path().join("absent.db"), false);
    assert!(matches!(store.try_load(), Err(VectorDbError::IoError(_))));
    assert!(!store.load());
}

#[test]
fn test_unbound_store_cannot_persist() {
    let mut store = VectorStore::new();
    assert!(!store.has_storage());
    assert!(matches!(store.try_save(), Err(VectorDbError::NoStorage)));
    assert!(matches!(store.try_load(), Err(VectorDbError::NoStorage)));
    assert!(!store.save());
}

#[test]
fn test_auto_save_writes_each_mutation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("auto.db");

    let mut store = VectorStore::with_storage(&path, true);
    store.insert(vec![1.0], Metadata::new()).unwrap();
    assert_eq!(VectorStore::open(&path, false).unwrap().len(), 1);

    store
        .insert_batch(vec![(vec![2.0], Metadata::new()), (vec![3.0], Metadata::new())])
        .unwrap();
    assert_eq!(VectorStore::open(&path, false).unwrap().len(), 3);

    store.clear();
    let reopened = VectorStore::open(&path, false).unwrap();
    assert!(reopened.is_empty());
    assert_eq!(reopened.dimension(), None);
}

#[test]
fn test_auto_save_disabled_leaves_file_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("manual.db");

    let mut store = VectorStore::with_storage(&path, false);
    store.insert(vec![1.0], Metadata::new()).unwrap();
    assert!(!path.exists());

    assert!(store.save());
    assert!(path.exists());
}

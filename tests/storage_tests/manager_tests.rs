//! Tests for StorageManager
//!
//! These tests verify:
//! - Opening/creating storage directories
//! - Flushing MemTable to SSTable
//! - Querying across multiple SSTables
//! - Tombstone handling across SSTables
//! - Persistence (restart and rediscover SSTables)
//! - Corrupt table policy and temp-file cleanup

use std::fs;
use std::path::PathBuf;

use stratakv::config::CorruptTablePolicy;
use stratakv::memtable::MemTable;
use stratakv::storage::{SSTableBuilder, SSTableReader, StorageManager};
use stratakv::StrataError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn create_memtable_with_entries(entries: &[(&str, &str)]) -> MemTable {
    let mut memtable = MemTable::new();
    for (key, value) in entries {
        memtable.put(key.as_bytes().to_vec(), value.as_bytes().to_vec());
    }
    memtable
}

fn open(path: &PathBuf) -> StorageManager {
    StorageManager::open(path, CorruptTablePolicy::Skip).unwrap()
}

// =============================================================================
// Open/Create Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("new_storage");

    assert!(!path.exists());

    let manager = open(&path);

    assert!(path.is_dir());
    assert_eq!(manager.data_dir(), path.as_path());
}

#[test]
fn test_open_empty_directory() {
    let (_temp, path) = setup_temp_storage();

    let manager = open(&path);

    assert_eq!(manager.sstable_count(), 0);
    assert_eq!(manager.next_sstable_id(), 1);
}

#[test]
fn test_open_existing_directory() {
    let (_temp, path) = setup_temp_storage();

    // First open - create some SSTables
    {
        let manager = open(&path);

        let memtable = create_memtable_with_entries(&[("k1", "v1")]);
        manager.flush(&memtable).unwrap();

        let memtable = create_memtable_with_entries(&[("k2", "v2")]);
        manager.flush(&memtable).unwrap();

        assert_eq!(manager.sstable_count(), 2);
    }

    // Second open - should discover existing SSTables
    let manager = open(&path);
    assert_eq!(manager.sstable_count(), 2);
    assert_eq!(manager.next_sstable_id(), 3);
    assert_eq!(manager.get(b"k1").unwrap(), Some(b"v1".to_vec()));
    assert_eq!(manager.get(b"k2").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_open_ignores_unrelated_files() {
    let (_temp, path) = setup_temp_storage();
    fs::write(path.join("notes.txt"), b"hello").unwrap();
    fs::write(path.join("sstable_abc.sst"), b"junk").unwrap();

    let manager = open(&path);

    assert_eq!(manager.sstable_count(), 0);
}

#[test]
fn test_open_orders_by_id_not_name_length() {
    let (_temp, path) = setup_temp_storage();
    for id in [2u64, 10, 9] {
        let mut builder =
            SSTableBuilder::new(&StorageManager::sstable_path_with_dir(&path, id)).unwrap();
        builder.add(b"k", format!("v{}", id).as_bytes()).unwrap();
        builder.finish().unwrap();
    }

    let manager = open(&path);
    let ids: Vec<u64> = manager.tables().iter().map(|t| t.id).collect();

    assert_eq!(ids, vec![10, 9, 2]);
    assert_eq!(manager.next_sstable_id(), 11);
    assert_eq!(manager.get(b"k").unwrap(), Some(b"v10".to_vec()));
}

#[test]
fn test_open_removes_leftover_temp_files() {
    let (_temp, path) = setup_temp_storage();
    let leftover = path.join("sstable_000004.sst.tmp");
    fs::write(&leftover, b"partial").unwrap();

    let manager = open(&path);

    assert!(!leftover.exists());
    assert_eq!(manager.sstable_count(), 0);
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_creates_named_table() {
    let (_temp, path) = setup_temp_storage();
    let manager = open(&path);

    let memtable = create_memtable_with_entries(&[("b", "2"), ("a", "1")]);
    let sstable = manager.flush(&memtable).unwrap();

    assert_eq!(sstable.path, path.join("sstable_000001.sst"));
    assert_eq!(sstable.entry_count(), 2);
    assert_eq!(sstable.key_len_hints, (1, 1));
    assert_eq!(manager.next_sstable_id(), 2);
}

#[test]
fn test_flush_empty_memtable_fails() {
    let (_temp, path) = setup_temp_storage();
    let manager = open(&path);

    let err = manager.flush(&MemTable::new()).unwrap_err();

    assert!(matches!(err, StrataError::Storage(_)));
    assert_eq!(manager.sstable_count(), 0);
}

#[test]
fn test_flush_writes_tombstones() {
    let (_temp, path) = setup_temp_storage();
    let manager = open(&path);

    let mut memtable = create_memtable_with_entries(&[("live", "v")]);
    memtable.insert_tombstone(b"dead".to_vec());
    let sstable = manager.flush(&memtable).unwrap();

    let mut reader = SSTableReader::open(&sstable.path).unwrap();
    assert_eq!(reader.entry_count(), 2);
    assert_eq!(reader.get(b"dead").unwrap(), None);
}

// =============================================================================
// Query Tests
// =============================================================================

#[test]
fn test_get_newest_wins() {
    let (_temp, path) = setup_temp_storage();
    let manager = open(&path);

    manager
        .flush(&create_memtable_with_entries(&[("key", "old"), ("other", "x")]))
        .unwrap();
    manager
        .flush(&create_memtable_with_entries(&[("key", "new")]))
        .unwrap();

    assert_eq!(manager.get(b"key").unwrap(), Some(b"new".to_vec()));
    assert_eq!(manager.get(b"other").unwrap(), Some(b"x".to_vec()));
    assert_eq!(manager.get(b"missing").unwrap(), None);
}

#[test]
fn test_tombstone_shadows_older_tables() {
    let (_temp, path) = setup_temp_storage();
    let manager = open(&path);

    manager
        .flush(&create_memtable_with_entries(&[("key", "value")]))
        .unwrap();

    let mut memtable = MemTable::new();
    memtable.insert_tombstone(b"key".to_vec());
    manager.flush(&memtable).unwrap();

    assert_eq!(manager.get(b"key").unwrap(), None);
}

// =============================================================================
// Corrupt Table Tests
// =============================================================================

#[test]
fn test_corrupt_table_skipped() {
    let (_temp, path) = setup_temp_storage();
    {
        let manager = open(&path);
        manager
            .flush(&create_memtable_with_entries(&[("key", "good")]))
            .unwrap();
    }
    fs::write(path.join("sstable_000002.sst"), b"XXXXgarbagegarbage").unwrap();

    let manager = open(&path);

    assert_eq!(manager.sstable_count(), 2);
    assert_eq!(manager.get(b"key").unwrap(), Some(b"good".to_vec()));
}

#[test]
fn test_corrupt_table_fails_when_strict() {
    let (_temp, path) = setup_temp_storage();
    {
        let manager = open(&path);
        manager
            .flush(&create_memtable_with_entries(&[("key", "good")]))
            .unwrap();
    }
    fs::write(path.join("sstable_000002.sst"), b"XXXXgarbagegarbage").unwrap();

    let manager = StorageManager::open(&path, CorruptTablePolicy::Fail).unwrap();

    let err = manager.get(b"key").unwrap_err();
    assert!(err.is_corrupt_table());
}

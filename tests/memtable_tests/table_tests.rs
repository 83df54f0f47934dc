//! Tests for the MemTable
//!
//! These tests verify:
//! - Put/get and overwrite semantics
//! - Live-entry counting (tombstones excluded)
//! - Delete with and without an on-disk version to shadow
//! - Sorted iteration and key-length bounds
//! - Clear resets the generation

use stratakv::memtable::MemTable;
use stratakv::Entry;

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_new_is_empty() {
    let table = MemTable::new();

    assert!(table.is_empty());
    assert_eq!(table.size(), 0);
    assert_eq!(table.entry_count(), 0);
    assert_eq!(table.key_len_bounds(), (0, 0));
}

#[test]
fn test_put_and_get() {
    let mut table = MemTable::new();

    assert_eq!(table.put(b"key".to_vec(), b"value".to_vec()), 1);

    assert_eq!(table.get(b"key"), Some(&Entry::Value(b"value".to_vec())));
    assert_eq!(table.get(b"missing"), None);
}

#[test]
fn test_overwrite_does_not_grow() {
    let mut table = MemTable::new();

    table.put(b"key".to_vec(), b"v1".to_vec());
    let live = table.put(b"key".to_vec(), b"v2".to_vec());

    assert_eq!(live, 1);
    assert_eq!(table.get(b"key"), Some(&Entry::Value(b"v2".to_vec())));
}

#[test]
fn test_put_replaces_tombstone() {
    let mut table = MemTable::new();
    table.insert_tombstone(b"key".to_vec());
    assert_eq!(table.size(), 0);

    let live = table.put(b"key".to_vec(), b"back".to_vec());

    assert_eq!(live, 1);
    assert_eq!(table.tombstone_count(), 0);
    assert_eq!(table.get(b"key"), Some(&Entry::Value(b"back".to_vec())));
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_without_disk_version_removes_entry() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"value".to_vec());

    let old = table.delete(b"key", false);

    assert_eq!(old, Some(b"value".to_vec()));
    assert_eq!(table.get(b"key"), None);
    assert!(table.is_empty());
}

#[test]
fn test_delete_with_disk_version_leaves_tombstone() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"value".to_vec());

    let old = table.delete(b"key", true);

    assert_eq!(old, Some(b"value".to_vec()));
    assert_eq!(table.get(b"key"), Some(&Entry::Tombstone));
    assert_eq!(table.size(), 0);
    assert_eq!(table.entry_count(), 1);
    assert!(!table.is_empty());
}

#[test]
fn test_delete_missing_or_tombstoned_is_noop() {
    let mut table = MemTable::new();
    table.insert_tombstone(b"gone".to_vec());

    assert_eq!(table.delete(b"missing", true), None);
    assert_eq!(table.delete(b"gone", true), None);
    assert_eq!(table.entry_count(), 1);
    assert_eq!(table.get(b"missing"), None);
}

#[test]
fn test_tombstone_over_live_value() {
    let mut table = MemTable::new();
    table.put(b"a".to_vec(), b"1".to_vec());
    table.put(b"b".to_vec(), b"2".to_vec());

    table.insert_tombstone(b"a".to_vec());

    assert_eq!(table.size(), 1);
    assert_eq!(table.tombstone_count(), 1);
    assert!(table.get(b"a").unwrap().is_tombstone());
}

// =============================================================================
// Iteration and Bounds
// =============================================================================

#[test]
fn test_iter_sorted_with_tombstones() {
    let mut table = MemTable::new();
    table.put(b"c".to_vec(), b"3".to_vec());
    table.put(b"a".to_vec(), b"1".to_vec());
    table.insert_tombstone(b"b".to_vec());

    let iter = table.iter();
    assert_eq!(iter.len(), 3);

    let items: Vec<(Vec<u8>, Entry)> = iter.map(|(k, e)| (k.to_vec(), e.clone())).collect();
    assert_eq!(
        items,
        vec![
            (b"a".to_vec(), Entry::Value(b"1".to_vec())),
            (b"b".to_vec(), Entry::Tombstone),
            (b"c".to_vec(), Entry::Value(b"3".to_vec())),
        ]
    );
}

#[test]
fn test_iter_orders_bytes_unsigned() {
    let mut table = MemTable::new();
    table.put(vec![0xFF], b"high".to_vec());
    table.put(vec![0x00], b"low".to_vec());
    table.put(vec![0x7F, 0x00], b"mid".to_vec());

    let keys: Vec<Vec<u8>> = table.iter().map(|(k, _)| k.to_vec()).collect();

    assert_eq!(keys, vec![vec![0x00], vec![0x7F, 0x00], vec![0xFF]]);
}

#[test]
fn test_key_len_bounds_track_puts() {
    let mut table = MemTable::new();
    table.put(b"abc".to_vec(), b"v".to_vec());
    table.put(b"a".to_vec(), b"v".to_vec());
    table.put(b"abcdefg".to_vec(), b"v".to_vec());

    // Tombstones alone do not move the bounds
    table.insert_tombstone(b"a-much-longer-key".to_vec());

    assert_eq!(table.key_len_bounds(), (1, 7));
}

#[test]
fn test_key_len_bounds_with_empty_key() {
    let mut table = MemTable::new();
    table.put(Vec::new(), b"v".to_vec());
    table.put(b"abc".to_vec(), b"v".to_vec());

    assert_eq!(table.key_len_bounds(), (0, 3));

    // Order of puts does not matter
    let mut table = MemTable::new();
    table.put(b"abc".to_vec(), b"v".to_vec());
    table.put(Vec::new(), b"v".to_vec());

    assert_eq!(table.key_len_bounds(), (0, 3));
}

#[test]
fn test_clear_resets_everything() {
    let mut table = MemTable::new();
    table.put(b"key".to_vec(), b"value".to_vec());
    table.insert_tombstone(b"other".to_vec());

    table.clear();

    assert!(table.is_empty());
    assert_eq!(table.size(), 0);
    assert_eq!(table.tombstone_count(), 0);
    assert_eq!(table.key_len_bounds(), (0, 0));
    assert_eq!(table.get(b"key"), None);
}

//! Tests for the WAL Reader
//!
//! These tests verify:
//! - Reading an empty WAL yields nothing
//! - Entries come back in file order
//! - Torn and corrupt frames surface as a single error
//! - Position tracks the end of the last valid entry

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use stratakv::config::WalSyncStrategy;
use stratakv::wal::{Operation, WalEntry, WalReader, WalWriter};
use stratakv::StrataError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries_via_writer(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Set {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Clean Read Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_open_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();

    let err = WalReader::open(&wal_path).err().unwrap();
    assert!(matches!(err, StrataError::Io(_)));
}

#[test]
fn test_read_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for i in 0..4u64 {
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.lsn, i + 1);
        assert_eq!(entry.operation.key(), format!("key{}", i).as_bytes());
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_iterator_collects_all() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let entries: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(entries.len(), 10);
}

// =============================================================================
// Damaged Tail Tests
// =============================================================================

#[test]
fn test_partial_header_is_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let valid_len = fs::metadata(&wal_path).unwrap().len();
    append_raw(&wal_path, &[1, 2, 3]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_some());

    let err = reader.next_entry().unwrap_err();
    assert!(matches!(err, StrataError::MalformedRecord(_)));
    assert_eq!(reader.position(), valid_len);
}

#[test]
fn test_partial_payload_is_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 1);

    let frame = WalEntry::new(
        2,
        Operation::Set {
            key: b"torn".to_vec(),
            value: b"value".to_vec(),
        },
    )
    .serialize()
    .unwrap();
    append_raw(&wal_path, &frame[..frame.len() - 3]);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

#[test]
fn test_corrupt_frame_stops_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);

    // Flip a payload byte of the second frame
    let mut bytes = fs::read(&wal_path).unwrap();
    let first_len = {
        let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        16 + len
    };
    bytes[first_len + 16] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    // One good entry, one error, nothing after it
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(StrataError::MalformedRecord(_))));
}

#[test]
fn test_length_past_end_of_file_is_error() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut header = Vec::new();
    header.extend_from_slice(&1u64.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&u32::MAX.to_le_bytes());
    fs::write(&wal_path, &header).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().is_err());
    assert_eq!(reader.position(), 0);
}

//! Storage Module
//!
//! Persistent storage layer: immutable sorted tables produced by flushes.
//!
//! ## Responsibilities
//! - Persist memtable generations to disk in sorted order
//! - Point lookups across all tables, newest first
//! - Tombstones shadow every older version of a key
//!
//! Tables are never merged or deleted; the set only grows.

mod sstable;
mod manager;

pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader, TableHeader};
pub use manager::{StorageManager, TableFile};

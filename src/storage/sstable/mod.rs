//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (16 bytes)                                       │
//! │   Magic: "SSTB" (4) | Count: u32 | MinKeyLen: u32 |     │
//! │   MaxKeyLen: u32                                        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable, ascending by key)                 │
//! │   [Marker: u16][KeyLen: u32][ValLen: u32][Key][Value]   │
//! │   ... repeated Count times ...                          │
//! │   (Marker = 1 means tombstone, ValLen = 0)              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no index or footer: lookups scan entries in order.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

pub use crate::codec::TableHeader;

// =============================================================================
// SSTable Metadata
// =============================================================================

/// SSTable metadata returned by a finished build
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable (live and tombstone)
    pub entry_count: u64,
    /// Smallest key written
    pub min_key: Vec<u8>,
    /// Largest key written
    pub max_key: Vec<u8>,
    /// Key-length hints recorded in the header
    pub key_len_hints: (u32, u32),
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}

//! Storage Manager
//!
//! Manages the set of on-disk tables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Track SSTable lifecycle (tables are never deleted here)

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::config::CorruptTablePolicy;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::StrataError;

use super::{SSTable, SSTableBuilder, SSTableReader};

/// A table file known to the manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    /// Creation order; higher is newer
    pub id: u64,
    pub path: PathBuf,
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `tables`: Protected by RwLock; readers clone a snapshot and release it
///   before touching any file
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - A table is added to `tables` only after it has been renamed into place,
///   so a snapshot never names a partially written file
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Known tables, ordered newest → oldest
    tables: RwLock<Vec<TableFile>>,

    /// Next ID for creating new SSTables (atomic, lock-free)
    next_sstable_id: AtomicU64,

    corrupt_table_policy: CorruptTablePolicy,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Remove temp files left by an interrupted flush
    /// 3. Discover existing SSTable files
    /// 4. Order by ID descending (newest first)
    pub fn open(path: &Path, corrupt_table_policy: CorruptTablePolicy) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut tables: Vec<TableFile> = Vec::new();

        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();

            if !file_path.is_file() {
                continue;
            }

            if Self::is_temp_file(&file_path) {
                tracing::warn!(path = %file_path.display(), "Removing leftover partial SSTable");
                fs::remove_file(&file_path)?;
                continue;
            }

            if let Some(id) = Self::parse_sstable_id(&file_path) {
                tables.push(TableFile {
                    id,
                    path: file_path,
                });
            }
        }

        // Sort newest first (highest ID first)
        tables.sort_by(|a, b| b.id.cmp(&a.id));

        // Next ID = max + 1, or 1 if no SSTables exist
        let next_id = tables.first().map(|t| t.id + 1).unwrap_or(1);

        tracing::debug!(
            dir = %path.display(),
            tables = tables.len(),
            next_id,
            "Opened table set"
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            tables: RwLock::new(tables),
            next_sstable_id: AtomicU64::new(next_id),
            corrupt_table_policy,
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: newest version found is live
    /// - `Ok(None)`: key not found, or the newest version is a tombstone
    ///
    /// A tombstone ends the search: older tables are not consulted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let snapshot = self.tables.read().clone();

        for table in &snapshot {
            match Self::lookup(&table.path, key) {
                Ok(Some(value)) => return Ok(Some(value)), // Found!
                Ok(None) => return Ok(None),               // Tombstone = deleted
                Err(StrataError::KeyNotFound) => continue, // Not in this SSTable
                Err(e) => match self.corrupt_table_policy {
                    CorruptTablePolicy::Skip => {
                        tracing::warn!(
                            path = %table.path.display(),
                            error = %e,
                            "Skipping unreadable SSTable"
                        );
                        continue;
                    }
                    CorruptTablePolicy::Fail => return Err(e),
                },
            }
        }

        // Not found in any SSTable
        Ok(None)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Writes the MemTable's sorted entries (live and tombstone) to a new
    /// file and publishes it at the front of the list. On error the partial
    /// file is removed and the table set is unchanged.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(StrataError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        let (min_len, max_len) = memtable.key_len_bounds();
        builder.set_key_len_hints(min_len, max_len)?;
        for (key, entry) in memtable.iter() {
            builder.add_entry(key, entry)?;
        }
        let metadata = builder.finish()?;

        self.tables.write().insert(0, TableFile { id, path });

        tracing::info!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "Flushed memtable to SSTable"
        );

        Ok(metadata)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Snapshot of known tables, newest first
    pub fn tables(&self) -> Vec<TableFile> {
        self.tables.read().clone()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    /// Generate SSTable path given a directory and ID
    pub fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn lookup(path: &Path, key: &[u8]) -> Result<Option<Vec<u8>>> {
        SSTableReader::open(path)?.get(key)
    }

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }

    fn is_temp_file(path: &Path) -> bool {
        path.file_name()
            .map(|name| {
                let name = name.to_string_lossy();
                name.starts_with("sstable_") && name.ends_with(".sst.tmp")
            })
            .unwrap_or(false)
    }
}

//! Engine Module
//!
//! The storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Serialize mutations under one lock
//! - Trigger flushes when the MemTable reaches the threshold
//! - Replay the WAL before serving requests

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::codec::Entry;
use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::memtable::MemTable;
use crate::storage::{StorageManager, TableFile};
use crate::wal::{Operation, RecoveryResult, WalEntry, WalRecovery, WalWriter};

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// WAL open, memtable empty, recovery not yet run
    Starting,
    /// WAL replay in progress
    Recovering,
    /// Accepting get/put/delete
    Serving,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Starting => "starting",
            EngineState::Recovering => "recovering",
            EngineState::Serving => "serving",
        };
        f.write_str(name)
    }
}

/// State guarded by the engine lock
struct Inner {
    state: EngineState,
    memtable: MemTable,
    wal: WalWriter,
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// - One `Mutex` guards the memtable and the WAL handle together. Every
///   put/delete/flush/WAL reset, and every memtable read, runs under it.
/// - Table lookups for `get` happen after the lock is released. Tables are
///   immutable and only published once fully written, so a snapshot of the
///   table list is always safe to scan.
/// - `delete` consults the tables while holding the lock, because the answer
///   decides whether a tombstone is needed.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Directory for all table files
    storage_dir: PathBuf,

    /// Path of the write-ahead log
    wal_path: PathBuf,

    /// Memtable + WAL handle, one exclusive-access boundary
    inner: Mutex<Inner>,

    /// Persistent storage manager (internal RwLock on the table list)
    storage: StorageManager,
}

impl Engine {
    // =========================================================================
    // Data Directory Layout
    // =========================================================================
    pub const WAL_FILENAME: &'static str = "wal.log";
    pub const SSTABLE_DIR: &'static str = "sstables";

    /// Open an engine without replaying the WAL
    ///
    /// Creates the data directory, discovers existing tables and opens the
    /// WAL for appending. The engine is `Starting` until [`Engine::recover`]
    /// runs; requests before that fail with `InvalidState`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir).map_err(|source| StrataError::StorageInit {
            path: config.data_dir.clone(),
            source,
        })?;

        let storage_dir = config.data_dir.join(Self::SSTABLE_DIR);
        let wal_path = config.data_dir.join(Self::WAL_FILENAME);

        let storage = StorageManager::open(&storage_dir, config.corrupt_table_policy)?;

        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy).map_err(|e| match e {
            StrataError::Io(source) => StrataError::StorageInit {
                path: wal_path.clone(),
                source,
            },
            other => other,
        })?;

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            tables = storage.sstable_count(),
            "Engine opened"
        );

        Ok(Self {
            config,
            storage_dir,
            wal_path,
            inner: Mutex::new(Inner {
                state: EngineState::Starting,
                memtable: MemTable::new(),
                wal,
            }),
            storage,
        })
    }

    /// Open and recover in one step
    pub fn start(config: Config) -> Result<Self> {
        let engine = Self::open(config)?;
        engine.recover()?;
        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory, and recovers.
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::start(config)
    }

    /// Replay the WAL into the memtable and start serving
    ///
    /// Must run exactly once. `Set` records become live entries and `Delete`
    /// records become tombstones, so replaying records that were already
    /// flushed is harmless. If the replayed memtable is at or above the
    /// flush threshold it is flushed straight away; a failure there is
    /// logged and retried by the next put.
    pub fn recover(&self) -> Result<RecoveryResult> {
        let mut inner = self.inner.lock();
        if inner.state != EngineState::Starting {
            return Err(StrataError::InvalidState(format!(
                "recover called while {}",
                inner.state
            )));
        }
        inner.state = EngineState::Recovering;

        // Recovery may cut a damaged tail off the file the writer already has open
        let recovered = WalRecovery::recover(&self.wal_path)
            .and_then(|recovered| inner.wal.refresh_len().map(|()| recovered));
        let (entries, result) = match recovered {
            Ok(recovered) => recovered,
            Err(e) => {
                inner.state = EngineState::Starting;
                return Err(e);
            }
        };

        for entry in entries {
            match entry.operation {
                Operation::Set { key, value } => {
                    inner.memtable.put(key, value);
                }
                Operation::Delete { key, .. } => {
                    inner.memtable.insert_tombstone(key);
                }
            }
        }
        inner.wal.set_next_lsn(result.last_lsn + 1);

        if result.entries_recovered > 0 || result.was_truncated {
            tracing::info!(
                recovered = result.entries_recovered,
                corrupted = result.entries_corrupted,
                last_lsn = result.last_lsn,
                truncated = result.was_truncated,
                "WAL recovery complete"
            );
        }

        if inner.memtable.size() >= self.config.flush_threshold {
            if let Err(e) = self.flush_locked(&mut inner) {
                tracing::warn!(error = %e, "Flush after recovery failed, deferring");
            }
        }

        inner.state = EngineState::Serving;
        Ok(result)
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (a tombstone here means absent)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        {
            let inner = self.inner.lock();
            Self::ensure_serving(&inner)?;

            match inner.memtable.get(key) {
                Some(Entry::Value(value)) => return Ok(Some(value.clone())),
                Some(Entry::Tombstone) => return Ok(None),
                None => {}
            }
        }

        self.storage.get(key)
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Acquire the engine lock
    /// 2. Append to WAL and sync (durability)
    /// 3. Write to MemTable
    /// 4. Flush if the live-entry count reached the threshold
    ///
    /// If the write was logged but the flush failed, the error is `Flush`;
    /// the value is still durable in the WAL and visible to reads.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        WalEntry::check_record_size(key.len(), value.len())?;

        let mut inner = self.inner.lock();
        Self::ensure_serving(&inner)?;

        let lsn = inner.wal.append(Operation::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })?;

        let live = inner.memtable.put(key.to_vec(), value.to_vec());
        tracing::debug!(lsn, live, "put");

        if live >= self.config.flush_threshold {
            self.flush_locked(&mut inner)?;
        }

        Ok(())
    }

    /// Delete a key, returning the value it had
    ///
    /// - Live in the MemTable: the entry is dropped, or replaced by a
    ///   tombstone when an older table still holds the key
    /// - Only on disk: a tombstone is recorded
    /// - Absent or already deleted: `Ok(None)`, nothing is logged
    pub fn delete(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        Self::ensure_serving(&inner)?;

        let (value, in_memtable) = match inner.memtable.get(key) {
            Some(Entry::Tombstone) => return Ok(None),
            Some(Entry::Value(value)) => (value.clone(), true),
            None => match self.storage.get(key)? {
                Some(value) => (value, false),
                None => return Ok(None),
            },
        };
        let shadows_disk = !in_memtable || self.storage.get(key)?.is_some();

        let lsn = inner.wal.append(Operation::Delete {
            key: key.to_vec(),
            value: value.clone(),
        })?;

        if in_memtable {
            inner.memtable.delete(key, shadows_disk);
        } else {
            inner.memtable.insert_tombstone(key.to_vec());
        }
        tracing::debug!(lsn, tombstone = shadows_disk, "delete");

        Ok(Some(value))
    }

    /// Flush memtable to disk regardless of its size
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::ensure_serving(&inner)?;
        self.flush_locked(&mut inner)
    }

    /// Flush with the engine lock held
    ///
    /// The table is written first; only then are the memtable cleared and
    /// the WAL reset. A failed table write leaves both untouched. A failed
    /// WAL reset leaves the (already durable) table in place and surfaces
    /// the error; the stale records are replayed harmlessly next start.
    fn flush_locked(&self, inner: &mut Inner) -> Result<()> {
        if inner.memtable.is_empty() {
            return Ok(());
        }

        if let Err(e) = self.storage.flush(&inner.memtable) {
            tracing::error!(error = %e, "Flush failed, memtable and WAL kept");
            return Err(StrataError::Flush(Box::new(e)));
        }

        inner.memtable.clear();

        if let Err(e) = inner.wal.reset() {
            tracing::warn!(error = %e, "WAL reset after flush failed");
            return Err(e);
        }

        Ok(())
    }

    /// Close the engine
    ///
    /// Syncs and closes the WAL. The memtable is not flushed; its contents
    /// are recovered from the WAL on the next start.
    pub fn close(self) -> Result<()> {
        let mut inner = self.inner.into_inner();
        inner.wal.sync()?;
        tracing::debug!("Engine closed");
        Ok(())
    }

    fn ensure_serving(inner: &Inner) -> Result<()> {
        match inner.state {
            EngineState::Serving => Ok(()),
            other => Err(StrataError::InvalidState(format!(
                "engine is {}, recover() must complete first",
                other
            ))),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the storage directory path (where SSTables are stored)
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the WAL file path
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Live entries in the memtable (what the flush threshold counts)
    pub fn memtable_len(&self) -> usize {
        self.inner.lock().memtable.size()
    }

    /// Live plus tombstoned keys in the memtable
    pub fn memtable_entry_count(&self) -> usize {
        self.inner.lock().memtable.entry_count()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// Known table files, newest first
    pub fn sstables(&self) -> Vec<TableFile> {
        self.storage.tables()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StrataError};

/// Main configuration for a StrataKV engine
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files (WAL, tables)
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── sstables/        (immutable sorted tables)
    pub data_dir: PathBuf,

    /// What a lookup does when it meets an unreadable table file
    pub corrupt_table_policy: CorruptTablePolicy,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of live memtable entries that triggers a flush
    pub flush_threshold: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (required for the durability contract)
    EveryWrite,

    /// fsync after N uncommitted entries.
    /// Acknowledged writes since the last sync can be lost on a crash.
    EveryNEntries { count: usize },
}

/// Handling of table files that fail header or entry validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptTablePolicy {
    /// Log the problem and treat the file as contributing no entries
    Skip,

    /// Abort the lookup with a `CorruptTable` error
    Fail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./stratakv_data"),
            corrupt_table_policy: CorruptTablePolicy::Skip,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            flush_threshold: 10,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.flush_threshold == 0 {
            return Err(StrataError::Config(
                "flush_threshold must be at least 1".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(StrataError::Config(
                "EveryNEntries sync count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the number of live entries that triggers a flush
    pub fn flush_threshold(mut self, entries: usize) -> Self {
        self.config.flush_threshold = entries;
        self
    }

    /// Set how lookups treat corrupt table files
    pub fn corrupt_table_policy(mut self, policy: CorruptTablePolicy) -> Self {
        self.config.corrupt_table_policy = policy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

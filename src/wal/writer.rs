//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{Operation, WalEntry};

/// Writes entries to the WAL file
pub struct WalWriter {
    path: PathBuf,
    file: File,
    /// LSN handed to the next appended entry
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Entries written since the last fsync
    unsynced: usize,
    /// Bytes known to be fully written
    len: u64,
}

impl WalWriter {
    /// Open or create a WAL file for appending
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = Self::open_append(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            next_lsn: 1,
            sync_strategy,
            unsynced: 0,
            len,
        })
    }

    /// Append an entry to the WAL, returning its LSN
    ///
    /// With `EveryWrite` the entry is on stable storage when this returns.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;
        let start = self.len;

        if let Err(e) = self.file.write_all(&bytes) {
            self.rollback(start);
            return Err(e.into());
        }
        self.len += bytes.len() as u64;
        self.unsynced += 1;

        let needs_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if needs_sync {
            if let Err(e) = self.sync() {
                // The caller sees a failed write, so the frame must not
                // replay on the next start
                self.unsynced -= 1;
                self.rollback(start);
                return Err(e);
            }
        }

        self.next_lsn += 1;
        Ok(lsn)
    }

    /// Cut the log back to `len`, dropping a frame that was not acknowledged
    ///
    /// Later appends would otherwise sit behind a torn or unacknowledged
    /// record.
    fn rollback(&mut self, len: u64) {
        match self.file.set_len(len) {
            Ok(()) => self.len = len,
            Err(e) => tracing::warn!(error = %e, "Failed to trim unacknowledged WAL write"),
        }
    }

    /// Re-read the file length after the log was truncated externally
    /// (by [`super::WalRecovery::recover`])
    pub fn refresh_len(&mut self) -> Result<()> {
        self.len = self.file.metadata()?.len();
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Truncate the log to zero length and reopen it for appending
    ///
    /// Only called once the memtable contents are durable in a table. The
    /// previous handle stays in place if any step fails. LSNs keep counting.
    pub fn reset(&mut self) -> Result<()> {
        let truncated = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        truncated.sync_all()?;
        drop(truncated);

        self.file = Self::open_append(&self.path)?;
        self.len = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN (the one the next append will use)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Continue numbering after entries recovered from a previous run
    pub fn set_next_lsn(&mut self, lsn: u64) {
        self.next_lsn = lsn.max(1);
    }

    /// Bytes written to the current log
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_append(path: &Path) -> std::io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }
}

//! SSTable Builder
//!
//! Writes sorted entries to a new SSTable file. The file is assembled under a
//! temporary name and renamed into place by `finish()`, so a partially
//! written table is never visible under its final name.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::codec::{self, Entry, TableHeader};
use crate::error::{Result, StrataError};

use super::SSTable;

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Final file path
    path: PathBuf,
    /// Where the table is written until `finish()`
    tmp_path: PathBuf,
    /// Buffered writer; `None` once finished
    writer: Option<BufWriter<File>>,
    /// Number of entries written
    entry_count: u64,
    /// Header key-length hints
    key_len_hints: (u32, u32),
    /// Track min/max keys for metadata and ordering checks
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
}

impl SSTableBuilder {
    /// Create a new SSTable builder targeting `path`
    ///
    /// Writes a placeholder header immediately; call `add()`/`add_tombstone()`
    /// in ascending key order, then `finish()`.
    pub fn new(path: &Path) -> Result<Self> {
        let tmp_path = Self::tmp_path_for(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(&TableHeader::default().encode())?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer: Some(writer),
            entry_count: 0,
            key_len_hints: (0, 0),
            min_key: None,
            max_key: None,
        })
    }

    /// Temporary path used while a table at `path` is being built
    pub fn tmp_path_for(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Record the key-length hints written to the header
    pub fn set_key_len_hints(&mut self, min: usize, max: usize) -> Result<()> {
        let min = u32::try_from(min)
            .map_err(|_| StrataError::Storage(format!("key length hint {} too large", min)))?;
        let max = u32::try_from(max)
            .map_err(|_| StrataError::Storage(format!("key length hint {} too large", max)))?;
        self.key_len_hints = (min, max);
        Ok(())
    }

    /// Add a key-value pair (must be called in sorted key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.add_entry(key, &Entry::Value(value.to_vec()))
    }

    /// Add a tombstone (must be called in sorted key order)
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.add_entry(key, &Entry::Tombstone)
    }

    /// Add an entry of either kind (must be called in sorted key order)
    pub fn add_entry(&mut self, key: &[u8], entry: &Entry) -> Result<()> {
        if let Some(last) = &self.max_key {
            if key <= last.as_slice() {
                return Err(StrataError::Storage(format!(
                    "SSTable keys must be strictly ascending: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }
        if self.entry_count >= u64::from(u32::MAX) {
            return Err(StrataError::Storage(
                "SSTable entry count exceeds u32".to_string(),
            ));
        }

        let writer = self.writer_mut()?;
        codec::write_entry(writer, key, entry).map_err(StrataError::from_table_write)?;

        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.max_key = Some(key.to_vec());
        self.entry_count += 1;

        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finish building: fill in the header, fsync, rename into place
    pub fn finish(mut self) -> Result<SSTable> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StrataError::Storage("SSTable builder already finished".to_string()))?;

        let mut file = writer
            .into_inner()
            .map_err(|e| StrataError::Storage(format!("Failed to flush SSTable: {}", e)))?;

        let header = TableHeader {
            entry_count: self.entry_count as u32,
            min_key_len_hint: self.key_len_hints.0,
            max_key_len_hint: self.key_len_hints.1,
        };
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;
        sync_parent_dir(&self.path)?;

        Ok(SSTable {
            path: self.path.clone(),
            entry_count: self.entry_count,
            min_key: self.min_key.take().unwrap_or_default(),
            max_key: self.max_key.take().unwrap_or_default(),
            key_len_hints: self.key_len_hints,
            file_size,
        })
    }

    fn writer_mut(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| StrataError::Storage("SSTable builder already finished".to_string()))
    }
}

impl Drop for SSTableBuilder {
    /// An unfinished or failed build leaves no file behind
    fn drop(&mut self) {
        if self.tmp_path.exists() {
            self.writer.take();
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                tracing::warn!(
                    path = %self.tmp_path.display(),
                    error = %e,
                    "Failed to remove partial SSTable"
                );
            }
        }
    }
}

/// Make a rename durable by syncing the containing directory
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

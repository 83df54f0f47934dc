//! SSTable Reader
//!
//! Opens SSTable files and answers point lookups by scanning entries in
//! key order.

use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::codec::TableHeader;
use crate::error::{Result, StrataError};

use super::iterator::SSTableIterator;

/// Reader for a single SSTable file
pub struct SSTableReader {
    path: PathBuf,
    /// File handle for reading entries
    file: BufReader<File>,
    header: TableHeader,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Validates the header; a bad magic or short header is `CorruptTable`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let header = TableHeader::read_from(&mut file)
            .map_err(|e| StrataError::corrupt_table(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
        })
    }

    /// Get a value by key with a linear scan
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key found but is a tombstone (deleted)
    /// - `Err(KeyNotFound)`: key not in this SSTable
    ///
    /// Entries are sorted, so the scan ends at the first larger key.
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        for item in self.iter()? {
            let (entry_key, entry) = item?;
            match entry_key.as_slice().cmp(key) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(entry.into_value()),
                Ordering::Greater => break,
            }
        }

        Err(StrataError::KeyNotFound)
    }

    /// The validated header
    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        u64::from(self.header.entry_count)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an iterator over all entries
    pub fn iter(&mut self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(&mut self.file, &self.path, self.header.entry_count)
    }
}

//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::codec::{self, Entry, TABLE_HEADER_SIZE};
use crate::error::{Result, StrataError};

/// Iterator over SSTable entries in sorted key order
///
/// Stops after the first decode error.
pub struct SSTableIterator<'a> {
    file: &'a mut BufReader<File>,
    /// Used for error context
    path: &'a Path,
    /// Entries left according to the header
    remaining: u32,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator starting from the data block
    pub(super) fn new(file: &'a mut BufReader<File>, path: &'a Path, entry_count: u32) -> Result<Self> {
        // Seek to start of data (after header)
        file.seek(SeekFrom::Start(TABLE_HEADER_SIZE as u64))?;
        Ok(Self {
            file,
            path,
            remaining: entry_count,
        })
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    type Item = Result<(Vec<u8>, Entry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        match codec::read_entry(&mut *self.file) {
            Ok(item) => {
                self.remaining -= 1;
                Some(Ok(item))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(StrataError::corrupt_table(self.path, e)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining as usize))
    }
}

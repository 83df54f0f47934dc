//! WAL Reader
//!
//! Handles reading entries from the WAL file. The reader opens its own file
//! handle, independent of the live append handle held by [`super::WalWriter`].

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, StrataError};

use super::entry::{FrameHeader, HEADER_SIZE};
use super::WalEntry;

/// Outcome of decoding one frame
#[derive(Debug)]
pub(super) enum Frame {
    /// A valid entry
    Entry(WalEntry),
    /// Clean end of file on a frame boundary
    End,
    /// The file ends part-way through a frame (torn write)
    Torn(String),
    /// A complete frame that fails validation
    Corrupt(String),
}

/// Reads entries from the WAL file
pub struct WalReader {
    file: BufReader<File>,
    /// Byte offset just past the last valid entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file and `MalformedRecord` for a
    /// torn or corrupt frame.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn(reason) | Frame::Corrupt(reason) => {
                Err(StrataError::MalformedRecord(reason))
            }
        }
    }

    /// Iterate over all valid entries
    ///
    /// The iterator yields at most one error and then stops.
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last entry successfully read
    pub fn position(&self) -> u64 {
        self.position
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        let read = self.read_up_to(&mut header)?;
        if read == 0 {
            return Ok(Frame::End);
        }
        if read < HEADER_SIZE {
            return Ok(Frame::Torn(format!(
                "partial header at offset {}: {} of {} bytes",
                self.position, read, HEADER_SIZE
            )));
        }

        let header = FrameHeader::parse(&header);

        // Grows with what is actually on disk, so a garbage length cannot
        // force a huge allocation
        let mut payload = Vec::new();
        (&mut self.file)
            .take(u64::from(header.len))
            .read_to_end(&mut payload)?;
        if payload.len() < header.len as usize {
            return Ok(Frame::Torn(format!(
                "partial payload at offset {}: {} of {} bytes",
                self.position,
                payload.len(),
                header.len
            )));
        }

        match WalEntry::from_payload(&header, &payload) {
            Ok(entry) => {
                self.position += (HEADER_SIZE + payload.len()) as u64;
                Ok(Frame::Entry(entry))
            }
            Err(e) => Ok(Frame::Corrupt(format!("offset {}: {}", self.position, e))),
        }
    }

    /// Fill `buf` as far as the file allows, returning the byte count
    fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

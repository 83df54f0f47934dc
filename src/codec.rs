//! Record Codec
//!
//! Byte layout of on-disk table files. WAL frames are encoded next to their
//! entry type in [`crate::wal`].
//!
//! ## Table File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Header (16 bytes, little-endian)                            │
//! │   Magic "SSTB" (4) | EntryCount u32 | MinKeyLen u32 |       │
//! │   MaxKeyLen u32                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Entries (EntryCount times, ascending by key)                │
//! │   Marker u16 (0 = live, 1 = tombstone) | KeyLen u32 |       │
//! │   ValLen u32 | Key | Value                                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::CodecError;

/// Magic bytes identifying a table file
pub const TABLE_MAGIC: &[u8; 4] = b"SSTB";

/// Header size: Magic (4) + EntryCount (4) + MinKeyLen (4) + MaxKeyLen (4)
pub const TABLE_HEADER_SIZE: usize = 16;

/// Per-entry prefix: Marker (2) + KeyLen (4) + ValLen (4)
pub const ENTRY_HEADER_SIZE: usize = 10;

/// Operation marker stored in front of every table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OpMarker {
    Live = 0,
    Tombstone = 1,
}

impl OpMarker {
    pub fn from_u16(raw: u16) -> Result<Self, CodecError> {
        match raw {
            0 => Ok(OpMarker::Live),
            1 => Ok(OpMarker::Tombstone),
            other => Err(CodecError::UnknownMarker(other)),
        }
    }
}

/// A versioned value: either live bytes or a deletion marker.
///
/// Used unchanged by the memtable and by table files, so "does this version
/// shadow older ones" is a single match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl Entry {
    pub fn marker(&self) -> OpMarker {
        match self {
            Entry::Value(_) => OpMarker::Live,
            Entry::Tombstone => OpMarker::Tombstone,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Entry::Tombstone)
    }

    /// Borrow the live value, `None` for tombstones
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Entry::Value(v) => Some(v.as_slice()),
            Entry::Tombstone => None,
        }
    }

    pub fn into_value(self) -> Option<Vec<u8>> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Tombstone => None,
        }
    }
}

// =============================================================================
// Header
// =============================================================================

/// Fixed-size table header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableHeader {
    pub entry_count: u32,
    /// Shortest key length written by the generation that produced the table.
    /// A hint only: keys that were tombstoned without being written in that
    /// generation are not reflected.
    pub min_key_len_hint: u32,
    /// Longest key length hint, same caveat as `min_key_len_hint`
    pub max_key_len_hint: u32,
}

impl TableHeader {
    pub fn encode(&self) -> [u8; TABLE_HEADER_SIZE] {
        let mut buf = [0u8; TABLE_HEADER_SIZE];
        buf[0..4].copy_from_slice(TABLE_MAGIC);
        buf[4..8].copy_from_slice(&self.entry_count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.min_key_len_hint.to_le_bytes());
        buf[12..16].copy_from_slice(&self.max_key_len_hint.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8; TABLE_HEADER_SIZE]) -> Result<Self, CodecError> {
        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if &magic != TABLE_MAGIC {
            return Err(CodecError::BadMagic(magic));
        }

        Ok(Self {
            entry_count: u32_at(buf, 4),
            min_key_len_hint: u32_at(buf, 8),
            max_key_len_hint: u32_at(buf, 12),
        })
    }

    /// Read and validate a header from the start of a table stream
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let mut buf = [0u8; TABLE_HEADER_SIZE];
        read_field(reader, &mut buf, "header")?;
        Self::decode(&buf)
    }
}

// =============================================================================
// Entries
// =============================================================================

/// Encode one table entry. Tombstones carry an empty value.
pub fn encode_entry(key: &[u8], entry: &Entry) -> Result<Vec<u8>, CodecError> {
    let value = entry.value().unwrap_or(&[]);
    let key_len = len_u32("key", key.len())?;
    let val_len = len_u32("value", value.len())?;

    let mut buf = Vec::with_capacity(ENTRY_HEADER_SIZE + key.len() + value.len());
    buf.extend_from_slice(&(entry.marker() as u16).to_le_bytes());
    buf.extend_from_slice(&key_len.to_le_bytes());
    buf.extend_from_slice(&val_len.to_le_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
    Ok(buf)
}

/// Write one entry, returning the number of bytes written
pub fn write_entry<W: Write>(writer: &mut W, key: &[u8], entry: &Entry) -> Result<u64, CodecError> {
    let bytes = encode_entry(key, entry)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len() as u64)
}

/// Read the next entry. Running out of bytes mid-entry is `Truncated`.
pub fn read_entry<R: Read>(reader: &mut R) -> Result<(Vec<u8>, Entry), CodecError> {
    let mut header = [0u8; ENTRY_HEADER_SIZE];
    read_field(reader, &mut header, "entry header")?;

    let marker = OpMarker::from_u16(u16::from_le_bytes([header[0], header[1]]))?;
    let key_len = u32_at(&header, 2);
    let val_len = u32_at(&header, 6);

    let key = read_bytes(reader, key_len, "key")?;
    let value = read_bytes(reader, val_len, "value")?;

    let entry = match marker {
        OpMarker::Live => Entry::Value(value),
        // Older writers may leave bytes behind a tombstone; they are ignored
        OpMarker::Tombstone => Entry::Tombstone,
    };

    Ok((key, entry))
}

// =============================================================================
// Helpers
// =============================================================================

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn len_u32(what: &'static str, len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::LengthOverflow(what, len))
}

fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<(), CodecError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CodecError::Truncated(what),
        _ => CodecError::Io(e),
    })
}

/// Read exactly `len` bytes without trusting `len` for the allocation size
fn read_bytes<R: Read>(reader: &mut R, len: u32, what: &'static str) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    reader.take(u64::from(len)).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(CodecError::Truncated(what));
    }
    Ok(buf)
}

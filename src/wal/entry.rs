//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Bytes a payload adds around its key and value: LSN (8), operation tag (4),
/// key length (8), value length (8), timestamp (8)
pub const RECORD_OVERHEAD: usize = 36;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Store a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key; `value` is the last value the key had when deleted
    Delete { key: Vec<u8>, value: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Set { key, .. } | Operation::Delete { key, .. } => key,
        }
    }

    /// Wire name of the operation, as shown by tooling
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Set { .. } => "set",
            Operation::Delete { .. } => "delete",
        }
    }
}

impl WalEntry {
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Check that a record for this key and value fits the `u32` frame length
    pub fn check_record_size(key_len: usize, value_len: usize) -> Result<()> {
        let total = key_len
            .checked_add(value_len)
            .and_then(|n| n.checked_add(RECORD_OVERHEAD));
        if matches!(total, Some(n) if n <= u32::MAX as usize) {
            Ok(())
        } else {
            Err(StrataError::Storage(format!(
                "key ({} bytes) and value ({} bytes) do not fit a single WAL record",
                key_len, value_len
            )))
        }
    }

    /// Serialize into a framed record:
    /// `[lsn: u64][crc: u32][len: u32][bincode payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| StrataError::Serialization(e.to_string()))?;

        let len = u32::try_from(payload.len()).map_err(|_| {
            StrataError::Serialization(format!(
                "WAL payload of {} bytes does not fit a frame",
                payload.len()
            ))
        })?;

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(&self.lsn.to_le_bytes());
        buf.extend_from_slice(&Self::compute_crc(&payload).to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Deserialize a complete frame produced by [`WalEntry::serialize`]
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StrataError::MalformedRecord(format!(
                "frame of {} bytes is shorter than the header",
                bytes.len()
            )));
        }

        let header = FrameHeader::parse(&bytes[..HEADER_SIZE]);
        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(StrataError::MalformedRecord(format!(
                "payload truncated: expected {} bytes, got {}",
                header.len,
                bytes.len() - HEADER_SIZE
            )));
        }

        Self::from_payload(&header, &bytes[HEADER_SIZE..end])
    }

    /// CRC32 over the payload bytes
    pub fn compute_crc(payload: &[u8]) -> u32 {
        crc32fast::hash(payload)
    }

    /// Validate a payload against its frame header and decode it
    pub(super) fn from_payload(header: &FrameHeader, payload: &[u8]) -> Result<Self> {
        let crc = Self::compute_crc(payload);
        if crc != header.crc {
            return Err(StrataError::MalformedRecord(format!(
                "CRC mismatch at lsn {}: stored {:#010x}, computed {:#010x}",
                header.lsn, header.crc, crc
            )));
        }

        let entry: WalEntry = bincode::deserialize(payload)
            .map_err(|e| StrataError::MalformedRecord(format!("undecodable payload: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(StrataError::MalformedRecord(format!(
                "LSN mismatch: header {}, payload {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    /// `bytes` must hold at least `HEADER_SIZE` bytes
    pub fn parse(bytes: &[u8]) -> Self {
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        }
    }
}

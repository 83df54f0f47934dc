//! Error types for StrataKV
//!
//! Provides a unified error type for all engine operations, plus the
//! narrower [`CodecError`] produced while decoding on-disk tables.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // Startup Errors
    // -------------------------------------------------------------------------
    #[error("Failed to initialize storage at {}: {source}", path.display())]
    StorageInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("Malformed WAL record: {0}")]
    MalformedRecord(String),

    // -------------------------------------------------------------------------
    // Table Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Flush failed: {0}")]
    Flush(#[source] Box<StrataError>),

    #[error("Corrupt table {}: {source}", path.display())]
    CorruptTable {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Lifecycle / Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataError {
    /// Wrap a table-file decode failure with the offending path
    pub fn corrupt_table(path: impl Into<PathBuf>, source: CodecError) -> Self {
        StrataError::CorruptTable {
            path: path.into(),
            source,
        }
    }

    /// Convert a codec failure raised while *writing* a table
    pub fn from_table_write(err: CodecError) -> Self {
        match err {
            CodecError::Io(e) => StrataError::Io(e),
            other => StrataError::Storage(other.to_string()),
        }
    }

    /// True if this error describes a damaged table file rather than an
    /// engine-wide failure
    pub fn is_corrupt_table(&self) -> bool {
        matches!(self, StrataError::CorruptTable { .. })
    }
}

/// Errors raised by the table record codec
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("bad magic: expected \"SSTB\", got {0:?}")]
    BadMagic([u8; 4]),

    #[error("truncated {0}")]
    Truncated(&'static str),

    #[error("unknown operation marker {0}")]
    UnknownMarker(u16),

    #[error("{0} length {1} does not fit in u32")]
    LengthOverflow(&'static str, usize),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

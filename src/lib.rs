//! # StrataKV
//!
//! A single-node, log-structured key-value storage engine:
//! - Write-Ahead Logging (WAL) for durability
//! - Crash recovery with torn-write handling
//! - Mutable in-memory table flushed into immutable sorted tables
//! - Newest-first multi-table lookup with tombstone shadowing
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Request layer (external)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ get / put / delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                         Engine                               │
//! │          (one Mutex over memtable + WAL handle)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (BTreeMap) │
//!   └─────────────┘          └──────┬──────┘
//!                                   │ flush
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Table Set  │
//!                           │  (SSTables) │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod codec;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use codec::Entry;
pub use config::Config;
pub use engine::{Engine, EngineState};
pub use error::{CodecError, Result, StrataError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

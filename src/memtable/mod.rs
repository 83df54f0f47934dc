//! MemTable Module
//!
//! In-memory data structure for the current write generation.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Tombstones for keys deleted since the last flush
//! - Track the live-entry count for the flush trigger
//! - Ordered iteration for table creation
//!
//! ## Data Structure Choice
//! A BTreeMap of [`Entry`](crate::codec::Entry) values:
//! - Ordered keys (required for table generation)
//! - Live values and tombstones share one map, so a key is never both

mod table;

pub use table::{MemTable, MemTableIterator};

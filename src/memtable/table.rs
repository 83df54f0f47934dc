//! MemTable implementation
//!
//! BTreeMap-based memtable. Not internally synchronized: the engine owns it
//! behind the same lock as the WAL handle.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::codec::Entry;

/// In-memory table for the currently open write generation
#[derive(Debug, Default)]
pub struct MemTable {
    /// Live values and tombstones, sorted by key
    entries: BTreeMap<Vec<u8>, Entry>,
    /// Number of `Entry::Value` items in `entries`
    live: usize,
    /// Shortest and longest key observed by `put` in this generation
    key_lens: Option<(usize, usize)>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key
    ///
    /// - `Some(Entry::Value(_))`: live in this generation
    /// - `Some(Entry::Tombstone)`: deleted in this generation
    /// - `None`: unknown here, the caller falls through to the tables
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Store a value, returning the live entry count afterwards
    ///
    /// A tombstone for `key` is replaced by the new value.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.observe_key_len(key.len());

        match self.entries.insert(key, Entry::Value(value)) {
            Some(Entry::Value(_)) => {}
            Some(Entry::Tombstone) | None => self.live += 1,
        }
        self.live
    }

    /// Delete a key that is live in this generation, returning its value
    ///
    /// When `shadows_disk` is set an older table still holds the key, so a
    /// tombstone is left behind; otherwise the entry is simply dropped.
    /// Returns `None` (and changes nothing) if the key is not live here.
    pub fn delete(&mut self, key: &[u8], shadows_disk: bool) -> Option<Vec<u8>> {
        if !matches!(self.entries.get(key), Some(Entry::Value(_))) {
            return None;
        }

        let previous = if shadows_disk {
            self.entries.insert(key.to_vec(), Entry::Tombstone)
        } else {
            self.entries.remove(key)
        };
        self.live -= 1;
        previous.and_then(Entry::into_value)
    }

    /// Mark a key deleted regardless of its current state
    pub fn insert_tombstone(&mut self, key: Vec<u8>) {
        if let Some(Entry::Value(_)) = self.entries.insert(key, Entry::Tombstone) {
            self.live -= 1;
        }
    }

    /// Number of live entries (tombstones excluded); drives the flush threshold
    pub fn size(&self) -> usize {
        self.live
    }

    /// Number of tracked keys, live and tombstoned
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn tombstone_count(&self) -> usize {
        self.entries.len() - self.live
    }

    /// True when there is nothing to flush
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shortest and longest key length written via `put` in this generation,
    /// `(0, 0)` before the first put
    pub fn key_len_bounds(&self) -> (usize, usize) {
        self.key_lens.unwrap_or((0, 0))
    }

    /// All entries in ascending key order
    pub fn iter(&self) -> MemTableIterator<'_> {
        MemTableIterator {
            inner: self.entries.iter(),
        }
    }

    /// Reset to an empty generation (after a successful flush)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.live = 0;
        self.key_lens = None;
    }

    fn observe_key_len(&mut self, len: usize) {
        self.key_lens = Some(match self.key_lens {
            Some((min, max)) => (min.min(len), max.max(len)),
            None => (len, len),
        });
    }
}

/// Iterator over MemTable entries in sorted key order
pub struct MemTableIterator<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, Entry>,
}

impl<'a> Iterator for MemTableIterator<'a> {
    type Item = (&'a [u8], &'a Entry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_slice(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for MemTableIterator<'_> {}

//! Multi-version store used to detect read/write conflicts.
//!
//! For each key it keeps the history of values written by transactions of the
//! current block, indexed by transaction. Each executed attempt also leaves
//! its read set behind: the key and the version (or base storage) it observed.
//! Validation re-reads every key and checks that the observed origin is still
//! the latest write below the reader.

use crate::scheduler::ConflictValidator;
use crate::types::{Incarnation, TxnIndex, Version};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Value slot in a key's history.
#[derive(Debug, Clone)]
enum EntryValue<V> {
    Written(V),
    /// Left behind by an invalidated attempt; the next incarnation will
    /// probably write here again.
    Estimate,
}

/// Entry in the version history for a key.
#[derive(Debug, Clone)]
struct VersionedEntry<V> {
    incarnation: Incarnation,
    value: EntryValue<V>,
}

/// Result of reading from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult<V> {
    /// Value written by a lower transaction.
    Versioned(Version, V),
    /// No lower transaction wrote the key; read from base storage.
    Storage,
    /// The latest lower write belongs to an invalidated attempt.
    Dependency(TxnIndex),
}

/// Where a recorded read got its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrigin {
    Versioned(Version),
    Storage,
}

/// Multi-version store keyed by `K`.
pub struct MultiVersionStore<K, V> {
    data: DashMap<K, BTreeMap<TxnIndex, VersionedEntry<V>>>,
    read_sets: DashMap<TxnIndex, Vec<(K, ReadOrigin)>>,
    write_sets: DashMap<TxnIndex, Vec<K>>,
}

impl<K, V> MultiVersionStore<K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
{
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            read_sets: DashMap::new(),
            write_sets: DashMap::new(),
        }
    }

    /// Reads the latest value of `key` written by a transaction below `reader_txn_idx`.
    pub fn read(&self, key: &K, reader_txn_idx: TxnIndex) -> ReadResult<V> {
        let Some(versions) = self.data.get(key) else {
            return ReadResult::Storage;
        };
        match versions.range(..reader_txn_idx).next_back() {
            Some((&txn_idx, entry)) => match &entry.value {
                EntryValue::Written(value) => {
                    ReadResult::Versioned(Version::new(txn_idx, entry.incarnation), value.clone())
                }
                EntryValue::Estimate => ReadResult::Dependency(txn_idx),
            },
            None => ReadResult::Storage,
        }
    }

    /// Stores the read and write sets of a finished attempt.
    ///
    /// Keys written by the previous incarnation but not by this one are removed.
    pub fn record(&self, version: Version, reads: Vec<(K, ReadOrigin)>, writes: Vec<(K, V)>) {
        let txn_idx = version.txn_idx;
        let new_keys: Vec<K> = writes.iter().map(|(k, _)| k.clone()).collect();

        if let Some((_, previous)) = self.write_sets.remove(&txn_idx) {
            let keep: HashSet<&K> = new_keys.iter().collect();
            for key in previous.iter().filter(|k| !keep.contains(k)) {
                if let Some(mut versions) = self.data.get_mut(key) {
                    versions.remove(&txn_idx);
                }
            }
        }

        for (key, value) in writes {
            self.data.entry(key).or_default().insert(
                txn_idx,
                VersionedEntry {
                    incarnation: version.incarnation,
                    value: EntryValue::Written(value),
                },
            );
        }

        self.write_sets.insert(txn_idx, new_keys);
        self.read_sets.insert(txn_idx, reads);
    }

    /// Checks that every read of `txn_idx` would still observe the same origin.
    pub fn validate_reads(&self, txn_idx: TxnIndex) -> bool {
        let Some(reads) = self.read_sets.get(&txn_idx) else {
            return true;
        };
        reads.iter().all(|(key, origin)| match (self.read(key, txn_idx), origin) {
            (ReadResult::Versioned(version, _), ReadOrigin::Versioned(seen)) => version == *seen,
            (ReadResult::Storage, ReadOrigin::Storage) => true,
            _ => false,
        })
    }

    /// Marks the writes of `txn_idx` as estimates and drops its read set.
    pub fn invalidate(&self, txn_idx: TxnIndex) {
        if let Some(keys) = self.write_sets.get(&txn_idx) {
            for key in keys.iter() {
                if let Some(mut versions) = self.data.get_mut(key) {
                    if let Some(entry) = versions.get_mut(&txn_idx) {
                        entry.value = EntryValue::Estimate;
                    }
                }
            }
        }
        self.read_sets.remove(&txn_idx);
    }

    /// Latest written value for every key, in key order.
    ///
    /// Only meaningful once every transaction has validated.
    pub fn latest_values(&self) -> Vec<(K, V)> {
        let mut result: Vec<(K, V)> = self
            .data
            .iter()
            .filter_map(|entry| {
                entry.value().values().next_back().and_then(|latest| match &latest.value {
                    EntryValue::Written(value) => Some((entry.key().clone(), value.clone())),
                    EntryValue::Estimate => None,
                })
            })
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Starts a buffered view for one execution attempt.
    pub fn view(&self, version: Version) -> TxnView<'_, K, V> {
        TxnView {
            store: self,
            version,
            reads: Vec::new(),
            writes: BTreeMap::new(),
        }
    }
}

impl<K, V> Default for MultiVersionStore<K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConflictValidator for MultiVersionStore<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn validate(&self, txn_idx: TxnIndex, _incarnation: Incarnation) -> bool {
        self.validate_reads(txn_idx)
    }

    fn invalidate(&self, txn_idx: TxnIndex, _incarnation: Incarnation) {
        MultiVersionStore::invalidate(self, txn_idx);
    }
}

/// Reads through the store for one attempt, buffering its writes.
///
/// Nothing reaches the store until [`TxnView::commit`].
pub struct TxnView<'a, K, V> {
    store: &'a MultiVersionStore<K, V>,
    version: Version,
    reads: Vec<(K, ReadOrigin)>,
    writes: BTreeMap<K, V>,
}

impl<'a, K, V> TxnView<'a, K, V>
where
    K: Eq + Hash + Ord + Clone,
    V: Clone,
{
    /// Reads `key`, falling back to `base` when no lower transaction wrote it.
    ///
    /// Returns `Err(blocking_txn)` when the value is still being produced.
    pub fn read<F>(&mut self, key: &K, base: F) -> Result<V, TxnIndex>
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.writes.get(key) {
            return Ok(value.clone());
        }
        match self.store.read(key, self.version.txn_idx) {
            ReadResult::Versioned(version, value) => {
                self.reads.push((key.clone(), ReadOrigin::Versioned(version)));
                Ok(value)
            }
            ReadResult::Storage => {
                self.reads.push((key.clone(), ReadOrigin::Storage));
                Ok(base(key))
            }
            ReadResult::Dependency(blocking) => Err(blocking),
        }
    }

    pub fn write(&mut self, key: K, value: V) {
        self.writes.insert(key, value);
    }

    /// Publishes the read and write sets.
    pub fn commit(self) {
        let writes = self.writes.into_iter().collect();
        self.store.record(self.version, self.reads, writes);
    }

    /// Publishes only the read set, e.g. for a transaction that failed after reading.
    pub fn commit_reads(self) {
        self.store.record(self.version, self.reads, Vec::new());
    }
}

//! Per-account aggregate of pending balance deltas.
//!
//! Every operation takes the single map-wide lock for its whole duration, so
//! compound read-modify-write steps are atomic with respect to each other.
//! Callers must not assume any per-account locking.

use crate::coins::Coins;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

/// Map from account id to a pending multi-denomination delta.
///
/// Invariant: every present key holds at least one non-zero denomination.
pub struct AccountAggregateMap<K> {
    entries: Mutex<HashMap<K, Coins>>,
}

impl<K> AccountAggregateMap<K>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the pending amount for `id`, if any.
    pub fn get(&self, id: &K) -> Option<Coins> {
        self.entries.lock().get(id).cloned()
    }

    /// Replaces the pending amount for `id`. An empty amount removes the entry.
    pub fn set(&self, id: K, amount: Coins) {
        let mut entries = self.entries.lock();
        store(&mut entries, id, amount);
    }

    /// Adds `amount` to the pending amount for `id`; missing denominations count as zero.
    pub fn upsert(&self, id: K, amount: &Coins) {
        let mut entries = self.entries.lock();
        let next = match entries.get(&id) {
            Some(existing) => existing + amount,
            None => amount.clone(),
        };
        store(&mut entries, id, next);
    }

    /// Subtracts as much of `amount` as the entry covers and returns the rest.
    ///
    /// Denominations that would go negative are left at zero (pruned) and their
    /// shortfall is returned as a positive remainder. Without an entry the whole
    /// amount is the remainder.
    pub fn saturating_sub(&self, id: &K, amount: &Coins) -> Coins {
        let mut entries = self.entries.lock();
        let Some(existing) = entries.get(id) else {
            return amount.clone();
        };

        let diff = existing - amount;
        if !diff.is_any_negative() {
            store(&mut entries, id.clone(), diff);
            return Coins::new();
        }

        let (covered, remainder) = diff.partition();
        store(&mut entries, id.clone(), covered);
        remainder
    }

    /// Subtracts `amount` only if the entry covers every denomination.
    ///
    /// Returns false and leaves the map untouched on any shortfall.
    pub fn safe_sub(&self, id: &K, amount: &Coins) -> bool {
        if amount.is_empty() {
            return true;
        }
        let mut entries = self.entries.lock();
        let Some(existing) = entries.get(id) else {
            return false;
        };

        let diff = existing - amount;
        if diff.is_any_negative() {
            return false;
        }
        store(&mut entries, id.clone(), diff);
        true
    }

    /// Applies `apply` to every entry in ascending id order, then clears the map.
    ///
    /// The lock is held throughout, so `apply` must not call back into this map.
    /// Returns the number of entries applied.
    pub fn range_and_remove<F>(&self, mut apply: F) -> usize
    where
        F: FnMut(&K, &Coins),
    {
        let mut entries = self.entries.lock();
        let mut drained: Vec<(K, Coins)> = entries.drain().collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        for (id, amount) in &drained {
            apply(id, amount);
        }
        drained.len()
    }

    /// Number of accounts with a pending amount.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Sorted copy of all entries.
    pub fn snapshot(&self) -> Vec<(K, Coins)> {
        let mut out: Vec<(K, Coins)> = self
            .entries
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl<K> Default for AccountAggregateMap<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

fn store<K: Eq + Hash>(entries: &mut HashMap<K, Coins>, id: K, amount: Coins) {
    if amount.is_empty() {
        entries.remove(&id);
    } else {
        entries.insert(id, amount);
    }
}

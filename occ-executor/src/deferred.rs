//! Deferred balance operations for hot shared accounts.
//!
//! Transactions that pay into (or draw from) a small set of heavily shared
//! accounts record their deltas here instead of writing the authoritative
//! store. Nothing here is visible to store reads until [`DeferredLedgerCache::flush`]
//! runs once at the end of the block, in ascending account order.

use crate::aggregate::AccountAggregateMap;
use crate::coins::Coins;
use crate::error::{FallbackError, StoreError};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, info, trace};

/// Authoritative per-account, per-denomination balance store.
///
/// Implementations use interior mutability; the cache only calls into the
/// store from a fallback or during a flush.
pub trait BalanceStore<K> {
    /// Current balance of `denom` for `id`, zero when absent.
    fn balance(&self, id: &K, denom: &str) -> i128;

    /// Overwrites the balance of `denom` for `id`.
    fn set_balance(&self, id: &K, denom: &str, amount: i128);

    /// Adds every denomination of `amount` to `id`.
    fn add_coins(&self, id: &K, amount: &Coins) {
        for (denom, value) in amount.iter() {
            let current = self.balance(id, denom);
            self.set_balance(id, denom, current.saturating_add(value));
        }
    }

    /// Subtracts `amount` from `id`, all or nothing.
    fn sub_coins(&self, id: &K, amount: &Coins) -> Result<(), StoreError> {
        for (denom, value) in amount.iter() {
            let available = self.balance(id, denom);
            if available < value {
                return Err(StoreError::InsufficientFunds {
                    denom: denom.to_string(),
                    available,
                    requested: value,
                });
            }
        }
        for (denom, value) in amount.iter() {
            let current = self.balance(id, denom);
            self.set_balance(id, denom, current - value);
        }
        Ok(())
    }
}

/// Number of entries applied by a flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub credits: usize,
    pub debits: usize,
}

impl FlushSummary {
    pub fn total(&self) -> usize {
        self.credits + self.debits
    }
}

/// Pending credits and debits for hot accounts.
///
/// For any account and denomination at most one side holds a non-zero value:
/// an insert first nets against the opposite side.
pub struct DeferredLedgerCache<K> {
    pending_credits: AccountAggregateMap<K>,
    pending_debits: AccountAggregateMap<K>,
    /// Serializes the two-map net-merge steps.
    merge_lock: Mutex<()>,
}

impl<K> DeferredLedgerCache<K>
where
    K: Eq + Hash + Ord + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            pending_credits: AccountAggregateMap::new(),
            pending_debits: AccountAggregateMap::new(),
            merge_lock: Mutex::new(()),
        }
    }

    /// Records a credit to `id`, cancelling pending debits first.
    pub fn upsert_deferred_credit(&self, id: K, amount: &Coins) {
        let _merge = self.merge_lock.lock();
        Self::net_into(&self.pending_debits, &self.pending_credits, id, amount);
    }

    /// Records a debit from `id`, cancelling pending credits first.
    pub fn upsert_deferred_debit(&self, id: K, amount: &Coins) {
        let _merge = self.merge_lock.lock();
        Self::net_into(&self.pending_credits, &self.pending_debits, id, amount);
    }

    fn net_into(
        opposite: &AccountAggregateMap<K>,
        target: &AccountAggregateMap<K>,
        id: K,
        amount: &Coins,
    ) {
        if opposite.safe_sub(&id, amount) {
            trace!(account = ?id, %amount, "deferred amount netted out");
            return;
        }
        // Net whatever the opposite side does hold, keep the rest.
        let remainder = opposite.saturating_sub(&id, amount);
        if !remainder.is_empty() {
            target.upsert(id, &remainder);
        }
    }

    /// Subtracts `amount` from the pending credits of `id`, passing any
    /// uncovered remainder to `fallback`.
    ///
    /// `fallback` is not called when the cache covers the whole amount. If it
    /// fails, the cache-side subtraction stays applied and the error is
    /// returned with the remainder.
    pub fn atomic_spillover_sub<F, E>(
        &self,
        id: &K,
        amount: &Coins,
        fallback: F,
    ) -> Result<(), FallbackError<E>>
    where
        F: FnOnce(&Coins) -> Result<(), E>,
        E: std::error::Error + 'static,
    {
        let remainder = self.pending_credits.saturating_sub(id, amount);
        if remainder.is_empty() {
            return Ok(());
        }

        debug!(account = ?id, %amount, %remainder, "spilling deferred subtraction over to store");
        fallback(&remainder).map_err(|source| FallbackError { remainder, source })
    }

    /// Drains credits then debits, each in ascending account order.
    ///
    /// Must run once per block, after every transaction has executed and
    /// validated.
    pub fn flush<C, D>(&self, apply_credit: C, apply_debit: D) -> FlushSummary
    where
        C: FnMut(&K, &Coins),
        D: FnMut(&K, &Coins),
    {
        let _merge = self.merge_lock.lock();
        let summary = FlushSummary {
            credits: self.pending_credits.range_and_remove(apply_credit),
            debits: self.pending_debits.range_and_remove(apply_debit),
        };
        info!(credits = summary.credits, debits = summary.debits, "flushed deferred balances");
        summary
    }

    /// Flushes into a [`BalanceStore`]: credits are added, debits subtracted.
    ///
    /// Both sides are always drained. The first failed debit is returned.
    pub fn flush_into<S>(&self, store: &S) -> Result<FlushSummary, StoreError>
    where
        S: BalanceStore<K>,
    {
        let mut first_error = None;
        let summary = self.flush(
            |id, amount| store.add_coins(id, amount),
            |id, amount| {
                if let Err(err) = store.sub_coins(id, amount) {
                    tracing::error!(account = ?id, %amount, %err, "failed to apply deferred debit");
                    first_error.get_or_insert(err);
                }
            },
        );
        match first_error {
            Some(err) => Err(err),
            None => Ok(summary),
        }
    }

    pub fn pending_credit(&self, id: &K) -> Option<Coins> {
        self.pending_credits.get(id)
    }

    pub fn pending_debit(&self, id: &K) -> Option<Coins> {
        self.pending_debits.get(id)
    }

    pub fn pending_credits(&self) -> &AccountAggregateMap<K> {
        &self.pending_credits
    }

    pub fn pending_debits(&self) -> &AccountAggregateMap<K> {
        &self.pending_debits
    }

    /// True when nothing is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.pending_credits.is_empty() && self.pending_debits.is_empty()
    }
}

impl<K> Default for DeferredLedgerCache<K>
where
    K: Eq + Hash + Ord + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
    use std::collections::BTreeMap;

    fn coins(pairs: &[(&str, i128)]) -> Coins {
        Coins::from_pairs(pairs.iter().map(|(d, a)| (*d, *a)))
    }

    #[derive(Default)]
    struct MemStore {
        balances: Mutex<BTreeMap<(String, String), i128>>,
    }

    impl BalanceStore<String> for MemStore {
        fn balance(&self, id: &String, denom: &str) -> i128 {
            self.balances
                .lock()
                .get(&(id.clone(), denom.to_string()))
                .copied()
                .unwrap_or(0)
        }

        fn set_balance(&self, id: &String, denom: &str, amount: i128) {
            self.balances
                .lock()
                .insert((id.clone(), denom.to_string()), amount);
        }
    }

    #[test]
    fn test_credit_then_equal_debit_nets_out() {
        let cache = DeferredLedgerCache::new();
        let amount = coins(&[("d1", 40), ("d2", 2)]);

        cache.upsert_deferred_credit("id", &amount);
        cache.upsert_deferred_debit("id", &amount);

        assert_eq!(cache.pending_credit(&"id"), None);
        assert_eq!(cache.pending_debit(&"id"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_partial_netting_keeps_one_side_per_denom() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_debit("id", &coins(&[("d1", 5), ("d2", 3)]));
        cache.upsert_deferred_credit("id", &coins(&[("d1", 10)]));

        assert_eq!(cache.pending_debit(&"id"), Some(coins(&[("d2", 3)])));
        assert_eq!(cache.pending_credit(&"id"), Some(coins(&[("d1", 5)])));
    }

    #[test]
    fn test_spillover_calls_fallback_with_remainder() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_credit("moduleA", &coins(&[("d1", 10)]));

        let mut seen = None;
        let result = cache.atomic_spillover_sub(&"moduleA", &coins(&[("d1", 75)]), |rem| {
            seen = Some(rem.clone());
            Ok::<(), StoreError>(())
        });

        assert!(result.is_ok());
        assert_eq!(seen, Some(coins(&[("d1", 65)])));
        assert_eq!(cache.pending_credit(&"moduleA"), None);
    }

    #[test]
    fn test_spillover_skips_fallback_when_covered() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_credit("moduleA", &coins(&[("d1", 100)]));

        let mut called = false;
        let result = cache.atomic_spillover_sub(&"moduleA", &coins(&[("d1", 60)]), |_| {
            called = true;
            Ok::<(), StoreError>(())
        });

        assert!(result.is_ok());
        assert!(!called);
        assert_eq!(cache.pending_credit(&"moduleA"), Some(coins(&[("d1", 40)])));
    }

    #[test]
    fn test_spillover_failure_keeps_cache_side() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_credit("moduleA".to_string(), &coins(&[("d1", 10)]));
        let store = MemStore::default();
        store.set_balance(&"moduleA".to_string(), "d1", 20);

        let err = cache
            .atomic_spillover_sub(&"moduleA".to_string(), &coins(&[("d1", 75)]), |rem| {
                store.sub_coins(&"moduleA".to_string(), rem)
            })
            .unwrap_err();

        assert_eq!(err.remainder, coins(&[("d1", 65)]));
        assert!(matches!(err.source, StoreError::InsufficientFunds { available: 20, requested: 65, .. }));
        assert_eq!(cache.pending_credit(&"moduleA".to_string()), None);
        assert_eq!(store.balance(&"moduleA".to_string(), "d1"), 20);
    }

    #[test]
    fn test_flush_applies_then_is_idempotent() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_credit("b".to_string(), &coins(&[("d1", 5)]));
        cache.upsert_deferred_credit("a".to_string(), &coins(&[("d1", 7)]));
        cache.upsert_deferred_debit("c".to_string(), &coins(&[("d2", 1)]));

        let store = MemStore::default();
        store.set_balance(&"c".to_string(), "d2", 4);

        let summary = cache.flush_into(&store).expect("flush should succeed");
        assert_eq!(summary, FlushSummary { credits: 2, debits: 1 });
        assert_eq!(store.balance(&"a".to_string(), "d1"), 7);
        assert_eq!(store.balance(&"b".to_string(), "d1"), 5);
        assert_eq!(store.balance(&"c".to_string(), "d2"), 3);

        let second = cache.flush(|_, _| panic!("nothing to credit"), |_, _| panic!("nothing to debit"));
        assert_eq!(second.total(), 0);
    }

    #[test]
    fn test_flush_into_reports_failed_debit_and_drains() {
        let cache = DeferredLedgerCache::new();
        cache.upsert_deferred_debit("a".to_string(), &coins(&[("d1", 3)]));
        let store = MemStore::default();

        let err = cache.flush_into(&store).unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_flush_order_independent_of_insertion_order() {
        let mut ops: Vec<(String, Coins, bool)> = (0..20)
            .map(|i| {
                let id = format!("module{:02}", i % 7);
                let amount = coins(&[("d1", i as i128 + 1), ("d2", (i % 3) as i128)]);
                (id, amount, i % 4 == 0)
            })
            .collect();

        let run = |ops: &[(String, Coins, bool)]| {
            let cache = DeferredLedgerCache::new();
            for (id, amount, debit) in ops {
                if *debit {
                    cache.upsert_deferred_debit(id.clone(), amount);
                } else {
                    cache.upsert_deferred_credit(id.clone(), amount);
                }
            }
            let mut calls = Vec::new();
            let mut debit_calls = Vec::new();
            cache.flush(
                |id, amount| calls.push((id.clone(), amount.clone())),
                |id, amount| debit_calls.push((id.clone(), amount.clone())),
            );
            (calls, debit_calls)
        };

        let expected = run(&ops);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            ops.shuffle(&mut rng);
            assert_eq!(run(&ops), expected);
        }
    }
}

//! Authoritative in-memory ledger.

use alloy_primitives::Address;
use occ_executor::{BalanceStore, Denom};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Balances and nonces, each behind its own lock.
///
/// Zero balances are not stored, so two ledgers holding the same funds
/// compare equal regardless of how they got there.
#[derive(Debug, Default)]
pub struct LedgerStore {
    balances: RwLock<BTreeMap<(Address, Denom), i128>>,
    nonces: RwLock<BTreeMap<Address, u64>>,
}

/// Point-in-time copy of a [`LedgerStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub balances: BTreeMap<(Address, Denom), i128>,
    pub nonces: BTreeMap<Address, u64>,
}

impl LedgerSnapshot {
    /// Sum of `denom` across all accounts.
    pub fn total_supply(&self, denom: &str) -> i128 {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, amount)| *amount)
            .sum()
    }
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nonce(&self, account: &Address) -> u64 {
        self.nonces.read().get(account).copied().unwrap_or(0)
    }

    pub fn set_nonce(&self, account: &Address, nonce: u64) {
        let mut nonces = self.nonces.write();
        if nonce == 0 {
            nonces.remove(account);
        } else {
            nonces.insert(*account, nonce);
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balances: self.balances.read().clone(),
            nonces: self.nonces.read().clone(),
        }
    }
}

impl BalanceStore<Address> for LedgerStore {
    fn balance(&self, id: &Address, denom: &str) -> i128 {
        self.balances
            .read()
            .get(&(*id, denom.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn set_balance(&self, id: &Address, denom: &str, amount: i128) {
        let mut balances = self.balances.write();
        let key = (*id, denom.to_string());
        if amount == 0 {
            balances.remove(&key);
        } else {
            balances.insert(key, amount);
        }
    }
}

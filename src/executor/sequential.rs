//! Sequential transaction executor.
//!
//! This module provides the baseline executor that processes transfers one
//! at a time, straight against the authoritative store.

use super::{ExecutionResult, Executor};
use crate::error::{BenchError, TxError};
use crate::store::LedgerStore;
use crate::transfer::{apply_transfer, LedgerAccess, TxOutcome};
use crate::{Workload, FEE_COLLECTOR};
use alloy_primitives::Address;
use occ_executor::{BalanceStore, Coins, Denom, StoreError};
use std::collections::BTreeMap;
use tracing::debug;

/// Sequential executor that processes transactions one at a time.
///
/// Fees are credited to the fee collector immediately. This is the reference
/// every other executor is checked against.
///
/// # Example
///
/// ```
/// use occ_bench::{Executor, SequentialExecutor, Workload, WorkloadConfig};
///
/// let workload = Workload::generate(WorkloadConfig::default());
/// let store = workload.create_store();
///
/// let executor = SequentialExecutor::new(true); // with signature verification
/// let (_, result) = executor.execute(store, &workload).unwrap();
///
/// println!("Successful: {}, Failed: {}", result.successful, result.failed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequentialExecutor {
    /// Whether to verify signatures during execution.
    pub verify_signatures: bool,
}

impl SequentialExecutor {
    /// Creates a new sequential executor.
    ///
    /// # Arguments
    /// * `verify_signatures` - If true, recovers and verifies the signer address
    ///   from each transaction's signature before execution.
    pub fn new(verify_signatures: bool) -> Self {
        Self { verify_signatures }
    }
}

impl Executor for SequentialExecutor {
    fn execute(
        &self,
        store: LedgerStore,
        workload: &Workload,
    ) -> Result<(LedgerStore, ExecutionResult), BenchError> {
        let mut result = ExecutionResult::default();

        for (height, block) in workload.blocks.iter().enumerate() {
            for tx in block {
                let mut access = BufferedAccess::new(&store);
                let outcome = match apply_transfer(&mut access, tx, self.verify_signatures) {
                    Ok(outcome) => {
                        access.commit();
                        outcome
                    }
                    Err(err) => TxOutcome::Rejected(err),
                };
                result.record(outcome);
            }
            debug!(height, txs = block.len(), "sequential block done");
        }

        Ok((store, result))
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Per-transaction write buffer over the store.
struct BufferedAccess<'a> {
    store: &'a LedgerStore,
    balances: BTreeMap<(Address, Denom), i128>,
    nonces: BTreeMap<Address, u64>,
}

impl<'a> BufferedAccess<'a> {
    fn new(store: &'a LedgerStore) -> Self {
        Self {
            store,
            balances: BTreeMap::new(),
            nonces: BTreeMap::new(),
        }
    }

    fn commit(self) {
        for ((account, denom), amount) in self.balances {
            self.store.set_balance(&account, &denom, amount);
        }
        for (account, nonce) in self.nonces {
            self.store.set_nonce(&account, nonce);
        }
    }
}

impl LedgerAccess for BufferedAccess<'_> {
    fn balance(&mut self, account: &Address, denom: &str) -> Result<i128, TxError> {
        let key = (*account, denom.to_string());
        Ok(match self.balances.get(&key) {
            Some(amount) => *amount,
            None => self.store.balance(account, denom),
        })
    }

    fn set_balance(&mut self, account: &Address, denom: &str, amount: i128) {
        self.balances.insert((*account, denom.to_string()), amount);
    }

    fn nonce(&mut self, account: &Address) -> Result<u64, TxError> {
        Ok(match self.nonces.get(account) {
            Some(nonce) => *nonce,
            None => self.store.nonce(account),
        })
    }

    fn set_nonce(&mut self, account: &Address, nonce: u64) {
        self.nonces.insert(*account, nonce);
    }

    fn collect_fee(&mut self, fee: &Coins) -> Result<(), TxError> {
        for (denom, amount) in fee.iter() {
            let current = self.balance(&FEE_COLLECTOR, denom)?;
            self.set_balance(&FEE_COLLECTOR, denom, current + amount);
        }
        Ok(())
    }

    fn refund_fee(&mut self, amount: &Coins) -> Result<(), TxError> {
        for (denom, value) in amount.iter() {
            let current = self.balance(&FEE_COLLECTOR, denom)?;
            if current < value {
                return Err(StoreError::InsufficientFunds {
                    denom: denom.to_string(),
                    available: current,
                    requested: value,
                }
                .into());
            }
            self.set_balance(&FEE_COLLECTOR, denom, current - value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WorkloadConfig, FEE_DENOM, TRANSFER_DENOMS};

    #[test]
    fn test_sequential_executor_with_verification() {
        let config = WorkloadConfig {
            num_accounts: 10,
            num_transactions: 5,
            transactions_per_block: 5,
            conflict_factor: 0.0,
            seed: 42,
            chain_id: 1,
        };

        let workload = Workload::generate(config);
        let store = workload.create_store();

        let executor = SequentialExecutor::new(true);
        let (_, result) = executor.execute(store, &workload).unwrap();

        assert_eq!(result.total(), 5);
        assert_eq!(result.outcomes.len(), 5);
        assert!(!result
            .outcomes
            .iter()
            .any(|o| matches!(o, TxOutcome::Rejected(_))));
    }

    #[test]
    fn test_supply_is_conserved() {
        let config = WorkloadConfig {
            num_accounts: 8,
            num_transactions: 60,
            transactions_per_block: 20,
            conflict_factor: 0.8,
            seed: 9,
            chain_id: 1,
        };
        let workload = Workload::generate(config);
        let before = workload.create_store().snapshot();

        let (store, result) = SequentialExecutor::new(false)
            .execute(workload.create_store(), &workload)
            .unwrap();
        let after = store.snapshot();

        for denom in TRANSFER_DENOMS {
            assert_eq!(before.total_supply(denom), after.total_supply(denom));
        }
        assert!(after.balances[&(FEE_COLLECTOR, FEE_DENOM.to_string())] > crate::COLLECTOR_FLOAT);
        assert_eq!(result.total(), 60);
    }

    #[test]
    fn test_rejected_transfer_leaves_no_trace() {
        let workload = Workload::generate(WorkloadConfig {
            num_accounts: 4,
            num_transactions: 3,
            transactions_per_block: 3,
            ..Default::default()
        });
        let mut tampered = workload.clone();
        tampered.blocks[0][1].amount += 1;

        let (store, result) = SequentialExecutor::new(true)
            .execute(tampered.create_store(), &tampered)
            .unwrap();

        assert_eq!(result.outcomes[1], TxOutcome::Rejected(TxError::InvalidSignature));
        let tx = &tampered.blocks[0][1];
        let expected_nonce = tampered.blocks[0][..1]
            .iter()
            .filter(|t| t.from == tx.from)
            .count() as u64;
        assert_eq!(store.nonce(&tx.from), expected_nonce);
    }
}

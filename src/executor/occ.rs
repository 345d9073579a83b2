//! Optimistic concurrent executor.
//!
//! Each block runs through an `occ-executor` [`Scheduler`]. Account balances
//! and nonces go through multi-version stores so conflicting transfers are
//! detected and re-executed. Fee payments never touch the fee collector's
//! balance during the block: they accumulate in a [`DeferredLedgerCache`] and
//! are flushed once the block has validated.

use super::{ExecutionResult, Executor};
use crate::error::{BenchError, TxError};
use crate::store::LedgerStore;
use crate::transfer::{apply_transfer, LedgerAccess, TxOutcome};
use crate::{SignedTransfer, Workload, FEE_COLLECTOR};
use alloy_primitives::Address;
use occ_executor::{
    BalanceStore, Coins, ConflictValidator, DeferredLedgerCache, Denom, ExecuteOutcome,
    FlushSummary, Incarnation, MultiVersionStore, Scheduler, SchedulerConfig, StoreError,
    TaskContext, TransactionExecutor, TxnIndex, TxnView, Version,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

type BalanceKey = (Address, Denom);

/// Parallel executor built on the OCC scheduler.
#[derive(Debug, Clone)]
pub struct OccExecutor {
    pub config: SchedulerConfig,
    pub verify_signatures: bool,
}

impl OccExecutor {
    /// Creates an executor running `workers` threads per execution round.
    pub fn new(workers: usize, verify_signatures: bool) -> Self {
        Self {
            config: SchedulerConfig::default().with_workers(workers),
            verify_signatures,
        }
    }

    pub fn with_config(config: SchedulerConfig, verify_signatures: bool) -> Self {
        Self {
            config,
            verify_signatures,
        }
    }
}

impl Executor for OccExecutor {
    fn execute(
        &self,
        store: LedgerStore,
        workload: &Workload,
    ) -> Result<(LedgerStore, ExecutionResult), BenchError> {
        let mut result = ExecutionResult::default();

        for (height, block) in workload.blocks.iter().enumerate() {
            let state = BlockState::new(&store, self.verify_signatures);
            let mut scheduler = Scheduler::new(self.config.clone(), &state, &state);

            let outcomes = scheduler
                .process_all(block.iter().collect())
                .map_err(|source| BenchError::Scheduler {
                    block: height,
                    source,
                })?;

            let metrics = scheduler.metrics().clone();
            drop(scheduler);
            result.rounds += metrics.iterations;
            result.retries += metrics.retries;
            if metrics.synchronous {
                result.synchronous_blocks += 1;
            }

            let summary = state.commit().map_err(|source| BenchError::Flush {
                block: height,
                source,
            })?;
            debug!(
                height,
                txs = block.len(),
                flushed = summary.total(),
                "occ block committed"
            );

            for outcome in outcomes {
                result.record(outcome);
            }
        }

        info!(
            blocks = workload.blocks.len(),
            rounds = result.rounds,
            retries = result.retries,
            synchronous_blocks = result.synchronous_blocks,
            "occ workload done"
        );
        Ok((store, result))
    }

    fn name(&self) -> &'static str {
        "occ"
    }
}

// ============================================================================
// Block State
// ============================================================================

/// Deferred operation applied by an attempt, kept so it can be undone.
#[derive(Debug, Clone)]
enum DeferredOp {
    /// Fee credited to the collector's pending credits.
    Credit(Coins),
    /// Part of a refund taken out of the collector's pending credits.
    Consumed(Coins),
}

/// Shared state for executing one block.
struct BlockState<'a> {
    store: &'a LedgerStore,
    balances: MultiVersionStore<BalanceKey, i128>,
    nonces: MultiVersionStore<Address, u64>,
    deferred: DeferredLedgerCache<Address>,
    /// Deferred operations of each transaction's applied attempt.
    journal: Mutex<HashMap<TxnIndex, Vec<DeferredOp>>>,
    verify_signatures: bool,
}

impl<'a> BlockState<'a> {
    fn new(store: &'a LedgerStore, verify_signatures: bool) -> Self {
        Self {
            store,
            balances: MultiVersionStore::new(),
            nonces: MultiVersionStore::new(),
            deferred: DeferredLedgerCache::new(),
            journal: Mutex::new(HashMap::new()),
            verify_signatures,
        }
    }

    fn revert(&self, ops: Vec<DeferredOp>) {
        for op in ops {
            match op {
                DeferredOp::Credit(amount) => {
                    self.deferred.upsert_deferred_debit(FEE_COLLECTOR, &amount)
                }
                DeferredOp::Consumed(amount) => {
                    self.deferred.upsert_deferred_credit(FEE_COLLECTOR, &amount)
                }
            }
        }
    }

    /// Writes the validated block into the store, then flushes deferred
    /// balances on top.
    fn commit(self) -> Result<FlushSummary, StoreError> {
        for ((account, denom), amount) in self.balances.latest_values() {
            self.store.set_balance(&account, &denom, amount);
        }
        for (account, nonce) in self.nonces.latest_values() {
            self.store.set_nonce(&account, nonce);
        }
        self.deferred.flush_into(self.store)
    }
}

impl<'a> TransactionExecutor for BlockState<'a> {
    type Request = &'a SignedTransfer;
    type Response = TxOutcome;

    fn execute(
        &self,
        ctx: &TaskContext<'_>,
        tx: &&'a SignedTransfer,
    ) -> ExecuteOutcome<TxOutcome> {
        let mut access = AttemptAccess::new(self, ctx.version());
        match apply_transfer(&mut access, tx, self.verify_signatures) {
            Ok(outcome) => {
                access.commit(ctx.index());
                ExecuteOutcome::Executed(outcome)
            }
            Err(TxError::Blocked(dependency)) => {
                access.abandon();
                ExecuteOutcome::Aborted {
                    dependency: Some(dependency),
                }
            }
            Err(err) => {
                access.reject();
                ExecuteOutcome::Executed(TxOutcome::Rejected(err))
            }
        }
    }
}

impl ConflictValidator for BlockState<'_> {
    fn validate(&self, txn_idx: TxnIndex, _incarnation: Incarnation) -> bool {
        self.balances.validate_reads(txn_idx) && self.nonces.validate_reads(txn_idx)
    }

    fn invalidate(&self, txn_idx: TxnIndex, _incarnation: Incarnation) {
        self.balances.invalidate(txn_idx);
        self.nonces.invalidate(txn_idx);
        let ops = self.journal.lock().remove(&txn_idx);
        if let Some(ops) = ops {
            self.revert(ops);
        }
    }
}

// ============================================================================
// Attempt Access
// ============================================================================

/// One attempt's view of the block state.
struct AttemptAccess<'s, 'a> {
    state: &'s BlockState<'a>,
    balances: TxnView<'s, BalanceKey, i128>,
    nonces: TxnView<'s, Address, u64>,
    ops: Vec<DeferredOp>,
}

impl<'s, 'a> AttemptAccess<'s, 'a> {
    fn new(state: &'s BlockState<'a>, version: Version) -> Self {
        Self {
            state,
            balances: state.balances.view(version),
            nonces: state.nonces.view(version),
            ops: Vec::new(),
        }
    }

    /// Publishes reads, writes and deferred operations.
    fn commit(self, txn_idx: TxnIndex) {
        self.balances.commit();
        self.nonces.commit();
        if !self.ops.is_empty() {
            self.state
                .journal
                .lock()
                .entry(txn_idx)
                .or_default()
                .extend(self.ops);
        }
    }

    /// Publishes only the reads, so a rejection based on stale state is caught
    /// by validation.
    fn reject(self) {
        self.balances.commit_reads();
        self.nonces.commit_reads();
        self.state.revert(self.ops);
    }

    /// Drops everything; the attempt will be retried.
    fn abandon(self) {
        self.state.revert(self.ops);
    }
}

impl LedgerAccess for AttemptAccess<'_, '_> {
    fn balance(&mut self, account: &Address, denom: &str) -> Result<i128, TxError> {
        let store = self.state.store;
        self.balances
            .read(&(*account, denom.to_string()), |(account, denom)| {
                store.balance(account, denom)
            })
            .map_err(TxError::Blocked)
    }

    fn set_balance(&mut self, account: &Address, denom: &str, amount: i128) {
        self.balances.write((*account, denom.to_string()), amount);
    }

    fn nonce(&mut self, account: &Address) -> Result<u64, TxError> {
        let store = self.state.store;
        self.nonces
            .read(account, |account| store.nonce(account))
            .map_err(TxError::Blocked)
    }

    fn set_nonce(&mut self, account: &Address, nonce: u64) {
        self.nonces.write(*account, nonce);
    }

    fn collect_fee(&mut self, fee: &Coins) -> Result<(), TxError> {
        self.state.deferred.upsert_deferred_credit(FEE_COLLECTOR, fee);
        self.ops.push(DeferredOp::Credit(fee.clone()));
        Ok(())
    }

    /// Takes the refund from pending fee credits first, spilling the rest over
    /// to the collector's balance.
    fn refund_fee(&mut self, amount: &Coins) -> Result<(), TxError> {
        let store = self.state.store;
        let balances = &mut self.balances;
        let mut spilled = Coins::new();

        let result = self
            .state
            .deferred
            .atomic_spillover_sub(&FEE_COLLECTOR, amount, |remainder| {
                spilled = remainder.clone();
                for (denom, value) in remainder.iter() {
                    let key = (FEE_COLLECTOR, denom.to_string());
                    let available = balances
                        .read(&key, |(account, denom)| store.balance(account, denom))
                        .map_err(TxError::Blocked)?;
                    if available < value {
                        return Err(TxError::Store(StoreError::InsufficientFunds {
                            denom: denom.to_string(),
                            available,
                            requested: value,
                        }));
                    }
                    balances.write(key, available - value);
                }
                Ok(())
            });

        let consumed = amount - &spilled;
        if !consumed.is_empty() {
            self.ops.push(DeferredOp::Consumed(consumed));
        }
        result.map_err(|err| err.source)
    }
}

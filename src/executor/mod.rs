//! Transaction execution strategies.
//!
//! This module provides the [`Executor`] trait and implementations for
//! different transaction execution strategies.

mod occ;
mod sequential;

pub use occ::OccExecutor;
pub use sequential::SequentialExecutor;

use crate::error::BenchError;
use crate::store::LedgerStore;
use crate::transfer::TxOutcome;
use crate::Workload;

/// Result of executing a workload.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Number of successfully executed transactions.
    pub successful: usize,
    /// Number of failed transactions (rejected or failed message).
    pub failed: usize,
    /// One outcome per transaction, in workload order.
    pub outcomes: Vec<TxOutcome>,
    /// Execute/validate rounds across all blocks. Zero for sequential execution.
    pub rounds: usize,
    /// Re-executions across all blocks.
    pub retries: usize,
    /// Blocks that fell back to synchronous execution.
    pub synchronous_blocks: usize,
}

impl ExecutionResult {
    /// Total number of transactions processed.
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    fn record(&mut self, outcome: TxOutcome) {
        if outcome.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }
}

/// Trait for different transaction execution strategies.
///
/// Every implementation must leave the store in the state produced by
/// applying the workload's blocks in order, one transaction at a time.
pub trait Executor {
    /// Executes the workload on the given store.
    ///
    /// # Returns
    /// A tuple of (final store state, execution result).
    fn execute(
        &self,
        store: LedgerStore,
        workload: &Workload,
    ) -> Result<(LedgerStore, ExecutionResult), BenchError>;

    /// Returns a human-readable name for this executor.
    fn name(&self) -> &'static str {
        "unknown"
    }
}

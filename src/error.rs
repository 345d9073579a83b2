//! Error types for transfer processing and workload execution.

use occ_executor::{SchedulerError, StoreError, TxnIndex};
use thiserror::Error;

/// Why a transfer was rejected, or could not finish its current attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("signature does not recover to the sender")]
    InvalidSignature,

    #[error("bad nonce: expected {expected}, got {got}")]
    BadNonce { expected: u64, got: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A value this attempt needs is still being produced by a lower
    /// transaction. Only seen during optimistic execution.
    #[error("blocked on transaction {0}")]
    Blocked(TxnIndex),
}

/// Failures that abort a whole workload run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("block {block}: {source}")]
    Scheduler {
        block: usize,
        #[source]
        source: SchedulerError,
    },

    #[error("block {block}: deferred flush failed: {source}")]
    Flush {
        block: usize,
        #[source]
        source: StoreError,
    },
}

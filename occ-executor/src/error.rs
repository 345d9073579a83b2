//! Error types for scheduling and deferred balance operations.

use crate::coins::Coins;
use crate::types::TxnIndex;
use thiserror::Error;

/// Scheduler-level failures. Any of these aborts the whole block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The cancellation signal tripped while transactions were executing.
    #[error("execution cancelled")]
    Cancelled,

    /// A worker thread panicked while running a transaction.
    #[error("worker thread panicked")]
    WorkerPanicked,

    /// A transaction finished the block without a response.
    #[error("transaction {0} has no response")]
    MissingResponse(TxnIndex),
}

/// Failures of the authoritative balance store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("insufficient funds: {available}{denom} available, {requested}{denom} requested")]
    InsufficientFunds {
        denom: String,
        available: i128,
        requested: i128,
    },
}

/// Returned by [`DeferredLedgerCache::atomic_spillover_sub`] when the
/// fallback for the uncovered remainder fails.
///
/// The part covered by the cache has already been subtracted and is not
/// restored; the enclosing transaction must fail.
///
/// [`DeferredLedgerCache::atomic_spillover_sub`]: crate::DeferredLedgerCache::atomic_spillover_sub
#[derive(Debug, Error)]
#[error("spillover of {remainder} failed outside the deferred cache: {source}")]
pub struct FallbackError<E>
where
    E: std::error::Error + 'static,
{
    /// The amount that had to be taken from the backing store.
    pub remainder: Coins,
    #[source]
    pub source: E,
}

//! Optimistic concurrent execution of ordered transaction batches.
//!
//! This crate runs the transactions of a block speculatively on a worker pool
//! and produces results identical to executing them one by one in order.
//! Balance changes to hot, heavily shared accounts are kept out of the
//! authoritative store until the end of the block so they do not cause
//! conflicts between otherwise independent transactions.
//!
//! # Core Components
//!
//! - **Scheduler**: Round-based execute/validate loop over a task arena
//! - **MultiVersionStore**: Per-key write history and read sets for conflict detection
//! - **DeferredLedgerCache**: Net-merged pending credits and debits for hot accounts
//! - **AccountAggregateMap**: Concurrency-safe account to coins map backing the cache
//!
//! # Algorithm Overview
//!
//! 1. Every pending task executes on the pool; the round ends at a barrier
//! 2. Tasks are validated in index order from the first unvalidated one
//! 3. Aborted or conflicting tasks get a new incarnation and run again
//! 4. After too many rounds the remaining suffix runs in order on one thread
//! 5. Once everything validates, deferred balances are flushed in account order
//!
//! # Example
//!
//! ```rust,ignore
//! use occ_executor::{AlwaysValid, Scheduler, SchedulerConfig};
//!
//! let config = SchedulerConfig::default().with_workers(4);
//! let mut scheduler = Scheduler::new(config, &my_executor, &AlwaysValid);
//! let responses = scheduler.process_all(requests)?;
//!
//! println!("rounds: {}", scheduler.metrics().iterations);
//! ```

pub mod aggregate;
pub mod cancel;
pub mod coins;
pub mod deferred;
pub mod error;
pub mod mvhashmap;
pub mod scheduler;
pub mod types;

pub use aggregate::AccountAggregateMap;
pub use cancel::CancellationToken;
pub use coins::{Coins, Denom};
pub use deferred::{BalanceStore, DeferredLedgerCache, FlushSummary};
pub use error::{FallbackError, SchedulerError, StoreError};
pub use mvhashmap::{MultiVersionStore, ReadOrigin, ReadResult, TxnView};
pub use scheduler::{
    AlwaysValid, ConflictValidator, Scheduler, SchedulerConfig, SchedulerMetrics, TaskContext,
    TransactionExecutor, DEFAULT_MAX_ITERATIONS,
};
pub use types::{ExecuteOutcome, Incarnation, TaskState, TaskStatus, TxnIndex, Version};

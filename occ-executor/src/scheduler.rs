//! Round-based optimistic scheduler.
//!
//! Each round executes a set of pending tasks on a fixed-size worker pool,
//! then validates every task from the first unvalidated index onward. Tasks
//! that aborted or failed validation get a new incarnation and run again in
//! the next round. The loop ends when a validation pass selects nothing.

use crate::cancel::CancellationToken;
use crate::error::SchedulerError;
use crate::types::{ExecuteOutcome, Incarnation, TaskState, TaskStatus, TxnIndex, Version};
use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Rounds before falling back to in-order execution.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

// ============================================================================
// Configuration & Metrics
// ============================================================================

/// Configuration for a [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of worker threads per execution round. 0 means one per task.
    pub workers: usize,
    /// Rounds to run before switching to synchronous, in-order execution.
    /// 0 disables the fallback.
    pub max_iterations: usize,
}

impl SchedulerConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Statistics about the last [`Scheduler::process_all`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Execute/validate rounds run.
    pub iterations: usize,
    /// Executor invocations, including re-executions.
    pub executions: usize,
    /// Tasks selected for re-execution, summed over rounds.
    pub retries: usize,
    /// Highest incarnation any task reached.
    pub max_incarnation: Incarnation,
    /// Whether the synchronous fallback engaged.
    pub synchronous: bool,
}

// ============================================================================
// External Contracts
// ============================================================================

/// Per-attempt context handed to the executor.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    index: TxnIndex,
    incarnation: Incarnation,
    cancel: &'a CancellationToken,
}

impl<'a> TaskContext<'a> {
    pub fn new(index: TxnIndex, incarnation: Incarnation, cancel: &'a CancellationToken) -> Self {
        Self {
            index,
            incarnation,
            cancel,
        }
    }

    pub fn index(&self) -> TxnIndex {
        self.index
    }

    pub fn incarnation(&self) -> Incarnation {
        self.incarnation
    }

    pub fn version(&self) -> Version {
        Version::new(self.index, self.incarnation)
    }

    /// The scheduler's cancellation token.
    pub fn cancellation(&self) -> &'a CancellationToken {
        self.cancel
    }
}

/// Runs one transaction attempt.
///
/// Called concurrently for different tasks, at most once per
/// `(index, incarnation)`. Hot-account mutations must go through a
/// [`DeferredLedgerCache`](crate::DeferredLedgerCache), never straight to the
/// authoritative store.
pub trait TransactionExecutor: Sync {
    type Request: Sync;
    type Response: Send;

    fn execute(
        &self,
        ctx: &TaskContext<'_>,
        request: &Self::Request,
    ) -> ExecuteOutcome<Self::Response>;
}

/// Decides whether an executed attempt is still consistent with the writes
/// of lower-indexed transactions.
pub trait ConflictValidator: Sync {
    /// True when the attempt `(txn_idx, incarnation)` saw no conflicting write.
    fn validate(&self, txn_idx: TxnIndex, incarnation: Incarnation) -> bool;

    /// Called once before an attempt is discarded for re-execution.
    fn invalidate(&self, _txn_idx: TxnIndex, _incarnation: Incarnation) {}
}

/// Validator that accepts every attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysValid;

impl ConflictValidator for AlwaysValid {
    fn validate(&self, _txn_idx: TxnIndex, _incarnation: Incarnation) -> bool {
        true
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// A queued execution attempt.
struct Job<'a, Q> {
    index: TxnIndex,
    incarnation: Incarnation,
    request: &'a Q,
}

type Arena<X> =
    Vec<TaskState<<X as TransactionExecutor>::Request, <X as TransactionExecutor>::Response>>;

/// Optimistic scheduler for one block at a time.
pub struct Scheduler<'a, X, V> {
    config: SchedulerConfig,
    executor: &'a X,
    validator: &'a V,
    cancel: CancellationToken,
    metrics: SchedulerMetrics,
    synchronous: bool,
}

impl<'a, X, V> Scheduler<'a, X, V>
where
    X: TransactionExecutor,
    V: ConflictValidator,
{
    /// Creates a scheduler with its own cancellation token.
    pub fn new(config: SchedulerConfig, executor: &'a X, validator: &'a V) -> Self {
        Self {
            config,
            executor,
            validator,
            cancel: CancellationToken::new(),
            metrics: SchedulerMetrics::default(),
            synchronous: false,
        }
    }

    /// Replaces the cancellation token, e.g. to share one across components.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this scheduler's in-flight work.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Metrics of the most recent call to [`Scheduler::process_all`].
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    /// Executes `requests` until every attempt validates and returns one
    /// response per request, in input order.
    ///
    /// A cancellation or worker panic aborts the call; no partial results are
    /// returned and the call cannot be resumed.
    pub fn process_all(
        &mut self,
        requests: Vec<X::Request>,
    ) -> Result<Vec<X::Response>, SchedulerError> {
        let start = Instant::now();
        self.metrics = SchedulerMetrics::default();
        self.synchronous = false;

        let mut tasks: Arena<X> = requests
            .into_iter()
            .enumerate()
            .map(|(index, request)| TaskState::new(index, request))
            .collect();
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.effective_workers(tasks.len());
        let mut to_execute: Vec<TxnIndex> = (0..tasks.len()).collect();

        loop {
            if self.config.max_iterations > 0 && self.metrics.iterations >= self.config.max_iterations {
                if !self.synchronous {
                    warn!(
                        iterations = self.metrics.iterations,
                        "conflict rate too high, switching to synchronous execution"
                    );
                    self.synchronous = true;
                    self.metrics.synchronous = true;
                }
                match first_non_validated(&tasks) {
                    Some(first) => to_execute = (first..tasks.len()).collect(),
                    None => break,
                }
            }

            if self.synchronous {
                self.execute_in_order(&mut tasks, &to_execute)?;
            } else {
                self.execute_all(&mut tasks, &to_execute, workers)?;
            }

            to_execute = self.validate_all(&mut tasks);
            self.metrics.iterations += 1;
            self.metrics.retries += to_execute.len();
            debug!(
                round = self.metrics.iterations,
                retries = to_execute.len(),
                "validation pass complete"
            );

            if to_execute.is_empty() {
                break;
            }
        }

        info!(
            txs = tasks.len(),
            workers,
            iterations = self.metrics.iterations,
            retries = self.metrics.retries,
            max_incarnation = self.metrics.max_incarnation,
            sync = self.synchronous,
            latency_ms = start.elapsed().as_millis() as u64,
            "occ scheduler"
        );

        tasks
            .into_iter()
            .map(|task| {
                let index = task.index();
                task.into_response()
                    .ok_or(SchedulerError::MissingResponse(index))
            })
            .collect()
    }

    fn effective_workers(&self, num_tasks: usize) -> usize {
        if self.config.workers == 0 || self.config.workers > num_tasks {
            num_tasks
        } else {
            self.config.workers
        }
    }

    /// Runs the selected tasks on a pool of `workers` threads fed through a
    /// bounded queue. Returns once every dispatched task finished.
    pub(crate) fn execute_all(
        &mut self,
        tasks: &mut Arena<X>,
        to_execute: &[TxnIndex],
        workers: usize,
    ) -> Result<(), SchedulerError> {
        if to_execute.is_empty() {
            return Ok(());
        }
        let workers = workers.clamp(1, to_execute.len());

        let jobs: Vec<Job<'_, X::Request>> = to_execute
            .iter()
            .map(|&index| {
                let task = &tasks[index];
                Job {
                    index,
                    incarnation: task.incarnation(),
                    request: task.request(),
                }
            })
            .collect();

        let (job_tx, job_rx) = channel::bounded(workers);
        let (done_tx, done_rx) = channel::unbounded();
        let executor = self.executor;
        let cancel = &self.cancel;

        let dispatched = crossbeam::thread::scope(move |s| {
            for worker_id in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                s.spawn(move |_| worker_loop(worker_id, executor, cancel, job_rx, done_tx));
            }
            drop(job_rx);
            drop(done_tx);
            dispatch(jobs, job_tx, cancel)
        })
        .map_err(|_| SchedulerError::WorkerPanicked)?;

        let mut outcomes: Vec<Option<ExecuteOutcome<X::Response>>> =
            (0..tasks.len()).map(|_| None).collect();
        for (index, outcome) in done_rx.try_iter() {
            outcomes[index] = Some(outcome);
            self.metrics.executions += 1;
        }

        let current = std::mem::take(tasks);
        *tasks = current
            .into_iter()
            .zip(outcomes)
            .map(|(task, outcome)| match outcome {
                Some(outcome) => task.finish(outcome),
                None => task,
            })
            .collect();

        dispatched?;
        if self.cancel.is_cancelled() {
            warn!("execution cancelled");
            return Err(SchedulerError::Cancelled);
        }
        Ok(())
    }

    /// Synchronous fallback: runs the selected tasks one at a time, in index
    /// order, on the calling thread. Tasks that are not pending are retried first.
    fn execute_in_order(
        &mut self,
        tasks: &mut Arena<X>,
        to_execute: &[TxnIndex],
    ) -> Result<(), SchedulerError> {
        let mut selected = vec![false; tasks.len()];
        for &index in to_execute {
            selected[index] = true;
        }

        let current = std::mem::take(tasks);
        let mut cancelled = false;
        for task in current {
            if !selected[task.index()] || cancelled {
                tasks.push(task);
                continue;
            }
            if self.cancel.is_cancelled() {
                cancelled = true;
                tasks.push(task);
                continue;
            }

            let task = if task.is_pending() {
                task
            } else {
                self.validator.invalidate(task.index(), task.incarnation());
                let retry = task.into_retry();
                self.metrics.retries += 1;
                self.metrics.max_incarnation = self.metrics.max_incarnation.max(retry.incarnation());
                retry
            };

            let ctx = TaskContext::new(task.index(), task.incarnation(), &self.cancel);
            let outcome = self.executor.execute(&ctx, task.request());
            self.metrics.executions += 1;
            tasks.push(task.finish(outcome));
        }

        if cancelled {
            warn!("execution cancelled");
            return Err(SchedulerError::Cancelled);
        }
        Ok(())
    }

    /// Validates tasks in index order from the first unvalidated one and
    /// returns the indices selected for re-execution, already retried.
    pub(crate) fn validate_all(&mut self, tasks: &mut Arena<X>) -> Vec<TxnIndex> {
        let Some(first) = first_non_validated(tasks) else {
            return Vec::new();
        };

        let validator = self.validator;
        let mut selected = Vec::new();
        let mut max_incarnation = self.metrics.max_incarnation;

        let current = std::mem::take(tasks);
        *tasks = current
            .into_iter()
            .map(|task| {
                if task.index() < first {
                    return task;
                }
                let rerun = match task.status() {
                    TaskStatus::Pending | TaskStatus::Aborted => true,
                    TaskStatus::Executed(_) | TaskStatus::Validated(_) => {
                        !validator.validate(task.index(), task.incarnation())
                    }
                };
                if !rerun {
                    return task.into_validated();
                }

                trace!(
                    txn = task.index(),
                    incarnation = task.incarnation(),
                    status = task.status().name(),
                    "selected for re-execution"
                );
                validator.invalidate(task.index(), task.incarnation());
                let retry = task.into_retry();
                max_incarnation = max_incarnation.max(retry.incarnation());
                selected.push(retry.index());
                retry
            })
            .collect();

        self.metrics.max_incarnation = max_incarnation;
        selected
    }
}

fn first_non_validated<Q, R>(tasks: &[TaskState<Q, R>]) -> Option<TxnIndex> {
    tasks.iter().position(|task| !task.is_validated())
}

/// Feeds jobs to the workers until exhausted or cancelled.
fn dispatch<'j, Q>(
    jobs: Vec<Job<'j, Q>>,
    job_tx: Sender<Job<'j, Q>>,
    cancel: &CancellationToken,
) -> Result<(), SchedulerError> {
    for job in jobs {
        if cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        let sent = select! {
            send(job_tx, job) -> res => res.is_ok(),
            recv(cancel.signal()) -> _ => false,
        };
        if !sent {
            if cancel.is_cancelled() {
                return Err(SchedulerError::Cancelled);
            }
            // Every worker is gone; the scope reports the panic.
            break;
        }
    }
    Ok(())
}

/// Worker thread main loop.
fn worker_loop<X: TransactionExecutor>(
    worker_id: usize,
    executor: &X,
    cancel: &CancellationToken,
    jobs: Receiver<Job<'_, X::Request>>,
    done: Sender<(TxnIndex, ExecuteOutcome<X::Response>)>,
) {
    let mut local_executions = 0usize;
    loop {
        let job = select! {
            recv(jobs) -> job => job.ok(),
            recv(cancel.signal()) -> _ => None,
        };
        let Some(job) = job else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        let ctx = TaskContext::new(job.index, job.incarnation, cancel);
        let outcome = executor.execute(&ctx, job.request);
        local_executions += 1;
        trace!(
            worker_id,
            txn = job.index,
            incarnation = job.incarnation,
            aborted = matches!(outcome, ExecuteOutcome::Aborted { .. }),
            "executed task"
        );

        if done.send((job.index, outcome)).is_err() {
            break;
        }
    }
    trace!(worker_id, local_executions, "worker done");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Echoes its request and records every attempt.
    #[derive(Default)]
    struct RecordingExecutor {
        calls: AtomicUsize,
        attempts: Mutex<Vec<(TxnIndex, Incarnation)>>,
        in_flight: Mutex<HashSet<TxnIndex>>,
        delay: Option<Duration>,
    }

    impl TransactionExecutor for RecordingExecutor {
        type Request = u64;
        type Response = (u64, Incarnation);

        fn execute(&self, ctx: &TaskContext<'_>, request: &u64) -> ExecuteOutcome<(u64, Incarnation)> {
            assert!(
                self.in_flight.lock().insert(ctx.index()),
                "task {} executed concurrently",
                ctx.index()
            );
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.attempts.lock().push((ctx.index(), ctx.incarnation()));
            self.in_flight.lock().remove(&ctx.index());
            ExecuteOutcome::Executed((*request * 10, ctx.incarnation()))
        }
    }

    /// Rejects the first `k` incarnations of selected tasks.
    struct RejectFirst {
        rejections: HashMap<TxnIndex, Incarnation>,
        invalidated: Mutex<Vec<(TxnIndex, Incarnation)>>,
    }

    impl ConflictValidator for RejectFirst {
        fn validate(&self, txn_idx: TxnIndex, incarnation: Incarnation) -> bool {
            incarnation >= self.rejections.get(&txn_idx).copied().unwrap_or(0)
        }

        fn invalidate(&self, txn_idx: TxnIndex, incarnation: Incarnation) {
            self.invalidated.lock().push((txn_idx, incarnation));
        }
    }

    #[test]
    fn test_single_round_when_everything_validates() {
        let executor = RecordingExecutor::default();
        let config = SchedulerConfig::default().with_workers(2);
        let mut scheduler = Scheduler::new(config, &executor, &AlwaysValid);

        let results = scheduler.process_all(vec![1, 2, 3, 4, 5]).unwrap();

        assert_eq!(results, vec![(10, 0), (20, 0), (30, 0), (40, 0), (50, 0)]);
        assert_eq!(scheduler.metrics().iterations, 1);
        assert_eq!(scheduler.metrics().executions, 5);
        assert_eq!(scheduler.metrics().retries, 0);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_results_match_input_for_any_size() {
        for n in [0usize, 1, 2, 7, 64] {
            let executor = RecordingExecutor::default();
            let config = SchedulerConfig::default().with_workers(3);
            let mut scheduler = Scheduler::new(config, &executor, &AlwaysValid);

            let requests: Vec<u64> = (0..n as u64).collect();
            let results = scheduler.process_all(requests).unwrap();

            assert_eq!(results.len(), n);
            for (i, (value, _)) in results.iter().enumerate() {
                assert_eq!(*value, i as u64 * 10);
            }
        }
    }

    #[test]
    fn test_zero_workers_means_one_per_task() {
        let executor = RecordingExecutor {
            delay: Some(Duration::from_millis(1)),
            ..Default::default()
        };
        let config = SchedulerConfig::default().with_workers(0);
        let mut scheduler = Scheduler::new(config, &executor, &AlwaysValid);

        let results = scheduler.process_all((0..16).collect()).unwrap();
        assert_eq!(results.len(), 16);
        assert_eq!(scheduler.effective_workers(16), 16);
    }

    #[test]
    fn test_rejected_tasks_rerun_with_new_incarnation() {
        let executor = RecordingExecutor::default();
        let validator = RejectFirst {
            rejections: HashMap::from([(1, 2), (3, 1)]),
            invalidated: Mutex::new(Vec::new()),
        };
        let config = SchedulerConfig::default().with_workers(4);
        let mut scheduler = Scheduler::new(config, &executor, &validator);

        let results = scheduler.process_all(vec![0, 1, 2, 3, 4]).unwrap();

        assert_eq!(results, vec![(0, 0), (10, 2), (20, 0), (30, 1), (40, 0)]);
        let metrics = scheduler.metrics();
        assert_eq!(metrics.iterations, 3);
        assert_eq!(metrics.retries, 3);
        assert_eq!(metrics.max_incarnation, 2);
        assert_eq!(metrics.executions, 8);
        assert!(!metrics.synchronous);

        let mut invalidated = validator.invalidated.lock().clone();
        invalidated.sort();
        assert_eq!(invalidated, vec![(1, 0), (1, 1), (3, 0)]);

        // Every (task, incarnation) ran exactly once.
        let mut attempts = executor.attempts.lock().clone();
        attempts.sort();
        let unique: HashSet<_> = attempts.iter().copied().collect();
        assert_eq!(unique.len(), attempts.len());
    }

    #[test]
    fn test_aborted_tasks_are_always_rerun() {
        struct AbortOnce;

        impl TransactionExecutor for AbortOnce {
            type Request = ();
            type Response = Incarnation;

            fn execute(&self, ctx: &TaskContext<'_>, _request: &()) -> ExecuteOutcome<Incarnation> {
                if ctx.index() % 2 == 1 && ctx.incarnation() == 0 {
                    ExecuteOutcome::Aborted {
                        dependency: Some(ctx.index() - 1),
                    }
                } else {
                    ExecuteOutcome::Executed(ctx.incarnation())
                }
            }
        }

        let mut scheduler = Scheduler::new(SchedulerConfig::default(), &AbortOnce, &AlwaysValid);
        let results = scheduler.process_all(vec![(); 6]).unwrap();

        assert_eq!(results, vec![0, 1, 0, 1, 0, 1]);
        assert_eq!(scheduler.metrics().iterations, 2);
    }

    #[test]
    fn test_validate_all_skips_validated_prefix() {
        let executor = RecordingExecutor::default();
        let validator = RejectFirst {
            rejections: HashMap::from([(2, 1)]),
            invalidated: Mutex::new(Vec::new()),
        };
        let mut scheduler = Scheduler::new(SchedulerConfig::default(), &executor, &validator);

        let mut tasks: Vec<TaskState<u64, (u64, Incarnation)>> = (0..4)
            .map(|i| TaskState::new(i, i as u64).finish(ExecuteOutcome::Executed((0, 0))))
            .collect();

        let selected = scheduler.validate_all(&mut tasks);
        assert_eq!(selected, vec![2]);
        assert!(tasks[0].is_validated() && tasks[1].is_validated() && tasks[3].is_validated());
        assert!(tasks[2].is_pending());
        assert_eq!(tasks[2].incarnation(), 1);

        // Nothing before index 2 is re-checked.
        scheduler.execute_all(&mut tasks, &selected, 1).unwrap();
        assert_eq!(scheduler.validate_all(&mut tasks), Vec::<TxnIndex>::new());
        assert!(tasks.iter().all(|t| t.is_validated()));
    }

    #[test]
    fn test_synchronous_fallback_after_max_iterations() {
        let executor = RecordingExecutor::default();
        let validator = RejectFirst {
            rejections: HashMap::from([(2, 5)]),
            invalidated: Mutex::new(Vec::new()),
        };
        let config = SchedulerConfig::default()
            .with_workers(2)
            .with_max_iterations(2);
        let mut scheduler = Scheduler::new(config, &executor, &validator);

        let results = scheduler.process_all(vec![0, 1, 2, 3]).unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[2], (20, 5));
        let metrics = scheduler.metrics();
        assert!(metrics.synchronous);
        assert_eq!(metrics.max_incarnation, 5);
        // Task 3 sits after the unvalidated task and is re-run in order.
        assert!(results[3].1 >= 1);
        // Every re-execution is counted, including those run in order.
        let incarnations: usize = results.iter().map(|(_, inc)| *inc).sum();
        assert_eq!(metrics.retries, incarnations);
    }

    #[test]
    fn test_cancelled_before_start() {
        let executor = RecordingExecutor::default();
        let mut scheduler = Scheduler::new(SchedulerConfig::default(), &executor, &AlwaysValid);
        scheduler.cancellation_token().cancel();

        assert_eq!(
            scheduler.process_all(vec![1, 2, 3]),
            Err(SchedulerError::Cancelled)
        );
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_mid_execution() {
        struct CancelOnFirst {
            calls: AtomicUsize,
        }

        impl TransactionExecutor for CancelOnFirst {
            type Request = ();
            type Response = ();

            fn execute(&self, ctx: &TaskContext<'_>, _request: &()) -> ExecuteOutcome<()> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                ctx.cancellation().cancel();
                ExecuteOutcome::Executed(())
            }
        }

        let executor = CancelOnFirst {
            calls: AtomicUsize::new(0),
        };
        let config = SchedulerConfig::default().with_workers(1);
        let mut scheduler = Scheduler::new(config, &executor, &AlwaysValid);

        assert_eq!(
            scheduler.process_all(vec![(); 50]),
            Err(SchedulerError::Cancelled)
        );
        // The in-flight call finished; little else started.
        assert!(executor.calls.load(Ordering::SeqCst) < 50);
    }

    #[test]
    fn test_worker_panic_is_reported() {
        struct Panics;

        impl TransactionExecutor for Panics {
            type Request = ();
            type Response = ();

            fn execute(&self, _ctx: &TaskContext<'_>, _request: &()) -> ExecuteOutcome<()> {
                panic!("executor bug");
            }
        }

        let config = SchedulerConfig::default().with_workers(2);
        let mut scheduler = Scheduler::new(config, &Panics, &AlwaysValid);
        assert_eq!(
            scheduler.process_all(vec![(); 4]),
            Err(SchedulerError::WorkerPanicked)
        );
    }
}

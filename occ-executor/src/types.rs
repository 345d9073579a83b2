//! Core types for optimistic execution.

use std::fmt;

/// Transaction index in the block (0-based).
pub type TxnIndex = usize;

/// Incarnation number (how many times a transaction has been re-executed).
pub type Incarnation = usize;

/// Version identifier for a transaction execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub txn_idx: TxnIndex,
    pub incarnation: Incarnation,
}

impl Version {
    pub fn new(txn_idx: TxnIndex, incarnation: Incarnation) -> Self {
        Self { txn_idx, incarnation }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.txn_idx, self.incarnation)
    }
}

/// Status of one execution attempt.
///
/// The response lives inside the `Executed` and `Validated` variants, so an
/// attempt carries a response exactly when it finished executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus<R> {
    /// Ready to execute (or currently executing).
    Pending,
    /// Finished execution, waiting for validation.
    Executed(R),
    /// Execution hit a dependency on an unfinished write and must run again.
    Aborted,
    /// Passed validation against the writes of lower-indexed transactions.
    Validated(R),
}

impl<R> TaskStatus<R> {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Executed(_) => "executed",
            TaskStatus::Aborted => "aborted",
            TaskStatus::Validated(_) => "validated",
        }
    }
}

/// One transaction's execution-attempt record.
///
/// A record is never reset in place: [`TaskState::into_retry`] consumes it and
/// returns the next attempt with a bumped incarnation.
#[derive(Debug, Clone)]
pub struct TaskState<Q, R> {
    index: TxnIndex,
    incarnation: Incarnation,
    status: TaskStatus<R>,
    request: Q,
}

impl<Q, R> TaskState<Q, R> {
    /// Creates the first attempt for a transaction.
    pub fn new(index: TxnIndex, request: Q) -> Self {
        Self {
            index,
            incarnation: 0,
            status: TaskStatus::Pending,
            request,
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

    pub fn status(&self) -> &TaskStatus<R> {
        &self.status
    }

    pub fn request(&self) -> &Q {
        &self.request
    }

    pub fn is_validated(&self) -> bool {
        matches!(self.status, TaskStatus::Validated(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, TaskStatus::Pending)
    }

    /// Returns the response of an executed or validated attempt.
    pub fn response(&self) -> Option<&R> {
        match &self.status {
            TaskStatus::Executed(r) | TaskStatus::Validated(r) => Some(r),
            _ => None,
        }
    }

    /// Records the outcome of executing this attempt.
    pub(crate) fn finish(self, outcome: ExecuteOutcome<R>) -> Self {
        let status = match outcome {
            ExecuteOutcome::Executed(response) => TaskStatus::Executed(response),
            ExecuteOutcome::Aborted { .. } => TaskStatus::Aborted,
        };
        Self { status, ..self }
    }

    /// Promotes an executed attempt to validated. Other statuses are returned unchanged.
    pub(crate) fn into_validated(self) -> Self {
        match self.status {
            TaskStatus::Executed(response) => Self {
                status: TaskStatus::Validated(response),
                ..self
            },
            status => Self { status, ..self },
        }
    }

    /// Produces the next pending attempt, dropping any response.
    pub(crate) fn into_retry(self) -> Self {
        Self {
            index: self.index,
            incarnation: self.incarnation + 1,
            status: TaskStatus::Pending,
            request: self.request,
        }
    }

    /// Takes the response out of a finished attempt.
    pub(crate) fn into_response(self) -> Option<R> {
        match self.status {
            TaskStatus::Executed(r) | TaskStatus::Validated(r) => Some(r),
            _ => None,
        }
    }
}

/// Result a transaction executor reports for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome<R> {
    /// The attempt ran to completion. Business-level failures belong in `R`.
    Executed(R),
    /// The attempt read a value that a lower transaction is still producing.
    Aborted {
        /// The transaction it depends on, if known.
        dependency: Option<TxnIndex>,
    },
}

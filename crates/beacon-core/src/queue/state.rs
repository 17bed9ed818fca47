//! Queue state machine.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::policy::DuplicatePolicy;
use super::task::Task;
use crate::domain::BatchId;
use crate::observability::QueueStats;

/// Where the queue is in its cycle.
///
/// Transitions:
/// - Idle -> Starting (task added)
/// - Starting -> Running (batch taken from pending)
/// - Running -> Debounce (batch settled)
/// - Running -> Starting (batch cancelled, no debounce)
/// - any -> Starting | Idle (driver stopped without settling, see `abandon`)
/// - Debounce -> Running (quiet period over, pending non-empty)
/// - Debounce -> Idle (quiet period over, nothing pending)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    Starting,
    Running(BatchId),
    Debounce,
}

impl Phase {
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Running(_))
    }

    pub fn is_idle(self) -> bool {
        matches!(self, Phase::Idle)
    }
}

/// What `push` did with a new task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Appended,
    Replaced,
    Dropped,
}

/// How a batch ended, for bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settle {
    Succeeded { completed: usize, failed: usize },
    Failed,
    Cancelled,
}

/// A batch handed to the driver.
pub(crate) struct StartedBatch<T> {
    pub batch_id: BatchId,
    pub tasks: Vec<Task<T>>,
    pub cancelled: oneshot::Receiver<()>,
}

/// Mutable queue state. Guarded by the queue's mutex and never held across an
/// await.
pub(crate) struct QueueState<T> {
    pending: VecDeque<Task<T>>,
    phase: Phase,
    cancel: Option<oneshot::Sender<()>>,
    stats: QueueStats,
}

impl<T> QueueState<T> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            phase: Phase::Idle,
            cancel: None,
            stats: QueueStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.pending.iter().map(|t| t.key().to_string()).collect()
    }

    /// Add a task according to `policy`.
    ///
    /// Returns what happened and whether the caller has to start a driver
    /// (the queue was idle).
    pub fn push(&mut self, task: Task<T>, policy: DuplicatePolicy) -> (Admission, bool) {
        let existing = match policy {
            DuplicatePolicy::Append => None,
            DuplicatePolicy::ReplacePending | DuplicatePolicy::KeepFirst => {
                self.pending.iter().position(|t| t.key() == task.key())
            }
        };

        let admission = match (existing, policy) {
            (Some(index), DuplicatePolicy::ReplacePending) => {
                self.pending[index].replace_work(task);
                Admission::Replaced
            }
            (Some(_), _) => Admission::Dropped,
            (None, _) => {
                self.pending.push_back(task);
                Admission::Appended
            }
        };

        let start = self.phase.is_idle() && !self.pending.is_empty();
        if start {
            self.phase = Phase::Starting;
        }
        (admission, start)
    }

    /// Remove pending tasks with `key`. Returns the removed keys.
    pub fn remove(&mut self, key: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.pending.retain(|t| {
            let keep = t.key() != key;
            if !keep {
                removed.push(t.key().to_string());
            }
            keep
        });
        removed
    }

    /// Drop every pending task. Returns the removed keys in queue order.
    pub fn flush(&mut self) -> Vec<String> {
        self.pending.drain(..).map(|t| t.key().to_string()).collect()
    }

    /// Take the next batch from the front of the queue.
    ///
    /// With nothing pending the queue goes back to `Idle` and the driver
    /// stops.
    pub fn begin_batch(&mut self, batch_size: usize) -> Option<StartedBatch<T>> {
        if self.pending.is_empty() {
            self.phase = Phase::Idle;
            return None;
        }

        let take = batch_size.min(self.pending.len());
        let tasks: Vec<Task<T>> = self.pending.drain(..take).collect();
        let batch_id = BatchId::generate();
        let (tx, rx) = oneshot::channel();

        self.phase = Phase::Running(batch_id);
        self.cancel = Some(tx);
        self.stats.batches_started += 1;

        Some(StartedBatch {
            batch_id,
            tasks,
            cancelled: rx,
        })
    }

    /// Signal the running batch to stop. Returns its id, or `None` if nothing
    /// is running.
    pub fn cancel_running(&mut self) -> Option<BatchId> {
        let Phase::Running(batch_id) = self.phase else {
            return None;
        };
        if let Some(tx) = self.cancel.take() {
            // the driver may have settled already; nothing to signal then
            let _ = tx.send(());
        }
        Some(batch_id)
    }

    /// Record the end of the running batch.
    pub fn settle(&mut self, outcome: Settle) {
        self.cancel = None;
        self.stats.last_settled_at = Some(Utc::now());
        match outcome {
            Settle::Succeeded { completed, failed } => {
                self.stats.batches_succeeded += 1;
                self.stats.tasks_completed += completed as u64;
                self.stats.tasks_failed += failed as u64;
                self.phase = Phase::Debounce;
            }
            Settle::Failed => {
                self.stats.batches_failed += 1;
                self.phase = Phase::Debounce;
            }
            Settle::Cancelled => {
                self.stats.batches_cancelled += 1;
                self.phase = Phase::Starting;
            }
        }
    }

    /// The driver stopped without settling its cycle.
    ///
    /// A running batch is counted as failed. Returns `true` when tasks are
    /// still pending; the phase is then `Starting` and a new driver is due.
    pub fn abandon(&mut self) -> bool {
        self.cancel = None;
        if self.phase.is_running() {
            self.stats.batches_failed += 1;
            self.stats.last_settled_at = Some(Utc::now());
        }
        let restart = !self.pending.is_empty();
        self.phase = if restart { Phase::Starting } else { Phase::Idle };
        restart
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            phase: self.phase,
            pending: self.pending.len(),
            ..self.stats.clone()
        }
    }
}

//! Batching task queue.
//!
//! `TaskQueue` collects keyed async tasks and runs them in batches of at most
//! `batch_size`, with a quiet period between one batch settling and the next
//! one starting. Results are broadcast on a shared stream keyed by task key, so
//! any number of callers can wait for the same key.
//!
//! Rules the queue keeps:
//! - Batches run strictly one after another; tasks inside a batch run
//!   concurrently.
//! - Nothing is replayed. Subscribe before the task can run (see
//!   [`TaskQueue::enqueue_and_wait`]).
//! - A failing task never stops the queue; what gets lost depends on the
//!   [`FailurePolicy`].

mod batch;
mod config;
mod event;
mod policy;
mod state;
mod task;

pub use config::QueueConfig;
pub use event::{QueueEvent, WaitError, wait_for_key};
pub use policy::{DuplicatePolicy, FailurePolicy};
pub use state::{Admission, Phase};
pub use task::{Task, TaskError, TaskPanicked};

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use self::batch::BatchOutcome;
use self::state::{QueueState, Settle};
use crate::domain::BatchId;
use crate::error::BeaconError;
use crate::observability::QueueStats;

struct Inner<T> {
    config: QueueConfig,
    state: Mutex<QueueState<T>>,
    events: broadcast::Sender<QueueEvent<T>>,
    runtime: Handle,
}

/// Generic batching queue. Cheap to clone; clones share the same queue.
pub struct TaskQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> TaskQueue<T> {
    /// Create a queue driven by the current tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, BeaconError> {
        let runtime = Handle::try_current().map_err(|_| BeaconError::NoRuntime)?;
        Self::with_runtime(config, runtime)
    }

    pub fn with_runtime(config: QueueConfig, runtime: Handle) -> Result<Self, BeaconError> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(QueueState::new()),
                events,
                runtime,
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Queue `work` under `key`.
    ///
    /// Never fails: errors from `work` only show up on the result stream. When
    /// the queue is idle a batch starts right away.
    pub fn add_task<F, Fut, E>(&self, key: impl Into<String>, work: F) -> Admission
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        self.push(Task::new(key, work))
    }

    /// Queue an already built task.
    pub fn push(&self, task: Task<T>) -> Admission {
        let key = task.key().to_string();
        let (admission, start) = {
            let mut state = self.inner.state.lock();
            state.push(task, self.inner.config.duplicate_policy)
        };
        debug!(key = %key, ?admission, "task queued");

        if start {
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(drive(inner));
        }
        admission
    }

    /// Subscribe, queue the task, and return a future for its result.
    ///
    /// The subscription exists before the task is queued, so the result cannot
    /// be missed even if the batch settles before the future is first polled.
    pub fn enqueue_and_wait<F, Fut, E>(
        &self,
        key: impl Into<String>,
        work: F,
    ) -> impl Future<Output = Result<T, WaitError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let key = key.into();
        let mut rx = self.subscribe();
        self.add_task(key.clone(), work);
        async move { wait_for_key(&mut rx, &key).await }
    }

    /// Future for the next event that settles `key`. Subscribes immediately.
    pub fn result_for(
        &self,
        key: impl Into<String>,
    ) -> impl Future<Output = Result<T, WaitError>> + Send + 'static {
        let key = key.into();
        let mut rx = self.subscribe();
        async move { wait_for_key(&mut rx, &key).await }
    }

    /// Remove pending tasks with `key`. Running batches are not touched.
    ///
    /// Waiters on `key` are released with a `Removed` event.
    pub fn remove_task(&self, key: &str) -> usize {
        let removed = self.inner.state.lock().remove(key);
        if !removed.is_empty() {
            debug!(key, removed = removed.len(), "pending task removed");
        }
        self.release_removed(removed)
    }

    /// Remove every pending task. Running batches are not touched.
    pub fn flush_tasks(&self) -> usize {
        let removed = self.inner.state.lock().flush();
        if !removed.is_empty() {
            debug!(removed = removed.len(), "pending tasks flushed");
        }
        self.release_removed(removed)
    }

    fn release_removed(&self, mut keys: Vec<String>) -> usize {
        let count = keys.len();
        if count > 0 {
            keys.dedup();
            publish(&self.inner, QueueEvent::Removed { keys });
        }
        count
    }

    /// Stop waiting for the running batch.
    ///
    /// Its results are discarded (a `BatchCancelled` event is published
    /// instead) and the next batch starts without a quiet period. Work that
    /// already reached the network is abandoned, not undone.
    pub fn cancel_running(&self) {
        if let Some(batch_id) = self.inner.state.lock().cancel_running() {
            info!(%batch_id, "cancelling running batch");
        }
    }

    /// `flush_tasks` followed by `cancel_running`.
    pub fn cancel_all(&self) {
        self.flush_tasks();
        self.cancel_running();
    }

    /// Subscribe to the result stream. Only events published from now on are
    /// delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent<T>> {
        self.inner.events.subscribe()
    }

    pub fn phase(&self) -> Phase {
        self.inner.state.lock().phase()
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.inner.state.lock().pending_keys()
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.state.lock().stats()
    }
}

/// Runs batches until nothing is pending, then exits. Spawned when a task is
/// added to an idle queue.
async fn drive<T: Clone + Send + 'static>(inner: Arc<Inner<T>>) {
    let mut guard = DriverGuard {
        inner: Arc::clone(&inner),
        batch: None,
        finished: false,
    };

    loop {
        let Some(started) = inner.state.lock().begin_batch(inner.config.batch_size) else {
            guard.finished = true;
            debug!("queue drained");
            return;
        };

        let batch_id = started.batch_id;
        let keys: Vec<String> = started.tasks.iter().map(|t| t.key().to_string()).collect();
        debug!(%batch_id, batch_size = keys.len(), ?keys, "batch started");
        guard.batch = Some((batch_id, keys.clone()));

        let outcome = tokio::select! {
            outcome = batch::execute(started.tasks, inner.config.failure_policy) => Some(outcome),
            _ = started.cancelled => None,
        };
        guard.batch = None;

        let Some(outcome) = outcome else {
            inner.state.lock().settle(Settle::Cancelled);
            publish(&inner, QueueEvent::BatchCancelled { batch_id, keys });
            // straight to the next batch
            continue;
        };

        match outcome {
            BatchOutcome::Settled(results) => {
                let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                let completed = results.len() - failed;
                inner.state.lock().settle(Settle::Succeeded { completed, failed });
                debug!(%batch_id, completed, failed, "batch settled");

                for (key, result) in results {
                    let event = match result {
                        Ok(value) => QueueEvent::Completed { key, value },
                        Err(error) => {
                            warn!(%batch_id, key = %key, %error, "task failed");
                            QueueEvent::TaskFailed { key, error }
                        }
                    };
                    publish(&inner, event);
                }
            }
            BatchOutcome::Failed { key, error } => {
                inner.state.lock().settle(Settle::Failed);
                warn!(%batch_id, key = %key, %error, "batch failed, results dropped");
                publish(
                    &inner,
                    QueueEvent::BatchFailed {
                        batch_id,
                        keys,
                        error,
                    },
                );
            }
        }

        tokio::time::sleep(inner.config.quiet_period()).await;
    }
}

/// Puts the queue back in a startable state if `drive` stops before draining
/// (panic or runtime shutdown). Waiters of the batch in flight get
/// `BatchCancelled`.
struct DriverGuard<T: Clone + Send + 'static> {
    inner: Arc<Inner<T>>,
    batch: Option<(BatchId, Vec<String>)>,
    finished: bool,
}

impl<T: Clone + Send + 'static> Drop for DriverGuard<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let restart = self.inner.state.lock().abandon();
        warn!(restart, "queue driver stopped before draining");
        if let Some((batch_id, keys)) = self.batch.take() {
            publish(&self.inner, QueueEvent::BatchCancelled { batch_id, keys });
        }
        if restart {
            self.inner.runtime.spawn(drive(Arc::clone(&self.inner)));
        }
    }
}

fn publish<T>(inner: &Inner<T>, event: QueueEvent<T>) {
    // no subscribers is fine: results are not kept
    let _ = inner.events.send(event);
}

//! Result stream events and keyed waiting.

use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use super::task::TaskError;
use crate::domain::BatchId;

/// Event published on a queue's result stream.
///
/// The stream is broadcast-only: a subscriber only sees events published
/// after it subscribed.
#[derive(Debug, Clone)]
pub enum QueueEvent<T> {
    /// A task finished successfully.
    Completed { key: String, value: T },

    /// A task failed under `FailurePolicy::IsolateTasks`.
    TaskFailed { key: String, error: TaskError },

    /// A task failed under `FailurePolicy::FailBatch`; nothing from the batch
    /// was published. `keys` lists every task of the batch.
    BatchFailed {
        batch_id: BatchId,
        keys: Vec<String>,
        error: TaskError,
    },

    /// `cancel_running` discarded the batch.
    BatchCancelled { batch_id: BatchId, keys: Vec<String> },

    /// `remove_task` / `flush_tasks` dropped these pending keys.
    Removed { keys: Vec<String> },
}

impl<T> QueueEvent<T> {
    /// Whether this event settles the wait for `key`.
    pub fn concerns(&self, key: &str) -> bool {
        match self {
            QueueEvent::Completed { key: k, .. } | QueueEvent::TaskFailed { key: k, .. } => k == key,
            QueueEvent::BatchFailed { keys, .. }
            | QueueEvent::BatchCancelled { keys, .. }
            | QueueEvent::Removed { keys } => keys.iter().any(|k| k == key),
        }
    }

    /// Resolve the wait for `key`, or `None` if the event is about other keys.
    pub fn resolve(self, key: &str) -> Option<Result<T, WaitError>> {
        if !self.concerns(key) {
            return None;
        }
        let key = key.to_string();
        Some(match self {
            QueueEvent::Completed { value, .. } => Ok(value),
            QueueEvent::TaskFailed { error, .. } => Err(WaitError::TaskFailed { key, error }),
            QueueEvent::BatchFailed {
                batch_id, error, ..
            } => Err(WaitError::BatchFailed {
                key,
                batch_id,
                error,
            }),
            QueueEvent::BatchCancelled { batch_id, .. } => {
                Err(WaitError::Cancelled { key, batch_id })
            }
            QueueEvent::Removed { .. } => Err(WaitError::Removed { key }),
        })
    }
}

#[derive(Debug, Clone, Error)]
pub enum WaitError {
    #[error("task `{key}` failed: {error}")]
    TaskFailed {
        key: String,
        #[source]
        error: TaskError,
    },

    #[error("batch {batch_id} failed before `{key}` produced a result: {error}")]
    BatchFailed {
        key: String,
        batch_id: BatchId,
        #[source]
        error: TaskError,
    },

    #[error("batch {batch_id} was cancelled before `{key}` produced a result")]
    Cancelled { key: String, batch_id: BatchId },

    #[error("`{key}` was removed from the queue before it ran")]
    Removed { key: String },

    #[error("missed {skipped} events while waiting for `{key}`; its result may be lost")]
    Lagged { key: String, skipped: u64 },

    #[error("result stream closed while waiting for `{key}`")]
    Closed { key: String },
}

impl WaitError {
    pub fn key(&self) -> &str {
        match self {
            WaitError::TaskFailed { key, .. }
            | WaitError::BatchFailed { key, .. }
            | WaitError::Cancelled { key, .. }
            | WaitError::Removed { key }
            | WaitError::Lagged { key, .. }
            | WaitError::Closed { key } => key,
        }
    }

    /// The underlying task error, if a task actually failed.
    pub fn task_error(&self) -> Option<&TaskError> {
        match self {
            WaitError::TaskFailed { error, .. } | WaitError::BatchFailed { error, .. } => {
                Some(error)
            }
            WaitError::Cancelled { .. }
            | WaitError::Removed { .. }
            | WaitError::Lagged { .. }
            | WaitError::Closed { .. } => None,
        }
    }
}

/// Wait for the first event that settles `key` (filter + take one).
///
/// Events for other keys are skipped. A receiver that falls more than the
/// stream capacity behind gives up with `WaitError::Lagged`: the dropped
/// events may have held its result, and nothing is replayed.
pub async fn wait_for_key<T: Clone>(
    rx: &mut broadcast::Receiver<QueueEvent<T>>,
    key: &str,
) -> Result<T, WaitError> {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(result) = event.resolve(key) {
                    return result;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(key, skipped, "result subscriber lagged behind the queue");
                return Err(WaitError::Lagged {
                    key: key.to_string(),
                    skipped,
                });
            }
            Err(RecvError::Closed) => {
                return Err(WaitError::Closed {
                    key: key.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    fn boom() -> TaskError {
        Arc::new(io::Error::other("boom"))
    }

    #[test]
    fn completed_resolves_only_its_key() {
        let event = QueueEvent::Completed {
            key: "a".to_string(),
            value: 1,
        };
        assert!(event.clone().resolve("b").is_none());
        assert_eq!(event.resolve("a").unwrap().unwrap(), 1);
    }

    #[test]
    fn batch_failure_resolves_every_member() {
        let batch_id = BatchId::generate();
        let event: QueueEvent<i32> = QueueEvent::BatchFailed {
            batch_id,
            keys: vec!["a".into(), "b".into()],
            error: boom(),
        };

        for key in ["a", "b"] {
            let err = event.clone().resolve(key).unwrap().unwrap_err();
            assert_eq!(err.key(), key);
            assert!(err.to_string().contains("boom"));
        }
        assert!(event.resolve("c").is_none());
    }

    #[tokio::test]
    async fn wait_skips_other_keys() {
        let (tx, mut rx) = broadcast::channel(8);
        tx.send(QueueEvent::Completed {
            key: "other".to_string(),
            value: 1,
        })
        .unwrap();
        tx.send(QueueEvent::Completed {
            key: "mine".to_string(),
            value: 2,
        })
        .unwrap();

        assert_eq!(wait_for_key(&mut rx, "mine").await.unwrap(), 2);
    }

    #[test]
    fn removal_resolves_every_removed_key() {
        let event: QueueEvent<i32> = QueueEvent::Removed {
            keys: vec!["a".into(), "b".into()],
        };
        assert!(matches!(
            event.clone().resolve("b"),
            Some(Err(WaitError::Removed { key })) if key == "b"
        ));
        assert!(event.resolve("c").is_none());
    }

    #[tokio::test]
    async fn lagging_waiter_gives_up() {
        let (tx, mut rx) = broadcast::channel(2);
        for n in 0..3 {
            tx.send(QueueEvent::Completed {
                key: format!("other-{n}"),
                value: n,
            })
            .unwrap();
        }

        let err = wait_for_key(&mut rx, "mine").await.unwrap_err();
        assert!(matches!(
            err,
            WaitError::Lagged { ref key, skipped: 1 } if key == "mine"
        ));
    }

    #[tokio::test]
    async fn wait_reports_closed_stream() {
        let (tx, mut rx) = broadcast::channel::<QueueEvent<i32>>(8);
        drop(tx);

        let err = wait_for_key(&mut rx, "mine").await.unwrap_err();
        assert!(matches!(err, WaitError::Closed { key } if key == "mine"));
    }

    #[tokio::test]
    async fn isolated_failure_keeps_the_source_error() {
        let (tx, mut rx) = broadcast::channel::<QueueEvent<i32>>(8);
        tx.send(QueueEvent::TaskFailed {
            key: "mine".to_string(),
            error: boom(),
        })
        .unwrap();

        let err = wait_for_key(&mut rx, "mine").await.unwrap_err();
        let source = err.task_error().unwrap();
        assert!(source.downcast_ref::<io::Error>().is_some());
    }
}

//! Queued unit of work.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

/// Error produced by a task's work.
///
/// Shared so that one failure can be handed to every subscriber of the result
/// stream. Use `downcast_ref` to recover the concrete error type.
pub type TaskError = Arc<dyn Error + Send + Sync + 'static>;

/// A task's work panicked. Reported like any other task failure.
#[derive(Debug, Error)]
#[error("task `{key}` panicked: {message}")]
pub struct TaskPanicked {
    pub key: String,
    pub message: String,
}

impl TaskPanicked {
    pub(crate) fn new(key: &str, payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&'static str>()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "non-string panic payload".to_string()),
        };
        Self {
            key: key.to_string(),
            message,
        }
    }
}

type Work<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, TaskError>> + Send>;

/// A keyed, not-yet-started async operation.
///
/// The work is a closure so nothing runs until the task's batch starts.
pub struct Task<T> {
    key: String,
    work: Work<T>,
}

impl<T: Send + 'static> Task<T> {
    pub fn new<F, Fut, E>(key: impl Into<String>, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let work: Work<T> = Box::new(move || {
            async move {
                work().await.map_err(|e| {
                    let boxed: Box<dyn Error + Send + Sync> = e.into();
                    TaskError::from(boxed)
                })
            }
            .boxed()
        });
        Self {
            key: key.into(),
            work,
        }
    }
}

impl<T> Task<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Split into key and the started future.
    pub(crate) fn start(self) -> (String, BoxFuture<'static, Result<T, TaskError>>) {
        let future = (self.work)();
        (self.key, future)
    }

    pub(crate) fn replace_work(&mut self, other: Task<T>) {
        self.work = other.work;
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("key", &self.key).finish_non_exhaustive()
    }
}

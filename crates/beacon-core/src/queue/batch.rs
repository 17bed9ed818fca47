//! Concurrent execution of one batch.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};

use super::policy::FailurePolicy;
use super::task::{Task, TaskError, TaskPanicked};

/// Result of running a batch to completion.
pub(crate) enum BatchOutcome<T> {
    /// Per-task results in settle order. Under `FailBatch` every entry is `Ok`.
    Settled(Vec<(String, Result<T, TaskError>)>),

    /// `FailBatch` only: `key` failed first and the rest were dropped.
    Failed { key: String, error: TaskError },
}

/// Start every task of the batch at once and wait for them to settle.
///
/// Under `FailBatch` the first error settles the batch and drops the futures
/// still in flight. A panicking task counts as a failed one.
pub(crate) async fn execute<T>(tasks: Vec<Task<T>>, policy: FailurePolicy) -> BatchOutcome<T> {
    let total = tasks.len();
    let mut in_flight: FuturesUnordered<_> = tasks
        .into_iter()
        .map(|task| {
            let key = task.key().to_string();
            // the work closure itself runs inside catch_unwind too
            let run = async move {
                let (_, future) = task.start();
                future.await
            };
            async move {
                let result = AssertUnwindSafe(run)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(Arc::new(TaskPanicked::new(&key, payload)) as TaskError)
                    });
                (key, result)
            }
        })
        .collect();

    let mut settled = Vec::with_capacity(total);
    while let Some((key, result)) = in_flight.next().await {
        match (result, policy) {
            (Err(error), FailurePolicy::FailBatch) => {
                return BatchOutcome::Failed { key, error };
            }
            (result, _) => settled.push((key, result)),
        }
    }
    BatchOutcome::Settled(settled)
}

//! Queue policies: duplicate keys and failure blast radius.

use serde::{Deserialize, Serialize};

/// What `add_task` does when a task with the same key is already pending.
///
/// Only *pending* tasks are considered. A key whose task is already running
/// can always be added again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every task, even with the same key.
    Append,

    /// One pending task per key. The newest work replaces the pending one and
    /// keeps its place in line.
    #[default]
    ReplacePending,

    /// One pending task per key. Later adds are dropped.
    KeepFirst,
}

/// How a failing task affects the rest of its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failure settles the batch: no results are published for it,
    /// only one `BatchFailed` event.
    #[default]
    FailBatch,

    /// Every task settles on its own and publishes `Completed` or `TaskFailed`.
    IsolateTasks,
}

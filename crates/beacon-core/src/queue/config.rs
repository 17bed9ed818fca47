//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::policy::{DuplicatePolicy, FailurePolicy};
use crate::error::BeaconError;

/// Configuration for a `TaskQueue`.
///
/// `quiet_period_ms` and `batch_size` together bound the call rate: at most
/// `batch_size` tasks run at once, and after a batch settles the queue waits
/// `quiet_period_ms` before it looks at the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub quiet_period_ms: u64,
    pub batch_size: usize,
    /// Buffer of the broadcast result stream. Must hold at least one full
    /// batch of events. A waiter that falls further behind fails with
    /// `WaitError::Lagged`.
    pub event_capacity: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub failure_policy: FailurePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 1_000,
            batch_size: 5,
            event_capacity: 256,
            duplicate_policy: DuplicatePolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl QueueConfig {
    pub fn new(quiet_period: Duration, batch_size: usize) -> Self {
        Self {
            quiet_period_ms: u64::try_from(quiet_period.as_millis()).unwrap_or(u64::MAX),
            batch_size,
            ..Self::default()
        }
    }

    /// Settings used for report assessment: failures stay with the report that
    /// caused them.
    pub fn for_ai_requests() -> Self {
        Self {
            failure_policy: FailurePolicy::IsolateTasks,
            ..Self::default()
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn validate(&self) -> Result<(), BeaconError> {
        if self.batch_size == 0 {
            return Err(BeaconError::InvalidConfig(
                "queue.batch_size must be at least 1".to_string(),
            ));
        }
        if self.event_capacity < self.batch_size {
            return Err(BeaconError::InvalidConfig(format!(
                "queue.event_capacity ({}) must be at least queue.batch_size ({})",
                self.event_capacity, self.batch_size
            )));
        }
        Ok(())
    }
}

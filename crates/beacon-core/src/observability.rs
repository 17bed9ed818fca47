use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::queue::Phase;

/// Point-in-time view of a `TaskQueue`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub phase: Phase,
    pub pending: usize,
    pub batches_started: u64,
    pub batches_succeeded: u64,
    pub batches_failed: u64,
    pub batches_cancelled: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub last_settled_at: Option<DateTime<Utc>>,
}

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

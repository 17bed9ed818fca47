//! Live feature flag cell.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::features::FeatureConfig;

/// Shared, live-updatable `FeatureConfig`.
///
/// Clones share the same value. Readers take a snapshot with `current()` at
/// the moment they need the flags; `subscribe()` gives a receiver that is
/// notified on every change.
#[derive(Debug, Clone)]
pub struct FeatureConfigCell {
    tx: Arc<watch::Sender<FeatureConfig>>,
}

impl FeatureConfigCell {
    pub fn new(initial: FeatureConfig) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> FeatureConfig {
        self.tx.borrow().clone()
    }

    /// Replace the flags. Subscribers are only notified if something changed.
    pub fn replace(&self, flags: FeatureConfig) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == flags {
                return false;
            }
            *current = flags;
            true
        });
        if changed {
            info!(flags = ?self.current(), "feature flags updated");
        }
        changed
    }

    /// Change the flags in place.
    pub fn update(&self, f: impl FnOnce(&mut FeatureConfig)) -> bool {
        let mut next = self.current();
        f(&mut next);
        self.replace(next)
    }

    pub fn subscribe(&self) -> watch::Receiver<FeatureConfig> {
        self.tx.subscribe()
    }
}

impl Default for FeatureConfigCell {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

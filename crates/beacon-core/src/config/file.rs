//! File-backed configuration and live reload of feature flags.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::cell::FeatureConfigCell;
use super::features::FeatureConfig;
use crate::error::BeaconError;
use crate::impls::GeminiConfig;
use crate::queue::QueueConfig;

/// Top-level configuration file.
///
/// ```toml
/// [queue]
/// quiet_period_ms = 1000
/// batch_size = 5
///
/// [gemini]
/// model = "gemini-1.5-flash"
///
/// [features]
/// enableAISummary = true
/// summaryGenerationIncludeReportLogs = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    pub queue: QueueConfig,
    pub gemini: GeminiConfig,
    pub features: FeatureConfig,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::for_ai_requests(),
            gemini: GeminiConfig::default(),
            features: FeatureConfig::default(),
        }
    }
}

impl BeaconConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, BeaconError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| BeaconError::InvalidConfig(e.to_string()))?;
        config.queue.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, BeaconError> {
        let path = path.as_ref();
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BeaconError::ConfigLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_toml_str(&source).map_err(|e| BeaconError::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Poll `path` every `interval` and push changed feature flags into `cell`.
///
/// Only the `[features]` table is live; queue and model settings need a
/// restart. A file that fails to parse is logged and the current flags stay.
pub fn spawn_feature_reloader(
    path: PathBuf,
    cell: FeatureConfigCell,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_modified = modified_at(&path).await;
        loop {
            tokio::time::sleep(interval).await;

            let modified = modified_at(&path).await;
            if modified.is_none() || modified == last_modified {
                continue;
            }
            last_modified = modified;

            match BeaconConfig::load(&path).await {
                Ok(config) => {
                    if !cell.replace(config.features) {
                        debug!(path = %path.display(), "config changed, flags unchanged");
                    }
                }
                Err(e) => warn!(path = %path.display(), error = %e, "config reload failed"),
            }
        }
    })
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::FailurePolicy;

    #[test]
    fn empty_file_gives_defaults() {
        let config = BeaconConfig::from_toml_str("").unwrap();
        assert_eq!(config, BeaconConfig::default());
        assert_eq!(config.queue.failure_policy, FailurePolicy::IsolateTasks);
    }

    #[test]
    fn reads_all_sections() {
        let config = BeaconConfig::from_toml_str(
            r#"
            [queue]
            quiet_period_ms = 250
            batch_size = 2
            duplicate_policy = "append"

            [gemini]
            model = "gemini-test"

            [features]
            enableAISummary = true
            summaryGenerationIncludeComments = false
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.batch_size, 2);
        assert_eq!(config.queue.quiet_period(), Duration::from_millis(250));
        assert_eq!(config.gemini.model, "gemini-test");
        assert!(config.features.enable_ai_summary);
        assert!(!config.features.summary_generation_include_comments);
    }

    #[test]
    fn invalid_queue_settings_are_rejected() {
        let err = BeaconConfig::from_toml_str("[queue]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, BeaconError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn missing_file_reports_its_path() {
        let err = BeaconConfig::load("/definitely/not/here.toml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }

    #[tokio::test]
    async fn reloader_pushes_new_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.toml");
        std::fs::write(&path, "[features]\nenableAISummary = false\n").unwrap();

        let cell = FeatureConfigCell::default();
        let mut rx = cell.subscribe();
        let handle =
            spawn_feature_reloader(path.clone(), cell.clone(), Duration::from_millis(20));

        // make sure the new mtime differs from the first one
        tokio::time::sleep(Duration::from_millis(50)).await;
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        std::fs::write(&path, "[features]\nenableAISummary = true\n").unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();

        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(cell.current().enable_ai_summary);
        handle.abort();
    }
}

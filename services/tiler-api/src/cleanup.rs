//! Run retention background task.
//!
//! Removes run directories older than the configured retention period.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use tokio::time::{interval, Duration as TokioDuration};
use tracing::{error, info};

use crate::metrics::record_purge;
use crate::state::AppState;

/// Configuration for the cleanup task.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Whether cleanup is enabled
    pub enabled: bool,
    /// How often to run cleanup (in seconds)
    pub interval_secs: u64,
    /// Age after which a run is removed (in hours)
    pub retention_hours: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            retention_hours: 24,
        }
    }
}

impl CleanupConfig {
    /// Load cleanup configuration from the environment, falling back to
    /// `retention_hours` from the pipeline config.
    pub fn from_env(retention_hours: u64) -> Self {
        let enabled = std::env::var("ENABLE_CLEANUP")
            .ok()
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true);

        let interval_secs = std::env::var("CLEANUP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let retention_hours = std::env::var("RUN_RETENTION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(retention_hours);

        Self {
            enabled,
            interval_secs,
            retention_hours,
        }
    }
}

/// Background cleanup task.
pub struct CleanupTask {
    state: Arc<AppState>,
    config: CleanupConfig,
}

impl CleanupTask {
    pub fn new(state: Arc<AppState>, config: CleanupConfig) -> Self {
        Self { state, config }
    }

    /// Run one cleanup cycle. Returns the number of runs removed.
    pub async fn run_once(&self) -> Result<usize> {
        let state = self.state.clone();
        let age = Duration::hours(self.config.retention_hours as i64);

        let removed = tokio::task::spawn_blocking(move || state.store().purge_older_than(age))
            .await
            .context("Cleanup task panicked")??;

        record_purge(removed);
        info!(
            removed,
            retention_hours = self.config.retention_hours,
            "Cleanup cycle complete"
        );
        Ok(removed)
    }

    /// Run the cleanup task in a loop.
    pub async fn run_forever(self) {
        if !self.config.enabled {
            info!("Cleanup task disabled");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            retention_hours = self.config.retention_hours,
            "Starting cleanup background task"
        );

        // The first tick completes immediately.
        let mut ticker = interval(TokioDuration::from_secs(self.config.interval_secs.max(1)));
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Cleanup cycle failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiling::TilingConfig;

    #[tokio::test]
    async fn test_run_once_keeps_fresh_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = TilingConfig {
            output_root: dir.path().to_path_buf(),
            ..TilingConfig::default()
        };
        let state = Arc::new(AppState::new(config, "", 1024));
        let (run_id, _) = state.store().create_run().unwrap();

        let task = CleanupTask::new(state.clone(), CleanupConfig::default());
        assert_eq!(task.run_once().await.unwrap(), 0);
        assert!(state.store().run_dir(&run_id).exists());

        let expire_all = CleanupConfig {
            retention_hours: 0,
            ..CleanupConfig::default()
        };
        // A zero retention still needs the run to be strictly older than now.
        std::thread::sleep(std::time::Duration::from_millis(20));
        let task = CleanupTask::new(state.clone(), expire_all);
        assert_eq!(task.run_once().await.unwrap(), 1);
        assert!(!state.store().run_dir(&run_id).exists());
    }
}

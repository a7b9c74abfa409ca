//! Scheduled task manager
//!
//! Owns the background refresh task:
//! - one refresh right away when the cache is empty at startup
//! - one refresh every day at a fixed UTC time
//!
//! A failed run is logged and left alone; the next daily run is the retry.

use super::imdb::{RatingsUpdater, RefreshOutcome};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// UTC hour of the daily refresh (0-23)
    pub refresh_hour: u32,

    /// UTC minute of the daily refresh (0-59)
    pub refresh_minute: u32,

    /// Refresh immediately when the cache is empty at startup
    pub refresh_on_startup: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            refresh_hour: 2,
            refresh_minute: 0,
            refresh_on_startup: true,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    updater: Arc<RatingsUpdater>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduledTaskConfig, updater: Arc<RatingsUpdater>) -> Self {
        Self {
            config,
            updater,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        let refresh_handle = self.start_refresh_task();
        self.task_handles.push(refresh_handle);

        tracing::info!(
            "Started {} scheduled tasks (dataset refresh daily at {:02}:{:02} UTC)",
            self.task_handles.len(),
            self.config.refresh_hour,
            self.config.refresh_minute
        );
    }

    fn start_refresh_task(&self) -> JoinHandle<()> {
        let updater = self.updater.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            if config.refresh_on_startup {
                Self::initial_refresh(&updater).await;
            }

            Self::refresh_loop(updater, config.refresh_hour, config.refresh_minute).await;
        })
    }

    /// Refresh once if nothing is loaded yet
    async fn initial_refresh(updater: &Arc<RatingsUpdater>) {
        if updater.store().is_loaded().await {
            tracing::info!("Cache already loaded, skipping startup refresh");
            return;
        }

        tracing::info!(
            "No data loaded, starting initial dataset download (this can take several minutes)..."
        );
        Self::run_refresh(updater).await;
    }

    /// Daily refresh loop
    async fn refresh_loop(updater: Arc<RatingsUpdater>, hour: u32, minute: u32) {
        loop {
            let now = Utc::now();
            let next_trigger = Self::calculate_next_refresh_time(now, hour, minute);
            let sleep_duration = (next_trigger - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));

            tracing::info!(
                "Next dataset refresh at: {} (in {:.1} hours)",
                next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                sleep_duration.as_secs_f64() / 3600.0
            );

            tokio::time::sleep(sleep_duration).await;

            tracing::info!("Running scheduled refresh of IMDb datasets");
            Self::run_refresh(&updater).await;
        }
    }

    async fn run_refresh(updater: &Arc<RatingsUpdater>) {
        match updater.refresh().await {
            Ok(RefreshOutcome::Completed(_)) => {}
            Ok(RefreshOutcome::AlreadyRunning) => {
                tracing::warn!("Skipped refresh: previous cycle still running");
            }
            Err(e) => {
                tracing::error!(
                    "Dataset refresh failed, will try again at the next scheduled time: {}",
                    e
                );
            }
        }
    }

    /// Next `hour:minute` UTC strictly after `now`
    fn calculate_next_refresh_time(now: DateTime<Utc>, hour: u32, minute: u32) -> DateTime<Utc> {
        let Some(target) = NaiveTime::from_hms_opt(hour, minute, 0) else {
            return now + ChronoDuration::days(1);
        };

        let today = now.date_naive().and_time(target).and_utc();
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}

//! IMDb dataset updater
//!
//! Runs one refresh cycle: fetch → parse ratings, fetch → parse episodes,
//! then publish both mappings together. Any failure aborts the cycle and
//! leaves the published snapshot alone. At most one cycle runs at a time.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use super::cache::CacheStore;
use super::fetcher::{DatasetDescriptor, DatasetSource, FetchError, LineStream};
use super::parser::{parse_episodes, parse_ratings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Ratings,
    Episodes,
}

/// Where the updater currently is in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "dataset", rename_all = "snake_case")]
pub enum RefreshState {
    Idle,
    Fetching(DatasetKind),
    Parsing(DatasetKind),
    Publishing,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error("fetching {dataset} failed: {source}")]
    Fetch {
        dataset: String,
        #[source]
        source: FetchError,
    },

    #[error("reading {dataset} failed: {source}")]
    Read {
        dataset: String,
        #[source]
        source: io::Error,
    },
}

/// Summary of one finished cycle, successful or not
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub ratings_count: Option<usize>,
    pub episodes_count: Option<usize>,
    /// Set when the cycle was aborted
    pub error: Option<String>,
}

impl RefreshReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub last_report: Option<RefreshReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Completed(RefreshReport),
    /// Another cycle was in progress; nothing was done
    AlreadyRunning,
}

/// Clears the running flag when the cycle ends, even if its future is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the refresh state machine and the single-flight guard
pub struct RatingsUpdater {
    source: Arc<dyn DatasetSource>,
    store: Arc<CacheStore>,
    ratings_dataset: DatasetDescriptor,
    episodes_dataset: DatasetDescriptor,
    running: AtomicBool,
    status: watch::Sender<RefreshStatus>,
}

impl RatingsUpdater {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        store: Arc<CacheStore>,
        ratings_dataset: DatasetDescriptor,
        episodes_dataset: DatasetDescriptor,
    ) -> Self {
        let (status, _) = watch::channel(RefreshStatus {
            state: RefreshState::Idle,
            last_report: None,
        });

        Self {
            source,
            store,
            ratings_dataset,
            episodes_dataset,
            running: AtomicBool::new(false),
            status,
        }
    }

    pub fn store(&self) -> Arc<CacheStore> {
        self.store.clone()
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.borrow().clone()
    }

    /// Watch state changes and finished cycles
    pub fn subscribe(&self) -> watch::Receiver<RefreshStatus> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one full refresh cycle unless one is already running.
    ///
    /// On error the cache is untouched and the failure is also recorded in
    /// [`RefreshStatus::last_report`].
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::info!("Refresh already in progress, ignoring trigger");
            return Ok(RefreshOutcome::AlreadyRunning);
        };

        tracing::info!("Starting IMDb dataset refresh...");
        let started_at = Utc::now();
        let timer = Instant::now();

        let result = self.run_cycle().await;

        let mut report = RefreshReport {
            started_at,
            finished_at: Utc::now(),
            duration_seconds: timer.elapsed().as_secs_f64(),
            ratings_count: None,
            episodes_count: None,
            error: None,
        };
        match &result {
            Ok((ratings, episodes)) => {
                report.ratings_count = Some(*ratings);
                report.episodes_count = Some(*episodes);
                tracing::info!(
                    "✓ Refresh completed in {:.1}s: {} ratings, {} episodes",
                    report.duration_seconds,
                    ratings,
                    episodes
                );
            }
            Err(e) => {
                report.error = Some(e.to_string());
                tracing::error!(
                    "✗ Refresh failed after {:.1}s, keeping previous cache: {}",
                    report.duration_seconds,
                    e
                );
            }
        }

        self.status.send_modify(|status| {
            status.state = RefreshState::Idle;
            status.last_report = Some(report.clone());
        });

        result.map(|_| RefreshOutcome::Completed(report))
    }

    async fn run_cycle(&self) -> Result<(usize, usize), RefreshError> {
        // Ratings are fully parsed (and their staging file gone) before the
        // episodes download starts.
        self.set_state(RefreshState::Fetching(DatasetKind::Ratings));
        let lines = self.fetch(&self.ratings_dataset).await?;
        self.set_state(RefreshState::Parsing(DatasetKind::Ratings));
        let ratings = parse_ratings(lines)
            .await
            .map_err(|source| read_error(&self.ratings_dataset, source))?;

        self.set_state(RefreshState::Fetching(DatasetKind::Episodes));
        let lines = self.fetch(&self.episodes_dataset).await?;
        self.set_state(RefreshState::Parsing(DatasetKind::Episodes));
        let episodes = parse_episodes(lines)
            .await
            .map_err(|source| read_error(&self.episodes_dataset, source))?;

        self.set_state(RefreshState::Publishing);
        let snapshot = self.store.publish(ratings, episodes, Utc::now()).await;

        Ok((snapshot.ratings_count, snapshot.episodes_count))
    }

    async fn fetch(&self, dataset: &DatasetDescriptor) -> Result<LineStream, RefreshError> {
        self.source
            .fetch(dataset)
            .await
            .map_err(|source| RefreshError::Fetch {
                dataset: dataset.name.clone(),
                source,
            })
    }

    fn set_state(&self, state: RefreshState) {
        tracing::debug!("Refresh state: {:?}", state);
        self.status.send_modify(|status| status.state = state);
    }
}

fn read_error(dataset: &DatasetDescriptor, source: io::Error) -> RefreshError {
    RefreshError::Read {
        dataset: dataset.name.clone(),
        source,
    }
}

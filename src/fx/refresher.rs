//! Background rate refresher
//!
//! Pulls the feed on a fixed interval and ingests it through its own SQLite
//! connection, so conversions never wait on the network. Conversions read
//! whatever rows are latest, stale by at most one interval.

use super::feed::{RateFeed, RateIngestor};
use crate::store::Store;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Settings for a refresher task
#[derive(Debug, Clone)]
pub struct RefresherSettings {
    pub database_path: PathBuf,
    pub busy_timeout: Duration,
    pub interval: Duration,
}

/// Handle to a running refresher
pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    completed: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl RefresherHandle {
    /// Number of refreshes that committed
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Number of refreshes that failed
    pub fn failed_runs(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Stop the task and wait for it; an in-flight refresh finishes first
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Rate refresher task ended abnormally: {}", e);
        }
    }
}

/// Scheduled rate refresh, decoupled from ledger operations
pub struct BackgroundRefresher;

impl BackgroundRefresher {
    /// Spawn on the current tokio runtime. The first refresh runs immediately.
    pub fn spawn(
        settings: RefresherSettings,
        feed: Arc<dyn RateFeed>,
        ingestor: RateIngestor,
    ) -> RefresherHandle {
        let (shutdown, mut stop) = watch::channel(false);
        let completed = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let (ok_count, err_count) = (completed.clone(), failed.clone());

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(settings.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => break,
                }

                let feed = feed.clone();
                let ingestor = ingestor.clone();
                let path = settings.database_path.clone();
                let busy_timeout = settings.busy_timeout;

                let outcome = tokio::task::spawn_blocking(move || {
                    let mut store = Store::open_with_timeout(&path, busy_timeout)?;
                    ingestor.refresh(&mut store, feed.as_ref())
                })
                .await;

                match outcome {
                    Ok(Ok(rows)) => {
                        ok_count.fetch_add(1, Ordering::SeqCst);
                        log::debug!("Background refresh wrote {} rows", rows);
                    }
                    Ok(Err(e)) => {
                        err_count.fetch_add(1, Ordering::SeqCst);
                        log::warn!("Background rate refresh failed: {}", e);
                    }
                    Err(e) => {
                        err_count.fetch_add(1, Ordering::SeqCst);
                        log::warn!("Background rate refresh panicked: {}", e);
                    }
                }
            }

            log::info!("Rate refresher stopped");
        });

        RefresherHandle {
            shutdown,
            task,
            completed,
            failed,
        }
    }
}

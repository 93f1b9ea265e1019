//! Crawl orchestrator: runs every registered provider and reports per provider.
//!
//! Each registration runs in its own task behind a semaphore, so a failure or panic
//! in one provider only marks that provider's report. Reports come back in
//! registry order whatever the completion order was.

use crate::config::AppConfig;
use crate::crawler::Registration;
use crate::models::CrawlReport;
use crate::storage::SnapshotStore;
use anyhow::{Result, anyhow};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

pub struct Pipeline {
    registrations: Vec<Registration>,
    store: Arc<SnapshotStore>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(config: &AppConfig, registrations: Vec<Registration>) -> Self {
        Self {
            registrations,
            store: Arc::new(SnapshotStore::new(&config.storage.data_dir)),
            concurrency: config.pipeline.concurrency.max(1),
        }
    }

    pub async fn run(&self) -> Result<CrawlSummary> {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::new();

        info!("=== Crawling {} providers ({} at a time) ===", self.registrations.len(), self.concurrency);

        for registration in &self.registrations {
            let registration = registration.clone();
            let store = Arc::clone(&self.store);
            let sem = Arc::clone(&sem);
            let name = registration.name().to_string();

            // Timing starts once the permit is held
            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await;
                let started_at = Utc::now();
                let start = Instant::now();
                let outcome = match AssertUnwindSafe(registration.run(&store)).catch_unwind().await {
                    Ok(result) => result.map(|listings| listings.len()),
                    Err(_) => Err(anyhow!("provider panicked")),
                };
                (outcome, started_at, start.elapsed().as_millis() as u64)
            });

            handles.push((name, handle));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let report = match handle.await {
                Ok((Ok(count), started_at, duration_ms)) => {
                    CrawlReport { name, success: true, count: Some(count), error: None, duration_ms, started_at }
                }
                Ok((Err(e), started_at, duration_ms)) => {
                    warn!("{}: {:#}", name, e);
                    let error = Some(format!("{:#}", e));
                    CrawlReport { name, success: false, count: None, error, duration_ms, started_at }
                }
                Err(e) => {
                    error!("Task panic for {}: {}", name, e);
                    let error = Some(format!("task failed: {}", e));
                    CrawlReport { name, success: false, count: None, error, duration_ms: 0, started_at: Utc::now() }
                }
            };
            reports.push(report);
        }

        let summary = CrawlSummary { reports };
        info!("=== Done: {} providers | {} listings | {} failed ===",
            summary.reports.len(), summary.listing_count(), summary.failures().count());
        Ok(summary)
    }
}

#[derive(Debug)]
pub struct CrawlSummary {
    pub reports: Vec<CrawlReport>,
}

impl CrawlSummary {
    pub fn failures(&self) -> impl Iterator<Item = &CrawlReport> {
        self.reports.iter().filter(|r| !r.success)
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn listing_count(&self) -> usize {
        self.reports.iter().filter_map(|r| r.count).sum()
    }
}

//! In-memory transport serving recorded pages by URL.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Transport;
use super::error::CrawlError;

#[derive(Default)]
pub struct FixtureTransport {
    pages: HashMap<String, String>,
    parallelism: Option<usize>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = Some(n);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Highest number of overlapping fetches observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn fetch(&self, url: &str, _ready: Option<&str>) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(body) => Ok(body.clone()),
            None => Err(CrawlError::Status { url: url.to_string(), status: 404 }.into()),
        }
    }

    fn parallelism(&self) -> usize {
        self.parallelism.unwrap_or(usize::MAX)
    }
}

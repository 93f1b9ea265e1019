//! Page-walking state machine shared by every numbered-page provider.
//!
//! Three independent stop signals: an empty page, the reported total being
//! reached, and a hard page cap.

use tracing::{debug, warn};

/// One fetched results page.
#[derive(Debug, Clone)]
pub struct PageBatch<T> {
    pub items: Vec<T>,
    /// Result count the site claims; `None` when the page shows none.
    pub reported_total: Option<usize>,
}

impl<T> PageBatch<T> {
    pub fn new(items: Vec<T>, reported_total: Option<usize>) -> Self {
        Self { items, reported_total }
    }

    pub fn untotaled(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Which reported total a provider trusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalPolicy {
    /// Only the first page carries a meaningful count.
    FirstReported,
    /// Every page repeats the count; the latest wins.
    LatestReported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    EmptyPage,
    TotalReached,
    PageCap,
}

pub struct Paginator<T> {
    current: u32,
    max_pages: u32,
    policy: TotalPolicy,
    expected_total: Option<usize>,
    aggregated: Vec<T>,
    stopped: Option<Stop>,
}

impl<T> Paginator<T> {
    pub fn new(max_pages: u32, policy: TotalPolicy) -> Self {
        Self {
            current: 1,
            max_pages,
            policy,
            expected_total: None,
            aggregated: Vec::new(),
            stopped: None,
        }
    }

    /// Page number to fetch next, or `None` once any stop signal fired.
    pub fn next_page(&mut self) -> Option<u32> {
        if self.stopped.is_some() {
            return None;
        }
        if self.current > self.max_pages {
            warn!(
                "Page cap of {} reached with {} listings, stopping",
                self.max_pages,
                self.aggregated.len()
            );
            self.stopped = Some(Stop::PageCap);
            return None;
        }
        Some(self.current)
    }

    /// Record a fetched page. Returns `true` when another page should be fetched.
    pub fn accept(&mut self, batch: PageBatch<T>) -> bool {
        if batch.items.is_empty() {
            debug!("Empty page {}, stopping", self.current);
            self.stopped = Some(Stop::EmptyPage);
            return false;
        }

        // A zero count is indistinguishable from "not shown".
        if let Some(total) = batch.reported_total.filter(|t| *t > 0) {
            match self.policy {
                TotalPolicy::FirstReported if self.expected_total.is_some() => {}
                _ => self.expected_total = Some(total),
            }
        }

        self.aggregated.extend(batch.items);

        if let Some(total) = self.expected_total {
            if self.aggregated.len() >= total {
                debug!("Reported total {} reached on page {}", total, self.current);
                self.stopped = Some(Stop::TotalReached);
                return false;
            }
        }

        self.current += 1;
        true
    }

    #[cfg(test)]
    fn expected_total(&self) -> Option<usize> {
        self.expected_total
    }

    pub fn stop_reason(&self) -> Option<Stop> {
        self.stopped
    }

    pub fn into_items(self) -> Vec<T> {
        self.aggregated
    }
}

pub mod browser;
pub mod cleaner;
pub mod dom;
pub mod enrich;
pub mod error;
pub mod http_client;
pub mod pagination;
pub mod providers;
pub mod query;
pub mod registry;
#[cfg(test)]
pub mod testing;

use crate::config::CrawlerConfig;
use crate::models::Listing;
use crate::storage::SnapshotStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use self::browser::{BrowserOptions, BrowserSession};
use self::pagination::{PageBatch, Paginator, TotalPolicy};

pub const DEFAULT_MAX_PAGES: u32 = 50;
pub const DEFAULT_MIN_AREA: f64 = 70.0;
pub const DEFAULT_MAX_RENT: f64 = 4000.0;

// ── Search limits ─────────────────────────────────────────────────────────────

/// Filters every provider bakes into its search URL.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    pub min_area: f64,
    pub max_rent: f64,
    pub max_pages: u32,
    pub detail_concurrency: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            max_rent: DEFAULT_MAX_RENT,
            max_pages: DEFAULT_MAX_PAGES,
            detail_concurrency: 4,
        }
    }
}

impl From<&CrawlerConfig> for SearchLimits {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            min_area: config.min_area,
            max_rent: config.max_rent,
            max_pages: config.max_pages,
            detail_concurrency: config.detail_concurrency,
        }
    }
}

// ── Source capability set ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// Everything arrives on one results page.
    Single,
    Numbered(TotalPolicy),
}

/// What a provider knows about its site: URLs, selectors and field rules.
/// Everything is synchronous over response bodies; fetching is the transport's job.
pub trait ListingSource: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Results-page URL for `page` (1-based).
    fn page_url(&self, limits: &SearchLimits, page: u32) -> String;

    fn paging(&self) -> Paging {
        Paging::Single
    }

    /// When a later results page fails, keep the pages already fetched instead of failing.
    fn keeps_partial_pages(&self) -> bool {
        false
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>>;

    /// Detail page to enrich `listing` from, if this site needs one.
    fn detail_url(&self, _listing: &Listing) -> Option<String> {
        None
    }

    fn enrich_detail(&self, listing: Listing, _body: &str) -> Result<Listing> {
        Ok(listing)
    }

    /// CSS selector that marks a rendered results page (browser transports only).
    fn ready_selector(&self) -> Option<&'static str> {
        None
    }

    fn detail_ready_selector(&self) -> Option<&'static str> {
        None
    }

    /// Extra Chromium flags.
    fn launch_args(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Something that turns a URL into a response body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// `ready` is a selector to wait for; plain HTTP ignores it.
    async fn fetch(&self, url: &str, ready: Option<&str>) -> Result<String>;

    /// Maximum useful concurrent fetches.
    fn parallelism(&self) -> usize {
        usize::MAX
    }
}

/// Walk the source's result pages, then enrich the aggregated listings.
pub async fn scrape_with<S>(source: &S, transport: &dyn Transport, limits: &SearchLimits) -> Result<Vec<Listing>>
where
    S: ListingSource + ?Sized,
{
    let name = source.name();
    let listings = match source.paging() {
        Paging::Single => {
            let url = source.page_url(limits, 1);
            let body = transport
                .fetch(&url, source.ready_selector())
                .await
                .with_context(|| format!("{}: failed to fetch {}", name, url))?;
            let batch = source
                .extract_list_page(&body)
                .with_context(|| format!("{}: failed to parse {}", name, url))?;
            info!("{}: {} listings on results page", name, batch.items.len());
            batch.items
        }
        Paging::Numbered(policy) => {
            let mut pager = Paginator::new(limits.max_pages, policy);
            while let Some(page) = pager.next_page() {
                let batch = match fetch_page(source, transport, limits, page).await {
                    Ok(batch) => batch,
                    Err(e) if page > 1 && source.keeps_partial_pages() => {
                        warn!("{}: stopping at page {}, keeping earlier pages: {:#}", name, page, e);
                        break;
                    }
                    Err(e) => return Err(e),
                };
                info!("{}: page {}: {} listings (reported total {:?})",
                    name, page, batch.items.len(), batch.reported_total);
                if !pager.accept(batch) {
                    break;
                }
            }
            debug!("{}: pagination stopped ({:?})", name, pager.stop_reason());
            pager.into_items()
        }
    };

    Ok(enrich::enrich_bounded(source, transport, listings, limits.detail_concurrency).await)
}

async fn fetch_page<S>(source: &S, transport: &dyn Transport, limits: &SearchLimits, page: u32) -> Result<PageBatch<Listing>>
where
    S: ListingSource + ?Sized,
{
    let name = source.name();
    let url = source.page_url(limits, page);
    let body = transport
        .fetch(&url, source.ready_selector())
        .await
        .with_context(|| format!("{}: failed to fetch page {}", name, page))?;
    source
        .extract_list_page(&body)
        .with_context(|| format!("{}: failed to parse page {}", name, page))
}

// ── Crawler contract ──────────────────────────────────────────────────────────

#[async_trait]
pub trait Crawler: Send + Sync {
    fn name(&self) -> &str;

    fn variant(&self) -> Variant;

    /// Full current listing set for this provider.
    async fn scrape(&self) -> Result<Vec<Listing>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Http,
    Browser,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::Http => "http",
            Variant::Browser => "browser",
        })
    }
}

pub enum Backend {
    Http(Arc<dyn Transport>),
    /// A fresh Chromium session per scrape, closed afterwards.
    Browser(BrowserOptions),
}

/// A [`ListingSource`] bound to the transport that reaches it.
pub struct SourceCrawler<S> {
    source: S,
    backend: Backend,
    limits: SearchLimits,
}

impl<S: ListingSource> SourceCrawler<S> {
    pub fn new(source: S, backend: Backend, limits: SearchLimits) -> Self {
        Self { source, backend, limits }
    }
}

#[async_trait]
impl<S: ListingSource> Crawler for SourceCrawler<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn variant(&self) -> Variant {
        match self.backend {
            Backend::Http(_) => Variant::Http,
            Backend::Browser(_) => Variant::Browser,
        }
    }

    async fn scrape(&self) -> Result<Vec<Listing>> {
        match &self.backend {
            Backend::Http(transport) => scrape_with(&self.source, transport.as_ref(), &self.limits).await,
            Backend::Browser(options) => {
                let session = BrowserSession::launch(options, self.source.launch_args())
                    .await
                    .with_context(|| format!("{}: browser session", self.source.name()))?;
                let result = scrape_with(&self.source, &session, &self.limits).await;
                session.close().await;
                result
            }
        }
    }
}

// ── Registration ──────────────────────────────────────────────────────────────

/// What `run()` does when scraping fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Propagate the failure; the previous snapshot stays untouched.
    FailFast,
    /// Log and persist an empty snapshot.
    DegradeToEmpty,
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorPolicy::FailFast => "fail_fast",
            ErrorPolicy::DegradeToEmpty => "degrade_to_empty",
        })
    }
}

#[derive(Clone)]
pub struct Registration {
    pub crawler: Arc<dyn Crawler>,
    pub policy: ErrorPolicy,
}

impl Registration {
    pub fn new(crawler: Arc<dyn Crawler>, policy: ErrorPolicy) -> Self {
        Self { crawler, policy }
    }

    pub fn name(&self) -> &str {
        self.crawler.name()
    }

    /// Scrape, apply the error policy, persist the full result, return it.
    pub async fn run(&self, store: &SnapshotStore) -> Result<Vec<Listing>> {
        let name = self.crawler.name();
        let listings = match self.crawler.scrape().await {
            Ok(listings) => listings,
            Err(e) => match self.policy {
                ErrorPolicy::FailFast => return Err(e).with_context(|| format!("{} scrape failed", name)),
                ErrorPolicy::DegradeToEmpty => {
                    warn!("{}: scrape failed, saving empty snapshot: {:#}", name, e);
                    Vec::new()
                }
            },
        };

        let listings = sanitize(name, listings);
        store
            .save(name, &listings)
            .await
            .with_context(|| format!("Failed to save {} snapshot", name))?;
        info!("{}: saved {} listings", name, listings.len());
        Ok(listings)
    }
}

/// Drop records without identity, clamp invalid amounts, keep the first of each id.
pub fn sanitize(provider: &str, listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    let before = listings.len();
    let kept: Vec<Listing> = listings
        .into_iter()
        .filter(|l| !l.local_id().is_empty() && !l.listing_url.trim().is_empty())
        .filter(|l| seen.insert(l.id.clone()))
        .map(|mut l| {
            if !l.rent_value.is_finite() || l.rent_value < 0.0 {
                l.rent_value = 0.0;
            }
            if !l.total_value.is_finite() || l.total_value < 0.0 {
                l.total_value = 0.0;
            }
            if l.provider_name.is_empty() {
                l.provider_name = provider.to_string();
            }
            l
        })
        .collect();
    if kept.len() < before {
        debug!("{}: dropped {} invalid or duplicate listings", provider, before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::testing::FixtureTransport;
    use super::*;
    use crate::crawler::dom::{attr, selector};
    use scraper::Html;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Cards are `<a class="card" href=... data-rent=...>`; detail pages carry `<b>` neighborhoods.
    struct ToySource {
        paging: Paging,
    }

    impl ListingSource for ToySource {
        fn name(&self) -> &'static str {
            "toy"
        }

        fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
            format!("https://toy.test/busca?max={}&page={}", limits.max_rent, page)
        }

        fn paging(&self) -> Paging {
            self.paging
        }

        fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
            let doc = Html::parse_document(body);
            let card = selector("a.card")?;
            let items = doc
                .select(&card)
                .filter_map(|a| {
                    let href = attr(a, "href")?;
                    let rent = cleaner::parse_brl(&attr(a, "data-rent")?);
                    let id = dom::last_path_segment(&href)?;
                    Some(Listing::new("toy", &id, href, rent))
                })
                .collect();
            let total = attr(doc.root_element(), "data-total").and_then(|t| t.parse().ok());
            Ok(PageBatch::new(items, total))
        }

        fn detail_url(&self, listing: &Listing) -> Option<String> {
            Some(listing.listing_url.clone())
        }

        fn enrich_detail(&self, mut listing: Listing, body: &str) -> Result<Listing> {
            let doc = Html::parse_document(body);
            let b = selector("b")?;
            let n = dom::doc_text(&doc, &b);
            anyhow::ensure!(!n.is_empty(), "no neighborhood");
            listing.neighborhood = Some(n);
            Ok(listing)
        }
    }

    fn card(id: u32, rent: &str) -> String {
        format!(r#"<a class="card" href="https://toy.test/imovel/{id}" data-rent="{rent}">x</a>"#)
    }

    fn limits() -> SearchLimits {
        SearchLimits { max_rent: 3000.0, ..SearchLimits::default() }
    }

    #[tokio::test]
    async fn numbered_paging_stops_on_empty_page_then_enriches_in_order() {
        let src = ToySource { paging: Paging::Numbered(TotalPolicy::LatestReported) };
        let fixture = FixtureTransport::new()
            .with_page(src.page_url(&limits(), 1), format!("{}{}", card(1, "R$ 1.200,00"), card(2, "900")))
            .with_page(src.page_url(&limits(), 2), card(3, "R$ 2.000"))
            .with_page(src.page_url(&limits(), 3), "<p>nenhum resultado</p>")
            .with_page("https://toy.test/imovel/1", "<b>Trindade</b>")
            .with_page("https://toy.test/imovel/3", "<b>Pantanal</b>");

        let listings = scrape_with(&src, &fixture, &limits()).await.unwrap();

        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["toy_1", "toy_2", "toy_3"]);
        assert_eq!(listings[0].rent_value, 1200.0);
        assert_eq!(listings[0].neighborhood.as_deref(), Some("Trindade"));
        // Missing detail page keeps the list-page record
        assert_eq!(listings[1].neighborhood, None);
        assert_eq!(listings[1].rent_value, 900.0);
        assert_eq!(listings[2].neighborhood.as_deref(), Some("Pantanal"));
        assert_eq!(fixture.requests().len(), 6);
    }

    #[tokio::test]
    async fn single_page_source_fetches_once() {
        let src = ToySource { paging: Paging::Single };
        let fixture = FixtureTransport::new().with_page(src.page_url(&limits(), 1), card(7, "1500"));
        let listings = scrape_with(&src, &fixture, &limits()).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(fixture.requests()[0], "https://toy.test/busca?max=3000&page=1");
    }

    #[tokio::test]
    async fn list_page_failure_is_an_error() {
        let src = ToySource { paging: Paging::Single };
        let err = scrape_with(&src, &FixtureTransport::new(), &limits()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP 404"));
    }

    #[tokio::test]
    async fn enrichment_respects_transport_parallelism() {
        let src = ToySource { paging: Paging::Single };
        let cards: String = (1..=6).map(|i| card(i, "1000")).collect();
        let mut fixture = FixtureTransport::new().with_parallelism(1).with_page(src.page_url(&limits(), 1), cards);
        for i in 1..=6 {
            fixture = fixture.with_page(format!("https://toy.test/imovel/{i}"), "<b>Centro</b>");
        }
        let listings = scrape_with(&src, &fixture, &limits()).await.unwrap();
        assert_eq!(listings.len(), 6);
        assert_eq!(fixture.peak_in_flight(), 1);
    }

    struct Scripted {
        outcome: fn() -> Result<Vec<Listing>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Crawler for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn variant(&self) -> Variant {
            Variant::Http
        }
        async fn scrape(&self) -> Result<Vec<Listing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn registration(outcome: fn() -> Result<Vec<Listing>>, policy: ErrorPolicy) -> Registration {
        Registration::new(Arc::new(Scripted { outcome, calls: AtomicUsize::new(0) }), policy)
    }

    #[tokio::test]
    async fn run_persists_full_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let reg = registration(
            || Ok(vec![Listing::new("scripted", "1", "https://s.test/1", 1000.0)]),
            ErrorPolicy::FailFast,
        );
        let saved = reg.run(&store).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(store.load("scripted").await.unwrap(), saved);
    }

    #[tokio::test]
    async fn fail_fast_propagates_and_leaves_snapshot_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let previous = vec![Listing::new("scripted", "9", "https://s.test/9", 800.0)];
        store.save("scripted", &previous).await.unwrap();

        let reg = registration(|| Err(anyhow::anyhow!("site down")), ErrorPolicy::FailFast);
        assert!(reg.run(&store).await.is_err());
        assert_eq!(store.load("scripted").await.unwrap(), previous);
    }

    #[tokio::test]
    async fn degrade_to_empty_saves_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let reg = registration(|| Err(anyhow::anyhow!("selector missing")), ErrorPolicy::DegradeToEmpty);
        assert!(reg.run(&store).await.unwrap().is_empty());
        assert!(store.load("scripted").await.unwrap().is_empty());
    }

    #[test]
    fn sanitize_drops_anonymous_and_duplicate_records() {
        let mut negative = Listing::new("p", "3", "https://p.test/3", 100.0);
        negative.total_value = -5.0;
        let listings = vec![
            Listing::new("p", "1", "https://p.test/1", 100.0),
            Listing::new("p", "", "https://p.test/x", 100.0),
            Listing::new("p", "2", " ", 100.0),
            Listing::new("p", "1", "https://p.test/1-again", 200.0),
            negative,
        ];
        let kept = sanitize("p", listings);
        let ids: Vec<&str> = kept.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["p_1", "p_3"]);
        assert_eq!(kept[0].listing_url, "https://p.test/1");
        assert_eq!(kept[1].total_value, 0.0);
    }
}

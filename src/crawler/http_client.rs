use crate::config::CrawlerConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use super::Transport;
use super::error::CrawlError;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/json, text/plain, */*";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Per-site client tweaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProfile {
    pub accept_json: bool,
    /// Bind to an IPv4 address; some hosts stall over IPv6.
    pub force_ipv4: bool,
}

impl HttpProfile {
    pub fn json() -> Self {
        Self { accept_json: true, ..Self::default() }
    }

    pub fn ipv4(mut self) -> Self {
        self.force_ipv4 = true;
        self
    }
}

pub struct HttpClient {
    inner: reqwest::Client,
    config: CrawlerConfig,
}

impl HttpClient {
    pub fn new(config: &CrawlerConfig, profile: HttpProfile) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(if profile.accept_json { JSON_ACCEPT } else { HTML_ACCEPT }),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8"));

        let mut builder = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .default_headers(headers);

        if profile.force_ipv4 {
            builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }

        let inner = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            config: config.clone(),
        })
    }

    /// Fetch a URL as text with rate-limiting and retry.
    pub async fn get_text(&self, url: &str) -> Result<String, CrawlError> {
        self.polite_delay().await;
        RetryIf::spawn(
            self.backoff(),
            || self.attempt(url),
            |e: &CrawlError| {
                let retry = e.is_transient();
                if retry {
                    warn!("Retrying {}: {}", url, e);
                }
                retry
            },
        )
        .await
    }

    async fn attempt(&self, url: &str) -> Result<String, CrawlError> {
        debug!("GET {}", url);
        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|source| CrawlError::Request { url: url.to_string(), source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CrawlError::Status { url: url.to_string(), status: status.as_u16() });
        }

        resp.text()
            .await
            .map_err(|source| CrawlError::Request { url: url.to_string(), source })
    }

    /// Delays between attempts: exponential from the configured request delay, capped.
    fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        ExponentialBackoff::from_millis(2)
            .factor(self.config.request_delay_ms.max(1))
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.config.max_retries as usize)
    }

    /// Sleep for the configured delay + random jitter.
    async fn polite_delay(&self) {
        let jitter = rand::random_range(0..=self.config.jitter_ms);
        sleep(Duration::from_millis(self.config.request_delay_ms + jitter)).await;
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn fetch(&self, url: &str, _ready: Option<&str>) -> Result<String> {
        Ok(self.get_text(url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn backoff_is_bounded_by_retry_count_and_cap() {
        let config = CrawlerConfig {
            max_retries: 4,
            request_delay_ms: 10_000,
            ..CrawlerConfig::default()
        };
        let client = HttpClient::new(&config, HttpProfile::json().ipv4()).unwrap();
        let delays: Vec<Duration> = client.backoff().collect();
        assert_eq!(delays.len(), 4);
        assert!(delays.iter().all(|d| *d <= MAX_BACKOFF));
    }

    /// Serves the given statuses in order, one connection each, and counts requests.
    async fn serve(statuses: &'static [u16]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/busca", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            for status in statuses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let body = if *status == 200 { "<p>ok</p>" } else { "" };
                let reply = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (url, hits)
    }

    fn quick_config(max_retries: u32) -> CrawlerConfig {
        CrawlerConfig {
            max_retries,
            request_delay_ms: 1,
            jitter_ms: 0,
            ..CrawlerConfig::default()
        }
    }

    #[tokio::test]
    async fn transient_status_is_retried_until_success() {
        let (url, hits) = serve(&[503, 500, 200]).await;
        let client = HttpClient::new(&quick_config(3), HttpProfile::default()).unwrap();

        let body = client.get_text(&url).await.unwrap();
        assert_eq!(body, "<p>ok</p>");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (url, hits) = serve(&[404, 200]).await;
        let client = HttpClient::new(&quick_config(3), HttpProfile::default()).unwrap();

        let err = client.get_text(&url).await.unwrap_err();
        assert!(matches!(err, CrawlError::Status { status: 404, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let config = CrawlerConfig { max_retries: 0, ..CrawlerConfig::default() };
        let client = HttpClient::new(&config, HttpProfile::default()).unwrap();
        assert_eq!(client.backoff().count(), 0);
    }
}

//! Headless Chromium session for sites that only render listings client-side.

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use super::Transport;
use super::error::CrawlError;
use crate::config::CrawlerConfig;

const SELECTOR_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
}

impl From<&CrawlerConfig> for BrowserOptions {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            chrome_path: config.chrome_path.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
        }
    }
}

/// One browser process with a single tab. Call [`BrowserSession::close`] on every
/// exit path; dropping it only aborts the event loop.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    options: BrowserOptions,
}

impl BrowserSession {
    pub async fn launch(options: &BrowserOptions, extra_args: &[&str]) -> Result<Self, CrawlError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", options.user_agent))
            .request_timeout(options.navigation_timeout);

        if let Some(path) = &options.chrome_path {
            builder = builder.chrome_executable(path);
        }
        for arg in extra_args {
            builder = builder.arg(*arg);
        }

        let config = builder
            .build()
            .map_err(|e| CrawlError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CrawlError::Browser(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(CrawlError::Browser(format!("failed to open tab: {e}")));
            }
        };

        info!("Chromium session started");
        Ok(Self {
            browser,
            page,
            handler,
            options: options.clone(),
        })
    }

    /// Poll for `css` until the selector timeout. Returns whether it appeared.
    async fn wait_for(&self, css: &str) -> bool {
        let deadline = Instant::now() + self.options.selector_timeout;
        loop {
            if self.page.find_element(css).await.is_ok() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(SELECTOR_POLL).await;
        }
    }

    async fn render(&self, url: &str, ready: Option<&str>) -> Result<String, CrawlError> {
        debug!("Navigating to {}", url);
        match timeout(self.options.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(CrawlError::Browser(format!("navigation to {url} failed: {e}"))),
            Err(_) => {
                return Err(CrawlError::NavigationTimeout {
                    url: url.to_string(),
                    secs: self.options.navigation_timeout.as_secs(),
                });
            }
        }

        if let Some(css) = ready {
            if !self.wait_for(css).await {
                warn!("Selector {:?} not found on {} within {:?}, reading page anyway",
                    css, url, self.options.selector_timeout);
            }
        }

        self.page
            .content()
            .await
            .map_err(|e| CrawlError::Browser(format!("failed to read HTML of {url}: {e}")))
    }

    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close Chromium cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for Chromium exit: {}", e);
        }
        self.handler.abort();
        debug!("Chromium session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Transport for BrowserSession {
    async fn fetch(&self, url: &str, ready: Option<&str>) -> Result<String> {
        Ok(self.render(url, ready).await?)
    }

    /// One tab, one navigation at a time.
    fn parallelism(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_crawler_config() {
        let config = CrawlerConfig {
            navigation_timeout_secs: 12,
            selector_timeout_secs: 3,
            ..CrawlerConfig::default()
        };
        let opts = BrowserOptions::from(&config);
        assert_eq!(opts.navigation_timeout, Duration::from_secs(12));
        assert_eq!(opts.selector_timeout, Duration::from_secs(3));
        assert_eq!(opts.user_agent, config.user_agent);
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn renders_data_url() {
        let session = BrowserSession::launch(&BrowserOptions::from(&CrawlerConfig::default()), &[])
            .await
            .expect("failed to launch");
        let html = session
            .fetch("data:text/html,<h1 class='ready'>Hello</h1>", Some("h1.ready"))
            .await;
        session.close().await;
        assert!(html.expect("render failed").contains("Hello"));
    }
}

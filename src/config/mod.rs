use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::crawler::{DEFAULT_MAX_PAGES, DEFAULT_MAX_RENT, DEFAULT_MIN_AREA, ErrorPolicy};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Crawler configuration shared by every provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_selector_timeout_secs")]
    pub selector_timeout_secs: u64,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    #[serde(default = "default_min_area")]
    pub min_area: f64,

    #[serde(default = "default_max_rent")]
    pub max_rent: f64,

    /// Chromium binary; `None` lets chromiumoxide look it up on PATH.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_annotations_file")]
    pub annotations_file: String,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Provider names to run; empty means every registered provider.
    #[serde(default)]
    pub providers: Vec<String>,

    #[serde(default)]
    pub policy_overrides: HashMap<String, ErrorPolicy>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    300
}
fn default_jitter_ms() -> u64 {
    250
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string()
}
fn default_navigation_timeout_secs() -> u64 {
    90
}
fn default_selector_timeout_secs() -> u64 {
    60
}
fn default_max_pages() -> u32 {
    DEFAULT_MAX_PAGES
}
fn default_detail_concurrency() -> usize {
    4
}
fn default_min_area() -> f64 {
    DEFAULT_MIN_AREA
}
fn default_max_rent() -> f64 {
    DEFAULT_MAX_RENT
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_annotations_file() -> String {
    "annotations.json".to_string()
}
fn default_concurrency() -> usize {
    3
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("RENTAL").separator("__"))
            .build()
            .context("Failed to assemble configuration sources")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}

impl StorageConfig {
    pub fn annotations_path(&self) -> PathBuf {
        self.data_dir.join(&self.annotations_file)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: default_jitter_ms(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            selector_timeout_secs: default_selector_timeout_secs(),
            max_pages: default_max_pages(),
            detail_concurrency: default_detail_concurrency(),
            min_area: default_min_area(),
            max_rent: default_max_rent(),
            chrome_path: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            annotations_file: default_annotations_file(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            providers: Vec::new(),
            policy_overrides: HashMap::new(),
        }
    }
}

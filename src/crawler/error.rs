use thiserror::Error;

/// Failures raised while talking to a listing source.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("navigation to {url} timed out after {secs}s")]
    NavigationTimeout { url: String, secs: u64 },

    #[error("browser: {0}")]
    Browser(String),

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },

    #[error("invalid selector {0:?}")]
    Selector(String),
}

impl CrawlError {
    /// Network errors, throttling and server errors get another attempt; 4xx are final.
    pub fn is_transient(&self) -> bool {
        match self {
            CrawlError::Request { .. } => true,
            CrawlError::Status { status, .. } => matches!(status, 429 | 500..=599),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_retried() {
        let status = |status| CrawlError::Status { url: "u".into(), status };
        assert!(status(429).is_transient());
        assert!(status(500).is_transient());
        assert!(status(501).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(403).is_transient());
        assert!(!CrawlError::Selector("div[".into()).is_transient());
    }
}

//! Explicit, ordered provider list assembled at startup.

use anyhow::{Result, bail};
use std::sync::Arc;
use tracing::debug;

use super::browser::BrowserOptions;
use super::http_client::{HttpClient, HttpProfile};
use super::providers::*;
use super::{Backend, ErrorPolicy, ListingSource, Registration, SearchLimits, SourceCrawler, Transport};
use crate::config::AppConfig;

/// Registry order. Snapshot merging and crawl reports follow it.
pub const PROVIDERS: [&str; 14] = [
    "creditoReal",
    "ibagy",
    "olx",
    "daltonandrade",
    "duda",
    "f1",
    "seiter",
    "regente",
    "sanremo",
    "realizar",
    "gralha",
    "quadra",
    "lideranca",
    "floripa-imob",
];

pub fn provider_names() -> Vec<String> {
    PROVIDERS.iter().map(|p| p.to_string()).collect()
}

struct Transports {
    html: Arc<dyn Transport>,
    html_ipv4: Arc<dyn Transport>,
    json: Arc<dyn Transport>,
    json_ipv4: Arc<dyn Transport>,
    browser: BrowserOptions,
    limits: SearchLimits,
}

impl Transports {
    fn http<S: ListingSource>(&self, source: S, transport: &Arc<dyn Transport>, policy: ErrorPolicy) -> Registration {
        let crawler = SourceCrawler::new(source, Backend::Http(Arc::clone(transport)), self.limits);
        Registration::new(Arc::new(crawler), policy)
    }

    /// Browser sites degrade to an empty snapshot; their markup shifts often.
    fn browser<S: ListingSource>(&self, source: S) -> Registration {
        let crawler = SourceCrawler::new(source, Backend::Browser(self.browser.clone()), self.limits);
        Registration::new(Arc::new(crawler), ErrorPolicy::DegradeToEmpty)
    }
}

/// Every provider in registry order, narrowed to `pipeline.providers` when set,
/// with `pipeline.policy_overrides` applied.
pub fn build(config: &AppConfig) -> Result<Vec<Registration>> {
    let crawler = &config.crawler;
    let t = Transports {
        html: Arc::new(HttpClient::new(crawler, HttpProfile::default())?),
        html_ipv4: Arc::new(HttpClient::new(crawler, HttpProfile::default().ipv4())?),
        json: Arc::new(HttpClient::new(crawler, HttpProfile::json())?),
        json_ipv4: Arc::new(HttpClient::new(crawler, HttpProfile::json().ipv4())?),
        browser: BrowserOptions::from(crawler),
        limits: SearchLimits::from(crawler),
    };

    use ErrorPolicy::{DegradeToEmpty, FailFast};
    let all = vec![
        t.http(CreditoReal, &t.html, FailFast),
        t.browser(Ibagy),
        t.browser(Olx),
        t.browser(DaltonAndrade),
        t.browser(Duda),
        t.http(F1, &t.html_ipv4, FailFast),
        t.http(Seiter, &t.html, FailFast),
        t.http(Regente, &t.html, FailFast),
        t.http(Sanremo, &t.json, DegradeToEmpty),
        t.browser(Realizar),
        t.http(Gralha, &t.json_ipv4, DegradeToEmpty),
        t.http(Quadra, &t.html, FailFast),
        t.browser(Lideranca),
        t.browser(FloripaImob),
    ];

    select(all, &config.pipeline.providers, |name| config.pipeline.policy_overrides.get(name).copied())
}

fn select(
    all: Vec<Registration>,
    wanted: &[String],
    override_for: impl Fn(&str) -> Option<ErrorPolicy>,
) -> Result<Vec<Registration>> {
    if let Some(unknown) = wanted.iter().find(|w| !all.iter().any(|r| r.name() == w.as_str())) {
        bail!("Unknown provider '{}' (known: {})", unknown, PROVIDERS.join(", "));
    }

    Ok(all
        .into_iter()
        .filter(|r| wanted.is_empty() || wanted.iter().any(|w| w == r.name()))
        .map(|mut r| {
            if let Some(policy) = override_for(r.name()) {
                debug!("{}: error policy overridden to {}", r.name(), policy);
                r.policy = policy;
            }
            r
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::Variant;

    #[test]
    fn registry_order_and_policies() {
        let regs = build(&AppConfig::default()).unwrap();
        let names: Vec<&str> = regs.iter().map(|r| r.name()).collect();
        assert_eq!(names, PROVIDERS);

        for r in &regs {
            if r.crawler.variant() == Variant::Browser {
                assert_eq!(r.policy, ErrorPolicy::DegradeToEmpty, "{}", r.name());
            }
        }
        let policy = |name: &str| regs.iter().find(|r| r.name() == name).map(|r| r.policy);
        assert_eq!(policy("creditoReal"), Some(ErrorPolicy::FailFast));
        assert_eq!(policy("quadra"), Some(ErrorPolicy::FailFast));
        assert_eq!(policy("sanremo"), Some(ErrorPolicy::DegradeToEmpty));
        assert_eq!(policy("gralha"), Some(ErrorPolicy::DegradeToEmpty));
    }

    #[test]
    fn selection_keeps_registry_order_and_applies_overrides() {
        let mut config = AppConfig::default();
        config.pipeline.providers = vec!["quadra".into(), "olx".into()];
        config.pipeline.policy_overrides.insert("quadra".into(), ErrorPolicy::DegradeToEmpty);

        let regs = build(&config).unwrap();
        let names: Vec<&str> = regs.iter().map(|r| r.name()).collect();
        assert_eq!(names, ["olx", "quadra"]);
        assert_eq!(regs[1].policy, ErrorPolicy::DegradeToEmpty);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.providers = vec!["zap".into()];
        let err = build(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown provider 'zap'"));
    }
}

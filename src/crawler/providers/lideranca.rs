use anyhow::Result;

use super::busca::{self, BuscaLayout, DETAIL_READY, RESULTS_READY};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const LAYOUT: BuscaLayout = BuscaLayout {
    provider: "lideranca",
    origin: "https://liderancaimobiliaria.com.br",
    card: "div.mb-10 > div > a",
    neighborhood: "h3.text-sm.font-medium",
};

pub struct Lideranca;

impl ListingSource for Lideranca {
    fn name(&self) -> &'static str {
        LAYOUT.provider
    }

    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        Query::new()
            .push("finalidade", "Aluguel")
            .push("cidade", "Florianópolis")
            .push("vagas", 1)
            .push("max", format!("{:.2}", limits.max_rent))
            .push("page", page)
            .push("areaPrivativaMin", format!("{:.2}", limits.min_area))
            .to_url(&LAYOUT.search_base())
    }

    fn paging(&self) -> Paging {
        Paging::Numbered(TotalPolicy::LatestReported)
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        Ok(PageBatch::new(LAYOUT.cards(body)?, busca::result_count(body)?))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
        LAYOUT.enrich(listing, body)
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(RESULTS_READY)
    }

    fn detail_ready_selector(&self) -> Option<&'static str> {
        Some(DETAIL_READY)
    }

    fn launch_args(&self) -> &'static [&'static str] {
        &["--ignore-certificate-errors"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::providers::busca::fixtures::detail_page;
    use crate::crawler::scrape_with;
    use crate::crawler::testing::FixtureTransport;

    fn results(hrefs: &[&str], total: usize) -> String {
        let cards: String = hrefs
            .iter()
            .map(|h| format!(r#"<div><a href="{h}">card</a></div>"#))
            .collect();
        format!(r#"<span class="text-base font-normal">1 - 2 de {total}</span><div class="mb-10">{cards}</div>"#)
    }

    #[tokio::test]
    async fn pages_until_reported_total_then_enriches() {
        let limits = SearchLimits::default();
        let mut fixture = FixtureTransport::new()
            .with_page(Lideranca.page_url(&limits, 1), results(&["/imovel/a-1", "/imovel/b-2"], 3))
            .with_page(Lideranca.page_url(&limits, 2), results(&["/imovel/c-3"], 3));
        for (slug, code) in [("a-1", "11"), ("b-2", "22"), ("c-3", "33")] {
            fixture = fixture.with_page(
                format!("https://liderancaimobiliaria.com.br/imovel/{slug}"),
                detail_page(code, "font-medium", "Itacorubi, Florianópolis"),
            );
        }

        let listings = scrape_with(&Lideranca, &fixture, &limits).await.unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["lideranca_11", "lideranca_22", "lideranca_33"]);
        assert!(listings.iter().all(|l| l.total_value > 0.0));
        // Page 3 is never requested
        assert!(!fixture.requests().contains(&Lideranca.page_url(&limits, 3)));
    }

    #[test]
    fn needs_relaxed_tls() {
        assert_eq!(Lideranca.launch_args(), ["--ignore-certificate-errors"]);
        assert!(Lideranca.page_url(&SearchLimits::default(), 4).contains("page=4"));
    }
}

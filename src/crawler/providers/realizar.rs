use anyhow::Result;

use super::busca::{BuscaLayout, DETAIL_READY};
use crate::crawler::pagination::PageBatch;
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

/// Spelling variants the site's neighborhood index actually contains.
const NEIGHBORHOODS: [&str; 19] = [
    "Trindade",
    "agronômica",
    "Agronomica",
    "Agronômica",
    "Carvoeira",
    "Córrego Grande",
    "Corrego Grande",
    "Itacorubi",
    "JOAO PAULO",
    "João Paulo",
    "Joao Paulo",
    "joão paulo",
    "joao paulo",
    "Joao paulo",
    "Monte Verde",
    "pantanal",
    "Pantanal",
    "Santa Mônica",
    "Santa Monica",
];

const LAYOUT: BuscaLayout = BuscaLayout {
    provider: "realizar",
    origin: "https://realizarimoveisfloripa.com.br",
    card: "div.mb-10 > div > a",
    neighborhood: "h3.text-sm.font-medium",
};

pub struct Realizar;

impl ListingSource for Realizar {
    fn name(&self) -> &'static str {
        LAYOUT.provider
    }

    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        Query::new()
            .push("finalidade", "Aluguel")
            .push("cidade", "Florianópolis")
            .push("vagas", 1)
            .push("max", format!("{:.2}", limits.max_rent))
            .push("areaPrivativaMin", format!("{:.2}", limits.min_area))
            .push("bairro", NEIGHBORHOODS.join(","))
            .to_url(&LAYOUT.search_base())
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        Ok(PageBatch::untotaled(LAYOUT.cards(body)?))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
        LAYOUT.enrich(listing, body)
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(".swiper-wrapper")
    }

    fn detail_ready_selector(&self) -> Option<&'static str> {
        Some(DETAIL_READY)
    }
}

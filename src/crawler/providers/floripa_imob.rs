use anyhow::Result;

use super::busca::{BuscaLayout, DETAIL_READY};
use crate::crawler::pagination::PageBatch;
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

const LAYOUT: BuscaLayout = BuscaLayout {
    provider: "floripa-imob",
    origin: "https://floripaimobiliariasc.com.br",
    card: "div.flex.mt-8 > div > a",
    neighborhood: "h3.text-sm.font-normal",
};

pub struct FloripaImob;

impl ListingSource for FloripaImob {
    fn name(&self) -> &'static str {
        LAYOUT.provider
    }

    /// The site ignores city and area filters; three bedrooms narrows it instead.
    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        Query::new()
            .push("finalidade", "Aluguel")
            .push("dormitorios", 3)
            .push("vagas", 1)
            .push("max", format!("{:.2}", limits.max_rent))
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

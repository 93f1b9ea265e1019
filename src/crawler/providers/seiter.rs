use anyhow::Result;
use scraper::Html;

use crate::crawler::cleaner::{non_empty, parse_brl, parse_count, parse_digits, positive};
use crate::crawler::dom::{absolute_url, attr, first_text, selector, text_of};
use crate::crawler::pagination::PageBatch;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

const ORIGIN: &str = "https://www.seiterimobiliaria.com";
const PAGE_SIZE: u32 = 48;

/// Seiter's cards are complete; no detail request is made.
pub struct Seiter;

impl ListingSource for Seiter {
    fn name(&self) -> &'static str {
        "seiter"
    }

    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        format!(
            "{ORIGIN}/alugar/sc/florianopolis/dormitorios-2/vagas-1/valor-max_{}/ordem-valor/resultado-decrescente/quantidade-{PAGE_SIZE}/",
            limits.max_rent
        )
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let code_sel = selector("div.referencia span")?;
        let detail_sel = selector("div.detalhes div.detalhe")?;
        let span_sel = selector("span")?;
        let value_row_sel = selector("div.area_soma > div")?;
        let rent_sel = selector("span.texto_valor")?;
        let total_sel = selector("div.texto_valor b")?;
        let location_sel = selector("h4.localizacao span")?;

        let mut items = Vec::new();
        for card in doc.select(&selector("div#lista.todos_imoveis a")?) {
            let code = first_text(card, &code_sel);
            let Some(url) = attr(card, "href").and_then(|href| absolute_url(ORIGIN, &href)) else {
                continue;
            };

            let (mut rent, mut total) = (0.0, 0.0);
            for row in card.select(&value_row_sel) {
                let text = text_of(row);
                if text.contains("Aluguel") {
                    rent = parse_brl(&first_text(row, &rent_sel));
                } else if text.contains("Total") {
                    total = parse_brl(&first_text(row, &total_sel));
                }
            }

            let mut listing = Listing::new(self.name(), &code, url, rent).with_total(total);

            for detail in card.select(&detail_sel) {
                let text = text_of(detail);
                let spans: Vec<String> = detail.select(&span_sel).map(text_of).collect();
                let first = spans.first().map(String::as_str).unwrap_or_default();
                if text.contains("dormitório") {
                    listing.bedrooms = parse_count(first);
                } else if text.contains("suíte") {
                    listing.bathrooms = Some(1 + parse_count(first).unwrap_or(0));
                } else if text.contains("vaga") {
                    listing.parking_spots = parse_count(first);
                } else if text.contains("útil") {
                    // "<span>78.40</span><span>m²</span>": integer part of the second-to-last span
                    listing.area_sqm = spans
                        .len()
                        .checked_sub(2)
                        .and_then(|i| spans[i].split('.').next())
                        .map(parse_digits)
                        .and_then(positive);
                }
            }

            listing.neighborhood = first_text(card, &location_sel)
                .split(" - ")
                .next()
                .and_then(non_empty);
            items.push(listing);
        }
        Ok(PageBatch::untotaled(items))
    }
}

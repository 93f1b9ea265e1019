use anyhow::Result;
use scraper::Html;

use crate::crawler::cleaner::{non_empty, parse_brl, parse_count, parse_decimal_comma, positive};
use crate::crawler::dom::{absolute_url, attr, first_text, selector, text_of};
use crate::crawler::pagination::PageBatch;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

const ORIGIN: &str = "https://www.quadraimobiliaria.com.br";
const BASE_URL: &str = "https://www.quadraimobiliaria.com.br/imoveis/para-alugar/apartamento/florianopolis";
const PACKAGE_LABEL: &str = "Pacote de locação";

const NEIGHBORHOODS: [&str; 9] = [
    "Agronômica",
    "Carvoeira",
    "Córrego Grande",
    "Itacorubi",
    "João Paulo",
    "Monte Verde",
    "Pantanal",
    "Santa Mônica",
    "Trindade",
];

pub struct Quadra;

/// "Córrego Grande" → "córrego-grande"
fn path_slug(neighborhood: &str) -> String {
    neighborhood.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

impl ListingSource for Quadra {
    fn name(&self) -> &'static str {
        "quadra"
    }

    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        let slugs = NEIGHBORHOODS.map(path_slug).join("+");
        format!(
            "{BASE_URL}/{slugs}?vagas=1+&area={}+&preco-de-locacao=0~{}",
            limits.min_area, limits.max_rent
        )
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let fact_sel = selector("ul > li")?;
        let code_sel = selector(".card-with-buttons__code")?;
        let rent_sel = selector("p.card-with-buttons__value")?;
        let heading_sel = selector(".card-with-buttons__heading")?;

        let mut items = Vec::new();
        for card in doc.select(&selector("div.digital-result.digital-result__grid a")?) {
            let Some(url) = attr(card, "href").and_then(|href| absolute_url(ORIGIN, &href)) else {
                continue;
            };
            let code = first_text(card, &code_sel);
            let mut listing = Listing::new(self.name(), &code, url, parse_brl(&first_text(card, &rent_sel)));

            for li in card.select(&fact_sel) {
                let text = text_of(li);
                if text.contains("m²") {
                    listing.area_sqm = positive(parse_decimal_comma(&text));
                }
                if text.contains("Quartos") {
                    listing.bedrooms = parse_count(&text);
                }
                if text.contains("Banheiro") {
                    listing.bathrooms = parse_count(&text);
                }
                if text.contains("Vaga") {
                    listing.parking_spots = parse_count(&text);
                }
            }

            listing.neighborhood = first_text(card, &heading_sel).split('-').next().and_then(non_empty);
            items.push(listing);
        }
        Ok(PageBatch::untotaled(items))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    /// Total is the rental package from the detail panels; rent when absent.
    fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
        let doc = Html::parse_document(body);
        let package = doc
            .select(&selector("li.knl_panels-list")?)
            .map(text_of)
            .find_map(|text| text.split(PACKAGE_LABEL).nth(1).map(parse_brl))
            .unwrap_or(0.0);
        Ok(listing.with_total(package))
    }
}

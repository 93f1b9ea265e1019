use anyhow::Result;
use scraper::Html;

use crate::crawler::cleaner::{non_empty, parse_brl, parse_decimal_comma, positive};
use crate::crawler::dom::{attr, doc_text, first_text, last_path_segment, selector};
use crate::crawler::error::CrawlError;
use crate::crawler::pagination::PageBatch;
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

const BASE_URL: &str = "https://f1ciaimobiliaria.com.br/imoveis-para-alugar/";
const CITIES: [u32; 9] = [61, 92, 71, 34, 36, 74, 63, 47, 45];
const MIN_RENT: u32 = 1000;

pub struct F1;

impl ListingSource for F1 {
    fn name(&self) -> &'static str {
        "f1"
    }

    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        let cities = CITIES.map(|c| c.to_string()).join(",");
        Query::new()
            .push("jsf", "jet-engine:pesquisa")
            .push("tax", format!("tipo-de-imovel:8;cidade:{cities}"))
            .push("meta", format!("quartos!range:2_3;valor-do-aluguel!range:{}_{}", MIN_RENT, limits.max_rent))
            .push("sort", "orderby:meta_value_num;order:ASC;meta_key:valor-do-aluguel")
            .to_url(BASE_URL)
    }

    /// Overlay links only; the detail page carries everything else.
    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let items = doc
            .select(&selector("div.jet-engine-listing-overlay-wrap[data-url]")?)
            .filter_map(|el| attr(el, "data-url"))
            .filter_map(|url| {
                let slug = last_path_segment(&url)?;
                Some(Listing::new(self.name(), &slug, url, 0.0))
            })
            .collect();
        Ok(PageBatch::untotaled(items))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    fn enrich_detail(&self, mut listing: Listing, body: &str) -> Result<Listing> {
        let doc = Html::parse_document(body);

        // "Apartamento 2 quartos no bairro Trindade, Florianópolis – 1234"
        let title = doc_text(&doc, &selector("h1.elementor-heading-title.elementor-size-default")?);
        if let Some(code) = title.rsplit('–').next().and_then(non_empty).filter(|_| title.contains('–')) {
            listing.set_local_id(&code);
        }
        listing.neighborhood = title
            .split("no bairro")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .and_then(non_empty);

        let rent = doc_text(&doc, &selector(".elementor-element-7a5a988 .jet-listing-dynamic-field__content")?);
        if rent.is_empty() {
            return Err(CrawlError::Malformed { url: listing.listing_url.clone(), reason: "rent field missing".into() }.into());
        }
        listing.set_rent(parse_brl(&rent));
        let total = doc_text(&doc, &selector(".elementor-element-8c13aac .jet-listing-dynamic-field__content")?);
        listing = listing.with_total(parse_brl(&total));

        let title_sel = selector(".elementor-icon-box-title")?;
        let value_sel = selector(".elementor-icon-box-description")?;
        for widget in doc.select(&selector(".elementor-widget-icon-box")?) {
            let label = first_text(widget, &title_sel).to_lowercase();
            let value = parse_decimal_comma(&first_text(widget, &value_sel));
            match label.as_str() {
                "área total" => listing.area_sqm = positive(value),
                "quartos" => listing.bedrooms = Some(value as u32),
                "banheiros" => listing.bathrooms = Some(value as u32),
                "garagens" => listing.parking_spots = Some(value as u32),
                _ => {}
            }
        }
        Ok(listing)
    }
}

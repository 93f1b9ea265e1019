//! Results grid used by several Florianópolis agencies built on the same
//! real-estate CMS (`.imovel-box-single` cards, `pagina=` paging).

use anyhow::Result;
use scraper::Html;
use std::collections::HashMap;

use crate::crawler::cleaner::{amenity_key, clean_text, monthly_tax, non_empty, parse_brl, parse_count, parse_decimal_comma, parse_digits, positive};
use crate::crawler::dom::{absolute_url, attr, doc_text, first_text, selector, text_of};
use crate::crawler::pagination::PageBatch;
use crate::models::Listing;

pub const CARD: &str = ".imovel-box-single";

/// How the card's total is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxTotal {
    /// Site prints the package total under the grid.
    Grid,
    /// Rent + condo + IPTU (annual amounts spread over 12 months).
    Charges,
}

pub struct ImovelBoxSite {
    pub provider: &'static str,
    pub origin: &'static str,
    pub total: BoxTotal,
    pub neighborhood: fn(&str) -> Option<String>,
}

/// "Rua X - Trindade, Florianópolis" style: first `-` segment.
pub fn leading_segment(address: &str) -> Option<String> {
    address.split('-').next().and_then(non_empty)
}

/// "Rua X, 120, Trindade - Florianópolis/SC": third comma segment up to the dash.
pub fn third_comma_segment(address: &str) -> Option<String> {
    address
        .split(',')
        .nth(2)
        .and_then(|part| part.split('-').next())
        .and_then(non_empty)
}

impl ImovelBoxSite {
    pub fn parse_results(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let card_sel = selector(CARD)?;
        let rent_sel = selector(".thumb-price")?;
        let rent_alt_sel = selector(".item-price-rent")?;
        let condo_sel = selector(".item-price-condominio")?;
        let iptu_sel = selector(".item-price-iptu")?;
        let grid_total_sel = selector(".valor-total-grid-imovel b")?;
        let title_link_sel = selector(".titulo-anuncio a")?;
        let any_link_sel = selector("a[href*='/imovel/']")?;
        let address_sel = selector(r#"h3[itemprop="streetAddress"]"#)?;
        let amenity_sel = selector(".property-amenities.amenities-main > div")?;
        let small_sel = selector("small")?;
        let span_sel = selector("span")?;

        let mut items = Vec::new();
        for card in doc.select(&card_sel) {
            let Some(url) = card
                .select(&title_link_sel)
                .chain(card.select(&any_link_sel))
                .find_map(|a| attr(a, "href"))
                .and_then(|href| absolute_url(self.origin, &href))
            else {
                continue;
            };
            let local_id = url
                .split("imovel/")
                .nth(1)
                .and_then(|rest| rest.split('/').next())
                .unwrap_or_default()
                .to_string();

            let mut rent_text = first_text(card, &rent_sel);
            if rent_text.is_empty() {
                rent_text = first_text(card, &rent_alt_sel);
            }
            let rent = parse_brl(&rent_text);

            let mut listing = Listing::new(self.provider, &local_id, url, rent);
            listing = match self.total {
                BoxTotal::Grid => listing.with_total(parse_brl(&first_text(card, &grid_total_sel))),
                BoxTotal::Charges => listing.with_charges(
                    parse_brl(&first_text(card, &condo_sel)),
                    monthly_tax(parse_brl(&first_text(card, &iptu_sel))),
                ),
            };

            listing.neighborhood = (self.neighborhood)(&first_text(card, &address_sel));

            let mut amenities: HashMap<String, String> = HashMap::new();
            for div in card.select(&amenity_sel) {
                let key = amenity_key(&first_text(div, &small_sel));
                let value = div.select(&span_sel).next().map(text_of).unwrap_or_default();
                amenities.insert(key, value);
            }
            let count = |key: &str| amenities.get(key).and_then(|v| parse_count(v));

            listing.area_sqm = amenities.get("privat").map(|v| parse_decimal_comma(v)).and_then(positive);
            listing.bedrooms = count("quartos");
            listing.bathrooms = Some(count("suite").filter(|n| *n > 0).map_or(1, |suites| suites + 1));
            listing.parking_spots = count("vaga");

            items.push(listing);
        }

        let totals = clean_text(&doc_text(&doc, &selector("p.result-totals-phrase")?));
        let reported_total = (!totals.is_empty()).then(|| parse_digits(&totals) as usize);

        Ok(PageBatch::new(items, reported_total))
    }
}

//! Layout shared by the `/busca` family of sites (realizar, lideranca, floripa-imob).
//!
//! Result cards only carry a link; every field comes from the detail page.

use anyhow::Result;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

use crate::crawler::cleaner::{non_empty, parse_brl};
use crate::crawler::dom::{absolute_url, attr, doc_text, last_path_segment, last_text, selector, text_of};
use crate::crawler::error::CrawlError;
use crate::models::Listing;

pub const RESULTS_READY: &str = "div.mb-10 > div > a";
pub const DETAIL_READY: &str = "section.flex.flex-col.gap-8";

const CODE_BADGE: &str = ".bg-white.text-brand.py-1.px-3.text-xs.font-medium.rounded-full";
const VALUES_BOX: &str = "div.flex.flex-col.items-start.pb-6";
const RENT: &str = "span.flex-shrink-0.text-2xl.font-bold.pb-4";

static AREA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:m2|m²)").expect("area regex is valid"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("number regex is valid"));
static RESULT_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"de\s+(\d+)").expect("count regex is valid"));

pub struct BuscaLayout {
    pub provider: &'static str,
    pub origin: &'static str,
    pub card: &'static str,
    pub neighborhood: &'static str,
}

impl BuscaLayout {
    pub fn search_base(&self) -> String {
        format!("{}/busca", self.origin)
    }

    /// Stub listings (rent still unknown) for every card link.
    pub fn cards(&self, body: &str) -> Result<Vec<Listing>> {
        let doc = Html::parse_document(body);
        let card = selector(self.card)?;
        Ok(doc
            .select(&card)
            .filter_map(|a| attr(a, "href"))
            .filter_map(|href| {
                let url = absolute_url(self.origin, &href)?;
                let slug = last_path_segment(&url)?;
                Some(Listing::new(self.provider, &slug, url, 0.0))
            })
            .collect())
    }

    /// Fill a stub from its detail page.
    pub fn enrich(&self, mut listing: Listing, body: &str) -> Result<Listing> {
        let doc = Html::parse_document(body);

        let badge = doc_text(&doc, &selector(CODE_BADGE)?);
        if let Some(code) = badge.split_whitespace().nth(1) {
            listing.set_local_id(code);
        }

        let (rent, condo, iptu) = values_box(&doc).ok_or_else(|| CrawlError::Malformed {
            url: listing.listing_url.clone(),
            reason: "price box missing".to_string(),
        })?;
        listing.set_rent(rent);
        listing = listing.with_charges(condo, iptu);

        listing.neighborhood = doc_text(&doc, &selector(self.neighborhood)?)
            .split(',')
            .next()
            .and_then(non_empty);

        let facts = characteristics(&doc)?;
        listing.area_sqm = facts.area;
        listing.bedrooms = facts.bedrooms;
        listing.bathrooms = facts.bathrooms;
        listing.parking_spots = facts.parking;
        Ok(listing)
    }
}

/// "Mostrando 1 - 12 de 37 imóveis" → Some(37)
pub fn result_count(body: &str) -> Result<Option<usize>> {
    let doc = Html::parse_document(body);
    let text = doc_text(&doc, &selector("span.text-base.font-normal")?);
    Ok(RESULT_COUNT
        .captures(&text)
        .and_then(|c| c[1].parse().ok()))
}

/// (rent, condo fee, IPTU) from the first values box.
fn values_box(doc: &Html) -> Option<(f64, f64, f64)> {
    let boxed = doc.select(&selector(VALUES_BOX).ok()?).next()?;
    let rent = parse_brl(&last_text(boxed, &selector(RENT).ok()?));

    let row_sel = selector(".py-3").ok()?;
    let label_sel = selector(".flex-1 span").ok()?;
    let span_sel = selector("span").ok()?;
    let (mut condo, mut iptu) = (0.0, 0.0);
    for row in boxed.select(&row_sel) {
        let label = row.select(&label_sel).next().map(text_of).unwrap_or_default().to_lowercase();
        let amount = row.select(&span_sel).nth(1).map(text_of).unwrap_or_default();
        if label.contains("condom") {
            condo = parse_brl(&amount);
        } else if label.contains("iptu") {
            iptu = parse_brl(&amount);
        }
    }
    Some((rent, condo, iptu))
}

#[derive(Debug, Default, PartialEq)]
struct Characteristics {
    area: Option<f64>,
    bedrooms: Option<u32>,
    bathrooms: Option<u32>,
    parking: Option<u32>,
}

/// The `<ul>` next to the "Características" heading.
fn characteristics(doc: &Html) -> Result<Characteristics> {
    let mut facts = Characteristics::default();
    let heading = doc
        .select(&selector("h4")?)
        .find(|h| text_of(*h).to_lowercase().contains("caracter"));
    let Some(container) = heading.and_then(|h| h.parent()).and_then(ElementRef::wrap) else {
        return Ok(facts);
    };
    let Some(list) = container.select(&selector("ul")?).next() else {
        return Ok(facts);
    };

    let first_number = |text: &str| NUMBER.captures(text).and_then(|c| c[1].parse::<u32>().ok());
    for item in list.children().filter_map(ElementRef::wrap) {
        let text = text_of(item).to_lowercase();
        if text.contains("privat") || text.contains("área") {
            if let Some(area) = AREA.captures(&text).and_then(|c| c[1].parse::<f64>().ok()) {
                facts.area = Some(area);
            }
        }
        if text.contains("dormit") {
            facts.bedrooms = first_number(&text).or(facts.bedrooms);
        }
        if text.contains("banheiro") {
            facts.bathrooms = first_number(&text).or(facts.bathrooms);
        }
        if text.contains("vaga") {
            facts.parking = first_number(&text).or(facts.parking);
        }
    }
    Ok(facts)
}


#[cfg(test)]
mod tests {
    use super::fixtures::detail_page;
    use super::*;

    const LAYOUT: BuscaLayout = BuscaLayout {
        provider: "realizar",
        origin: "https://realizar.test",
        card: "div.mb-10 > div > a",
        neighborhood: "h3.text-sm.font-medium",
    };

    #[test]
    fn cards_become_absolute_stubs() {
        let body = r#"<div class="mb-10"><div><a href="/imovel/apto-trindade-77">x</a></div>
                      <div><a href="">empty</a></div></div>"#;
        let stubs = LAYOUT.cards(body).unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].listing_url, "https://realizar.test/imovel/apto-trindade-77");
        assert_eq!(stubs[0].id, "realizar_apto-trindade-77");
        assert_eq!(stubs[0].total_value, 0.0);
    }

    #[test]
    fn detail_page_fills_every_field() {
        let stub = Listing::new("realizar", "apto-77", "https://realizar.test/imovel/apto-77", 0.0);
        let l = LAYOUT
            .enrich(stub, &detail_page("4821", "font-medium", "Trindade, Florianópolis"))
            .unwrap();

        assert_eq!(l.id, "realizar_4821");
        assert_eq!(l.rent_value, 2800.0);
        assert_eq!(l.total_value, 2800.0 + 650.0 + 95.5);
        assert_eq!(l.neighborhood.as_deref(), Some("Trindade"));
        assert_eq!(l.area_sqm, Some(82.0));
        assert_eq!(l.bedrooms, Some(3));
        assert_eq!(l.bathrooms, Some(2));
        assert_eq!(l.parking_spots, Some(1));
    }

    #[test]
    fn page_without_price_box_is_malformed() {
        let stub = Listing::new("realizar", "apto-77", "https://realizar.test/imovel/apto-77", 0.0);
        let err = LAYOUT.enrich(stub, "<html><body>Imóvel indisponível</body></html>").unwrap_err();
        assert!(err.to_string().contains("price box missing"));
    }

    #[test]
    fn counts_results_from_summary_span() {
        let body = r#"<span class="text-base font-normal">Mostrando 1 - 12 de 37 imóveis</span>"#;
        assert_eq!(result_count(body).unwrap(), Some(37));
        assert_eq!(result_count("<p>nada</p>").unwrap(), None);
    }
}

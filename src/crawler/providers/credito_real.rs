use anyhow::Result;
use scraper::Html;
use serde::Serialize;

use crate::crawler::cleaner::{non_empty, parse_brl, parse_decimal_comma, parse_digits, parse_leading_int, positive};
use crate::crawler::dom::{absolute_url, attr, doc_text, first_text, selector, text_of};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::encode_component;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const ORIGIN: &str = "https://www.creditoreal.com.br";
const BASE_URL: &str = "https://www.creditoreal.com.br/alugueis/florianopolis-sc/apartamento-residencial";

const PROPERTY_TYPES: [&str; 6] = [
    "Apartamento Garden",
    "Cobertura",
    "Casa em Condomínio",
    "Casa Geminada",
    "Casa Sobrado",
    "Apartamento",
];

const NEIGHBORHOODS: [&str; 10] = [
    "Agronômica",
    "Carvoeira",
    "Córrego Grande",
    "Itacorubi",
    "João Paulo",
    "Monte Verde",
    "Pantanal",
    "Santa Mônica",
    "Trindade",
    "Parque São Jorge",
];

pub(super) const CARD_RENT: &str = r#"section > div > div > p[type="text.body"]"#;
pub(super) const CARD_TOTAL: &str = "section > div > div > label";

pub struct CreditoReal;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchFilter {
    value_type: bool,
    imovel_types: [&'static str; 6],
    neighborhoods: [&'static str; 10],
    city_state: &'static str,
    final_value: u64,
    area_initial_value: u64,
    parking: u32,
}

impl CreditoReal {
    /// The search filter travels as a percent-encoded JSON object used as a bare query key.
    fn filter_component(limits: &SearchLimits) -> String {
        let filter = SearchFilter {
            value_type: true,
            imovel_types: PROPERTY_TYPES,
            neighborhoods: NEIGHBORHOODS,
            city_state: "Florianópolis_SC",
            final_value: limits.max_rent.round() as u64,
            area_initial_value: limits.min_area.round() as u64,
            parking: 1,
        };
        encode_component(&serde_json::to_string(&filter).unwrap_or_default())
    }
}

impl ListingSource for CreditoReal {
    fn name(&self) -> &'static str {
        "creditoReal"
    }

    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        format!("{}?{}&orderBy=2&page={}", BASE_URL, Self::filter_component(limits), page)
    }

    /// Only the first page's heading carries a trustworthy count.
    fn paging(&self) -> Paging {
        Paging::Numbered(TotalPolicy::FirstReported)
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let card_sel = selector("#teste .bRuoBA a")?;
        let rent_sel = selector(CARD_RENT)?;
        let total_sel = selector(CARD_TOTAL)?;

        let items = doc
            .select(&card_sel)
            .filter_map(|a| {
                let href = attr(a, "href")?;
                let code = href.split("-cod-").nth(1)?.trim_end_matches('/').to_string();
                let url = absolute_url(ORIGIN, &href)?;
                let rent = parse_brl(&first_text(a, &rent_sel));
                Some(Listing::new(self.name(), &code, url, rent).with_total(parse_brl(&first_text(a, &total_sel))))
            })
            .collect();

        let heading = doc_text(&doc, &selector("h1.sc-8c367b3a-6.dowwpi")?);
        let reported_total = (!heading.is_empty()).then(|| parse_digits(&heading) as usize);
        Ok(PageBatch::new(items, reported_total))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
        enrich_facts(listing, body)
    }
}

/// Neighborhood link and the facts strip of a Crédito Real style detail page.
pub(super) fn enrich_facts(mut listing: Listing, body: &str) -> Result<Listing> {
    let doc = Html::parse_document(body);

    listing.neighborhood = non_empty(&doc_text(&doc, &selector(r#"ul.sc-ce6dfd33-0 a[href*="/bairro/"]"#)?));

    for fact in doc.select(&selector("ul.sc-8f61197d-0.huQLXI p.sc-8c367b3a-1.jkcvKL")?) {
        let info = text_of(fact);
        if info.contains("m²") {
            listing.area_sqm = positive(parse_decimal_comma(&info));
        } else if info.contains("quarto") {
            listing.bedrooms = parse_leading_int(&info);
        } else if info.contains("banheiro") {
            listing.bathrooms = parse_leading_int(&info);
        } else if info.contains("vaga") {
            listing.parking_spots = parse_leading_int(&info);
        }
    }
    Ok(listing)
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub fn card(href: &str, rent: &str, total: &str) -> String {
        format!(
            r#"<a href="{href}"><section><div><div>
                 <p type="text.body">{rent}</p><label>{total}</label>
               </div></div></section></a>"#
        )
    }

    pub fn detail(neighborhood: &str) -> String {
        format!(
            r#"<html><body>
              <ul class="sc-ce6dfd33-0"><li><a href="/alugueis/florianopolis-sc/bairro/x">{neighborhood}</a></li></ul>
              <ul class="sc-8f61197d-0 huQLXI">
                <li><p class="sc-8c367b3a-1 jkcvKL">84 m²</p></li>
                <li><p class="sc-8c367b3a-1 jkcvKL">3 quartos</p></li>
                <li><p class="sc-8c367b3a-1 jkcvKL">2 banheiros</p></li>
                <li><p class="sc-8c367b3a-1 jkcvKL">1 vaga</p></li>
              </ul></body></html>"#
        )
    }
}

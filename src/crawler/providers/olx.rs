//! OLX renders results client-side but embeds them as Next.js page data.

use anyhow::{Context, Result};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

use crate::crawler::cleaner::{monthly_tax, non_empty, parse_brl, parse_decimal_comma, parse_digits, parse_leading_int, positive};
use crate::crawler::dom::{doc_text, selector};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const BASE_URL: &str = "https://www.olx.com.br/imoveis/aluguel/estado-sc/florianopolis-e-regiao/leste/trindade";

#[derive(Debug, Deserialize)]
struct NextData {
    props: NextProps,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextProps {
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(default)]
    ads: Vec<Ad>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ad {
    list_id: Option<u64>,
    price_value: Option<Value>,
    friendly_url: Option<String>,
    #[serde(default)]
    properties: Vec<Property>,
    location_details: Option<LocationDetails>,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct LocationDetails {
    neighbourhood: Option<String>,
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Ad {
    fn property(&self, name: &str) -> String {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| value_text(&p.value))
            .unwrap_or_default()
    }

    fn into_listing(self) -> Option<Listing> {
        let id = self.list_id?;
        let url = self.friendly_url.clone()?;
        let rent = parse_brl(&self.price_value.as_ref().map(value_text).unwrap_or_default());

        let condo = parse_brl(&self.property("condominio"));
        let iptu = monthly_tax(parse_brl(&self.property("iptu")));

        let mut listing = Listing::new("olx", &id.to_string(), url, rent).with_charges(condo, iptu);
        listing.area_sqm = positive(parse_decimal_comma(&self.property("size")));
        listing.bedrooms = parse_leading_int(&self.property("rooms"));
        listing.bathrooms = parse_leading_int(&self.property("bathrooms"));
        listing.parking_spots = parse_leading_int(&self.property("garage_spaces"));
        listing.neighborhood = self
            .location_details
            .and_then(|d| d.neighbourhood)
            .and_then(|n| non_empty(&n));
        Some(listing)
    }
}

pub struct Olx;

impl ListingSource for Olx {
    fn name(&self) -> &'static str {
        "olx"
    }

    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        Query::new()
            .push("pe", limits.max_rent)
            .push_all("gsp", [1, 2])
            .push("ss", limits.min_area)
            .push("ret", 1020)
            .push("o", page)
            .to_url(BASE_URL)
    }

    fn paging(&self) -> Paging {
        Paging::Numbered(TotalPolicy::LatestReported)
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);

        // "1 - 50 de 230 resultados": the count is the second-to-last word
        let summary = doc_text(&doc, &selector(".text-neutral-110")?);
        let words: Vec<&str> = summary.split_whitespace().collect();
        let reported_total = words
            .len()
            .checked_sub(2)
            .map(|i| parse_digits(words[i]) as usize)
            .filter(|t| *t > 0);

        let script = doc
            .select(&selector("script#__NEXT_DATA__")?)
            .next()
            .map(|s| s.text().collect::<String>());
        let Some(script) = script else {
            return Ok(PageBatch::new(Vec::new(), reported_total));
        };

        let data: NextData = serde_json::from_str(&script).context("Unexpected __NEXT_DATA__ shape")?;
        let items = data.props.page_props.ads.into_iter().filter_map(Ad::into_listing).collect();
        Ok(PageBatch::new(items, reported_total))
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some("h1.olx-text--bold")
    }
}

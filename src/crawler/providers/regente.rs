use anyhow::Result;
use scraper::Html;

use super::credito_real::{CARD_RENT, CARD_TOTAL, enrich_facts};
use crate::crawler::cleaner::parse_brl;
use crate::crawler::dom::{absolute_url, attr, first_text, selector};
use crate::crawler::pagination::PageBatch;
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, SearchLimits};
use crate::models::Listing;

const ORIGIN: &str = "https://regenteimoveis.com.br";
const BASE_URL: &str = "https://regenteimoveis.com.br/pesquisar-imovel/";

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

/// Regente runs the same storefront as Crédito Real, without paging.
pub struct Regente;

impl ListingSource for Regente {
    fn name(&self) -> &'static str {
        "regente"
    }

    fn page_url(&self, limits: &SearchLimits, _page: u32) -> String {
        Query::new()
            .push("finalidade", "Aluguel")
            .push("tipo_imovel", "Apartamento")
            .push("preco_max", limits.max_rent)
            .push_all("vagas", [1, 2])
            .push("area_min", limits.min_area)
            .push("bairro", NEIGHBORHOODS.join(","))
            .to_url(BASE_URL)
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        let doc = Html::parse_document(body);
        let link_sel = selector("a[href]")?;
        let rent_sel = selector(CARD_RENT)?;
        let total_sel = selector(CARD_TOTAL)?;

        let items = doc
            .select(&selector("div#property")?)
            .filter_map(|card| {
                let href = attr(card, "href").or_else(|| card.select(&link_sel).find_map(|a| attr(a, "href")))?;
                let code = href.split("-cod-").nth(1)?.trim_end_matches('/').to_string();
                let url = absolute_url(ORIGIN, &href)?;
                let rent = parse_brl(&first_text(card, &rent_sel));
                Some(Listing::new(self.name(), &code, url, rent).with_total(parse_brl(&first_text(card, &total_sel))))
            })
            .collect();
        Ok(PageBatch::untotaled(items))
    }

    fn detail_url(&self, listing: &Listing) -> Option<String> {
        Some(listing.listing_url.clone())
    }

    fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
        enrich_facts(listing, body)
    }
}

#[cfg(test)]
mod tests {
    use super::super::credito_real::fixtures::{card, detail};
    use super::*;
    use crate::crawler::scrape_with;
    use crate::crawler::testing::FixtureTransport;

    #[test]
    fn search_url_lists_neighborhoods_comma_joined() {
        let url = Regente.page_url(&SearchLimits::default(), 1);
        assert!(url.starts_with(&format!("{BASE_URL}?finalidade=Aluguel&tipo_imovel=Apartamento&preco_max=4000&vagas=1&vagas=2&area_min=70&bairro=")));
        assert!(url.contains("Agron%C3%B4mica%2CCarvoeira%2CC%C3%B3rrego+Grande"));
        assert!(url.ends_with("Trindade"));
    }

    #[tokio::test]
    async fn single_page_with_detail_facts() {
        let limits = SearchLimits::default();
        let page = format!(
            r#"<html><body>
                 <div id="property" href="/imovel/apartamento-trindade-cod-R55">{}</div>
                 <div id="property">{}</div>
                 <div id="property"><span>sem link</span></div>
               </body></html>"#,
            card("/ignored", "R$ 2.100", "R$ 2.700"),
            card("/imovel/apartamento-itacorubi-cod-R56", "R$ 3.000", "R$ 3.400"),
        );
        let fixture = FixtureTransport::new()
            .with_page(Regente.page_url(&limits, 1), page)
            .with_page(format!("{ORIGIN}/imovel/apartamento-trindade-cod-R55"), detail("Trindade"));

        let listings = scrape_with(&Regente, &fixture, &limits).await.unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].id, "regente_R55");
        assert_eq!(listings[0].total_value, 2700.0);
        assert_eq!(listings[0].bedrooms, Some(3));
        assert_eq!(listings[0].neighborhood.as_deref(), Some("Trindade"));
        assert_eq!(listings[1].id, "regente_R56");
        assert_eq!(listings[1].listing_url, format!("{ORIGIN}/imovel/apartamento-itacorubi-cod-R56"));
        assert_eq!(listings[1].bedrooms, None);
    }
}

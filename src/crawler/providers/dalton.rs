use anyhow::Result;

use super::imovel_box::{BoxTotal, CARD, ImovelBoxSite, third_comma_segment};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const BASE_URL: &str = "https://daltonandrade.com.br/aluguel/apartamento/florianopolis/2-3-dormitorios/com-vaga/";

const SITE: ImovelBoxSite = ImovelBoxSite {
    provider: "daltonandrade",
    origin: "https://daltonandrade.com.br",
    total: BoxTotal::Grid,
    neighborhood: third_comma_segment,
};

pub struct DaltonAndrade;

impl ListingSource for DaltonAndrade {
    fn name(&self) -> &'static str {
        SITE.provider
    }

    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        Query::new()
            .push("categoriagrupo", "Residencial")
            .push("finalidade", "aluguel")
            .push("tipo[]", "apartamento")
            .push("cidadebairro[]", "florianopolis")
            .push_all("dormitorios[]", [2, 3])
            .push("vagas[]", 1)
            .push("valorlocacao", format!("0,{}", limits.max_rent))
            .push("area", format!("{},509", limits.min_area))
            .push("ordenar", "precoAsc")
            .push("pagina", page)
            .to_url(BASE_URL)
    }

    fn paging(&self) -> Paging {
        Paging::Numbered(TotalPolicy::LatestReported)
    }

    fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
        SITE.parse_results(body)
    }

    fn ready_selector(&self) -> Option<&'static str> {
        Some(CARD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::providers::imovel_box::fixtures::{Card, results_page};

    #[test]
    fn search_url_orders_by_price() {
        let url = DaltonAndrade.page_url(&SearchLimits { max_rent: 3200.0, ..SearchLimits::default() }, 1);
        assert!(url.contains("tipo%5B%5D=apartamento&cidadebairro%5B%5D=florianopolis&dormitorios%5B%5D=2&dormitorios%5B%5D=3"));
        assert!(url.ends_with("valorlocacao=0%2C3200&area=70%2C509&ordenar=precoAsc&pagina=1"));
    }

    #[test]
    fn uses_grid_total_and_third_address_segment() {
        let body = results_page(
            &[Card {
                slug: "5521",
                rent: "R$ 2.900",
                condo: "",
                iptu: "",
                grid_total: "R$ 3.480",
                address: "Rua Delminda Silveira, 300, Agronômica - Florianópolis",
                suites: None,
            }],
            Some(1),
        );
        let page = DaltonAndrade.extract_list_page(&body).unwrap();
        let l = &page.items[0];
        assert_eq!(l.id, "daltonandrade_5521");
        assert_eq!(l.listing_url, "https://daltonandrade.com.br/imovel/5521/");
        assert_eq!(l.rent_value, 2900.0);
        assert_eq!(l.total_value, 3480.0);
        assert_eq!(l.neighborhood.as_deref(), Some("Agronômica"));
    }
}

use anyhow::Result;

use super::imovel_box::{BoxTotal, CARD, ImovelBoxSite, leading_segment};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const BASE_URL: &str = "https://dudaimoveis.com.br/aluguel/apartamento/florianopolis/monte-verde/com-vaga/";

const NEIGHBORHOODS: [&str; 8] = [
    "trindade",
    "joao-paulo",
    "itacorubi",
    "carvoeira",
    "corrego-grande",
    "pantanal",
    "agronomica",
    "monte-verde",
];

const SITE: ImovelBoxSite = ImovelBoxSite {
    provider: "duda",
    origin: "https://dudaimoveis.com.br",
    total: BoxTotal::Charges,
    neighborhood: leading_segment,
};

pub struct Duda;

impl ListingSource for Duda {
    fn name(&self) -> &'static str {
        SITE.provider
    }

    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        Query::new()
            .push("categoriagrupo", "Residencial")
            .push("finalidade", "aluguel")
            .push("tipo_residencial[]", "apartamento")
            .push_all("cidadebairro[]", NEIGHBORHOODS.iter().map(|n| format!("florianopolis, {n}")))
            .push("vagas[]", 1)
            .push("valorvenda", "0,1099999")
            .push("valorlocacao", format!("0,{}", limits.max_rent))
            .push("area", format!("{},509", limits.min_area))
            .push("codigo", "")
            .push("ordenar", "exclusivosDesc")
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

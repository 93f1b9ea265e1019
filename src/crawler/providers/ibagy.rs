use anyhow::Result;

use super::imovel_box::{BoxTotal, CARD, ImovelBoxSite, third_comma_segment};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const BASE_URL: &str = "https://ibagy.com.br/aluguel/apartamento/florianopolis/trindade/com-vaga/";

const NEIGHBORHOODS: [&str; 9] = [
    "agronomica",
    "carvoeira",
    "corrego-grande",
    "itacorubi",
    "joao-paulo",
    "monte-verde",
    "pantanal",
    "santa-monica",
    "trindade",
];

const SITE: ImovelBoxSite = ImovelBoxSite {
    provider: "ibagy",
    origin: "https://ibagy.com.br",
    total: BoxTotal::Grid,
    neighborhood: third_comma_segment,
};

pub struct Ibagy;

impl ListingSource for Ibagy {
    fn name(&self) -> &'static str {
        SITE.provider
    }

    /// `filterpacote=Sim` makes the grid show the rent package total.
    fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
        Query::new()
            .push("categoriagrupo", "Residencial")
            .push("finalidade", "aluguel")
            .push("tipo_residencial[]", "apartamento")
            .push_all("cidadebairro[]", NEIGHBORHOODS.iter().map(|n| format!("florianopolis, {n}")))
            .push_all("dormitorios[]", [2, 3])
            .push("vagas[]", 1)
            .push("valorlocacao", format!("0,{}", limits.max_rent))
            .push("filterpacote", "Sim")
            .push("area", format!("{},509", limits.min_area))
            .push("ordenar", "maior_area_priv")
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

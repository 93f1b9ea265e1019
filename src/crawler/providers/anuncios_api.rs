//! JSON search API (`/api/anuncios/search`) shared by sanremo and gralha.

use anyhow::{Context, Result};
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crawler::cleaner::{non_empty, parse_brl, positive};
use crate::crawler::dom::{doc_text, selector};
use crate::crawler::pagination::{PageBatch, TotalPolicy};
use crate::crawler::query::Query;
use crate::crawler::{ListingSource, Paging, SearchLimits};
use crate::models::Listing;

const CHARGES_BOX: &str = ".BoxFloat_Values_Complementation";

/// City suggestion the API expects, serialized as a one-element JSON array.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CitySuggestion {
    tipo_id: u32,
    tipo: &'static str,
    titulo: &'static str,
    slug: &'static str,
    bairro_id: u32,
    bairro: Option<String>,
    cidade_id: u32,
    cidade: &'static str,
    estado_sigla: &'static str,
    empreendimento: Option<String>,
    condominio: Option<String>,
    agrupamento_id: Option<u32>,
    agrupamento: Option<String>,
}

impl CitySuggestion {
    fn florianopolis(cidade_id: u32) -> Self {
        Self {
            tipo_id: 0,
            tipo: "Cidades",
            titulo: "Florianópolis - SC",
            slug: "cidade+sc+florianopolis",
            bairro_id: 0,
            bairro: None,
            cidade_id,
            cidade: "Florianópolis",
            estado_sigla: "SC",
            empreendimento: None,
            condominio: None,
            agrupamento_id: None,
            agrupamento: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    total: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    #[serde(default)]
    id: Value,
    url: Option<String>,
    #[serde(default)]
    codigo: Value,
    #[serde(default)]
    valor_locacao: Option<f64>,
    bairro: Option<String>,
    area_construida: Option<f64>,
    quartos: Option<u32>,
    banheiros: Option<u32>,
    vagas: Option<u32>,
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct AnunciosSite {
    pub provider: &'static str,
    pub origin: &'static str,
    pub city_id: u32,
    pub parking: &'static str,
    pub order: Option<&'static str>,
}

impl AnunciosSite {
    pub fn search_url(&self, limits: &SearchLimits, page: u32) -> String {
        let suggest = serde_json::to_string(&[CitySuggestion::florianopolis(self.city_id)]).unwrap_or_default();
        let mut query = Query::new().push("suggest", suggest);
        if let Some(order) = self.order {
            query = query.push("ordem", order);
        }
        query
            .push("finalidade", "aluguel")
            .push("tipos", "apartamento")
            .push("valorMaximo", limits.max_rent)
            .push("quartos", "2, 3")
            .push("vagas", self.parking)
            .push("areaMinima", limits.min_area)
            .push("page", page)
            .to_url(&format!("{}/api/anuncios/search", self.origin))
    }

    pub fn parse_search(&self, body: &str) -> Result<PageBatch<Listing>> {
        let response: SearchResponse =
            serde_json::from_str(body).with_context(|| format!("{}: unexpected search response", self.provider))?;

        let items = response
            .items
            .into_iter()
            .filter_map(|item| {
                let code = scalar_text(&item.codigo)?;
                let id = scalar_text(&item.id)?;
                let slug = item.url.as_deref().and_then(non_empty)?;
                let url = format!("{}/imovel/{}/{}", self.origin, slug, id);

                let mut listing = Listing::new(self.provider, &code, url, item.valor_locacao.unwrap_or(0.0));
                listing.neighborhood = item.bairro.as_deref().and_then(non_empty);
                listing.area_sqm = item.area_construida.and_then(positive);
                listing.bedrooms = item.quartos;
                listing.bathrooms = item.banheiros;
                listing.parking_spots = item.vagas;
                Some(listing)
            })
            .collect();

        Ok(PageBatch::new(items, response.total.filter(|t| *t > 0)))
    }

    /// Adds IPTU and condo fee from the detail page; a page without the box
    /// leaves the total at rent.
    pub fn parse_charges(&self, listing: Listing, body: &str) -> Result<Listing> {
        let doc = Html::parse_document(body);
        if doc.select(&selector(CHARGES_BOX)?).next().is_none() {
            return Ok(listing);
        }
        let iptu = parse_brl(&doc_text(&doc, &selector(&format!("{CHARGES_BOX} p:nth-child(1) strong"))?));
        let condo = parse_brl(&doc_text(&doc, &selector(&format!("{CHARGES_BOX} p:nth-child(2) strong"))?));
        Ok(listing.with_charges(condo, iptu))
    }
}

const SANREMO: AnunciosSite = AnunciosSite {
    provider: "sanremo",
    origin: "https://www.sanremoimoveis.com.br",
    city_id: 35,
    parking: "1",
    order: Some("Menor Valor"),
};

const GRALHA: AnunciosSite = AnunciosSite {
    provider: "gralha",
    origin: "https://www.gralhaalugueis.com.br",
    city_id: 34,
    parking: "1, 2",
    order: None,
};

macro_rules! anuncios_source {
    ($name:ident, $site:expr) => {
        pub struct $name;

        impl ListingSource for $name {
            fn name(&self) -> &'static str {
                $site.provider
            }

            fn page_url(&self, limits: &SearchLimits, page: u32) -> String {
                $site.search_url(limits, page)
            }

            fn paging(&self) -> Paging {
                Paging::Numbered(TotalPolicy::LatestReported)
            }

            fn keeps_partial_pages(&self) -> bool {
                true
            }

            fn extract_list_page(&self, body: &str) -> Result<PageBatch<Listing>> {
                $site.parse_search(body)
            }

            fn detail_url(&self, listing: &Listing) -> Option<String> {
                Some(listing.listing_url.clone())
            }

            fn enrich_detail(&self, listing: Listing, body: &str) -> Result<Listing> {
                $site.parse_charges(listing, body)
            }
        }
    };
}

anuncios_source!(Sanremo, SANREMO);
anuncios_source!(Gralha, GRALHA);

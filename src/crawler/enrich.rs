//! Per-listing detail-page enrichment with bounded fan-out.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{ListingSource, Transport};
use crate::models::Listing;

/// Enrich every listing that has a detail URL, at most `limit` fetches in flight.
/// Output order matches input order. A failed item keeps its list-page fields.
pub async fn enrich_bounded<S>(
    source: &S,
    transport: &dyn Transport,
    listings: Vec<Listing>,
    limit: usize,
) -> Vec<Listing>
where
    S: ListingSource + ?Sized,
{
    let limit = limit.clamp(1, transport.parallelism().max(1));
    debug!("{}: enriching {} listings ({} at a time)", source.name(), listings.len(), limit);

    stream::iter(listings.into_iter().map(|listing| enrich_one(source, transport, listing)))
        .buffered(limit)
        .collect()
        .await
}

async fn enrich_one<S>(source: &S, transport: &dyn Transport, listing: Listing) -> Listing
where
    S: ListingSource + ?Sized,
{
    let Some(url) = source.detail_url(&listing) else {
        return listing;
    };

    let body = match transport.fetch(&url, source.detail_ready_selector()).await {
        Ok(body) => body,
        Err(e) => {
            warn!("{}: detail fetch failed for {}: {:#}", source.name(), listing.id, e);
            return listing;
        }
    };

    match source.enrich_detail(listing.clone(), &body) {
        Ok(enriched) => enriched,
        Err(e) => {
            warn!("{}: detail parse failed for {}: {:#}", source.name(), listing.id, e);
            listing
        }
    }
}

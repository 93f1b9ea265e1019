//! Read path: merge provider snapshots, overlay annotations, filter, paginate.

use crate::models::{Annotation, AnnotationUpdate, Facets, Listing, ListingPage, ReadOptions};
use crate::storage::{AnnotationMap, AnnotationStore, SnapshotStore};
use anyhow::Result;
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub struct Catalog {
    snapshots: SnapshotStore,
    annotations: AnnotationStore,
    /// Provider names in registry order.
    providers: Vec<String>,
}

impl Catalog {
    pub fn new(snapshots: SnapshotStore, annotations: AnnotationStore, providers: Vec<String>) -> Self {
        Self { snapshots, annotations, providers }
    }

    /// Merged, annotated view of every snapshot. Never fails: unreadable files
    /// contribute nothing.
    pub async fn read_annotated(&self, options: &ReadOptions) -> ListingPage {
        let mut merged = self.load_snapshots().await;

        // Stable: equal totals keep snapshot order.
        merged.sort_by(|a, b| a.total_value.total_cmp(&b.total_value));

        let annotations = self.load_annotations().await;
        for listing in &mut merged {
            if let Some(annotation) = annotations.get(&listing.id) {
                listing.apply_annotation(annotation);
            }
        }

        merged.retain(|l| l.total_value > 0.0);

        if options.all {
            let total = merged.len();
            return ListingPage { items: merged, total };
        }

        if let Some(filters) = &options.filters {
            merged.retain(|l| filters.matches(l));
        }

        let total = merged.len();
        let items = match (options.page, options.limit) {
            (Some(page), Some(limit)) if page > 0 && limit > 0 => {
                let start = (page - 1).saturating_mul(limit).min(total);
                let end = page.saturating_mul(limit).min(total);
                merged.drain(start..end).collect()
            }
            _ => merged,
        };

        ListingPage { items, total }
    }

    /// Merge the provided fields into the stored annotation for `update.id`.
    pub async fn write_annotation(&self, update: &AnnotationUpdate) -> Result<Annotation> {
        self.annotations.update(update).await
    }

    /// Distinct filter values over the full merged set.
    pub async fn facets(&self) -> Facets {
        let page = self
            .read_annotated(&ReadOptions { all: true, ..Default::default() })
            .await;

        let mut neighborhoods = BTreeSet::new();
        let mut bedrooms = BTreeSet::new();
        let mut bathrooms = BTreeSet::new();
        let mut parking_spots = BTreeSet::new();
        let mut providers = BTreeSet::new();
        for l in &page.items {
            if let Some(n) = &l.neighborhood {
                neighborhoods.insert(n.clone());
            }
            bedrooms.extend(l.bedrooms);
            bathrooms.extend(l.bathrooms);
            parking_spots.extend(l.parking_spots);
            providers.insert(l.provider_name.clone());
        }

        Facets {
            neighborhoods: neighborhoods.into_iter().collect(),
            bedrooms: bedrooms.into_iter().collect(),
            bathrooms: bathrooms.into_iter().collect(),
            parking_spots: parking_spots.into_iter().collect(),
            providers: providers.into_iter().collect(),
        }
    }

    async fn load_snapshots(&self) -> Vec<Listing> {
        let mut merged = Vec::new();
        for provider in &self.providers {
            match self.snapshots.load(provider).await {
                Ok(listings) => {
                    debug!("{}: {} listings in snapshot", provider, listings.len());
                    merged.extend(listings.into_iter().map(|mut l| {
                        if l.provider_name.is_empty() {
                            l.provider_name = provider.clone();
                        }
                        l
                    }));
                }
                Err(e) => warn!("Skipping {} snapshot: {:#}", provider, e),
            }
        }
        merged
    }

    async fn load_annotations(&self) -> AnnotationMap {
        self.annotations.load().await.unwrap_or_else(|e| {
            warn!("Ignoring annotations: {:#}", e);
            AnnotationMap::new()
        })
    }
}

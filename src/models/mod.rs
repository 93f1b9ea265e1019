use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Listing ───────────────────────────────────────────────────────────────────

/// One rental apartment after provider-specific normalization.
///
/// Optional attributes mean "unknown", never zero. The annotation fields are
/// not produced by crawlers; the catalog overlays them at read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: String,
    pub rent_value: f64,
    pub total_value: f64,
    pub listing_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_sqm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_spots: Option<u32>,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

impl Listing {
    /// `total_value` starts equal to the rent until charges are known.
    pub fn new(provider: &str, local_id: &str, listing_url: impl Into<String>, rent_value: f64) -> Self {
        Self {
            id: format!("{}_{}", provider, local_id.trim()),
            rent_value,
            total_value: rent_value,
            listing_url: listing_url.into(),
            neighborhood: None,
            area_sqm: None,
            bedrooms: None,
            bathrooms: None,
            parking_spots: None,
            provider_name: provider.to_string(),
            note: None,
            tag: None,
            rating: None,
        }
    }

    /// Site-reported package total. Non-positive totals fall back to the rent.
    pub fn with_total(mut self, total: f64) -> Self {
        self.total_value = if total > 0.0 { total } else { self.rent_value };
        self
    }

    /// Rent plus condo fee plus monthly property tax.
    pub fn with_charges(mut self, condo_fee: f64, monthly_tax: f64) -> Self {
        self.total_value = self.rent_value + condo_fee.max(0.0) + monthly_tax.max(0.0);
        self
    }

    pub fn set_rent(&mut self, rent: f64) {
        self.rent_value = rent;
        self.total_value = rent;
    }

    pub fn set_local_id(&mut self, local_id: &str) {
        self.id = format!("{}_{}", self.provider_name, local_id.trim());
    }

    /// The part of the id after `{provider}_`.
    pub fn local_id(&self) -> &str {
        self.id
            .strip_prefix(self.provider_name.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(&self.id)
    }

    pub fn apply_annotation(&mut self, annotation: &Annotation) {
        if let Some(note) = &annotation.note {
            self.note = Some(note.clone());
        }
        if let Some(tag) = annotation.tag {
            self.tag = Some(tag);
        }
        if let Some(rating) = annotation.rating {
            self.rating = Some(rating);
        }
    }
}

// ── Annotations ───────────────────────────────────────────────────────────────

/// Visit-tracking label a user attaches to a listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Tag {
    #[serde(rename = "Não")]
    NotInterested,
    #[serde(rename = "Entrar em contato")]
    Contact,
    #[serde(rename = "Agendado")]
    Scheduled,
    #[serde(rename = "Visitado")]
    Visited,
}

impl Tag {
    pub const ALL: [Tag; 4] = [Tag::NotInterested, Tag::Contact, Tag::Scheduled, Tag::Visited];

    pub fn label(&self) -> &'static str {
        match self {
            Tag::NotInterested => "Não",
            Tag::Contact => "Entrar em contato",
            Tag::Scheduled => "Agendado",
            Tag::Visited => "Visitado",
        }
    }

    fn alias(&self) -> &'static str {
        match self {
            Tag::NotInterested => "not-interested",
            Tag::Contact => "contact",
            Tag::Scheduled => "scheduled",
            Tag::Visited => "visited",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tag {
    type Err = String;

    /// Accepts the stored label ("Agendado") or the ASCII alias ("scheduled").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Tag::ALL
            .into_iter()
            .find(|t| t.label().to_lowercase() == wanted || t.alias() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Tag::ALL.iter().map(|t| t.label()).collect();
                format!("unknown tag {:?} (expected one of {})", s, known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnnotationField {
    Note,
    Tag,
    Rating,
}

/// Partial update: `None` keeps the stored value, `clear` removes it.
#[derive(Debug, Clone, Default)]
pub struct AnnotationUpdate {
    pub id: String,
    pub note: Option<String>,
    pub tag: Option<Tag>,
    pub rating: Option<u8>,
    pub clear: Vec<AnnotationField>,
}

impl Annotation {
    pub fn merge(&mut self, update: &AnnotationUpdate) {
        for field in &update.clear {
            match field {
                AnnotationField::Note => self.note = None,
                AnnotationField::Tag => self.tag = None,
                AnnotationField::Rating => self.rating = None,
            }
        }
        if let Some(note) = &update.note {
            self.note = Some(note.clone());
        }
        if let Some(tag) = update.tag {
            self.tag = Some(tag);
        }
        if let Some(rating) = update.rating {
            self.rating = Some(rating);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.note.is_none() && self.tag.is_none() && self.rating.is_none()
    }
}

// ── Read path ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilters {
    /// Case-insensitive substring.
    pub neighborhood: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking_spots: Option<u32>,
    /// Minimum area; listings with unknown area count as zero.
    pub area_sqm: Option<f64>,
    pub tag: Option<Tag>,
    pub rating: Option<u8>,
}

impl ListingFilters {
    pub fn matches(&self, listing: &Listing) -> bool {
        let neighborhood = match &self.neighborhood {
            Some(wanted) if !wanted.trim().is_empty() => listing
                .neighborhood
                .as_deref()
                .map(|n| n.to_lowercase().contains(&wanted.trim().to_lowercase()))
                .unwrap_or(false),
            _ => true,
        };
        let area = self
            .area_sqm
            .map(|min| listing.area_sqm.unwrap_or(0.0) >= min)
            .unwrap_or(true);

        neighborhood
            && area
            && exact(self.bedrooms, listing.bedrooms)
            && exact(self.bathrooms, listing.bathrooms)
            && exact(self.parking_spots, listing.parking_spots)
            && exact(self.tag, listing.tag)
            && exact(self.rating, listing.rating)
    }
}

fn exact<T: PartialEq>(wanted: Option<T>, actual: Option<T>) -> bool {
    match wanted {
        Some(w) => actual == Some(w),
        None => true,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub filters: Option<ListingFilters>,
    /// Full merged set, used for facet discovery; ignores filters and paging.
    pub all: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ListingPage {
    pub items: Vec<Listing>,
    /// Count before pagination.
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub neighborhoods: Vec<String>,
    pub bedrooms: Vec<u32>,
    pub bathrooms: Vec<u32>,
    pub parking_spots: Vec<u32>,
    pub providers: Vec<String>,
}

// ── Crawl reports ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

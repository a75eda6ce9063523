//! Property listing domain types.
//!
//! Records are immutable once fetched: a refresh replaces the whole record
//! set for a cache entry, never individual fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Coarse listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyCategory {
    Apartment,
    House,
}

impl PropertyCategory {
    /// Stable lowercase name, used in cache keys and API queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyCategory::Apartment => "apartment",
            PropertyCategory::House => "house",
        }
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Active category filter for a viewport query.
///
/// The filter participates in cache-key derivation so that results for
/// different property types never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ListingFilter {
    /// No category restriction.
    #[default]
    All,
    /// Restrict to a single category.
    Category(PropertyCategory),
}

impl ListingFilter {
    /// Stable fragment appended to cache keys.
    pub fn key_fragment(&self) -> &'static str {
        match self {
            ListingFilter::All => "all",
            ListingFilter::Category(category) => category.as_str(),
        }
    }

    /// The category to send to the listings API, if any.
    pub fn category(&self) -> Option<PropertyCategory> {
        match self {
            ListingFilter::All => None,
            ListingFilter::Category(category) => Some(*category),
        }
    }
}

impl fmt::Display for ListingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_fragment())
    }
}

/// A single property listing.
///
/// Fields mirror what the listings API returns for map display; anything
/// the marker layer does not need stays out of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Stable listing identifier.
    pub id: String,
    /// Listing title.
    pub title: String,
    /// Preformatted price label (currency formatting is the API's concern).
    pub price_label: String,
    /// Human-readable location string.
    pub location: String,
    /// Geographic position of the listing.
    pub position: GeoPoint,
    /// Media references (image URLs or asset ids).
    #[serde(default)]
    pub media: Vec<String>,
    /// Coarse category.
    pub category: PropertyCategory,
    /// Free-form feature list.
    #[serde(default)]
    pub features: Vec<String>,
    /// Developer name for new-build projects, if any.
    #[serde(default)]
    pub developer: Option<String>,
}

/// One page of listings plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingPage {
    /// Records on this page.
    pub records: Vec<PropertyRecord>,
    /// Total number of matching records across all pages.
    pub total: u64,
    /// Zero-based page index.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
}

//! Data models for listings, product clusters and search results

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A listing exactly as one vendor page presented it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    pub vendor_name: String,
    pub raw_title: String,
    pub raw_price_text: String,
    pub url: String,
    /// Currency the adapter believes the page is priced in, if it knows
    pub currency_hint: Option<String>,
}

/// Stock state of a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    InStock,
    OutOfStock,
    Unknown,
}

impl Availability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
            Self::Unknown => "unknown",
        }
    }
}

/// A listing cleaned into canonical form, ready for matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    pub original_name: String,
    pub normalized_name: String,
    pub brand: Option<String>,
    pub specs: BTreeMap<String, String>,
    pub price: f64,
    pub currency: String,
    pub vendor: String,
    pub url: String,
    pub availability: Availability,
}

impl NormalizedListing {
    pub fn name_token_count(&self) -> usize {
        self.normalized_name.split_whitespace().count()
    }
}

/// Lowest, highest and mean price over the members of a cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl PriceRange {
    /// Compute the range over a non-empty set of listings.
    ///
    /// An empty slice yields an all-zero range.
    pub fn over<'a>(listings: impl IntoIterator<Item = &'a NormalizedListing>) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for listing in listings {
            min = min.min(listing.price);
            max = max.max(listing.price);
            sum += listing.price;
            count += 1;
        }

        if count == 0 {
            return Self {
                min: 0.0,
                max: 0.0,
                avg: 0.0,
            };
        }

        #[allow(clippy::cast_precision_loss)]
        let avg = sum / count as f64;
        Self { min, max, avg }
    }
}

/// A group of listings judged to be the same physical product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductCluster {
    pub representative: NormalizedListing,
    pub alternatives: Vec<NormalizedListing>,
    pub price_range: PriceRange,
}

impl ProductCluster {
    pub fn singleton(listing: NormalizedListing) -> Self {
        let price_range = PriceRange {
            min: listing.price,
            max: listing.price,
            avg: listing.price,
        };

        Self {
            representative: listing,
            alternatives: Vec::new(),
            price_range,
        }
    }

    pub fn len(&self) -> usize {
        self.alternatives.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Outcome category of one vendor fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Empty,
    Failed,
    RateLimited,
    TimedOut,
}

impl FetchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Empty => "empty",
            Self::Failed => "failed",
            Self::RateLimited => "rate_limited",
            Self::TimedOut => "timed_out",
        }
    }
}

/// What happened when one vendor was fetched during a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorReport {
    pub vendor: String,
    pub status: FetchStatus,
    pub listings: usize,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

/// The ranked, deduplicated answer to one search
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "SearchResponse")]
pub struct SearchResult {
    /// Clusters sorted ascending by representative price
    pub clusters: Vec<ProductCluster>,
    pub total_results: usize,
    pub search_time_ms: u64,
    pub country: String,
    pub query: String,
}

impl SearchResult {
    pub fn empty(country: &str, query: &str, search_time_ms: u64) -> Self {
        Self {
            clusters: Vec::new(),
            total_results: 0,
            search_time_ms,
            country: country.to_string(),
            query: query.to_string(),
        }
    }

    pub fn representatives(&self) -> impl Iterator<Item = &NormalizedListing> {
        self.clusters.iter().map(|c| &c.representative)
    }
}

/// One product entry in the serialized search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub link: String,
    pub price: String,
    pub currency: String,
    #[serde(rename = "productName")]
    pub product_name: String,
    pub vendor: String,
    pub availability: Availability,
    #[serde(rename = "originalPrice", skip_serializing_if = "Option::is_none", default)]
    pub original_price: Option<String>,
    #[serde(
        rename = "discountPercentage",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub discount_percentage: Option<f64>,
}

impl From<&ProductCluster> for ProductResponse {
    fn from(cluster: &ProductCluster) -> Self {
        let listing = &cluster.representative;
        Self {
            link: listing.url.clone(),
            price: format!("{:.2}", listing.price),
            currency: listing.currency.clone(),
            product_name: listing.original_name.clone(),
            vendor: listing.vendor.clone(),
            availability: listing.availability,
            original_price: None,
            discount_percentage: None,
        }
    }
}

/// Wire shape of a [`SearchResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub products: Vec<ProductResponse>,
    pub total_results: usize,
    pub search_time_ms: u64,
    pub country: String,
    pub query: String,
}

impl From<SearchResult> for SearchResponse {
    fn from(result: SearchResult) -> Self {
        Self {
            products: result.clusters.iter().map(ProductResponse::from).collect(),
            total_results: result.total_results,
            search_time_ms: result.search_time_ms,
            country: result.country,
            query: result.query,
        }
    }
}

/// Everything a finished search hands to the persistent store
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub country: String,
    pub query: String,
    pub listings: Vec<NormalizedListing>,
    pub reports: Vec<VendorReport>,
    pub searched_at: DateTime<Utc>,
}

//! # Product Matching
//!
//! Decides which listings from different vendors describe the same physical
//! product, merges them into [`ProductCluster`]s and picks the listing shown
//! for each.
//!
//! ## Pipeline
//!
//! 1. Listings are ordered by vendor, price and URL so the order vendors
//!    answered in cannot change the outcome.
//! 2. Listings are partitioned by brand (optional) to bound comparisons.
//! 3. Each partition gets a full similarity matrix.
//! 4. Clusters grow greedily around an anchor: a later listing joins when it
//!    is similar enough to the anchor. Similarity to other members is not
//!    considered, so membership is not transitive.
//! 5. Each cluster elects a representative; the rest become alternatives.

mod cluster;
mod similarity;

use std::cmp::Ordering;

use tracing::{debug, info};

pub use similarity::{name_score, price_score, spec_score};

use crate::config::MatchConfig;
use crate::models::{NormalizedListing, ProductCluster};

/// Fuzzy matcher and deduplicator for normalized listings
#[derive(Debug, Clone, Default)]
pub struct ProductMatcher {
    config: MatchConfig,
}

impl ProductMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Composite similarity of two listings in `[0, 1]`
    pub fn similarity(&self, a: &NormalizedListing, b: &NormalizedListing) -> f64 {
        similarity::similarity(a, b, &self.config)
    }

    /// Confidence that two listings are the same product
    pub fn match_confidence(&self, a: &NormalizedListing, b: &NormalizedListing) -> f64 {
        self.similarity(a, b)
    }

    /// Partition listings into clusters, preserving input order for anchors.
    ///
    /// Deterministic for a fixed input order. Clusters come out grouped by
    /// brand partition, then in anchor order.
    pub fn cluster(&self, listings: &[NormalizedListing]) -> Vec<ProductCluster> {
        let mut clusters = Vec::new();

        for group in cluster::partition(listings, self.config.use_brand_matching) {
            let matrix = cluster::similarity_matrix(listings, &group, &self.config);
            for positions in cluster::anchor_clusters(&matrix, self.config.min_similarity_score) {
                let members = positions
                    .into_iter()
                    .map(|p| listings[group[p]].clone())
                    .collect();
                clusters.push(cluster::build_cluster(members, &self.config));
            }
        }

        clusters
    }

    /// Sort, cluster and rank listings ascending by representative price
    pub fn deduplicate(&self, mut listings: Vec<NormalizedListing>) -> Vec<ProductCluster> {
        if listings.is_empty() {
            return Vec::new();
        }

        info!("Starting product matching for {} listings", listings.len());

        listings.sort_by(stable_order);
        let mut clusters = self.cluster(&listings);
        clusters.sort_by(|a, b| a.representative.price.total_cmp(&b.representative.price));

        let merged = clusters.iter().filter(|c| c.len() > 1).count();
        debug!(merged, "Clusters with alternatives");
        info!(
            "Product matching completed. {} unique products found",
            clusters.len()
        );

        clusters
    }
}

fn stable_order(a: &NormalizedListing, b: &NormalizedListing) -> Ordering {
    a.vendor
        .cmp(&b.vendor)
        .then_with(|| a.price.total_cmp(&b.price))
        .then_with(|| a.url.cmp(&b.url))
}

//! Anchor-based clustering and representative selection

use crate::config::MatchConfig;
use crate::models::{NormalizedListing, PriceRange, ProductCluster};

use super::similarity::similarity;

/// Indices of listings that may be compared with each other.
///
/// Listings sharing a brand form one group each, in order of first
/// appearance; brand-less listings share a final group. With brand matching
/// off everything is one group.
pub(crate) fn partition(listings: &[NormalizedListing], use_brand_matching: bool) -> Vec<Vec<usize>> {
    if !use_brand_matching {
        return vec![(0..listings.len()).collect()];
    }

    let mut branded: Vec<(&str, Vec<usize>)> = Vec::new();
    let mut unbranded = Vec::new();

    for (index, listing) in listings.iter().enumerate() {
        match listing.brand.as_deref() {
            Some(brand) => {
                if let Some(pos) = branded.iter().position(|(b, _)| *b == brand) {
                    branded[pos].1.push(index);
                } else {
                    branded.push((brand, vec![index]));
                }
            }
            None => unbranded.push(index),
        }
    }

    let mut groups: Vec<Vec<usize>> = branded.into_iter().map(|(_, members)| members).collect();
    if !unbranded.is_empty() {
        groups.push(unbranded);
    }
    groups
}

/// Full symmetric similarity matrix for a group, diagonal 1.0
pub(crate) fn similarity_matrix(
    listings: &[NormalizedListing],
    group: &[usize],
    config: &MatchConfig,
) -> Vec<Vec<f64>> {
    let n = group.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let score = similarity(&listings[group[i]], &listings[group[j]], config);
            matrix[i][j] = score;
            matrix[j][i] = score;
        }
    }

    matrix
}

/// Greedy clustering where each cluster admits later listings similar enough
/// to its first member. Returns positions within `group`.
pub(crate) fn anchor_clusters(matrix: &[Vec<f64>], threshold: f64) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut visited = vec![false; n];
    let mut clusters = Vec::new();

    for anchor in 0..n {
        if visited[anchor] {
            continue;
        }
        visited[anchor] = true;
        let mut cluster = vec![anchor];

        for candidate in (anchor + 1)..n {
            if !visited[candidate] && matrix[anchor][candidate] >= threshold {
                visited[candidate] = true;
                cluster.push(candidate);
            }
        }

        clusters.push(cluster);
    }

    clusters
}

/// How good a listing is as the face of its cluster
pub(crate) fn representative_score(
    listing: &NormalizedListing,
    cluster_min_price: f64,
    config: &MatchConfig,
) -> i32 {
    let mut score = 0;

    if listing.brand.is_some() {
        score += 10;
    }
    score += i32::try_from(listing.specs.len()).unwrap_or(i32::MAX / 4) * 2;
    if (3..=15).contains(&listing.name_token_count()) {
        score += 5;
    }
    score += config.reputation(&listing.vendor);
    if listing.price == cluster_min_price {
        score += 5;
    }

    score
}

/// Pick a representative and build the cluster. `members` must be non-empty.
pub(crate) fn build_cluster(members: Vec<NormalizedListing>, config: &MatchConfig) -> ProductCluster {
    if members.len() == 1 {
        let mut members = members;
        return ProductCluster::singleton(members.remove(0));
    }

    let price_range = PriceRange::over(&members);

    let mut best = 0;
    let mut best_score = i32::MIN;
    for (index, listing) in members.iter().enumerate() {
        let score = representative_score(listing, price_range.min, config);
        // Strictly greater keeps the earliest member on ties.
        if score > best_score {
            best = index;
            best_score = score;
        }
    }

    let mut alternatives = members;
    let representative = alternatives.remove(best);

    ProductCluster {
        representative,
        alternatives,
        price_range,
    }
}

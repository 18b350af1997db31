use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::time::Instant;
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::coordinator::FetchCoordinator;
use crate::database::{Database, ListingStore};
use crate::error::SearchError;
use crate::http::{HttpClient, ReqwestClient};
use crate::matching::ProductMatcher;
use crate::models::{NormalizedListing, SearchRecord, SearchResult};
use crate::normalizer::Normalizer;
use crate::vendors::{VendorDescriptor, VendorRegistry};

/// Fetch, normalize, match and rank listings for a query
#[derive(Clone)]
pub struct PriceFinder {
    coordinator: FetchCoordinator,
    normalizer: Normalizer,
    matcher: ProductMatcher,
    vendors: Arc<VendorRegistry>,
    store: Option<Arc<dyn ListingStore>>,
}

impl PriceFinder {
    pub fn new(config: EngineConfig, client: Arc<dyn HttpClient>) -> Self {
        let normalizer = Normalizer::new(&config.fetch.default_currency);

        Self {
            coordinator: FetchCoordinator::new(client, config.fetch),
            normalizer,
            matcher: ProductMatcher::new(config.matching),
            vendors: Arc::new(config.vendors),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ListingStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build a finder with the reqwest client, opening the SQLite store when
    /// a database URL is configured
    pub async fn connect(config: EngineConfig) -> Result<Self> {
        let database_url = config.database_url.clone();
        let client = Arc::new(ReqwestClient::new()?);
        let finder = Self::new(config, client);

        match database_url {
            Some(url) => {
                let database = Database::new(&url).await?;
                Ok(finder.with_store(Arc::new(database)))
            }
            None => Ok(finder),
        }
    }

    pub fn countries(&self) -> Vec<String> {
        self.vendors.countries().map(str::to_string).collect()
    }

    pub fn vendors(&self, country: &str) -> Result<&[VendorDescriptor], SearchError> {
        self.vendors.vendors(country)
    }

    /// Search every vendor of `country` for `query`.
    ///
    /// Only an unsupported country fails; vendors that fail contribute
    /// nothing and an empty fetch gives an empty result. When a store is
    /// configured the listings are saved in the background.
    pub async fn search(&self, country: &str, query: &str) -> Result<SearchResult, SearchError> {
        let (result, record) = self.run_search(country, query).await?;

        if let Some(store) = &self.store {
            let store = Arc::clone(store);
            tokio::spawn(async move {
                if let Err(e) = store.save_search(&record).await {
                    error!("Error saving search results: {}", e);
                }
            });
        }

        Ok(result)
    }

    /// Like [`PriceFinder::search`] but waits for the store before returning
    pub async fn search_and_save(&self, country: &str, query: &str) -> Result<SearchResult> {
        let (result, record) = self.run_search(country, query).await?;

        if let Some(store) = &self.store {
            store.save_search(&record).await?;
        }

        Ok(result)
    }

    async fn run_search(
        &self,
        country: &str,
        query: &str,
    ) -> Result<(SearchResult, SearchRecord), SearchError> {
        let started = Instant::now();
        info!("Searching '{}' in {}", query, country);

        let outcome = self.coordinator.run(country, query, &self.vendors).await?;

        let listings: Vec<NormalizedListing> = outcome
            .listings
            .iter()
            .map(|raw| self.normalizer.normalize(raw))
            .collect();

        let result = if listings.is_empty() {
            info!("No listings found for '{}' in {}", query, country);
            SearchResult::empty(country, query, elapsed_millis(started))
        } else {
            let clusters = self.matcher.deduplicate(listings.clone());
            SearchResult {
                total_results: clusters.len(),
                clusters,
                search_time_ms: elapsed_millis(started),
                country: country.to_string(),
                query: query.to_string(),
            }
        };

        info!(
            "Search for '{}' in {} returned {} products in {}ms",
            query, country, result.total_results, result.search_time_ms
        );

        let record = SearchRecord {
            country: country.to_string(),
            query: query.to_string(),
            listings,
            reports: outcome.reports,
            searched_at: Utc::now(),
        };

        Ok((result, record))
    }
}

fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

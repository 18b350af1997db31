//! Concurrent multi-vendor fetching with jitter, retries and a deadline

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, error, info, warn};

use crate::config::FetchConfig;
use crate::error::{FetchError, SearchError};
use crate::http::HttpClient;
use crate::models::{FetchStatus, RawListing, VendorReport};
use crate::scrapers::adapter_for;
use crate::traits::VendorAdapter;
use crate::vendors::VendorRegistry;

/// Raw listings from every vendor that answered, plus one report per vendor
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub listings: Vec<RawListing>,
    pub reports: Vec<VendorReport>,
}

/// Drives all vendor adapters for one search concurrently
#[derive(Clone)]
pub struct FetchCoordinator {
    client: Arc<dyn HttpClient>,
    config: Arc<FetchConfig>,
}

impl FetchCoordinator {
    pub fn new(client: Arc<dyn HttpClient>, config: FetchConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Fetch `query` from every vendor configured for `country`
    pub async fn run(
        &self,
        country: &str,
        query: &str,
        registry: &VendorRegistry,
    ) -> Result<FetchOutcome, SearchError> {
        let adapters: Vec<Arc<dyn VendorAdapter>> = registry
            .vendors(country)?
            .iter()
            .map(|descriptor| Arc::from(adapter_for(descriptor, &self.config.default_currency)))
            .collect();

        Ok(self.run_adapters(query, adapters).await)
    }

    /// Fetch `query` from the given adapters.
    ///
    /// Returns once every adapter has settled or the deadline passed; adapters
    /// still running at the deadline are aborted and contribute nothing.
    pub async fn run_adapters(
        &self,
        query: &str,
        adapters: Vec<Arc<dyn VendorAdapter>>,
    ) -> FetchOutcome {
        let started = Instant::now();
        let deadline = started + self.config.deadline;
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));

        info!(
            "Fetching '{}' from {} vendors (max {} concurrent)",
            query,
            adapters.len(),
            self.config.max_concurrent
        );

        let mut pending: BTreeSet<String> = BTreeSet::new();
        let mut tasks = JoinSet::new();

        for adapter in adapters {
            pending.insert(adapter.name().to_string());

            let client = Arc::clone(&self.client);
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&semaphore);
            let query = query.to_string();

            tasks.spawn(async move {
                fetch_vendor(adapter.as_ref(), client.as_ref(), &config, &semaphore, &query).await
            });
        }

        let mut outcome = FetchOutcome::default();

        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((report, listings)))) => {
                    pending.remove(&report.vendor);
                    outcome.listings.extend(listings);
                    outcome.reports.push(report);
                }
                Ok(Some(Err(e))) => {
                    error!("Vendor task failed to complete: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Fetch deadline of {:?} reached, abandoning {} vendors",
                        self.config.deadline,
                        pending.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        // Anything still pending was abandoned at the deadline or panicked.
        let elapsed_ms = elapsed_millis(started);
        let status = if Instant::now() >= deadline {
            FetchStatus::TimedOut
        } else {
            FetchStatus::Failed
        };
        for vendor in pending {
            outcome.reports.push(VendorReport {
                vendor,
                status,
                listings: 0,
                elapsed_ms,
                error: Some("vendor did not finish".to_string()),
            });
        }

        info!(
            "Fetched {} listings from {} vendors in {}ms",
            outcome.listings.len(),
            outcome.reports.len(),
            elapsed_ms
        );

        outcome
    }
}

/// One vendor's whole fetch: jitter, then attempts until success or exhaustion.
/// Never fails; errors become an empty result and a report.
async fn fetch_vendor(
    adapter: &dyn VendorAdapter,
    client: &dyn HttpClient,
    config: &FetchConfig,
    semaphore: &Semaphore,
    query: &str,
) -> (VendorReport, Vec<RawListing>) {
    let started = Instant::now();

    let delay = config.jitter.sample();
    debug!(vendor = adapter.name(), delay = ?delay, "Waiting before request");
    sleep(delay).await;

    let result = fetch_with_retry(adapter, client, config, semaphore, query).await;
    let elapsed_ms = elapsed_millis(started);

    match result {
        Ok(listings) => {
            info!("Found {} listings on {}", listings.len(), adapter.name());
            let status = if listings.is_empty() {
                FetchStatus::Empty
            } else {
                FetchStatus::Success
            };
            let report = VendorReport {
                vendor: adapter.name().to_string(),
                status,
                listings: listings.len(),
                elapsed_ms,
                error: None,
            };
            (report, listings)
        }
        Err(e) => {
            error!("Error fetching {}: {}", adapter.name(), e);
            let status = match e {
                FetchError::RateLimited { .. } => FetchStatus::RateLimited,
                FetchError::Timeout(_) => FetchStatus::TimedOut,
                _ => FetchStatus::Failed,
            };
            let report = VendorReport {
                vendor: adapter.name().to_string(),
                status,
                listings: 0,
                elapsed_ms,
                error: Some(e.to_string()),
            };
            (report, Vec::new())
        }
    }
}

async fn fetch_with_retry(
    adapter: &dyn VendorAdapter,
    client: &dyn HttpClient,
    config: &FetchConfig,
    semaphore: &Semaphore,
    query: &str,
) -> Result<Vec<RawListing>, FetchError> {
    let policy = &config.retry;
    let mut attempt = 0;

    loop {
        let result = {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|_| FetchError::Client("fetch semaphore closed".to_string()))?;

            let headers = config.request_headers();
            timeout(
                config.request_timeout,
                adapter.fetch(query, client, &headers, config.request_timeout),
            )
            .await
            .unwrap_or(Err(FetchError::Timeout(config.request_timeout)))
        };
        attempt += 1;

        let error = match result {
            Ok(listings) => return Ok(listings),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts || !error.is_retryable() {
            return Err(error);
        }

        let mut wait = policy.backoff(attempt - 1);
        if let FetchError::RateLimited { retry_after } = &error {
            wait += policy.rate_limit_wait(*retry_after);
        }

        warn!(
            vendor = adapter.name(),
            attempt,
            wait = ?wait,
            error = %error,
            "Fetch failed, retrying after backoff"
        );
        sleep(wait).await;
    }
}

fn elapsed_millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

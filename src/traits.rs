//! Traits and interfaces for vendor-agnostic scraping

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::RawListing;
use crate::vendors::VendorDescriptor;

/// Capability interface every vendor adapter implements
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// Get the configuration for this vendor
    fn descriptor(&self) -> &VendorDescriptor;

    /// Extract listings from a fetched search page.
    ///
    /// A container that cannot be parsed is skipped; it never fails the page.
    ///
    /// # Arguments
    /// * `page_body` - The raw HTML of the search page
    /// * `page_url` - The URL the page was fetched from, for resolving links
    fn extract(&self, page_body: &str, page_url: &str) -> Vec<RawListing>;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Process a query into this vendor's search URL
    ///
    /// Terms are percent-encoded individually and joined with `+`.
    fn build_search_url(&self, query: &str) -> String {
        let encoded = encode_query(query);
        let descriptor = self.descriptor();
        match &descriptor.search_url_template {
            Some(template) => template.replace("{query}", &encoded),
            None => format!(
                "{}/search?q={encoded}",
                descriptor.base_url.trim_end_matches('/')
            ),
        }
    }

    /// Fetch one search page and extract it. Performs a single attempt.
    ///
    /// # Returns
    /// * `Result<Vec<RawListing>, FetchError>` - Listings found, or why the page could not be fetched
    async fn fetch(
        &self,
        query: &str,
        client: &dyn HttpClient,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<Vec<RawListing>, FetchError> {
        let url = self.build_search_url(query);
        debug!(vendor = self.name(), url = %url, "Fetching search page");

        let response = client.get(&url, headers, timeout).await?;

        if response.status == 429 {
            return Err(FetchError::RateLimited {
                retry_after: response.retry_after,
            });
        }

        if !response.is_success() {
            warn!(vendor = self.name(), status = response.status, url = %url, "Search page returned an error status");
            return Err(FetchError::Status {
                status: response.status,
                url,
            });
        }

        Ok(self.extract(&response.body, &url))
    }
}

pub(crate) fn encode_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|term| urlencoding::encode(term).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

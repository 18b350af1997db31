use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use price_finder::config::{FetchConfig, JitterPolicy, RetryPolicy};
use price_finder::database::ListingStore;
use price_finder::http::{HttpClient, HttpResponse};
use price_finder::models::SearchRecord;
use price_finder::vendors::{VendorDescriptor, VendorRegistry};
use price_finder::{EngineConfig, FetchError, PriceFinder, SearchError};
use tokio::sync::mpsc;

const STORE_1_PAGE: &str = r#"
    <html><body>
        <div class="product-card">
            <h3 class="product-title">Apple iPhone 16 Pro 128GB Space Black</h3>
            <span class="price">$999.99</span>
            <a href="/p/iphone-16-pro">View</a>
        </div>
        <div class="product-card">
            <h3 class="product-title">Samsung Galaxy S24 Ultra 256GB</h3>
            <span class="price">$1,199.99</span>
            <a href="/p/galaxy-s24-ultra">View</a>
        </div>
    </body></html>
"#;

const STORE_2_PAGE: &str = r#"
    <html><body>
        <div class="search-result">
            <h2 class="item-name">iPhone 16 Pro (128GB) - Space Black</h2>
            <div class="sale-price">$1,049.99</div>
            <a href="https://store2.example/item/778?ref=search">Details</a>
        </div>
    </body></html>
"#;

/// Answers by URL prefix; unknown URLs fail at the transport level
struct StubClient {
    pages: Vec<(&'static str, HttpResponse)>,
}

#[async_trait]
impl HttpClient for StubClient {
    async fn get(
        &self,
        url: &str,
        _headers: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, FetchError> {
        self.pages
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| FetchError::Transport(format!("no route to {url}")))
    }
}

#[derive(Default)]
struct RecordingStore {
    records: Mutex<Vec<SearchRecord>>,
}

#[async_trait]
impl ListingStore for RecordingStore {
    async fn save_search(&self, record: &SearchRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct ChannelStore(mpsc::UnboundedSender<SearchRecord>);

#[async_trait]
impl ListingStore for ChannelStore {
    async fn save_search(&self, record: &SearchRecord) -> Result<()> {
        self.0.send(record.clone())?;
        Ok(())
    }
}

fn config() -> EngineConfig {
    let vendors = VendorRegistry::empty()
        .with_country(
            "US",
            vec![
                VendorDescriptor::generic(
                    "Store 1",
                    "https://store1.example",
                    "https://store1.example/search?q={query}",
                    60,
                ),
                VendorDescriptor::generic(
                    "Store 2",
                    "https://store2.example",
                    "https://store2.example/find?term={query}",
                    60,
                ),
            ],
        )
        .with_country(
            "DE",
            vec![
                VendorDescriptor::generic(
                    "Broken Shop",
                    "https://broken.example",
                    "https://broken.example/search?q={query}",
                    60,
                ),
                VendorDescriptor::generic(
                    "Offline Shop",
                    "https://offline.example",
                    "https://offline.example/search?q={query}",
                    60,
                ),
            ],
        );

    EngineConfig {
        fetch: FetchConfig {
            jitter: JitterPolicy::none(),
            retry: RetryPolicy {
                max_attempts: 2,
                base_backoff: Duration::from_millis(100),
                multiplier: 2,
                min_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_secs(1),
                default_retry_after: Duration::from_secs(1),
                max_retry_after: Duration::from_secs(2),
            },
            ..FetchConfig::default()
        },
        vendors,
        ..EngineConfig::default()
    }
}

fn client() -> Arc<StubClient> {
    Arc::new(StubClient {
        pages: vec![
            ("https://store1.example/", HttpResponse::ok(STORE_1_PAGE)),
            ("https://store2.example/", HttpResponse::ok(STORE_2_PAGE)),
            (
                "https://broken.example/",
                HttpResponse {
                    status: 503,
                    body: String::new(),
                    retry_after: None,
                },
            ),
        ],
    })
}

#[tokio::test(start_paused = true)]
async fn same_phone_from_two_vendors_becomes_one_product() {
    let finder = PriceFinder::new(config(), client());

    let result = finder.search("us", "iphone 16 pro").await.unwrap();

    assert_eq!(result.total_results, 2);
    assert_eq!(result.country, "us");
    assert_eq!(result.query, "iphone 16 pro");

    let iphone = &result.clusters[0];
    assert_eq!(iphone.len(), 2);
    assert_eq!(iphone.representative.vendor, "Store 1");
    assert_eq!(iphone.representative.url, "https://store1.example/p/iphone-16-pro");
    assert_eq!(iphone.alternatives[0].vendor, "Store 2");
    assert_eq!(iphone.price_range.min, 999.99);
    assert_eq!(iphone.price_range.max, 1049.99);

    let samsung = &result.clusters[1];
    assert_eq!(samsung.len(), 1);
    assert_eq!(samsung.representative.price, 1199.99);
}

#[tokio::test(start_paused = true)]
async fn products_are_sorted_by_price() {
    let finder = PriceFinder::new(config(), client());

    let result = finder.search("US", "iphone 16 pro").await.unwrap();
    let prices: Vec<f64> = result.representatives().map(|l| l.price).collect();

    assert_eq!(prices, vec![999.99, 1199.99]);
}

#[tokio::test(start_paused = true)]
async fn serialized_result_uses_the_response_shape() {
    let finder = PriceFinder::new(config(), client());

    let result = finder.search("US", "iphone 16 pro").await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["total_results"], 2);
    assert_eq!(json["country"], "US");
    assert_eq!(json["query"], "iphone 16 pro");

    let first = &json["products"][0];
    assert_eq!(first["productName"], "Apple iPhone 16 Pro 128GB Space Black");
    assert_eq!(first["price"], "999.99");
    assert_eq!(first["currency"], "USD");
    assert_eq!(first["vendor"], "Store 1");
    assert_eq!(first["link"], "https://store1.example/p/iphone-16-pro");
    assert_eq!(first["availability"], "in_stock");
    assert!(first.get("originalPrice").is_none());
    assert!(first.get("discountPercentage").is_none());
}

#[tokio::test(start_paused = true)]
async fn all_vendors_failing_gives_an_empty_result() {
    let finder = PriceFinder::new(config(), client());

    let result = finder.search("DE", "anything").await.unwrap();

    assert!(result.clusters.is_empty());
    assert_eq!(result.total_results, 0);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["products"], serde_json::json!([]));
    assert_eq!(json["total_results"], 0);
}

#[tokio::test(start_paused = true)]
async fn unknown_country_is_rejected() {
    let finder = PriceFinder::new(config(), client());

    let err = finder.search("XX", "test").await.unwrap_err();

    assert!(matches!(err, SearchError::UnsupportedCountry(ref code) if code == "XX"));
    assert_eq!(err.to_string(), "Country XX not supported");
}

#[tokio::test(start_paused = true)]
async fn store_receives_listings_and_vendor_reports() {
    let store = Arc::new(RecordingStore::default());
    let finder = PriceFinder::new(config(), client()).with_store(store.clone());

    finder.search_and_save("US", "iphone 16 pro").await.unwrap();
    finder.search_and_save("DE", "iphone 16 pro").await.unwrap();

    let records = store.records.lock().unwrap();
    assert_eq!(records.len(), 2);

    let found = &records[0];
    assert_eq!(found.listings.len(), 3);
    assert_eq!(found.reports.len(), 2);

    let failed = &records[1];
    assert!(failed.listings.is_empty());
    assert_eq!(failed.reports.len(), 2);
    assert!(failed.reports.iter().all(|r| r.listings == 0 && r.error.is_some()));
}

#[tokio::test(start_paused = true)]
async fn search_saves_in_the_background() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let finder = PriceFinder::new(config(), client()).with_store(Arc::new(ChannelStore(tx)));

    let result = finder.search("US", "iphone 16 pro").await.unwrap();
    let record = rx.recv().await.unwrap();

    assert_eq!(record.query, result.query);
    assert_eq!(record.listings.len(), 3);
}

#[test]
fn finder_lists_supported_countries() {
    let finder = PriceFinder::new(config(), client());

    assert_eq!(finder.countries(), vec!["DE".to_string(), "US".to_string()]);
    assert_eq!(finder.vendors("us").unwrap().len(), 2);
    assert!(finder.vendors("fr").is_err());
}

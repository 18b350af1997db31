//! Amazon specific adapter implementation

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{dedupe_by_url, element_text, resolve_link};
use crate::error::ParseError;
use crate::models::RawListing;
use crate::normalizer::parse_price;
use crate::traits::{VendorAdapter, encode_query};
use crate::vendors::VendorDescriptor;

const MAX_RESULTS: usize = 15;

static RESULT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[data-component-type="s-search-result"]"#)
        .expect("valid result selector")
});
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2 a").expect("valid title selector"));
static PRICE_WHOLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.a-price-whole").expect("valid price selector"));

/// Adapter for Amazon storefronts
#[derive(Debug, Clone)]
pub struct AmazonAdapter {
    descriptor: VendorDescriptor,
    currency: String,
}

impl AmazonAdapter {
    /// Pages are priced in the storefront's local currency, guessed from the domain
    pub fn new(descriptor: VendorDescriptor, default_currency: &str) -> Self {
        let currency = storefront_currency(&descriptor.base_url)
            .unwrap_or(default_currency)
            .to_string();

        Self {
            descriptor,
            currency,
        }
    }

    fn extract_result(
        &self,
        result: ElementRef<'_>,
        page_url: &str,
    ) -> Result<Option<RawListing>, ParseError> {
        let link = result
            .select(&TITLE_LINK)
            .next()
            .ok_or(ParseError::MissingElement("title"))?;
        let href = link
            .value()
            .attr("href")
            .ok_or(ParseError::MissingElement("link"))?;

        let title = element_text(link);

        let price_text = result
            .select(&PRICE_WHOLE)
            .next()
            .map(element_text)
            .ok_or(ParseError::MissingElement("price"))?;

        let price = parse_price(&price_text).ok_or_else(|| ParseError::NoPrice(price_text.clone()))?;
        if price <= 0.0 {
            return Ok(None);
        }

        Ok(Some(RawListing {
            vendor_name: self.descriptor.name.clone(),
            raw_title: title,
            raw_price_text: price_text,
            url: resolve_link(page_url, href)?,
            currency_hint: Some(self.currency.clone()),
        }))
    }
}

#[async_trait]
impl VendorAdapter for AmazonAdapter {
    fn descriptor(&self) -> &VendorDescriptor {
        &self.descriptor
    }

    fn build_search_url(&self, query: &str) -> String {
        format!(
            "{}/s?k={}",
            self.descriptor.base_url.trim_end_matches('/'),
            encode_query(query)
        )
    }

    fn extract(&self, page_body: &str, page_url: &str) -> Vec<RawListing> {
        let document = Html::parse_document(page_body);

        let listings = document
            .select(&RESULT)
            .take(MAX_RESULTS)
            .filter_map(|result| match self.extract_result(result, page_url) {
                Ok(listing) => listing,
                Err(e) => {
                    debug!(vendor = %self.descriptor.name, error = %e, "Skipping search result");
                    None
                }
            })
            .collect();

        dedupe_by_url(listings)
    }
}

fn storefront_currency(base_url: &str) -> Option<&'static str> {
    let host = url::Url::parse(base_url).ok()?.host_str()?.to_string();

    [
        (".in", "INR"),
        (".co.uk", "GBP"),
        (".co.jp", "JPY"),
        (".de", "EUR"),
        (".fr", "EUR"),
        (".it", "EUR"),
        (".es", "EUR"),
        (".com", "USD"),
    ]
    .into_iter()
    .find(|(suffix, _)| host.ends_with(suffix))
    .map(|(_, code)| code)
}

//! Generic adapter that finds listings by sniffing class names

use std::sync::LazyLock;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{class_hints, dedupe_by_url, element_text, resolve_link};
use crate::error::ParseError;
use crate::models::RawListing;
use crate::normalizer::{detect_currency, parse_price};
use crate::traits::VendorAdapter;
use crate::vendors::VendorDescriptor;

/// Containers past this many are ignored
pub const MAX_CONTAINERS: usize = 20;

const CONTAINER_HINTS: &[&str] = &["product", "item", "result"];
const TITLE_HINTS: &[&str] = &["title", "name", "product"];
const PRICE_HINTS: &[&str] = &["price", "cost", "amount"];

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[class]").expect("valid container selector"));
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4").expect("valid heading selector"));
static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, div").expect("valid price selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Adapter for vendors without a dedicated implementation
#[derive(Debug, Clone)]
pub struct GenericAdapter {
    descriptor: VendorDescriptor,
    default_currency: String,
}

impl GenericAdapter {
    pub fn new(descriptor: VendorDescriptor, default_currency: &str) -> Self {
        Self {
            descriptor,
            default_currency: default_currency.to_string(),
        }
    }

    fn extract_container(
        &self,
        container: ElementRef<'_>,
        page_url: &str,
    ) -> Result<RawListing, ParseError> {
        let title = container
            .select(&HEADING)
            .find(|el| class_hints(*el, TITLE_HINTS))
            .ok_or(ParseError::MissingElement("title"))?;

        let price = container
            .select(&PRICE)
            .find(|el| class_hints(*el, PRICE_HINTS))
            .ok_or(ParseError::MissingElement("price"))?;

        let href = container
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or(ParseError::MissingElement("link"))?;

        let raw_price_text = element_text(price);
        if parse_price(&raw_price_text).is_none() {
            return Err(ParseError::NoPrice(raw_price_text));
        }

        let currency = detect_currency(&raw_price_text)
            .map_or_else(|| self.default_currency.clone(), str::to_string);

        Ok(RawListing {
            vendor_name: self.descriptor.name.clone(),
            raw_title: element_text(title),
            url: resolve_link(page_url, href)?,
            currency_hint: Some(currency),
            raw_price_text,
        })
    }
}

#[async_trait]
impl VendorAdapter for GenericAdapter {
    fn descriptor(&self) -> &VendorDescriptor {
        &self.descriptor
    }

    fn extract(&self, page_body: &str, page_url: &str) -> Vec<RawListing> {
        let document = Html::parse_document(page_body);

        let mut accepted = Vec::new();
        let mut listings = Vec::new();
        let mut considered = 0;

        for container in document
            .select(&CONTAINER)
            .filter(|el| class_hints(*el, CONTAINER_HINTS))
        {
            // Inner parts of an accepted card repeat its listing.
            if container.ancestors().any(|node| accepted.contains(&node.id())) {
                continue;
            }
            // Grids and result lists wrap several cards.
            if container
                .select(&HEADING)
                .filter(|el| class_hints(*el, TITLE_HINTS))
                .count()
                > 1
            {
                continue;
            }
            if considered == MAX_CONTAINERS {
                break;
            }
            considered += 1;

            match self.extract_container(container, page_url) {
                Ok(listing) => {
                    accepted.push(container.id());
                    listings.push(listing);
                }
                Err(e) => {
                    debug!(vendor = %self.descriptor.name, error = %e, "Skipping listing container");
                }
            }
        }

        dedupe_by_url(listings)
    }
}

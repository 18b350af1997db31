//! Vendor adapters and the helpers they share

mod amazon;
mod generic;

use std::collections::HashSet;

use scraper::ElementRef;
use url::Url;

pub use amazon::AmazonAdapter;
pub use generic::GenericAdapter;

use crate::error::ParseError;
use crate::models::RawListing;
use crate::traits::VendorAdapter;
use crate::vendors::{AdapterKind, VendorDescriptor};

/// Build the adapter a vendor descriptor asks for
pub fn adapter_for(descriptor: &VendorDescriptor, default_currency: &str) -> Box<dyn VendorAdapter> {
    match descriptor.adapter {
        AdapterKind::Generic => Box::new(GenericAdapter::new(descriptor.clone(), default_currency)),
        AdapterKind::Amazon => Box::new(AmazonAdapter::new(descriptor.clone(), default_currency)),
    }
}

/// Whitespace-collapsed text content of an element
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether any of the element's class names contains one of `hints`
pub(crate) fn class_hints(element: ElementRef<'_>, hints: &[&str]) -> bool {
    element.value().classes().any(|class| {
        let class = class.to_lowercase();
        hints.iter().any(|hint| class.contains(hint))
    })
}

/// Convert a possibly relative href to an absolute URL
pub(crate) fn resolve_link(page_url: &str, href: &str) -> Result<String, ParseError> {
    let invalid = |reason: String| ParseError::InvalidLink {
        href: href.to_string(),
        reason,
    };

    let base = Url::parse(page_url).map_err(|e| invalid(e.to_string()))?;
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| invalid(e.to_string()))
}

/// Drop listings whose URL, ignoring the query string, was already seen
pub(crate) fn dedupe_by_url(listings: Vec<RawListing>) -> Vec<RawListing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| {
            let key = listing
                .url
                .split_once('?')
                .map_or(listing.url.as_str(), |(path, _)| path)
                .to_string();
            seen.insert(key)
        })
        .collect()
}

//! Per-country vendor configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Which extraction strategy a vendor's pages need
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[default]
    Generic,
    Amazon,
}

/// Configuration for one vendor website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorDescriptor {
    /// Display name for the vendor
    pub name: String,
    /// Base URL for the website, used to resolve relative links
    pub base_url: String,
    /// Search URL pattern with a `{query}` placeholder
    pub search_url_template: Option<String>,
    /// Allowed requests per hour
    pub rate_limit: u32,
    #[serde(default)]
    pub adapter: AdapterKind,
}

impl VendorDescriptor {
    pub fn generic(name: &str, base_url: &str, search_url_template: &str, rate_limit: u32) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            search_url_template: Some(search_url_template.to_string()),
            rate_limit,
            adapter: AdapterKind::Generic,
        }
    }

    pub fn amazon(name: &str, base_url: &str, rate_limit: u32) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.to_string(),
            search_url_template: None,
            rate_limit,
            adapter: AdapterKind::Amazon,
        }
    }
}

/// Country code to ordered vendor list. Codes are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRegistry {
    countries: BTreeMap<String, Vec<VendorDescriptor>>,
}

impl VendorRegistry {
    pub fn empty() -> Self {
        Self {
            countries: BTreeMap::new(),
        }
    }

    /// Replace the vendor list for a country
    #[must_use]
    pub fn with_country(mut self, code: &str, vendors: Vec<VendorDescriptor>) -> Self {
        self.countries.insert(code.trim().to_uppercase(), vendors);
        self
    }

    /// Vendors configured for `country`, matched case-insensitively
    pub fn vendors(&self, country: &str) -> Result<&[VendorDescriptor], SearchError> {
        self.countries
            .get(&country.trim().to_uppercase())
            .filter(|vendors| !vendors.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| SearchError::UnsupportedCountry(country.to_string()))
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::empty()
            .with_country(
                "US",
                vec![
                    VendorDescriptor::amazon("Amazon US", "https://www.amazon.com", 60),
                    VendorDescriptor::generic(
                        "eBay US",
                        "https://www.ebay.com",
                        "https://www.ebay.com/sch/i.html?_nkw={query}",
                        100,
                    ),
                    VendorDescriptor::generic(
                        "Walmart",
                        "https://www.walmart.com",
                        "https://www.walmart.com/search?q={query}",
                        50,
                    ),
                ],
            )
            .with_country(
                "IN",
                vec![
                    VendorDescriptor::amazon("Amazon India", "https://www.amazon.in", 60),
                    VendorDescriptor::generic(
                        "Flipkart",
                        "https://www.flipkart.com",
                        "https://www.flipkart.com/search?q={query}",
                        40,
                    ),
                ],
            )
    }
}

//! Multi-vendor product price search.
//!
//! [`PriceFinder`] fetches a query from every vendor configured for a
//! country, normalizes the listings, merges the ones describing the same
//! product and returns them ranked by price.

pub mod config;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod http;
pub mod matching;
pub mod models;
pub mod normalizer;
pub mod price_finder;
pub mod scrapers;
pub mod traits;
pub mod vendors;

pub use config::EngineConfig;
pub use error::{ConfigError, FetchError, ParseError, SearchError};
pub use models::{NormalizedListing, ProductCluster, RawListing, SearchResult};
pub use price_finder::PriceFinder;

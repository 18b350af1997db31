//! Engine configuration: fetch policies, matching thresholds and vendors

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::error::ConfigError;
use crate::vendors::VendorRegistry;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Randomized courtesy delay taken before each vendor request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl JitterPolicy {
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Draw a delay uniformly from `[min, max]`
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }

        let min_ms = u64::try_from(self.min.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
    }
}

impl Default for JitterPolicy {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(3),
        }
    }
}

/// Attempt budget and waits between attempts for one vendor fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub multiplier: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    /// Wait used for a 429 that carries no Retry-After header
    pub default_retry_after: Duration,
    /// Upper bound on any server-requested wait
    pub max_retry_after: Duration,
}

impl RetryPolicy {
    /// Wait before attempt `attempt + 1`, where `attempt` counts from zero
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.base_backoff
            .saturating_mul(factor)
            .clamp(self.min_backoff, self.max_backoff.max(self.min_backoff))
    }

    /// Wait honoring a server hint, bounded by `max_retry_after`
    pub fn rate_limit_wait(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.default_retry_after)
            .min(self.max_retry_after)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            multiplier: 2,
            min_backoff: Duration::from_secs(4),
            max_backoff: Duration::from_secs(10),
            default_retry_after: Duration::from_secs(10),
            max_retry_after: Duration::from_secs(30),
        }
    }
}

/// Settings for the concurrent fetch phase
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Global cap on in-flight vendor fetches
    pub max_concurrent: usize,
    pub request_timeout: Duration,
    /// Bound on the whole fetch phase of one search
    pub deadline: Duration,
    pub jitter: JitterPolicy,
    pub retry: RetryPolicy,
    pub user_agents: Vec<String>,
    pub default_currency: String,
}

impl FetchConfig {
    /// Headers sent with every request, with a user agent picked from the pool
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let user_agent = self
            .user_agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| USER_AGENTS[0].to_string());

        vec![
            ("User-Agent".to_string(), user_agent),
            (
                "Accept".to_string(),
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            ),
            ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ("Accept-Encoding".to_string(), "gzip, deflate".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
        ]
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            request_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(60),
            jitter: JitterPolicy::default(),
            retry: RetryPolicy::default(),
            user_agents: USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect(),
            default_currency: "USD".to_string(),
        }
    }
}

/// Thresholds and toggles for product matching
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub min_similarity_score: f64,
    pub max_price_difference_percent: f64,
    pub use_brand_matching: bool,
    pub use_price_filtering: bool,
    /// Representative-selection bonus per vendor name
    pub vendor_reputation: BTreeMap<String, i32>,
}

impl MatchConfig {
    /// Reputation bonus for a vendor.
    ///
    /// Exact names win; otherwise a table entry that prefixes the vendor name
    /// applies, so "Amazon US" picks up the "Amazon" bonus.
    pub fn reputation(&self, vendor: &str) -> i32 {
        if let Some(score) = self.vendor_reputation.get(vendor) {
            return *score;
        }

        self.vendor_reputation
            .iter()
            .filter(|(name, _)| {
                vendor
                    .strip_prefix(name.as_str())
                    .is_some_and(|rest| rest.starts_with(' '))
            })
            .max_by_key(|(name, _)| name.len())
            .map_or(0, |(_, score)| *score)
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        let vendor_reputation = [
            ("Amazon", 15),
            ("eBay", 10),
            ("Walmart", 12),
            ("Best Buy", 10),
            ("Flipkart", 12),
            ("Target", 8),
        ]
        .into_iter()
        .map(|(name, score)| (name.to_string(), score))
        .collect();

        Self {
            min_similarity_score: 0.75,
            max_price_difference_percent: 50.0,
            use_brand_matching: true,
            use_price_filtering: true,
            vendor_reputation,
        }
    }
}

/// Everything a [`crate::PriceFinder`] needs, constructed once and passed in
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub fetch: FetchConfig,
    pub matching: MatchConfig,
    pub vendors: VendorRegistry,
    /// SQLite URL for the listing store; `None` disables persistence
    pub database_url: Option<String>,
    /// Cron expression for watch mode
    pub watch_schedule: Option<String>,
}

impl EngineConfig {
    /// Defaults overridden by `PRICE_FINDER_*` environment variables, after
    /// loading `.env` if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_var::<usize>(&lookup, "PRICE_FINDER_MAX_CONCURRENT")? {
            config.fetch.max_concurrent = v;
        }
        if let Some(v) = parse_var::<u64>(&lookup, "PRICE_FINDER_REQUEST_TIMEOUT_SECS")? {
            config.fetch.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "PRICE_FINDER_DEADLINE_SECS")? {
            config.fetch.deadline = Duration::from_secs(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "PRICE_FINDER_JITTER_MIN_MS")? {
            config.fetch.jitter.min = Duration::from_millis(v);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "PRICE_FINDER_JITTER_MAX_MS")? {
            config.fetch.jitter.max = Duration::from_millis(v);
        }
        if let Some(v) = parse_var::<u32>(&lookup, "PRICE_FINDER_MAX_ATTEMPTS")? {
            config.fetch.retry.max_attempts = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "PRICE_FINDER_MIN_SIMILARITY")? {
            config.matching.min_similarity_score = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "PRICE_FINDER_MAX_PRICE_DIFF_PERCENT")? {
            config.matching.max_price_difference_percent = v;
        }
        if let Some(v) = parse_var::<bool>(&lookup, "PRICE_FINDER_USE_BRAND_MATCHING")? {
            config.matching.use_brand_matching = v;
        }
        if let Some(v) = lookup("PRICE_FINDER_DEFAULT_CURRENCY") {
            config.fetch.default_currency = v.trim().to_uppercase();
        }
        config.database_url = lookup("PRICE_FINDER_DATABASE_URL").filter(|v| !v.is_empty());
        config.watch_schedule = lookup("PRICE_FINDER_WATCH").filter(|v| !v.is_empty());

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_concurrent == 0 {
            return Err(ConfigError::Inconsistent(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.fetch.retry.max_attempts == 0 {
            return Err(ConfigError::Inconsistent(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.fetch.jitter.min > self.fetch.jitter.max {
            return Err(ConfigError::Inconsistent(format!(
                "jitter min {:?} exceeds max {:?}",
                self.fetch.jitter.min, self.fetch.jitter.max
            )));
        }
        if !(0.0..=1.0).contains(&self.matching.min_similarity_score) {
            return Err(ConfigError::Inconsistent(format!(
                "min_similarity_score {} is outside [0, 1]",
                self.matching.min_similarity_score
            )));
        }
        let max_diff = self.matching.max_price_difference_percent;
        if !(max_diff > 0.0 && max_diff.is_finite()) {
            return Err(ConfigError::Inconsistent(format!(
                "max_price_difference_percent {max_diff} must be a positive number"
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        })
}

//! Listing normalization: canonical names, brands, specs and prices

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Availability, NormalizedListing, RawListing};

const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "with", "for", "new", "original", "genuine", "official", "authentic",
    "brand", "product", "item", "piece",
];

const ABBREVIATIONS: &[(&str, &str)] = &[
    ("gb", "gigabyte"),
    ("tb", "terabyte"),
    ("mb", "megabyte"),
    ("ram", "memory"),
    ("ssd", "solid state drive"),
    ("hdd", "hard disk drive"),
    ("cpu", "processor"),
    ("gpu", "graphics card"),
    ("lcd", "liquid crystal display"),
    ("led", "light emitting diode"),
    ("oled", "organic led"),
    ("uhd", "ultra high definition"),
    ("4k", "ultra high definition"),
    ("fhd", "full high definition"),
    ("hd", "high definition"),
];

// Order matters: the first brand with a matching alias wins.
const BRAND_ALIASES: &[(&str, &[&str])] = &[
    ("apple", &["apple", "iphone", "ipad", "macbook", "imac"]),
    ("samsung", &["samsung", "galaxy"]),
    ("sony", &["sony", "playstation", "ps4", "ps5"]),
    ("nintendo", &["nintendo", "switch"]),
    ("microsoft", &["microsoft", "xbox", "surface"]),
    ("hp", &["hp", "hewlett packard", "hewlett-packard"]),
    ("dell", &["dell"]),
    ("lenovo", &["lenovo", "thinkpad"]),
    ("asus", &["asus"]),
    ("acer", &["acer"]),
];

const CURRENCIES: &[(&str, &str)] = &[
    ("$", "USD"),
    ("£", "GBP"),
    ("€", "EUR"),
    ("¥", "JPY"),
    ("₹", "INR"),
    ("USD", "USD"),
    ("EUR", "EUR"),
    ("GBP", "GBP"),
    ("INR", "INR"),
    ("JPY", "JPY"),
];

pub const DEFAULT_CURRENCY: &str = "USD";

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid non-word pattern"));
static STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*(gb|tb)").expect("valid storage pattern"));
static RAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(gb|mb)\s*(ram|memory)").expect("valid ram pattern")
});
static SCREEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+(?:\.\d+)?)\s*(?:inch|")"#).expect("valid screen pattern")
});
static MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]{1,3}\d{2,6}[A-Za-z]*").expect("valid model pattern"));
static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid price pattern"));
static CURRENCY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[£$€¥₹]|USD|EUR|GBP|INR|JPY").expect("valid currency pattern"));

/// Turns raw vendor listings into [`NormalizedListing`]s. Pure and infallible.
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_currency: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl Normalizer {
    pub fn new(default_currency: &str) -> Self {
        Self {
            default_currency: default_currency.to_string(),
        }
    }

    pub fn normalize(&self, raw: &RawListing) -> NormalizedListing {
        let currency = detect_currency(&raw.raw_price_text)
            .map(str::to_string)
            .or_else(|| raw.currency_hint.as_ref().map(|c| resolve_currency(c)))
            .unwrap_or_else(|| self.default_currency.clone());

        NormalizedListing {
            original_name: raw.raw_title.clone(),
            normalized_name: normalize_name(&raw.raw_title),
            brand: extract_brand(&raw.raw_title).map(str::to_string),
            specs: extract_specs(&raw.raw_title),
            price: parse_price(&raw.raw_price_text).unwrap_or(0.0),
            currency,
            vendor: raw.vendor_name.clone(),
            url: raw.url.clone(),
            availability: Availability::InStock,
        }
    }
}

/// Lower-case, de-punctuate, expand abbreviations and drop stop words.
///
/// Falls back to the lower-cased title when every token is a stop word, so a
/// non-empty title never normalizes to an empty name.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let cleaned = NON_WORD.replace_all(&lowered, " ");

    let normalized = cleaned
        .split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == token)
                .map_or(token, |(_, expansion)| *expansion)
        })
        .flat_map(str::split_whitespace)
        .filter(|word| !STOP_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");

    if !normalized.is_empty() {
        return normalized;
    }

    let fallback = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if fallback.is_empty() {
        // Nothing but punctuation or symbols
        lowered
    } else {
        fallback
    }
}

/// First brand whose alias appears as a whole word in the title
pub fn extract_brand(name: &str) -> Option<&'static str> {
    let lowered = name.to_lowercase();

    BRAND_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|alias| contains_word(&lowered, alias)))
        .map(|(brand, _)| *brand)
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Storage, RAM, screen size and model code, each only when present
pub fn extract_specs(name: &str) -> BTreeMap<String, String> {
    let lowered = name.to_lowercase();
    let mut specs = BTreeMap::new();

    if let Some(caps) = STORAGE.captures(&lowered) {
        specs.insert("storage".to_string(), format!("{}{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = RAM.captures(&lowered) {
        specs.insert("ram".to_string(), format!("{}{}", &caps[1], &caps[2]));
    }
    if let Some(caps) = SCREEN.captures(&lowered) {
        specs.insert("screen_size".to_string(), caps[1].to_string());
    }
    if let Some(m) = MODEL.find(name) {
        specs.insert("model".to_string(), m.as_str().to_string());
    }

    specs
}

/// Leading numeric token of a price text, with thousands separators removed
pub fn parse_price(text: &str) -> Option<f64> {
    let stripped = text.replace(',', "");
    PRICE
        .find(&stripped)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// ISO code for the first currency symbol or code in `text`
pub fn detect_currency(text: &str) -> Option<&'static str> {
    CURRENCY
        .find(text)
        .and_then(|m| lookup_currency(m.as_str()))
}

/// ISO code for a symbol or code, [`DEFAULT_CURRENCY`] when unknown
pub fn resolve_currency(symbol: &str) -> String {
    lookup_currency(symbol.trim())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string()
}

fn lookup_currency(symbol: &str) -> Option<&'static str> {
    CURRENCIES
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(symbol))
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn raw(title: &str, price: &str) -> RawListing {
        RawListing {
            vendor_name: "Store 1".to_string(),
            raw_title: title.to_string(),
            raw_price_text: price.to_string(),
            url: "https://store1.example/p".to_string(),
            currency_hint: None,
        }
    }

    #[test]
    fn punctuation_is_removed() {
        let name = normalize_name("Apple iPhone 16 Pro (128GB) - Space Black!");
        assert_eq!(name, "apple iphone 16 pro 128gb space black");
    }

    #[rstest]
    #[case("Samsung 1 TB SSD", "samsung 1 terabyte solid state drive")]
    #[case("LG 55 inch 4K OLED TV", "lg 55 inch ultra high definition organic led tv")]
    #[case("The Original Genuine Charger", "charger")]
    #[case("Brand New Item", "brand new item")]
    #[case("", "")]
    #[case("★ — !!!", "★ — !!!")]
    #[case("  ??? ", "???")]
    fn names_are_canonicalized(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[rstest]
    #[case("Apple iPhone 16 Pro", Some("apple"))]
    #[case("iPhone 16 Pro (128GB) - Space Black", Some("apple"))]
    #[case("Galaxy S24 Ultra", Some("samsung"))]
    #[case("Hewlett-Packard LaserJet", Some("hp"))]
    #[case("Nintendo Switch OLED", Some("nintendo"))]
    #[case("Chpad leather case", None)]
    #[case("Generic USB cable", None)]
    fn brands_come_from_alias_table(#[case] title: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_brand(title), expected);
    }

    #[test]
    fn specs_are_extracted_when_present() {
        let specs = extract_specs("Dell XPS13 16GB RAM 512 GB 13.4 inch");
        assert_eq!(specs.get("storage").map(String::as_str), Some("16gb"));
        assert_eq!(specs.get("ram").map(String::as_str), Some("16gb"));
        assert_eq!(specs.get("screen_size").map(String::as_str), Some("13.4"));
        assert_eq!(specs.get("model").map(String::as_str), Some("XPS13"));

        let specs = extract_specs("iPhone 16 Pro 128GB 6.1 inch");
        assert_eq!(specs.get("storage").map(String::as_str), Some("128gb"));
        assert!(!specs.contains_key("model"));

        assert!(extract_specs("Plain cotton shirt").is_empty());
    }

    #[rstest]
    #[case("$99.99", Some(99.99))]
    #[case("£1,299.00", Some(1299.0))]
    #[case("Now only 45 EUR", Some(45.0))]
    #[case("Price on request", None)]
    fn prices_are_parsed(#[case] text: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_price(text), expected);
    }

    #[rstest]
    #[case("$10", Some("USD"))]
    #[case("£10", Some("GBP"))]
    #[case("€10", Some("EUR"))]
    #[case("¥10", Some("JPY"))]
    #[case("₹10", Some("INR"))]
    #[case("10 INR", Some("INR"))]
    #[case("10", None)]
    fn currencies_are_detected(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(detect_currency(text), expected);
    }

    #[test]
    fn unknown_currency_falls_back_to_default() {
        assert_eq!(resolve_currency("CHF"), "USD");
        assert_eq!(resolve_currency("eur"), "EUR");

        let normalizer = Normalizer::new("GBP");
        assert_eq!(normalizer.normalize(&raw("Thing", "12.00")).currency, "GBP");

        let mut hinted = raw("Thing", "12.00");
        hinted.currency_hint = Some("₹".to_string());
        assert_eq!(normalizer.normalize(&hinted).currency, "INR");
    }

    #[test]
    fn normalize_is_deterministic() {
        let normalizer = Normalizer::default();
        let listing = raw("Apple iPhone 16 Pro 128GB Space Black", "$999.99");
        let first = normalizer.normalize(&listing);
        let second = normalizer.normalize(&listing);
        assert_eq!(first, second);
        assert_eq!(first.price, 999.99);
        assert_eq!(first.brand.as_deref(), Some("apple"));
        assert_eq!(first.currency, "USD");
    }

    #[test]
    fn malformed_price_defaults_to_zero() {
        let listing = Normalizer::default().normalize(&raw("Thing", "call us"));
        assert_eq!(listing.price, 0.0);
    }
}

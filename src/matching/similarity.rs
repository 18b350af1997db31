//! Pairwise similarity between normalized listings

use crate::config::MatchConfig;
use crate::models::NormalizedListing;

const NAME_WEIGHT: f64 = 0.6;
const PRICE_WEIGHT: f64 = 0.2;
const SPEC_WEIGHT: f64 = 0.2;

/// Neutral score when a component has nothing to compare
const NEUTRAL: f64 = 0.5;

/// Weighted name, price and spec similarity in `[0, 1]`
pub fn similarity(a: &NormalizedListing, b: &NormalizedListing, config: &MatchConfig) -> f64 {
    if a == b {
        return 1.0;
    }

    let price = if config.use_price_filtering {
        price_score(a.price, b.price, config.max_price_difference_percent)
    } else {
        1.0
    };

    let score = NAME_WEIGHT * name_score(&a.normalized_name, &b.normalized_name)
        + PRICE_WEIGHT * price
        + SPEC_WEIGHT * spec_score(a, b);

    score.clamp(0.0, 1.0)
}

/// Edit-distance ratio between the names with their tokens sorted
pub fn name_score(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b))
}

fn sorted_tokens(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Closeness of two prices relative to their mean
pub fn price_score(p1: f64, p2: f64, max_difference_percent: f64) -> f64 {
    if p1 <= 0.0 || p2 <= 0.0 {
        return NEUTRAL;
    }

    let mean = (p1 + p2) / 2.0;
    let percent_diff = (p1 - p2).abs() / mean * 100.0;

    if percent_diff <= max_difference_percent {
        1.0 - percent_diff / max_difference_percent
    } else {
        0.0
    }
}

/// Fraction of shared spec keys whose values agree
pub fn spec_score(a: &NormalizedListing, b: &NormalizedListing) -> f64 {
    match (a.specs.is_empty(), b.specs.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return NEUTRAL,
        (false, false) => {}
    }

    let mut shared = 0usize;
    let mut equal = 0usize;
    for (key, value) in &a.specs {
        if let Some(other) = b.specs.get(key) {
            shared += 1;
            if value == other {
                equal += 1;
            }
        }
    }

    if shared == 0 {
        return NEUTRAL;
    }

    #[allow(clippy::cast_precision_loss)]
    let fraction = equal as f64 / shared as f64;
    fraction
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::Availability;

    fn listing(name: &str, price: f64, specs: &[(&str, &str)]) -> NormalizedListing {
        NormalizedListing {
            original_name: name.to_string(),
            normalized_name: name.to_string(),
            brand: None,
            specs: specs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
            price,
            currency: "USD".to_string(),
            vendor: "Store 1".to_string(),
            url: format!("https://store1.example/{}", name.replace(' ', "-")),
            availability: Availability::InStock,
        }
    }

    #[test]
    fn name_score_charges_one_edit_per_substitution() {
        // "tv abc" vs "tv abd": one substitution over six characters
        let score = name_score("abc tv", "tv abd");
        assert!((score - 5.0 / 6.0).abs() < 1e-9, "{score}");
        assert_eq!(name_score("pro iphone", "iphone pro"), 1.0);
        assert_eq!(name_score("abc", "xyz"), 0.0);
    }

    #[test]
    fn token_order_does_not_matter() {
        assert_eq!(name_score("space black iphone", "iphone space black"), 1.0);
        assert!(name_score("iphone 16 pro", "galaxy s24 ultra") < 0.5);
    }

    #[test]
    fn close_prices_score_high() {
        assert!(price_score(100.0, 110.0, 50.0) > 0.8);
        assert!(price_score(100.0, 200.0, 50.0) < 0.5);
        assert_eq!(price_score(100.0, 100.0, 50.0), 1.0);
        assert_eq!(price_score(0.0, 100.0, 50.0), 0.5);
    }

    #[test]
    fn spec_agreement_is_a_fraction_of_shared_keys() {
        let a = listing("a", 1.0, &[("storage", "128gb"), ("color", "black")]);
        let b = listing("b", 1.0, &[("storage", "128gb"), ("color", "white")]);
        let c = listing("c", 1.0, &[("storage", "256gb"), ("color", "black")]);
        let d = listing("d", 1.0, &[("screen_size", "6.1")]);
        let none = listing("e", 1.0, &[]);

        assert_eq!(spec_score(&a, &b), 0.5);
        assert_eq!(spec_score(&a, &c), 0.5);
        assert_eq!(spec_score(&a, &a), 1.0);
        assert_eq!(spec_score(&a, &d), 0.5);
        assert_eq!(spec_score(&a, &none), 0.5);
        assert_eq!(spec_score(&none, &none), 1.0);
    }

    #[test]
    fn similarity_is_symmetric_and_reflexive() {
        let config = MatchConfig::default();
        let listings = [
            listing("apple iphone 16 pro 128gb", 999.99, &[("storage", "128gb")]),
            listing("iphone 16 pro 128gb space black", 1049.99, &[("storage", "128gb")]),
            listing("samsung galaxy s24 ultra 256gb", 1199.99, &[("storage", "256gb")]),
            listing("usb cable", 0.0, &[]),
        ];

        for a in &listings {
            assert_eq!(similarity(a, a, &config), 1.0);
            for b in &listings {
                let ab = similarity(a, b, &config);
                assert_eq!(ab, similarity(b, a, &config));
                assert!((0.0..=1.0).contains(&ab));
            }
        }
    }

    #[test]
    fn price_filtering_can_be_disabled() {
        let config = MatchConfig {
            use_price_filtering: false,
            ..MatchConfig::default()
        };
        let a = listing("usb cable", 5.0, &[]);
        let b = listing("usb cable", 500.0, &[]);
        assert!((similarity(&a, &b, &config) - 1.0).abs() < 1e-9);
        assert!(similarity(&a, &b, &MatchConfig::default()) < 0.85);
    }
}

//! The common record shape every provider maps into

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every price is normalised to
pub const REFERENCE_CURRENCY: &str = "EUR";

/// Approximate conversion rates into the reference currency
const EUR_RATES: [(&str, f64); 8] = [
    ("EUR", 1.0),
    ("USD", 0.92),
    ("GBP", 1.17),
    ("CHF", 1.04),
    ("SEK", 0.087),
    ("DKK", 0.134),
    ("NOK", 0.086),
    ("PLN", 0.23),
];

/// What kind of travel data a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Hotel,
    Attraction,
    Weather,
    Insight,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Hotel,
        Category::Attraction,
        Category::Weather,
        Category::Insight,
    ];

    /// Key used for this category in aggregated replies
    #[must_use]
    pub fn reply_key(self) -> &'static str {
        match self {
            Category::Hotel => "hotels",
            Category::Attraction => "attractions",
            Category::Weather => "weather",
            Category::Insight => "insights",
        }
    }

    /// Parse either the singular name or the reply key
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value || c.reply_key() == value)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Hotel => "hotel",
            Category::Attraction => "attraction",
            Category::Weather => "weather",
            Category::Insight => "insight",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Live,
    Fallback,
}

/// Price in a given currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: String,
}

impl Price {
    /// Convert an amount into the reference currency.
    /// Returns `None` for currencies without a known rate.
    #[must_use]
    pub fn normalized(amount: f64, currency: &str) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let currency = currency.trim().to_uppercase();
        let rate = EUR_RATES
            .iter()
            .find(|(code, _)| *code == currency)
            .map(|(_, rate)| *rate)?;
        let converted = (amount * rate * 100.0).round() / 100.0;
        Some(Self {
            amount: converted,
            currency: REFERENCE_CURRENCY.to_string(),
        })
    }
}

/// Map a rating given on `0..=scale_max` onto the 0–5 scale
#[must_use]
pub fn normalize_rating(value: f64, scale_max: f64) -> Option<f64> {
    if !value.is_finite() || scale_max <= 0.0 {
        return None;
    }
    let scaled = (value / scale_max * 5.0).clamp(0.0, 5.0);
    Some((scaled * 10.0).round() / 10.0)
}

/// Hotel, attraction, weather or insight entry in the common shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    /// Provider-specific sub-category ("historic", "Boutique Hotel", ...)
    pub category: Option<String>,
    /// Rating on a 0.0–5.0 scale
    pub rating: Option<f64>,
    pub price: Option<Price>,
    pub description: Option<String>,
    pub source: Source,
}

impl Record {
    /// A live record with only a name; fill the rest with struct update syntax
    #[must_use]
    pub fn live(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            rating: None,
            price: None,
            description: None,
            source: Source::Live,
        }
    }
}

/// Keep the `limit` best-rated records, ties in provider order.
///
/// Lists already within the limit are returned untouched.
#[must_use]
pub fn truncate_by_rating(mut records: Vec<Record>, limit: usize) -> Vec<Record> {
    if records.len() <= limit {
        return records;
    }
    // sort_by is stable, so equal ratings keep their original order
    records.sort_by(|a, b| {
        let a = a.rating.unwrap_or(f64::NEG_INFINITY);
        let b = b.rating.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rated(name: &str, rating: Option<f64>) -> Record {
        Record {
            rating,
            ..Record::live(name)
        }
    }

    #[rstest]
    #[case("hotel", Some(Category::Hotel))]
    #[case("hotels", Some(Category::Hotel))]
    #[case(" Attractions ", Some(Category::Attraction))]
    #[case("insight", Some(Category::Insight))]
    #[case("restaurants", None)]
    fn test_category_parse(#[case] input: &str, #[case] expected: Option<Category>) {
        assert_eq!(Category::parse(input), expected);
    }

    #[test]
    fn test_price_normalization() {
        let price = Price::normalized(100.0, "usd").unwrap();
        assert_eq!(price.currency, "EUR");
        assert_eq!(price.amount, 92.0);

        let price = Price::normalized(120.0, "EUR").unwrap();
        assert_eq!(price.amount, 120.0);

        assert!(Price::normalized(10.0, "XYZ").is_none());
        assert!(Price::normalized(-1.0, "EUR").is_none());
    }

    #[rstest]
    #[case(3.0, 3.0, Some(5.0))]
    #[case(1.5, 3.0, Some(2.5))]
    #[case(9.0, 10.0, Some(4.5))]
    #[case(12.0, 10.0, Some(5.0))]
    #[case(f64::NAN, 5.0, None)]
    fn test_normalize_rating(#[case] value: f64, #[case] max: f64, #[case] expected: Option<f64>) {
        assert_eq!(normalize_rating(value, max), expected);
    }

    #[test]
    fn test_truncate_keeps_short_lists_in_order() {
        let records = vec![rated("a", Some(1.0)), rated("b", Some(5.0))];
        let out = truncate_by_rating(records.clone(), 2);
        assert_eq!(out, records);
    }

    #[test]
    fn test_truncate_sorts_by_rating_stable() {
        let records = vec![
            rated("a", Some(3.0)),
            rated("b", None),
            rated("c", Some(4.5)),
            rated("d", Some(3.0)),
            rated("e", Some(4.5)),
        ];
        let names: Vec<_> = truncate_by_rating(records, 4)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "e", "a", "d"]);
    }
}

//! Deterministic substitute records for providers that cannot answer.
//!
//! Output depends only on the place name and category, so repeated calls are
//! identical and tests can assert exact content.

use crate::models::{Category, Place, Price, Record, Source};

struct HotelTemplate {
    kind: &'static str,
    price: f64,
    rating: f64,
}

const HOTELS: [HotelTemplate; 5] = [
    HotelTemplate { kind: "Grand Hotel", price: 120.0, rating: 4.5 },
    HotelTemplate { kind: "Boutique Hotel", price: 95.0, rating: 4.2 },
    HotelTemplate { kind: "Central Hotel", price: 85.0, rating: 4.0 },
    HotelTemplate { kind: "Palace Hotel", price: 150.0, rating: 4.7 },
    HotelTemplate { kind: "Inn", price: 75.0, rating: 3.9 },
];

const ATTRACTIONS: [(&str, &str, &str); 3] = [
    ("Historic Centre of {city}", "historic", "The old town and main squares of {city}."),
    ("{city} City Museum", "museums", "Local history and art collections of {city}."),
    ("{city} Central Park", "natural", "Green space popular with locals in {city}."),
];

const INSIGHTS: [(&str, &str); 3] = [
    ("Getting around", "Public transport in {city} is usually the quickest way between sights."),
    ("Timing", "Visit the main attractions of {city} early in the day to avoid queues."),
    ("Local food", "Ask locals in {city} for their favourite neighbourhood restaurants."),
];

/// Supplies fallback records per (place, category)
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSupplier;

impl FallbackSupplier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fixed-size, ordered substitute records, all tagged `fallback`
    #[must_use]
    pub fn records(&self, place: &Place, category: Category) -> Vec<Record> {
        let city = place.name.as_str();
        match category {
            Category::Hotel => HOTELS
                .iter()
                .map(|hotel| Record {
                    name: format!("{} {city}", hotel.kind),
                    category: Some(hotel.kind.to_string()),
                    rating: Some(hotel.rating),
                    price: Price::normalized(hotel.price, "EUR"),
                    description: Some(format!("Quality hotel in the heart of {city}.")),
                    source: Source::Fallback,
                })
                .collect(),
            Category::Attraction => ATTRACTIONS
                .iter()
                .map(|(name, kind, description)| Record {
                    name: name.replace("{city}", city),
                    category: Some((*kind).to_string()),
                    rating: None,
                    price: None,
                    description: Some(description.replace("{city}", city)),
                    source: Source::Fallback,
                })
                .collect(),
            Category::Weather => vec![Record {
                name: format!("Weather in {city}"),
                category: Some("current".to_string()),
                rating: None,
                price: None,
                description: Some("Weather data unavailable".to_string()),
                source: Source::Fallback,
            }],
            Category::Insight => INSIGHTS
                .iter()
                .map(|(title, tip)| Record {
                    name: (*title).to_string(),
                    category: Some("tip".to_string()),
                    rating: None,
                    price: None,
                    description: Some(tip.replace("{city}", city)),
                    source: Source::Fallback,
                })
                .collect(),
        }
    }
}

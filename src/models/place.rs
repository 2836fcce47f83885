//! Place model: free-text input and resolved geographic locations

use serde::{Deserialize, Serialize};

use crate::error::TravelError;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees, -90..=90
    pub latitude: f64,
    /// Longitude in decimal degrees, -180..=180
    pub longitude: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, TravelError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(TravelError::validation(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(TravelError::validation(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Great-circle distance in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Kilometers,
        )
    }
}

/// A place as supplied by a caller; not yet usable by providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PlaceInput {
    /// Free-text display name
    #[serde(default)]
    pub name: String,
    /// Optional country hint (ISO 3166-1 alpha-2 or English name)
    #[serde(default)]
    pub country: Option<String>,
    /// Optional `[latitude, longitude]` pair
    #[serde(default)]
    pub coordinates: Option<[f64; 2]>,
}

impl PlaceInput {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_coordinates(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            country: None,
            coordinates: Some([latitude, longitude]),
        }
    }
}

/// A resolved place. Only the resolver hands these out.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    /// Display name as requested by the caller
    pub name: String,
    /// Country code (ISO 3166-1 alpha-2), when known
    pub country: Option<String>,
    /// Location of the place
    pub coordinates: Coordinates,
    /// Short provider-facing code (IATA city code), when known
    pub code: Option<String>,
}

impl Place {
    /// Stable identifier used in cache keys.
    ///
    /// Places with a city code share entries regardless of spelling; others
    /// are keyed by coordinates rounded to roughly a kilometer.
    #[must_use]
    pub fn place_id(&self) -> String {
        match &self.code {
            Some(code) => code.to_lowercase(),
            None => {
                let (lat, lon) = self.coordinates.rounded(2);
                format!("{lat:.2},{lon:.2}")
            }
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!(
            "{:.4}, {:.4}",
            self.coordinates.latitude, self.coordinates.longitude
        )
    }
}

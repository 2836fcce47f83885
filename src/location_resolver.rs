//! Location Resolution Module
//!
//! This module resolves caller-supplied place inputs (a free-text name, an
//! optional country hint and optional coordinates) into [`Place`] values that
//! providers can query. Names are matched against the bundled gazetteer,
//! ignoring case, diacritics and punctuation. No network calls are made.

use std::collections::HashMap;

use tracing::debug;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::error::TravelError;
use crate::gazetteer::{self, CITIES, GazetteerEntry};
use crate::models::{Coordinates, Place, PlaceInput};

/// A name match only applies to caller coordinates this close to the entry
pub const MAX_MATCH_DISTANCE_KM: f64 = 50.0;

/// Fold a place name for matching: "Saint-Étienne" and "saint etienne" agree
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Service for resolving place inputs
pub struct LocationResolver {
    entries: &'static [GazetteerEntry],
    by_name: HashMap<String, Vec<usize>>,
}

impl Default for LocationResolver {
    fn default() -> Self {
        Self::new(CITIES)
    }
}

impl LocationResolver {
    /// Build a resolver over a gazetteer
    #[must_use]
    pub fn new(entries: &'static [GazetteerEntry]) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_name
                .entry(normalize_name(entry.name))
                .or_default()
                .push(idx);
        }
        Self { entries, by_name }
    }

    /// Resolve a place input into a structured Place.
    ///
    /// Coordinates supplied by the caller are used as-is once validated; a
    /// gazetteer match within [`MAX_MATCH_DISTANCE_KM`] only adds its country
    /// and city code. Without coordinates the name must match the gazetteer.
    pub fn resolve(&self, input: &PlaceInput) -> Result<Place, TravelError> {
        debug!("Resolving place input: {:?}", input);

        let name = input.name.trim();
        let matched = self.lookup(name, input.country.as_deref());

        let place = match (input.coordinates, matched) {
            (Some([lat, lon]), matched) => {
                let coordinates = Coordinates::new(lat, lon).map_err(|e| {
                    TravelError::unresolved(display_name(name, lat, lon), e.to_string())
                })?;
                let matched = matched.filter(|entry| {
                    let distance = coordinates.distance_km(&entry.coordinates());
                    let near = distance <= MAX_MATCH_DISTANCE_KM;
                    if !near {
                        debug!(
                            "Ignoring gazetteer entry {} ({}): {:.0} km from the given coordinates",
                            entry.name, entry.country, distance
                        );
                    }
                    near
                });
                Place {
                    name: display_name(name, lat, lon),
                    country: matched
                        .map(|e| e.country.to_string())
                        .or_else(|| input.country.clone()),
                    coordinates,
                    code: matched.and_then(|e| e.code).map(str::to_string),
                }
            }
            (None, Some(entry)) => Place {
                name: name.to_string(),
                country: Some(entry.country.to_string()),
                coordinates: entry.coordinates(),
                code: entry.code.map(str::to_string),
            },
            (None, None) if name.is_empty() => {
                return Err(TravelError::unresolved(
                    "",
                    "place has neither a name nor coordinates",
                ));
            }
            (None, None) => {
                return Err(TravelError::unresolved(name, "not found in gazetteer"));
            }
        };

        debug!(
            "Resolved place: {} at ({})",
            place.name,
            place.format_coordinates()
        );
        Ok(place)
    }

    /// Find a gazetteer entry by name, narrowed by an optional country hint
    #[must_use]
    pub fn lookup(&self, name: &str, country: Option<&str>) -> Option<&'static GazetteerEntry> {
        let key = normalize_name(name);
        if key.is_empty() {
            return None;
        }
        let candidates = self.by_name.get(&key)?;
        let wanted = country.and_then(gazetteer::country_code);
        let entries = self.entries;
        candidates
            .iter()
            .map(|&idx| &entries[idx])
            .find(|entry| wanted.is_none_or(|code| entry.country == code))
    }

    /// All known cities for a country given by ISO code or English name
    pub fn cities_in_country(
        &self,
        country: &str,
    ) -> Result<Vec<&'static GazetteerEntry>, TravelError> {
        let code = gazetteer::country_code(country)
            .ok_or_else(|| TravelError::validation(format!("unsupported country '{country}'")))?;
        let entries = self.entries;
        Ok(entries.iter().filter(|e| e.country == code).collect())
    }
}

fn display_name(name: &str, lat: f64, lon: f64) -> String {
    if name.is_empty() {
        format!("{lat:.4}, {lon:.4}")
    } else {
        name.to_string()
    }
}

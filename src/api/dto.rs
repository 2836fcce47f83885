//! Wire types of the HTTP API

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregator::{PairResult, PairStatus, PlaceReport};
use crate::cache::CacheStats;
use crate::error::TravelError;
use crate::gazetteer::GazetteerEntry;
use crate::models::{Category, DateRange, PlaceInput, Record, Source};
use crate::routing::{Route, RouteLeg};

/// Largest accepted per-pair result limit
pub const MAX_LIMIT: usize = 50;
/// Largest accepted search radius
pub const MAX_RADIUS_KM: u32 = 100;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// A record as sent to clients; price is flattened into amount and currency
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source: Source,
}

impl From<&Record> for ApiRecord {
    fn from(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            category: record.category.clone(),
            rating: record.rating,
            price: record.price.as_ref().map(|p| p.amount),
            currency: record.price.as_ref().map(|p| p.currency.clone()),
            description: record.description.clone(),
            source: record.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiPairStatus {
    pub status: PairStatus,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&PairResult> for ApiPairStatus {
    fn from(result: &PairResult) -> Self {
        Self {
            status: result.status,
            cached: result.cached,
            detail: result.detail.clone(),
        }
    }
}

/// Parameters shared by the query endpoints
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub limit: Option<usize>,
    pub radius_km: Option<u32>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub kinds: Option<String>,
}

impl QueryParams {
    /// Validate ranges and build a date range when both dates are set
    pub fn validate(&self) -> Result<Option<DateRange>, TravelError> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(TravelError::validation(format!(
                    "limit must be between 1 and {MAX_LIMIT}"
                )));
            }
        }
        if let Some(radius) = self.radius_km {
            if !(1..=MAX_RADIUS_KM).contains(&radius) {
                return Err(TravelError::validation(format!(
                    "radius_km must be between 1 and {MAX_RADIUS_KM}"
                )));
            }
        }
        match (self.check_in, self.check_out) {
            (None, None) => Ok(None),
            (Some(check_in), Some(check_out)) => {
                let range = DateRange {
                    check_in,
                    check_out,
                };
                if range.is_valid() {
                    Ok(Some(range))
                } else {
                    Err(TravelError::validation("check_out must be after check_in"))
                }
            }
            _ => Err(TravelError::validation(
                "check_in and check_out must be given together",
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TripDataRequest {
    #[serde(default, alias = "places")]
    pub cities: Vec<PlaceInput>,
    /// Category names; hotels and attractions when absent
    pub categories: Option<Vec<String>>,
    #[serde(flatten)]
    pub params: QueryParams,
}

impl TripDataRequest {
    pub const DEFAULT_CATEGORIES: [Category; 2] = [Category::Hotel, Category::Attraction];

    pub fn categories(&self) -> Result<Vec<Category>, TravelError> {
        match &self.categories {
            None => Ok(Self::DEFAULT_CATEGORIES.to_vec()),
            Some(names) if names.is_empty() => {
                Err(TravelError::validation("categories must not be empty"))
            }
            Some(names) => names
                .iter()
                .map(|name| {
                    Category::parse(name).ok_or_else(|| {
                        TravelError::validation(format!("unknown category '{name}'"))
                    })
                })
                .collect(),
        }
    }
}

pub type CategoryData = BTreeMap<String, Vec<ApiRecord>>;

#[derive(Debug, Serialize)]
pub struct TripDataResponse {
    pub success: bool,
    /// Records per category, then per place name
    pub data: BTreeMap<&'static str, CategoryData>,
    /// Pair status per place name, then per category
    pub status: BTreeMap<String, BTreeMap<&'static str, ApiPairStatus>>,
    pub unresolved: Vec<String>,
}

impl TripDataResponse {
    #[must_use]
    pub fn from_reports(reports: &[PlaceReport], categories: &[Category]) -> Self {
        let mut data: BTreeMap<&'static str, CategoryData> = categories
            .iter()
            .map(|c| (c.reply_key(), CategoryData::new()))
            .collect();
        let mut status = BTreeMap::new();
        let mut unresolved = Vec::new();

        for report in reports {
            if !report.is_resolved() {
                unresolved.push(report.name.clone());
            }
            let mut place_status = BTreeMap::new();
            for result in &report.results {
                place_status.insert(result.category.reply_key(), ApiPairStatus::from(result));
                if report.is_resolved() {
                    data.entry(result.category.reply_key()).or_default().insert(
                        report.name.clone(),
                        result.records.iter().map(ApiRecord::from).collect(),
                    );
                }
            }
            status.insert(report.name.clone(), place_status);
        }

        Self {
            success: true,
            data,
            status,
            unresolved,
        }
    }
}

/// `[lat, lon]` or `{latitude, longitude}`
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum CoordinatesInput {
    Pair([f64; 2]),
    Object { latitude: f64, longitude: f64 },
}

impl CoordinatesInput {
    #[must_use]
    pub fn as_pair(self) -> [f64; 2] {
        match self {
            CoordinatesInput::Pair(pair) => pair,
            CoordinatesInput::Object {
                latitude,
                longitude,
            } => [latitude, longitude],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CityAttractionsRequest {
    #[serde(default)]
    pub name: String,
    pub coordinates: CoordinatesInput,
    #[serde(flatten)]
    pub params: QueryParams,
}

#[derive(Debug, Serialize)]
pub struct CityAttractionsResponse {
    pub success: bool,
    pub place: String,
    pub attractions: Vec<ApiRecord>,
    pub count: usize,
    #[serde(flatten)]
    pub status: ApiPairStatus,
}

#[derive(Debug, Serialize)]
pub struct ApiCity {
    pub name: String,
    pub country: String,
    pub coordinates: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&GazetteerEntry> for ApiCity {
    fn from(entry: &GazetteerEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            country: entry.country.to_string(),
            coordinates: [entry.latitude, entry.longitude],
            code: entry.code.map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CitiesResponse {
    pub success: bool,
    pub country: String,
    pub cities: Vec<ApiCity>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    #[serde(default, alias = "places")]
    pub cities: Vec<PlaceInput>,
    /// Keep the last city as the final destination
    #[serde(default)]
    pub keep_last: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiStop {
    pub name: String,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub success: bool,
    pub stops: Vec<ApiStop>,
    pub legs: Vec<RouteLeg>,
    pub total_distance_km: f64,
    pub total_duration_hours: f64,
    pub unresolved: Vec<String>,
}

impl RouteResponse {
    #[must_use]
    pub fn new(route: Route, unresolved: Vec<String>) -> Self {
        Self {
            success: true,
            stops: route
                .stops
                .iter()
                .map(|p| ApiStop {
                    name: p.name.clone(),
                    coordinates: [p.coordinates.latitude, p.coordinates.longitude],
                })
                .collect(),
            legs: route.legs,
            total_distance_km: route.total_distance_km,
            total_duration_hours: route.total_duration_hours,
            unresolved,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub configured_providers: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_api_record_flattens_price_and_skips_absent() {
        let record = Record {
            rating: Some(4.5),
            price: Price::normalized(120.0, "EUR"),
            ..Record::live("Hotel X")
        };
        let value = serde_json::to_value(ApiRecord::from(&record)).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Hotel X",
                "rating": 4.5,
                "price": 120.0,
                "currency": "EUR",
                "source": "live"
            })
        );
    }

    #[test]
    fn test_trip_request_parsing() {
        let request: TripDataRequest = serde_json::from_value(json!({
            "cities": [{"name": "Paris", "coordinates": [48.8566, 2.3522]}],
            "categories": ["hotels", "weather"],
            "limit": 3
        }))
        .unwrap();
        assert_eq!(request.cities[0].coordinates, Some([48.8566, 2.3522]));
        assert_eq!(
            request.categories().unwrap(),
            vec![Category::Hotel, Category::Weather]
        );
        assert_eq!(request.params.limit, Some(3));
    }

    #[test]
    fn test_default_and_unknown_categories() {
        let request: TripDataRequest = serde_json::from_value(json!({"cities": []})).unwrap();
        assert_eq!(request.categories().unwrap(), TripDataRequest::DEFAULT_CATEGORIES.to_vec());

        let request: TripDataRequest =
            serde_json::from_value(json!({"cities": [], "categories": ["restaurants"]})).unwrap();
        assert!(request.categories().is_err());
    }

    #[rstest]
    #[case(json!({"limit": 0}))]
    #[case(json!({"limit": 51}))]
    #[case(json!({"radius_km": 500}))]
    #[case(json!({"check_in": "2025-06-03", "check_out": "2025-06-01"}))]
    #[case(json!({"check_in": "2025-06-03"}))]
    fn test_invalid_params(#[case] body: serde_json::Value) {
        let params: QueryParams = serde_json::from_value(body).unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_valid_dates() {
        let params: QueryParams =
            serde_json::from_value(json!({"check_in": "2025-06-01", "check_out": "2025-06-03"}))
                .unwrap();
        let range = params.validate().unwrap().unwrap();
        assert_eq!(range.check_in.to_string(), "2025-06-01");
    }

    #[rstest]
    #[case(json!([41.9, 12.5]))]
    #[case(json!({"latitude": 41.9, "longitude": 12.5}))]
    fn test_coordinates_input_shapes(#[case] value: serde_json::Value) {
        let coords: CoordinatesInput = serde_json::from_value(value).unwrap();
        assert_eq!(coords.as_pair(), [41.9, 12.5]);
    }
}

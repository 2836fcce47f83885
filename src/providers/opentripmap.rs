//! OpenTripMap points of interest around a place

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::http::{HttpClient, encode};
use super::{NO_CREDENTIALS, ProviderClient, classify};
use crate::config::{ApiKey, OpenTripMapConfig};
use crate::error::TravelError;
use crate::models::{Category, ProviderQuery, ProviderResult, Record, normalize_rating};

const PROVIDER: &str = "opentripmap";
/// OpenTripMap popularity rates run from 0 to 3 ("3h" marks heritage sites)
const RATE_SCALE: f64 = 3.0;

pub struct OpenTripMapClient {
    http: HttpClient,
    api_key: Option<ApiKey>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Poi {
    #[serde(default)]
    name: String,
    #[serde(default)]
    kinds: String,
    rate: Option<serde_json::Value>,
    /// Distance from the search centre in metres
    dist: Option<f64>,
}

fn parse_rate(rate: &serde_json::Value) -> Option<f64> {
    match rate {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim_end_matches('h').parse().ok(),
        _ => None,
    }
}

impl Poi {
    fn into_record(self) -> Option<Record> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        let category = self
            .kinds
            .split(',')
            .map(str::trim)
            .find(|k| !k.is_empty())
            .map(str::to_string);
        Some(Record {
            category,
            rating: self
                .rate
                .as_ref()
                .and_then(parse_rate)
                .and_then(|r| normalize_rating(r, RATE_SCALE)),
            description: self
                .dist
                .map(|m| format!("{:.1} km from the centre", m / 1000.0)),
            ..Record::live(name)
        })
    }
}

impl OpenTripMapClient {
    pub fn new(http: HttpClient, config: &OpenTripMapConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn search(
        &self,
        api_key: &ApiKey,
        query: &ProviderQuery,
    ) -> Result<Vec<Record>, TravelError> {
        let coords = query.place.coordinates;
        let mut url = format!(
            "{}/places/radius?radius={}&lon={}&lat={}&limit={}&format=json&apikey={}",
            self.base_url,
            u64::from(query.radius_km) * 1000,
            coords.longitude,
            coords.latitude,
            query.limit,
            encode(api_key.expose())
        );
        if let Some(kinds) = &query.kinds {
            url.push_str("&kinds=");
            url.push_str(&encode(kinds));
        }

        let pois: Vec<Poi> = self.http.get_json(PROVIDER, &url, &[]).await?;
        Ok(pois.into_iter().filter_map(Poi::into_record).collect())
    }
}

#[async_trait]
impl ProviderClient for OpenTripMapClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn category(&self) -> Category {
        Category::Attraction
    }

    #[instrument(skip(self, query), fields(place = %query.place.name))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Failed(NO_CREDENTIALS.to_string());
        };
        classify(PROVIDER, query, self.search(api_key, query).await)
    }
}

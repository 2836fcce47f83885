//! Provider clients: one adapter per external data source.
//!
//! Every adapter maps its provider's wire schema into [`Record`]s and reports
//! a classified [`ProviderResult`]. Errors never cross the trait boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::TravelPlannerConfig;
use crate::error::TravelError;
use crate::models::{Category, ProviderQuery, ProviderResult, Record};

pub mod amadeus;
pub mod anthropic;
pub mod http;
pub mod opentripmap;
pub mod openweather;

pub use amadeus::AmadeusClient;
pub use anthropic::AnthropicClient;
pub use http::HttpClient;
pub use opentripmap::OpenTripMapClient;
pub use openweather::OpenWeatherClient;

/// Reason reported by adapters constructed without credentials
pub const NO_CREDENTIALS: &str = "no credentials";

/// A source of records for one category
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Stable provider name, used in cache keys and logs
    fn name(&self) -> &'static str;

    fn category(&self) -> Category;

    /// Perform the external call. Must not panic or return an error;
    /// every outcome is classified into a `ProviderResult`.
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult;
}

/// Convert an adapter's internal result into a classified outcome
pub(crate) fn classify(
    provider: &str,
    query: &ProviderQuery,
    result: Result<Vec<Record>, TravelError>,
) -> ProviderResult {
    match result {
        Ok(records) => {
            debug!(
                "{} returned {} records for {}",
                provider,
                records.len(),
                query.place.name
            );
            ProviderResult::from_records(records)
        }
        Err(e) => {
            warn!(
                "{} failed for {} ({}): {}",
                provider, query.place.name, query.category, e
            );
            ProviderResult::Failed(e.to_string())
        }
    }
}

/// Build all provider clients from configuration.
/// Providers without credentials are still registered and answer `Failed`.
pub fn build_providers(
    config: &TravelPlannerConfig,
) -> Result<Vec<Arc<dyn ProviderClient>>, TravelError> {
    let http = HttpClient::new(&config.http)?;
    let providers = &config.providers;

    Ok(vec![
        Arc::new(AmadeusClient::new(http.clone(), &providers.amadeus)),
        Arc::new(OpenTripMapClient::new(http.clone(), &providers.opentripmap)),
        Arc::new(OpenWeatherClient::new(
            http.clone(),
            &providers.openweather,
            config.defaults.forecast_days,
        )),
        Arc::new(AnthropicClient::new(http, &providers.anthropic)),
    ])
}

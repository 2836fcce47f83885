//! Travel planner - aggregates hotels, attractions, weather and travel tips
//!
//! This library resolves places, queries the external travel providers,
//! substitutes deterministic fallback data when a provider has nothing to
//! offer, and serves the combined result over HTTP.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gazetteer;
pub mod location_resolver;
pub mod logging;
pub mod models;
pub mod providers;
pub mod routing;
pub mod web;

// Re-export core types for public API
pub use aggregator::{
    Aggregator, AggregatorSettings, PairResult, PairStatus, PlaceReport, QueryOptions,
};
pub use cache::ExpiringCache;
pub use config::TravelPlannerConfig;
pub use error::TravelError;
pub use fallback::FallbackSupplier;
pub use location_resolver::LocationResolver;
pub use models::{
    Category, Coordinates, Place, PlaceInput, ProviderQuery, ProviderResult, Record, Source,
};
pub use providers::ProviderClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelError>;

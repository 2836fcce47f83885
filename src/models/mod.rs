//! Data models for the travel planner
//!
//! This module contains the core domain models organized by concern:
//! - Place: caller input and resolved geographic locations
//! - Record: the common hotel/attraction/weather/insight shape
//! - Provider: queries sent to, and outcomes returned by, provider clients

pub mod place;
pub mod provider;
pub mod record;

// Re-export all public types for convenient access
pub use place::{Coordinates, Place, PlaceInput};
pub use provider::{DateRange, ProviderQuery, ProviderResult};
pub use record::{Category, Price, Record, Source, normalize_rating, truncate_by_rating};

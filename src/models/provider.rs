//! Query and outcome types exchanged with provider clients

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::place::Place;
use super::record::{Category, Record};

/// Stay dates for date-sensitive providers (hotel offers, forecasts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateRange {
    /// One night, `days_ahead` days from today
    #[must_use]
    pub fn nights_from_today(days_ahead: u64, nights: u64) -> Self {
        let today = Utc::now().date_naive();
        let check_in = today
            .checked_add_days(Days::new(days_ahead))
            .unwrap_or(today);
        let check_out = check_in
            .checked_add_days(Days::new(nights.max(1)))
            .unwrap_or(check_in);
        Self {
            check_in,
            check_out,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.check_out > self.check_in
    }
}

/// Immutable request for a single (place, category) pair
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub place: Place,
    pub category: Category,
    pub radius_km: u32,
    pub limit: usize,
    pub dates: Option<DateRange>,
    /// Provider-side sub-category filter, e.g. OpenTripMap kinds
    pub kinds: Option<String>,
}

impl ProviderQuery {
    #[must_use]
    pub fn new(place: Place, category: Category, radius_km: u32, limit: usize) -> Self {
        Self {
            place,
            category,
            radius_km,
            limit,
            dates: None,
            kinds: None,
        }
    }

    #[must_use]
    pub fn with_dates(mut self, dates: Option<DateRange>) -> Self {
        self.dates = dates;
        self
    }

    #[must_use]
    pub fn with_kinds(mut self, kinds: Option<String>) -> Self {
        self.kinds = kinds.filter(|k| !k.trim().is_empty());
        self
    }

    /// Query parameters in a canonical (sorted) order
    #[must_use]
    pub fn params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("category", self.category.as_str().to_string());
        params.insert("limit", self.limit.to_string());
        params.insert("radius_km", self.radius_km.to_string());
        if let Some(dates) = &self.dates {
            params.insert("check_in", dates.check_in.to_string());
            params.insert("check_out", dates.check_out.to_string());
        }
        if let Some(kinds) = &self.kinds {
            params.insert("kinds", kinds.clone());
        }
        params
    }

    /// Cache key: provider, normalised place id, then sorted parameters
    #[must_use]
    pub fn cache_key(&self, provider: &str) -> String {
        let params = self
            .params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{provider}:{}:{params}", self.place.place_id())
    }
}

/// Classified outcome of one provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProviderResult {
    /// Well-formed response with at least one record
    Ok(Vec<Record>),
    /// Well-formed response without any usable record
    Empty,
    /// Transport, timeout, schema or credential failure
    Failed(String),
}

impl ProviderResult {
    /// Classify records: an empty list is `Empty`
    #[must_use]
    pub fn from_records(records: Vec<Record>) -> Self {
        if records.is_empty() {
            ProviderResult::Empty
        } else {
            ProviderResult::Ok(records)
        }
    }

    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, ProviderResult::Ok(items) if !items.is_empty())
    }

    /// Short label for logs and status fields
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ProviderResult::Ok(items) => format!("{} records", items.len()),
            ProviderResult::Empty => "no results".to_string(),
            ProviderResult::Failed(reason) => reason.clone(),
        }
    }
}

//! OpenWeather current conditions and daily forecast summary

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::instrument;

use super::http::{HttpClient, encode};
use super::{NO_CREDENTIALS, ProviderClient, classify};
use crate::config::{ApiKey, OpenWeatherConfig};
use crate::error::TravelError;
use crate::models::{Category, ProviderQuery, ProviderResult, Record};

const PROVIDER: &str = "openweather";
/// The forecast endpoint reports in 3-hour steps
const SLOTS_PER_DAY: u32 = 8;

pub struct OpenWeatherClient {
    http: HttpClient,
    api_key: Option<ApiKey>,
    base_url: String,
    forecast_days: u32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    weather: Vec<Condition>,
    main: CurrentMain,
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct SlotMain {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastSlot {
    dt: i64,
    main: SlotMain,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastSlot>,
}

#[derive(Debug)]
struct DaySummary {
    min: f64,
    max: f64,
    conditions: Vec<String>,
}

impl DaySummary {
    /// Most frequent condition; the earliest wins a tie
    fn dominant_condition(&self) -> Option<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for condition in &self.conditions {
            *counts.entry(condition.as_str()).or_default() += 1;
        }
        let best = counts.values().copied().max()?;
        self.conditions
            .iter()
            .map(String::as_str)
            .find(|c| counts.get(c) == Some(&best))
    }
}

fn current_record(current: CurrentResponse) -> Record {
    let condition = current.weather.into_iter().next();
    let mut description = match &condition {
        Some(c) if !c.description.is_empty() => {
            format!("{}, {:.1}°C", c.description, current.main.temp)
        }
        _ => format!("{:.1}°C", current.main.temp),
    };
    if let Some(feels_like) = current.main.feels_like {
        description.push_str(&format!(" (feels like {feels_like:.1}°C)"));
    }
    if let Some(humidity) = current.main.humidity {
        description.push_str(&format!(", humidity {humidity:.0}%"));
    }
    if let Some(wind) = current.wind {
        description.push_str(&format!(", wind {:.1} m/s", wind.speed));
    }
    Record {
        category: condition.map(|c| c.main),
        description: Some(description),
        ..Record::live("Current weather")
    }
}

fn daily_records(forecast: ForecastResponse, days: usize) -> Vec<Record> {
    let mut by_day: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();
    for slot in forecast.list {
        let Some(day) = DateTime::from_timestamp(slot.dt, 0).map(|t| t.date_naive()) else {
            continue;
        };
        let summary = by_day.entry(day).or_insert(DaySummary {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            conditions: Vec::new(),
        });
        summary.min = summary.min.min(slot.main.temp_min);
        summary.max = summary.max.max(slot.main.temp_max);
        summary
            .conditions
            .extend(slot.weather.into_iter().map(|c| c.main));
    }

    by_day
        .into_iter()
        .take(days)
        .map(|(day, summary)| {
            let condition = summary.dominant_condition().map(str::to_string);
            let range = format!("{:.1}°C to {:.1}°C", summary.min, summary.max);
            Record {
                description: Some(match &condition {
                    Some(c) => format!("{c}, {range}"),
                    None => range,
                }),
                category: condition,
                ..Record::live(day.to_string())
            }
        })
        .collect()
}

impl OpenWeatherClient {
    pub fn new(http: HttpClient, config: &OpenWeatherConfig, forecast_days: u32) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            forecast_days,
        }
    }

    async fn search(
        &self,
        api_key: &ApiKey,
        query: &ProviderQuery,
    ) -> Result<Vec<Record>, TravelError> {
        let coords = query.place.coordinates;
        let common = format!(
            "lat={}&lon={}&appid={}&units=metric",
            coords.latitude,
            coords.longitude,
            encode(api_key.expose())
        );
        let current_url = format!("{}/weather?{common}", self.base_url);
        let forecast_url = format!(
            "{}/forecast?{common}&cnt={}",
            self.base_url,
            self.forecast_days * SLOTS_PER_DAY
        );

        let (current, forecast) = tokio::try_join!(
            self.http.get_json::<CurrentResponse>(PROVIDER, &current_url, &[]),
            self.http.get_json::<ForecastResponse>(PROVIDER, &forecast_url, &[]),
        )?;

        let mut records = vec![current_record(current)];
        records.extend(daily_records(forecast, self.forecast_days as usize));
        Ok(records)
    }
}

#[async_trait]
impl ProviderClient for OpenWeatherClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn category(&self) -> Category {
        Category::Weather
    }

    #[instrument(skip(self, query), fields(place = %query.place.name))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Failed(NO_CREDENTIALS.to_string());
        };
        classify(PROVIDER, query, self.search(api_key, query).await)
    }
}

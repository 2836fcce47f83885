//! Configuration management for the travel planner
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::TravelError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Provider credential. Never printed, not even in debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// The raw secret, for building requests only
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Root configuration structure for the travel planner
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TravelPlannerConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Outbound HTTP settings shared by all providers
    #[serde(default)]
    pub http: HttpConfig,
    /// Provider endpoints and credentials
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Default query settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body in KiB
    #[serde(default = "default_body_limit")]
    pub request_body_limit_kb: u32,
    /// Overall time budget for one request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per provider call timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for transient failures
    #[serde(default = "default_http_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Amadeus hotel search credentials (OAuth2 client credentials)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmadeusConfig {
    pub client_id: Option<ApiKey>,
    pub client_secret: Option<ApiKey>,
    #[serde(default = "default_amadeus_base_url")]
    pub base_url: String,
}

/// OpenTripMap attraction search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenTripMapConfig {
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_opentripmap_base_url")]
    pub base_url: String,
}

/// OpenWeather current conditions and forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_openweather_base_url")]
    pub base_url: String,
}

/// Anthropic Messages API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: Option<ApiKey>,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_anthropic_max_tokens")]
    pub max_tokens: u32,
}

/// All provider configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub amadeus: AmadeusConfig,
    #[serde(default)]
    pub opentripmap: OpenTripMapConfig,
    #[serde(default)]
    pub openweather: OpenWeatherConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for live provider results, in seconds
    #[serde(default = "default_live_ttl")]
    pub live_ttl_seconds: u64,
    /// TTL for empty/failed results, in seconds
    #[serde(default = "default_fallback_ttl")]
    pub fallback_ttl_seconds: u64,
    /// Fractional random spread applied to TTLs
    #[serde(default = "default_ttl_jitter")]
    pub ttl_jitter: f64,
    /// Interval of the expired-entry sweep in seconds, 0 disables it
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Directory of the persistent store; in-memory when absent
    pub location: Option<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// OTLP/HTTP collector endpoint for span export
    pub otlp_endpoint: Option<String>,
}

/// Default query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum records per (place, category) pair
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Search radius in kilometers
    #[serde(default = "default_search_radius")]
    pub search_radius_km: u32,
    /// Days of weather forecast to summarise
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> u32 {
    256
}

fn default_request_timeout() -> u32 {
    30
}

fn default_http_timeout() -> u32 {
    10
}

fn default_http_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!("travel-planner/{}", crate::VERSION)
}

fn default_amadeus_base_url() -> String {
    "https://test.api.amadeus.com".to_string()
}

fn default_opentripmap_base_url() -> String {
    "https://api.opentripmap.com/0.1/en".to_string()
}

fn default_openweather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    600
}

fn default_live_ttl() -> u64 {
    3600
}

fn default_fallback_ttl() -> u64 {
    300
}

fn default_ttl_jitter() -> f64 {
    0.1
}

fn default_sweep_interval() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_result_limit() -> usize {
    10
}

fn default_search_radius() -> u32 {
    10
}

fn default_forecast_days() -> u32 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_body_limit_kb: default_body_limit(),
            request_timeout_seconds: default_request_timeout(),
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            max_retries: default_http_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for AmadeusConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            base_url: default_amadeus_base_url(),
        }
    }
}

impl Default for OpenTripMapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_opentripmap_base_url(),
        }
    }
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openweather_base_url(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            max_tokens: default_anthropic_max_tokens(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            amadeus: AmadeusConfig::default(),
            opentripmap: OpenTripMapConfig::default(),
            openweather: OpenWeatherConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            live_ttl_seconds: default_live_ttl(),
            fallback_ttl_seconds: default_fallback_ttl(),
            ttl_jitter: default_ttl_jitter(),
            sweep_interval_seconds: default_sweep_interval(),
            location: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            otlp_endpoint: None,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            result_limit: default_result_limit(),
            search_radius_km: default_search_radius(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.into())
    }
}

impl CacheConfig {
    #[must_use]
    pub fn live_ttl(&self) -> Duration {
        Duration::from_secs(self.live_ttl_seconds)
    }

    #[must_use]
    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_seconds)
    }
}

/// Lowest-precedence credential source: the conventional provider variables
fn env_key(names: &[&str]) -> Option<ApiKey> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(ApiKey::new)
        .find(|key| !key.is_blank())
}

impl TravelPlannerConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path()
                .filter(|path| path.exists())
                .unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with TRAVEL_PLANNER__ prefix
        builder = builder.add_source(
            Environment::with_prefix("TRAVEL_PLANNER")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelPlannerConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_env_credentials();
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("travel-planner").join("config.toml"))
    }

    /// Fill credentials the layered config left unset from the conventional variables
    pub fn apply_env_credentials(&mut self) {
        let providers = &mut self.providers;
        if providers.amadeus.client_id.is_none() {
            providers.amadeus.client_id = env_key(&["AMADEUS_CLIENT_ID"]);
        }
        if providers.amadeus.client_secret.is_none() {
            providers.amadeus.client_secret = env_key(&["AMADEUS_CLIENT_SECRET"]);
        }
        if providers.opentripmap.api_key.is_none() {
            providers.opentripmap.api_key = env_key(&["OPENTRIPMAP_API_KEY"]);
        }
        if providers.openweather.api_key.is_none() {
            providers.openweather.api_key = env_key(&["OPENWEATHER_API_KEY"]);
        }
        if providers.anthropic.api_key.is_none() {
            providers.anthropic.api_key = env_key(&["ANTHROPIC_API_KEY", "CLAUDE_API_KEY"]);
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        fn clear_blank(key: &mut Option<ApiKey>) {
            if key.as_ref().is_some_and(ApiKey::is_blank) {
                *key = None;
            }
        }

        let providers = &mut self.providers;
        clear_blank(&mut providers.amadeus.client_id);
        clear_blank(&mut providers.amadeus.client_secret);
        clear_blank(&mut providers.opentripmap.api_key);
        clear_blank(&mut providers.openweather.api_key);
        clear_blank(&mut providers.anthropic.api_key);

        if providers.amadeus.base_url.is_empty() {
            providers.amadeus.base_url = default_amadeus_base_url();
        }
        if providers.opentripmap.base_url.is_empty() {
            providers.opentripmap.base_url = default_opentripmap_base_url();
        }
        if providers.openweather.base_url.is_empty() {
            providers.openweather.base_url = default_openweather_base_url();
        }
        if providers.anthropic.base_url.is_empty() {
            providers.anthropic.base_url = default_anthropic_base_url();
        }
        if providers.anthropic.model.is_empty() {
            providers.anthropic.model = default_anthropic_model();
        }
        if self.http.timeout_seconds == 0 {
            self.http.timeout_seconds = default_http_timeout();
        }
        if self.http.user_agent.is_empty() {
            self.http.user_agent = default_user_agent();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self
            .logging
            .otlp_endpoint
            .as_ref()
            .is_some_and(|e| e.trim().is_empty())
        {
            self.logging.otlp_endpoint = None;
        }
        if self.cache.location.as_ref().is_some_and(|l| l.trim().is_empty()) {
            self.cache.location = None;
        }
        if self.defaults.result_limit == 0 {
            self.defaults.result_limit = default_result_limit();
        }
        if self.defaults.search_radius_km == 0 {
            self.defaults.search_radius_km = default_search_radius();
        }
        if self.defaults.forecast_days == 0 {
            self.defaults.forecast_days = default_forecast_days();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.http.timeout_seconds > 300 {
            return Err(TravelError::config("Provider timeout cannot exceed 300 seconds").into());
        }

        if self.http.max_retries > 10 {
            return Err(TravelError::config("Provider max retries cannot exceed 10").into());
        }

        if self.cache.live_ttl_seconds > 7 * 24 * 3600 {
            return Err(TravelError::config("Cache TTL cannot exceed 7 days").into());
        }

        if self.cache.fallback_ttl_seconds > self.cache.live_ttl_seconds {
            return Err(TravelError::config(
                "Fallback cache TTL cannot exceed the live cache TTL",
            )
            .into());
        }

        if !(0.0..=0.5).contains(&self.cache.ttl_jitter) {
            return Err(TravelError::config("Cache TTL jitter must be within 0.0 and 0.5").into());
        }

        if self.defaults.result_limit > 50 {
            return Err(TravelError::config("Result limit cannot exceed 50").into());
        }

        if self.defaults.search_radius_km > 100 {
            return Err(TravelError::config("Search radius cannot exceed 100 km").into());
        }

        if self.defaults.forecast_days > 5 {
            return Err(TravelError::config("Forecast days cannot exceed 5").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("amadeus", &self.providers.amadeus.base_url),
            ("opentripmap", &self.providers.opentripmap.base_url),
            ("openweather", &self.providers.openweather.base_url),
            ("anthropic", &self.providers.anthropic.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Provider names that have credentials configured
    #[must_use]
    pub fn configured_providers(&self) -> Vec<&'static str> {
        let p = &self.providers;
        let mut names = Vec::new();
        if p.amadeus.client_id.is_some() && p.amadeus.client_secret.is_some() {
            names.push("amadeus");
        }
        if p.opentripmap.api_key.is_some() {
            names.push("opentripmap");
        }
        if p.openweather.api_key.is_some() {
            names.push("openweather");
        }
        if p.anthropic.api_key.is_some() {
            names.push("anthropic");
        }
        names
    }
}

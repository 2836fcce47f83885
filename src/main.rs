use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use travel_planner::api::AppState;
use travel_planner::{
    Aggregator, AggregatorSettings, ExpiringCache, FallbackSupplier, LocationResolver,
    TravelPlannerConfig, cache, logging, providers, web,
};

/// Travel data aggregation server
#[derive(Debug, Parser)]
#[command(name = "travel-planner", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Listen address, overrides the configured host
    #[arg(long)]
    host: Option<String>,
    /// Listen port, overrides the configured port
    #[arg(short, long)]
    port: Option<u16>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = TravelPlannerConfig::load_from_path(cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let _guard = logging::init(&config.logging);

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let providers = providers::build_providers(&config).context("Failed to build providers")?;
    let cache = Arc::new(
        ExpiringCache::from_location(config.cache.location.as_deref())
            .context("Failed to open cache")?,
    );
    if config.cache.sweep_interval_seconds > 0 {
        cache::spawn_sweeper(
            Arc::clone(&cache),
            Duration::from_secs(config.cache.sweep_interval_seconds),
        );
    }

    let aggregator = Aggregator::new(
        Arc::new(LocationResolver::default()),
        providers,
        FallbackSupplier::new(),
        cache,
        AggregatorSettings::from_config(&config),
    );

    let configured_providers = config.configured_providers();
    info!(
        "Starting travel planner {} with providers: {}",
        travel_planner::VERSION,
        if configured_providers.is_empty() {
            "none (fallback only)".to_string()
        } else {
            configured_providers.join(", ")
        }
    );

    let state = AppState {
        aggregator: Arc::new(aggregator),
        configured_providers,
    };
    web::run(state, &config.server).await
}

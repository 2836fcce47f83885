//! Aggregation of provider results for many places and categories.
//!
//! For each (place, category) pair the aggregator consults the cache, calls the
//! matching provider on a miss and substitutes fallback records whenever the
//! provider has nothing usable. A failing pair never aborts the batch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{ExpiringCache, jittered};
use crate::config::TravelPlannerConfig;
use crate::error::TravelError;
use crate::fallback::FallbackSupplier;
use crate::location_resolver::LocationResolver;
use crate::models::{
    Category, DateRange, Place, PlaceInput, ProviderQuery, ProviderResult, Record,
    truncate_by_rating,
};
use crate::providers::ProviderClient;

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub live_ttl: Duration,
    pub fallback_ttl: Duration,
    pub ttl_jitter: f64,
    /// Upper bound for one provider call, including retries
    pub call_timeout: Duration,
    pub default_limit: usize,
    pub default_radius_km: u32,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::from_config(&TravelPlannerConfig::default())
    }
}

impl AggregatorSettings {
    #[must_use]
    pub fn from_config(config: &TravelPlannerConfig) -> Self {
        Self {
            live_ttl: config.cache.live_ttl(),
            fallback_ttl: config.cache.fallback_ttl(),
            ttl_jitter: config.cache.ttl_jitter,
            call_timeout: config.http.timeout(),
            default_limit: config.defaults.result_limit,
            default_radius_km: config.defaults.search_radius_km,
        }
    }
}

/// Per-request query parameters; unset values use the configured defaults
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub radius_km: Option<u32>,
    pub dates: Option<DateRange>,
    /// Only applied to attraction queries
    pub kinds: Option<String>,
}

/// Outcome of one (place, category) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PairStatus {
    Live,
    Fallback,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub category: Category,
    pub status: PairStatus,
    /// Served from the cache without calling the provider
    pub cached: bool,
    /// Why fallback was used, or why the place is unresolved
    pub detail: Option<String>,
    pub records: Vec<Record>,
}

impl PairResult {
    fn unresolved(category: Category, reason: &str) -> Self {
        Self {
            category,
            status: PairStatus::Unresolved,
            cached: false,
            detail: Some(reason.to_string()),
            records: Vec::new(),
        }
    }
}

/// All pairs for one requested place
#[derive(Debug, Clone)]
pub struct PlaceReport {
    /// Key of this place in the reply
    pub name: String,
    /// `None` when the place could not be resolved
    pub place: Option<Place>,
    pub results: Vec<PairResult>,
}

impl PlaceReport {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.place.is_some()
    }

    #[must_use]
    pub fn result(&self, category: Category) -> Option<&PairResult> {
        self.results.iter().find(|r| r.category == category)
    }
}

/// Orchestrates resolver, providers, cache and fallback
pub struct Aggregator {
    resolver: Arc<LocationResolver>,
    providers: HashMap<Category, Arc<dyn ProviderClient>>,
    fallback: FallbackSupplier,
    cache: Arc<ExpiringCache>,
    settings: AggregatorSettings,
}

impl Aggregator {
    /// Later providers replace earlier ones registered for the same category
    pub fn new(
        resolver: Arc<LocationResolver>,
        providers: Vec<Arc<dyn ProviderClient>>,
        fallback: FallbackSupplier,
        cache: Arc<ExpiringCache>,
        settings: AggregatorSettings,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.category(), p))
            .collect();
        Self {
            resolver,
            providers,
            fallback,
            cache,
            settings,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &LocationResolver {
        &self.resolver
    }

    #[must_use]
    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    #[must_use]
    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Resolve every input and gather all requested categories for it.
    ///
    /// Duplicate place names are queried once; the first occurrence wins.
    /// Reports come back in input order.
    #[instrument(skip_all, fields(places = inputs.len(), categories = categories.len()))]
    pub async fn aggregate(
        &self,
        inputs: &[PlaceInput],
        categories: &[Category],
        options: &QueryOptions,
    ) -> Vec<PlaceReport> {
        let mut seen = HashSet::new();
        let categories: Vec<Category> = categories
            .iter()
            .copied()
            .filter(|c| seen.insert(*c))
            .collect();

        let mut names = HashSet::new();
        let unique: Vec<&PlaceInput> = inputs
            .iter()
            .filter(|input| {
                let name = input.name.trim();
                name.is_empty() || names.insert(name.to_lowercase())
            })
            .collect();

        join_all(
            unique
                .into_iter()
                .map(|input| self.place_report(input, &categories, options)),
        )
        .await
    }

    async fn place_report(
        &self,
        input: &PlaceInput,
        categories: &[Category],
        options: &QueryOptions,
    ) -> PlaceReport {
        let place = match self.resolver.resolve(input) {
            Ok(place) => place,
            Err(e) => {
                warn!("Skipping unresolved place: {}", e);
                let reason = match &e {
                    TravelError::UnresolvedPlace { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                return PlaceReport {
                    name: input.name.trim().to_string(),
                    place: None,
                    results: categories
                        .iter()
                        .map(|c| PairResult::unresolved(*c, &reason))
                        .collect(),
                };
            }
        };

        let results = join_all(
            categories
                .iter()
                .map(|category| self.pair(&place, *category, options)),
        )
        .await;

        PlaceReport {
            name: place.name.clone(),
            place: Some(place),
            results,
        }
    }

    /// Resolve one place and gather a single category
    pub async fn single(
        &self,
        input: &PlaceInput,
        category: Category,
        options: &QueryOptions,
    ) -> Result<(Place, PairResult), TravelError> {
        let place = self.resolver.resolve(input)?;
        let result = self.pair(&place, category, options).await;
        Ok((place, result))
    }

    fn query_for(
        &self,
        place: &Place,
        category: Category,
        options: &QueryOptions,
    ) -> ProviderQuery {
        let kinds = match category {
            Category::Attraction => options.kinds.clone(),
            _ => None,
        };
        let dates = match category {
            Category::Hotel => options.dates,
            _ => None,
        };
        ProviderQuery::new(
            place.clone(),
            category,
            options.radius_km.unwrap_or(self.settings.default_radius_km),
            options.limit.unwrap_or(self.settings.default_limit),
        )
        .with_dates(dates)
        .with_kinds(kinds)
    }

    /// Cache, then provider, then fallback, for one pair
    async fn pair(&self, place: &Place, category: Category, options: &QueryOptions) -> PairResult {
        let query = self.query_for(place, category, options);

        let (outcome, cached) = match self.providers.get(&category) {
            Some(provider) => self.cached_fetch(provider.as_ref(), &query).await,
            None => (
                ProviderResult::Failed("no provider registered".to_string()),
                false,
            ),
        };

        match outcome {
            ProviderResult::Ok(records) if !records.is_empty() => PairResult {
                category,
                status: PairStatus::Live,
                cached,
                detail: None,
                records: truncate_by_rating(records, query.limit),
            },
            other => {
                let reason = other.describe();
                info!(
                    "Using fallback {} for {}: {}",
                    category.reply_key(),
                    place.name,
                    reason
                );
                PairResult {
                    category,
                    status: PairStatus::Fallback,
                    cached,
                    detail: Some(reason),
                    records: self.fallback.records(place, category),
                }
            }
        }
    }

    /// Returns the provider outcome and whether it came from the cache
    async fn cached_fetch(
        &self,
        provider: &dyn ProviderClient,
        query: &ProviderQuery,
    ) -> (ProviderResult, bool) {
        let key = query.cache_key(provider.name());

        match self.cache.get(&key).await {
            Ok(Some(result)) => {
                debug!("Cache hit for {}", key);
                return (result, true);
            }
            Ok(None) => debug!("Cache miss for {}", key),
            Err(e) => warn!("Cache lookup failed for {}: {}", key, e),
        }

        let call = tokio::time::timeout(self.settings.call_timeout, provider.fetch(query));
        let result = match call.await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} timed out after {:?} for {}",
                    provider.name(),
                    self.settings.call_timeout,
                    query.place.name
                );
                ProviderResult::Failed(format!(
                    "timed out after {}s",
                    self.settings.call_timeout.as_secs_f64()
                ))
            }
        };

        let ttl = if result.is_usable() {
            self.settings.live_ttl
        } else {
            self.settings.fallback_ttl
        };
        if let Err(e) = self
            .cache
            .put(&key, result.clone(), jittered(ttl, self.settings.ttl_jitter))
            .await
        {
            warn!("Cache write failed for {}: {}", key, e);
        }

        (result, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Price, Source};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning a fixed outcome and counting calls
    struct StubProvider {
        category: Category,
        result: Mutex<ProviderResult>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(category: Category, result: ProviderResult) -> Self {
            Self {
                category,
                result: Mutex::new(result),
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn set_result(&self, result: ProviderResult) {
            *self.result.lock().unwrap() = result;
        }
    }

    #[async_trait]
    impl ProviderClient for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn category(&self) -> Category {
            self.category
        }

        async fn fetch(&self, _query: &ProviderQuery) -> ProviderResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.result.lock().unwrap().clone()
        }
    }

    fn settings() -> AggregatorSettings {
        AggregatorSettings {
            live_ttl: Duration::from_secs(60),
            fallback_ttl: Duration::from_secs(10),
            ttl_jitter: 0.0,
            call_timeout: Duration::from_secs(2),
            default_limit: 10,
            default_radius_km: 10,
        }
    }

    fn aggregator_with(stubs: Vec<Arc<StubProvider>>, settings: AggregatorSettings) -> Aggregator {
        let providers = stubs
            .into_iter()
            .map(|stub| stub as Arc<dyn ProviderClient>)
            .collect();
        Aggregator::new(
            Arc::new(LocationResolver::default()),
            providers,
            FallbackSupplier::new(),
            Arc::new(ExpiringCache::in_memory()),
            settings,
        )
    }

    fn hotel_x() -> Record {
        Record {
            rating: Some(4.5),
            price: Price::normalized(120.0, "EUR"),
            ..Record::live("Hotel X")
        }
    }

    fn paris() -> PlaceInput {
        PlaceInput::with_coordinates("Paris", 48.8566, 2.3522)
    }

    fn rated(name: &str, rating: f64) -> Record {
        Record {
            rating: Some(rating),
            ..Record::live(name)
        }
    }

    #[tokio::test]
    async fn test_live_result_is_tagged_and_truncated_by_rating() {
        let records = vec![rated("a", 3.0), rated("b", 4.8), rated("c", 4.1), rated("d", 4.8)];
        let stub = Arc::new(StubProvider::new(Category::Attraction, ProviderResult::Ok(records)));
        let aggregator = aggregator_with(vec![stub], settings());

        let options = QueryOptions {
            limit: Some(3),
            ..QueryOptions::default()
        };
        let reports = aggregator
            .aggregate(&[paris()], &[Category::Attraction], &options)
            .await;
        let result = reports[0].result(Category::Attraction).unwrap();
        assert_eq!(result.status, PairStatus::Live);
        let names: Vec<_> = result.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "c"]);
        assert!(result.records.iter().all(|r| r.source == Source::Live));
    }

    #[tokio::test]
    async fn test_empty_and_failed_use_exact_fallback() {
        let fallback = FallbackSupplier::new();
        for outcome in [
            ProviderResult::Empty,
            ProviderResult::Failed("HTTP 503".into()),
            ProviderResult::Ok(vec![]),
        ] {
            let stub = Arc::new(StubProvider::new(Category::Hotel, outcome));
            let aggregator = aggregator_with(vec![stub], settings());
            let reports = aggregator
                .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
                .await;
            let place = reports[0].place.clone().unwrap();
            let result = reports[0].result(Category::Hotel).unwrap();
            assert_eq!(result.status, PairStatus::Fallback);
            assert_eq!(result.records, fallback.records(&place, Category::Hotel));
            assert!(result.records.iter().all(|r| r.source == Source::Fallback));
        }
    }

    #[tokio::test]
    async fn test_missing_provider_uses_fallback() {
        let aggregator = aggregator_with(vec![], settings());
        let reports = aggregator
            .aggregate(&[paris()], &[Category::Insight], &QueryOptions::default())
            .await;
        let result = reports[0].result(Category::Insight).unwrap();
        assert_eq!(result.status, PairStatus::Fallback);
        assert_eq!(result.detail.as_deref(), Some("no provider registered"));
    }

    #[tokio::test]
    async fn test_identical_queries_call_provider_once() {
        let stub = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Ok(vec![hotel_x()]),
        ));
        let aggregator = aggregator_with(vec![stub.clone()], settings());

        let first = aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;
        let second = aggregator
            .aggregate(&[PlaceInput::named("paris")], &[Category::Hotel], &QueryOptions::default())
            .await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert!(!first[0].results[0].cached);
        assert!(second[0].results[0].cached);
        assert_eq!(first[0].results[0].records, second[0].results[0].records);
    }

    #[tokio::test]
    async fn test_expired_entry_calls_provider_again() {
        let stub = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Ok(vec![hotel_x()]),
        ));
        let aggregator = aggregator_with(
            vec![stub.clone()],
            AggregatorSettings {
                live_ttl: Duration::from_millis(30),
                ..settings()
            },
        );

        aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;

        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_result_cached_with_short_ttl_then_retried() {
        let stub = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Failed("HTTP 500".into()),
        ));
        let aggregator = aggregator_with(
            vec![stub.clone()],
            AggregatorSettings {
                fallback_ttl: Duration::from_millis(30),
                ..settings()
            },
        );

        let first = aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;
        assert_eq!(first[0].results[0].status, PairStatus::Fallback);

        stub.set_result(ProviderResult::Ok(vec![hotel_x()]));
        let cached = aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;
        assert_eq!(cached[0].results[0].status, PairStatus::Fallback);
        assert!(cached[0].results[0].cached);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let retried = aggregator
            .aggregate(&[paris()], &[Category::Hotel], &QueryOptions::default())
            .await;
        assert_eq!(retried[0].results[0].status, PairStatus::Live);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_with_unresolved_place_does_not_abort() {
        let stub = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Ok(vec![hotel_x()]),
        ));
        let aggregator = aggregator_with(vec![stub], settings());

        let inputs = [
            PlaceInput::named("Paris"),
            PlaceInput::named("Atlantis"),
            PlaceInput::named("Rome"),
        ];
        let reports = aggregator
            .aggregate(&inputs, &[Category::Hotel], &QueryOptions::default())
            .await;

        assert_eq!(reports.len(), 3);
        assert!(reports[0].is_resolved());
        assert!(!reports[1].is_resolved());
        assert_eq!(reports[1].name, "Atlantis");
        assert_eq!(reports[1].results[0].status, PairStatus::Unresolved);
        assert_eq!(reports[2].results[0].status, PairStatus::Live);
        assert_eq!(reports[2].results[0].records, vec![hotel_x()]);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_to_fallback() {
        let slow = Arc::new(
            StubProvider::new(Category::Weather, ProviderResult::Ok(vec![Record::live("late")]))
                .slow(Duration::from_millis(500)),
        );
        let fast = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Ok(vec![hotel_x()]),
        ));
        let aggregator = aggregator_with(
            vec![slow, fast],
            AggregatorSettings {
                call_timeout: Duration::from_millis(50),
                ..settings()
            },
        );

        let reports = aggregator
            .aggregate(&[paris()], &[Category::Weather, Category::Hotel], &QueryOptions::default())
            .await;
        let weather = reports[0].result(Category::Weather).unwrap();
        assert_eq!(weather.status, PairStatus::Fallback);
        assert!(weather.detail.as_deref().unwrap().contains("timed out"));
        assert_eq!(reports[0].result(Category::Hotel).unwrap().status, PairStatus::Live);
    }

    #[tokio::test]
    async fn test_duplicate_places_and_categories_collapse() {
        let stub = Arc::new(StubProvider::new(
            Category::Hotel,
            ProviderResult::Ok(vec![hotel_x()]),
        ));
        let aggregator = aggregator_with(vec![stub.clone()], settings());

        let reports = aggregator
            .aggregate(
                &[PlaceInput::named("Rome"), PlaceInput::named("rome")],
                &[Category::Hotel, Category::Hotel],
                &QueryOptions::default(),
            )
            .await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].results.len(), 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_rejects_invalid_coordinates() {
        let aggregator = aggregator_with(vec![], settings());
        let err = aggregator
            .single(
                &PlaceInput::with_coordinates("", 95.0, 0.0),
                Category::Attraction,
                &QueryOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TravelError::UnresolvedPlace { .. }));
    }

    /// Answers with a record naming the coordinates it was asked about
    struct CoordinateEcho;

    #[async_trait]
    impl ProviderClient for CoordinateEcho {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn category(&self) -> Category {
            Category::Attraction
        }

        async fn fetch(&self, query: &ProviderQuery) -> ProviderResult {
            let c = query.place.coordinates;
            ProviderResult::Ok(vec![Record::live(format!(
                "near {:.2},{:.2}",
                c.latitude, c.longitude
            ))])
        }
    }

    #[tokio::test]
    async fn test_same_name_elsewhere_does_not_share_cache() {
        let aggregator = Aggregator::new(
            Arc::new(LocationResolver::default()),
            vec![Arc::new(CoordinateEcho) as Arc<dyn ProviderClient>],
            FallbackSupplier::new(),
            Arc::new(ExpiringCache::in_memory()),
            settings(),
        );

        let (_, france) = aggregator
            .single(&paris(), Category::Attraction, &QueryOptions::default())
            .await
            .unwrap();
        let (texas_place, texas) = aggregator
            .single(
                &PlaceInput::with_coordinates("Paris", 33.6609, -95.5555),
                Category::Attraction,
                &QueryOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(france.records[0].name, "near 48.86,2.35");
        assert!(!texas.cached);
        assert_eq!(texas.records[0].name, "near 33.66,-95.56");
        assert_eq!(texas_place.code, None);
    }
}

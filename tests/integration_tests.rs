//! Integration tests for the travel planner HTTP API

use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use travel_planner::api::AppState;
use travel_planner::api::dto::ApiRecord;
use travel_planner::config::ServerConfig;
use travel_planner::models::Price;
use travel_planner::{
    Aggregator, AggregatorSettings, Category, ExpiringCache, FallbackSupplier, LocationResolver,
    PlaceInput, ProviderClient, ProviderQuery, ProviderResult, Record, web,
};

struct StubProvider {
    category: Category,
    result: ProviderResult,
    calls: AtomicUsize,
}

impl StubProvider {
    fn new(category: Category, result: ProviderResult) -> Arc<Self> {
        Arc::new(Self {
            category,
            result,
            calls: AtomicUsize::new(0),
        })
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
        self.result.clone()
    }
}

fn hotel_x() -> Record {
    Record {
        rating: Some(4.5),
        price: Price::normalized(120.0, "EUR"),
        ..Record::live("Hotel X")
    }
}

fn app_with(stubs: Vec<Arc<StubProvider>>) -> Router {
    let providers = stubs
        .into_iter()
        .map(|stub| stub as Arc<dyn ProviderClient>)
        .collect();
    let aggregator = Aggregator::new(
        Arc::new(LocationResolver::default()),
        providers,
        FallbackSupplier::new(),
        Arc::new(ExpiringCache::in_memory()),
        AggregatorSettings {
            ttl_jitter: 0.0,
            ..AggregatorSettings::default()
        },
    );
    let state = AppState {
        aggregator: Arc::new(aggregator),
        configured_providers: vec!["stub"],
    };
    web::app(state, &ServerConfig::default())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

fn paris_request() -> Value {
    json!({"cities": [{"name": "Paris", "coordinates": [48.8566, 2.3522]}]})
}

#[tokio::test]
async fn test_trip_data_returns_live_hotels() {
    let app = app_with(vec![StubProvider::new(
        Category::Hotel,
        ProviderResult::Ok(vec![hotel_x()]),
    )]);

    let (status, body) = post(&app, "/api/trip-data", paris_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let hotels = body["data"]["hotels"]["Paris"].as_array().unwrap();
    assert_eq!(hotels.len(), 1);
    assert_eq!(hotels[0]["name"], "Hotel X");
    assert_eq!(hotels[0]["rating"].as_f64(), Some(4.5));
    assert_eq!(hotels[0]["price"].as_f64(), Some(120.0));
    assert_eq!(hotels[0]["currency"], "EUR");
    assert_eq!(hotels[0]["source"], "live");
    assert_eq!(body["status"]["Paris"]["hotels"]["status"], "live");
}

#[tokio::test]
async fn test_trip_data_failed_provider_returns_fallback_catalog() {
    let app = app_with(vec![StubProvider::new(
        Category::Hotel,
        ProviderResult::Failed("HTTP 503".to_string()),
    )]);

    let (status, body) = post(
        &app,
        "/api/trip-data",
        json!({
            "cities": [{"name": "Paris", "coordinates": [48.8566, 2.3522]}],
            "categories": ["hotels"]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let place = LocationResolver::default()
        .resolve(&PlaceInput::with_coordinates("Paris", 48.8566, 2.3522))
        .unwrap();
    let expected: Vec<ApiRecord> = FallbackSupplier::new()
        .records(&place, Category::Hotel)
        .iter()
        .map(ApiRecord::from)
        .collect();
    assert_eq!(body["data"]["hotels"]["Paris"], serde_json::to_value(&expected).unwrap());
    assert!(
        body["data"]["hotels"]["Paris"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["source"] == "fallback")
    );
    assert_eq!(body["status"]["Paris"]["hotels"]["status"], "fallback");
    assert_eq!(body["status"]["Paris"]["hotels"]["detail"], "HTTP 503");
}

#[tokio::test]
async fn test_trip_data_reports_unresolved_places() {
    let stub = StubProvider::new(Category::Hotel, ProviderResult::Ok(vec![hotel_x()]));
    let app = app_with(vec![stub.clone()]);

    let (status, body) = post(
        &app,
        "/api/trip-data",
        json!({"cities": [{"name": "Paris"}, {"name": "Atlantis"}], "categories": ["hotels"]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unresolved"], json!(["Atlantis"]));
    assert!(body["data"]["hotels"].get("Atlantis").is_none());
    assert_eq!(body["status"]["Atlantis"]["hotels"]["status"], "unresolved");
    assert_eq!(body["data"]["hotels"]["Paris"][0]["name"], "Hotel X");
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_trip_data_repeated_request_is_cached() {
    let stub = StubProvider::new(Category::Hotel, ProviderResult::Ok(vec![hotel_x()]));
    let app = app_with(vec![stub.clone()]);
    let request = json!({"cities": [{"name": "Paris"}], "categories": ["hotels"]});

    let (_, first) = post(&app, "/api/trip-data", request.clone()).await;
    let (_, second) = post(&app, "/api/trip-data", request).await;

    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    assert_eq!(first["data"], second["data"]);
    assert_eq!(second["status"]["Paris"]["hotels"]["cached"], json!(true));
}

#[tokio::test]
async fn test_trip_data_rejects_bad_requests() {
    let app = app_with(vec![]);

    let (status, body) = post(&app, "/api/trip-data", json!({"cities": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("Cities data required"));

    let (status, _) = post(
        &app,
        "/api/trip-data",
        json!({"cities": [{"name": "Paris"}], "categories": ["restaurants"]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &app,
        "/api/trip-data",
        json!({"cities": [{"name": "Paris"}], "limit": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trip_data_malformed_json() {
    let app = app_with(vec![]);
    let request = Request::post("/api/trip-data")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert!(status.is_client_error());
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_cities_for_supported_country() {
    let app = app_with(vec![]);

    let (status, body) = get(&app, "/api/cities/france").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "france");
    let cities = body["cities"].as_array().unwrap();
    assert_eq!(body["count"].as_u64(), Some(cities.len() as u64));
    assert!(cities.iter().any(|c| c["name"] == "Paris"));
    assert!(cities.iter().all(|c| c["country"] == "FR"));
}

#[tokio::test]
async fn test_cities_for_unsupported_country() {
    let app = app_with(vec![]);

    let (status, body) = get(&app, "/api/cities/atlantis").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_city_attractions_live() {
    let records = vec![
        Record {
            rating: Some(4.0),
            category: Some("historic".to_string()),
            ..Record::live("Colosseum")
        },
        Record {
            rating: Some(3.0),
            ..Record::live("Trevi Fountain")
        },
    ];
    let app = app_with(vec![StubProvider::new(
        Category::Attraction,
        ProviderResult::Ok(records),
    )]);

    let (status, body) = post(
        &app,
        "/api/city-attractions",
        json!({"name": "Rome", "coordinates": {"latitude": 41.9028, "longitude": 12.4964}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["place"], "Rome");
    assert_eq!(body["count"].as_u64(), Some(2));
    assert_eq!(body["attractions"][0]["name"], "Colosseum");
    assert_eq!(body["status"], "live");
}

#[tokio::test]
async fn test_city_attractions_without_provider_falls_back() {
    let app = app_with(vec![]);

    let (status, body) = post(
        &app,
        "/api/city-attractions",
        json!({"name": "Rome", "coordinates": [41.9028, 12.4964]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "fallback");
    assert_eq!(body["count"].as_u64(), Some(3));
    assert!(
        body["attractions"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["source"] == "fallback")
    );
}

#[tokio::test]
async fn test_city_attractions_invalid_coordinates() {
    let app = app_with(vec![]);

    let (status, body) = post(
        &app,
        "/api/city-attractions",
        json!({"name": "Nowhere", "coordinates": [123.0, 12.0]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_route_orders_stops() {
    let app = app_with(vec![]);

    let (status, body) = post(
        &app,
        "/api/route",
        json!({"cities": [
            {"name": "Paris"},
            {"name": "Marseille"},
            {"name": "Lyon"},
            {"name": "Atlantis"}
        ]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let stops: Vec<&str> = body["stops"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(stops, vec!["Paris", "Lyon", "Marseille"]);
    assert_eq!(body["legs"].as_array().unwrap().len(), 2);
    assert_eq!(body["unresolved"], json!(["Atlantis"]));
    assert!(body["total_distance_km"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_health_reports_providers() {
    let app = app_with(vec![]);

    let (status, body) = get(&app, "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], travel_planner::VERSION);
    assert_eq!(body["configured_providers"], json!(["stub"]));
}

#[tokio::test]
async fn test_cache_stats_and_clear() {
    let stub = StubProvider::new(Category::Hotel, ProviderResult::Ok(vec![hotel_x()]));
    let app = app_with(vec![stub.clone()]);
    let request = json!({"cities": [{"name": "Paris"}], "categories": ["hotels"]});

    post(&app, "/api/trip-data", request.clone()).await;
    let (status, stats) = get(&app, "/api/cache/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["backend"], "memory");
    assert_eq!(stats["entries"].as_u64(), Some(1));
    assert_eq!(stats["misses"].as_u64(), Some(1));

    let (status, _) = send(
        &app,
        Request::delete("/api/cache").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, stats) = get(&app, "/api/cache/stats").await;
    assert_eq!(stats["entries"].as_u64(), Some(0));

    post(&app, "/api/trip-data", request).await;
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app_with(vec![]);
    let (status, _) = get(&app, "/api/flights").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// The binary describes itself on --help
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_travel-planner"))
        .arg("--help")
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--port"));
}

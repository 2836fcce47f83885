use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use tracing::{info, warn};

use crate::aggregator::{Aggregator, QueryOptions};
use crate::error::TravelError;
use crate::models::{Category, PlaceInput};
use crate::routing;

pub mod dto;

use dto::{
    ApiCity, ApiPairStatus, ApiRecord, CacheStatsResponse, CitiesResponse,
    CityAttractionsRequest, CityAttractionsResponse, ErrorResponse, HealthResponse, QueryParams,
    RouteRequest, RouteResponse, TripDataRequest, TripDataResponse,
};

/// Largest batch accepted by the multi-place endpoints
pub const MAX_PLACES: usize = 25;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Providers that have credentials, reported by the health check
    pub configured_providers: Vec<&'static str>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn bad_request(err: &TravelError) -> ApiError {
    warn!("Rejected request: {}", err);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(err.to_string())),
    )
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        (
            rejection.status(),
            Json(ErrorResponse::new(rejection.body_text())),
        )
    })
}

fn options_from(params: QueryParams) -> Result<QueryOptions, ApiError> {
    let dates = params.validate().map_err(|e| bad_request(&e))?;
    Ok(QueryOptions {
        limit: params.limit,
        radius_km: params.radius_km,
        dates,
        kinds: params.kinds,
    })
}

fn check_batch(places: &[PlaceInput]) -> Result<(), ApiError> {
    if places.is_empty() {
        return Err(bad_request(&TravelError::validation("Cities data required")));
    }
    if places.len() > MAX_PLACES {
        return Err(bad_request(&TravelError::validation(format!(
            "at most {MAX_PLACES} cities per request"
        ))));
    }
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/trip-data", post(trip_data))
        .route("/cities/{country}", get(cities))
        .route("/city-attractions", post(city_attractions))
        .route("/route", post(plan_route))
        .route("/health", get(health))
        .route("/cache/stats", get(cache_stats))
        .route("/cache", delete(clear_cache))
        .with_state(state)
}

async fn trip_data(
    State(state): State<AppState>,
    body: Result<Json<TripDataRequest>, JsonRejection>,
) -> ApiResult<TripDataResponse> {
    let request = parse_body(body)?;
    check_batch(&request.cities)?;
    let categories = request.categories().map_err(|e| bad_request(&e))?;
    let options = options_from(request.params)?;

    let reports = state
        .aggregator
        .aggregate(&request.cities, &categories, &options)
        .await;
    let response = TripDataResponse::from_reports(&reports, &categories);
    info!(
        "Trip data for {} places, {} unresolved",
        reports.len(),
        response.unresolved.len()
    );
    Ok(Json(response))
}

async fn cities(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> ApiResult<CitiesResponse> {
    let entries = state
        .aggregator
        .resolver()
        .cities_in_country(&country)
        .map_err(|e| bad_request(&e))?;
    let cities: Vec<ApiCity> = entries.into_iter().map(ApiCity::from).collect();
    Ok(Json(CitiesResponse {
        success: true,
        country,
        count: cities.len(),
        cities,
    }))
}

async fn city_attractions(
    State(state): State<AppState>,
    body: Result<Json<CityAttractionsRequest>, JsonRejection>,
) -> ApiResult<CityAttractionsResponse> {
    let request = parse_body(body)?;
    let [latitude, longitude] = request.coordinates.as_pair();
    let input = PlaceInput::with_coordinates(&request.name, latitude, longitude);
    let options = options_from(request.params)?;

    let (place, result) = state
        .aggregator
        .single(&input, Category::Attraction, &options)
        .await
        .map_err(|e| bad_request(&e))?;

    let attractions: Vec<ApiRecord> = result.records.iter().map(ApiRecord::from).collect();
    Ok(Json(CityAttractionsResponse {
        success: true,
        place: place.name,
        count: attractions.len(),
        attractions,
        status: ApiPairStatus::from(&result),
    }))
}

async fn plan_route(
    State(state): State<AppState>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> ApiResult<RouteResponse> {
    let request = parse_body(body)?;
    check_batch(&request.cities)?;

    let resolver = state.aggregator.resolver();
    let mut places = Vec::with_capacity(request.cities.len());
    let mut unresolved = Vec::new();
    for input in &request.cities {
        match resolver.resolve(input) {
            Ok(place) => places.push(place),
            Err(e) => {
                warn!("Leaving unresolved place out of the route: {}", e);
                unresolved.push(input.name.trim().to_string());
            }
        }
    }
    if places.is_empty() {
        return Err(bad_request(&TravelError::validation(
            "none of the cities could be resolved",
        )));
    }

    let route = routing::plan_route(places, request.keep_last);
    Ok(Json(RouteResponse::new(route, unresolved)))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        configured_providers: state.configured_providers.clone(),
    })
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        success: true,
        stats: state.aggregator.cache().stats().await,
    })
}

async fn clear_cache(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.aggregator.cache().clear().await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.user_message())),
        )
    })?;
    info!("Cache cleared");
    Ok(StatusCode::NO_CONTENT)
}

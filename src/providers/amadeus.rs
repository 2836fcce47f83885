//! Amadeus hotel search: hotels near a point, then offers for those hotels

use async_trait::async_trait;
use chrono::Utc;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, TokenResponse, TokenUrl, basic::BasicClient,
};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument};

use super::http::{HttpClient, encode};
use super::{NO_CREDENTIALS, ProviderClient, classify};
use crate::config::AmadeusConfig;
use crate::error::TravelError;
use crate::models::{Category, DateRange, Price, ProviderQuery, ProviderResult, Record};

const PROVIDER: &str = "amadeus";
/// The offers endpoint accepts at most this many hotel ids
const MAX_HOTEL_IDS: usize = 20;
/// Renew tokens this long before they expire
const TOKEN_EXPIRY_BUFFER_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct StoredToken {
    access_token: String,
    expiry: i64,
}

pub struct AmadeusClient {
    http: HttpClient,
    oauth: Option<BasicClient>,
    base_url: String,
    token: AsyncMutex<Option<StoredToken>>,
}

#[derive(Debug, Deserialize)]
struct HotelListResponse {
    #[serde(default)]
    data: Vec<HotelRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HotelRef {
    hotel_id: String,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<HotelOffers>,
}

#[derive(Debug, Deserialize)]
struct HotelOffers {
    hotel: OfferHotel,
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferHotel {
    name: Option<String>,
    rating: Option<Numeric>,
    chain_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    price: Option<OfferPrice>,
    room: Option<OfferRoom>,
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    currency: Option<String>,
    total: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct OfferRoom {
    description: Option<OfferText>,
}

#[derive(Debug, Deserialize)]
struct OfferText {
    text: Option<String>,
}

/// Amadeus sends numbers both as JSON numbers and as strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Offer {
    fn total(&self) -> Option<f64> {
        self.price.as_ref()?.total.as_ref()?.value()
    }

    fn normalized_price(&self) -> Option<Price> {
        let price = self.price.as_ref()?;
        let amount = price.total.as_ref()?.value()?;
        let currency = price.currency.as_deref()?;
        let normalized = Price::normalized(amount, currency);
        if normalized.is_none() {
            debug!("Dropping Amadeus price {} {}: no exchange rate", amount, currency);
        }
        normalized
    }
}

impl HotelOffers {
    fn into_record(self) -> Option<Record> {
        let name = self.hotel.name.filter(|n| !n.trim().is_empty())?;
        // cheapest priced offer, or the first one when none carries a total
        let best = self
            .offers
            .iter()
            .enumerate()
            .filter_map(|(idx, offer)| offer.total().map(|total| (idx, total)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(0, |(idx, _)| idx);
        let best = self.offers.into_iter().nth(best);
        let price = best.as_ref().and_then(Offer::normalized_price);
        let description = best
            .and_then(|o| o.room)
            .and_then(|r| r.description)
            .and_then(|d| d.text);
        Some(Record {
            category: self.hotel.chain_code,
            rating: self
                .hotel
                .rating
                .and_then(|r| r.value())
                .and_then(|r| crate::models::normalize_rating(r, 5.0)),
            price,
            description,
            ..Record::live(name.trim())
        })
    }
}

impl AmadeusClient {
    pub fn new(http: HttpClient, config: &AmadeusConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let oauth = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => build_oauth(&base_url, id.expose(), secret.expose()),
            _ => None,
        };
        Self {
            http,
            oauth,
            base_url,
            token: AsyncMutex::new(None),
        }
    }

    /// Bearer token, renewed shortly before expiry
    async fn access_token(&self, oauth: &BasicClient) -> Result<String, TravelError> {
        let mut stored = self.token.lock().await;
        let now = Utc::now().timestamp();
        if let Some(token) = stored.as_ref() {
            if token.expiry > now + TOKEN_EXPIRY_BUFFER_SECS {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Requesting new Amadeus access token");
        let token_response = oauth
            .exchange_client_credentials()
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| TravelError::transport(PROVIDER, format!("token request failed: {e}")))?;

        let expires_in = token_response
            .expires_in()
            .map_or(1799, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
        let token = StoredToken {
            access_token: token_response.access_token().secret().clone(),
            expiry: now.saturating_add(expires_in),
        };
        let access_token = token.access_token.clone();
        *stored = Some(token);
        Ok(access_token)
    }

    async fn search(
        &self,
        oauth: &BasicClient,
        query: &ProviderQuery,
    ) -> Result<Vec<Record>, TravelError> {
        let token = self.access_token(oauth).await?;
        let bearer = format!("Bearer {token}");
        let headers = [("Authorization", bearer.as_str()), ("Accept", "application/json")];

        let coords = query.place.coordinates;
        let url = format!(
            "{}/v1/reference-data/locations/hotels/by-geocode?latitude={}&longitude={}&radius={}&radiusUnit=KM&hotelSource=ALL",
            self.base_url, coords.latitude, coords.longitude, query.radius_km
        );
        let hotels: HotelListResponse = self.http.get_json(PROVIDER, &url, &headers).await?;
        if hotels.data.is_empty() {
            return Ok(Vec::new());
        }

        let hotel_ids = hotels
            .data
            .iter()
            .take(MAX_HOTEL_IDS)
            .map(|h| h.hotel_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let dates = query
            .dates
            .unwrap_or_else(|| DateRange::nights_from_today(30, 1));
        let url = format!(
            "{}/v3/shopping/hotel-offers?hotelIds={}&checkInDate={}&checkOutDate={}&adults=2&roomQuantity=1",
            self.base_url,
            encode(&hotel_ids),
            dates.check_in,
            dates.check_out
        );
        let offers: OffersResponse = self.http.get_json(PROVIDER, &url, &headers).await?;

        let records: Vec<Record> = offers
            .data
            .into_iter()
            .filter_map(HotelOffers::into_record)
            .collect();
        info!(
            "Found {} hotel offers near {}",
            records.len(),
            query.place.name
        );
        Ok(records)
    }
}

fn build_oauth(base_url: &str, client_id: &str, client_secret: &str) -> Option<BasicClient> {
    // client credentials never visit the authorize endpoint
    let auth_url = AuthUrl::new(format!("{base_url}/v1/security/oauth2/authorize")).ok()?;
    let token_url = TokenUrl::new(format!("{base_url}/v1/security/oauth2/token")).ok()?;
    Some(
        BasicClient::new(
            ClientId::new(client_id.to_string()),
            Some(ClientSecret::new(client_secret.to_string())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody),
    )
}

#[async_trait]
impl ProviderClient for AmadeusClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn category(&self) -> Category {
        Category::Hotel
    }

    #[instrument(skip(self, query), fields(place = %query.place.name))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult {
        let Some(oauth) = &self.oauth else {
            return ProviderResult::Failed(NO_CREDENTIALS.to_string());
        };
        classify(PROVIDER, query, self.search(oauth, query).await)
    }
}

//! Shared outbound HTTP client for provider adapters

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::TravelError;

/// reqwest client with transient-failure retries
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, TravelError> {
        Self::with_settings(config.timeout(), config.max_retries, &config.user_agent)
    }

    pub fn with_settings(
        timeout: Duration,
        max_retries: u32,
        user_agent: &str,
    ) -> Result<Self, TravelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TravelError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self { client })
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, TravelError> {
        let request = with_headers(self.client.get(url), headers);
        send_json(provider, request).await
    }

    /// POST a JSON body and read a JSON document back
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<T, TravelError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| TravelError::schema(provider, format!("Failed to encode request: {e}")))?;
        let request = with_headers(self.client.post(url), headers)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        send_json(provider, request).await
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&str, &str)]) -> RequestBuilder {
    for (key, value) in headers {
        request = request.header(*key, *value);
    }
    request
}

async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> Result<T, TravelError> {
    let response = request
        .send()
        .await
        .map_err(|e| TravelError::transport(provider, format!("Request failed: {e}")))?;

    let status = response.status();
    debug!("{} responded with {}", provider, status);

    if !status.is_success() {
        return Err(match status.as_u16() {
            401 | 403 => {
                TravelError::transport(provider, format!("authentication failed ({status})"))
            }
            429 => TravelError::transport(provider, "rate limit exceeded"),
            _ => TravelError::transport(provider, format!("HTTP {status}")),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| TravelError::transport(provider, format!("Failed to read response: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| TravelError::schema(provider, format!("Failed to parse response: {e}")))
}

/// Percent-encode a query parameter value
pub(crate) fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

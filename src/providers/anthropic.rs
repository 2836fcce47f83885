//! AI travel insights from the Anthropic Messages API

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use super::http::HttpClient;
use super::{NO_CREDENTIALS, ProviderClient, classify};
use crate::config::{AnthropicConfig, ApiKey};
use crate::error::TravelError;
use crate::models::{Category, ProviderQuery, ProviderResult, Record};

const PROVIDER: &str = "anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "You are an expert European travel assistant. \
Answer with short, practical tips only, one per line, formatted as 'Title: tip'. \
Do not number the lines and do not add any introduction.";

pub struct AnthropicClient {
    http: HttpClient,
    api_key: Option<ApiKey>,
    base_url: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

fn is_list_marker(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | '•')
}

/// Turn "Title: tip" lines into records, ignoring list markers
fn parse_tips(text: &str) -> Vec<Record> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(is_list_marker).trim())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(idx, line)| match line.split_once(':') {
            Some((title, tip)) if !title.trim().is_empty() && !tip.trim().is_empty() => Record {
                category: Some("tip".to_string()),
                description: Some(tip.trim().to_string()),
                ..Record::live(title.trim().trim_matches('*').trim())
            },
            _ => Record {
                category: Some("tip".to_string()),
                description: Some(line.to_string()),
                ..Record::live(format!("Tip {}", idx + 1))
            },
        })
        .collect()
}

impl AnthropicClient {
    pub fn new(http: HttpClient, config: &AnthropicConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    fn build_request(&self, query: &ProviderQuery) -> serde_json::Value {
        let place = &query.place;
        let location = match &place.country {
            Some(country) => format!("{} ({country})", place.name),
            None => place.name.clone(),
        };
        serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{
                "role": "user",
                "content": format!(
                    "Give {} practical travel tips for a visit to {location} (around {}).",
                    query.limit,
                    place.format_coordinates()
                ),
            }],
        })
    }

    async fn search(
        &self,
        api_key: &ApiKey,
        query: &ProviderQuery,
    ) -> Result<Vec<Record>, TravelError> {
        let url = format!("{}/messages", self.base_url);
        let headers = [
            ("x-api-key", api_key.expose()),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];
        let response: MessagesResponse = self
            .http
            .post_json(PROVIDER, &url, &headers, &self.build_request(query))
            .await?;

        let text = response
            .content
            .into_iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(parse_tips(&text))
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn category(&self) -> Category {
        Category::Insight
    }

    #[instrument(skip(self, query), fields(place = %query.place.name))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult {
        let Some(api_key) = &self.api_key else {
            return ProviderResult::Failed(NO_CREDENTIALS.to_string());
        };
        classify(PROVIDER, query, self.search(api_key, query).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, Place};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AnthropicClient {
        let config = AnthropicConfig {
            api_key: Some(ApiKey::new("sk-test")),
            base_url: server.uri(),
            ..AnthropicConfig::default()
        };
        let http = HttpClient::with_settings(Duration::from_secs(5), 0, "test").unwrap();
        AnthropicClient::new(http, &config)
    }

    fn query() -> ProviderQuery {
        let place = Place {
            name: "Florence".to_string(),
            country: Some("IT".to_string()),
            coordinates: Coordinates::new(43.7696, 11.2558).unwrap(),
            code: Some("FLR".to_string()),
        };
        ProviderQuery::new(place, Category::Insight, 10, 3)
    }

    #[test]
    fn test_parse_tips() {
        let records = parse_tips(
            "1. Book ahead: The Uffizi sells out.\n\n- **Walk**: Everything is close.\njust a sentence",
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, "Book ahead");
        assert_eq!(records[0].description.as_deref(), Some("The Uffizi sells out."));
        assert_eq!(records[1].name, "Walk");
        assert_eq!(records[2].name, "Tip 3");
    }

    #[tokio::test]
    async fn test_messages_request_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({"model": "claude-3-5-haiku-latest", "max_tokens": 600})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "content": [{
                    "type": "text",
                    "text": "Duomo: Climb early.\nMarkets: Try San Lorenzo."
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ProviderResult::Ok(records) = client(&server).fetch(&query()).await else {
            panic!("expected live records");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "Markets");
    }

    #[tokio::test]
    async fn test_empty_text_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        assert_eq!(client(&server).fetch(&query()).await, ProviderResult::Empty);
    }
}

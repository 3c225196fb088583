//! Overpass API client for populated places around a point.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::RawSettlementRecord;

pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: StatusCode },

    #[error("malformed Overpass response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of populated places within a radius of a point.
///
/// Implementations may be slow and may fail; callers treat a failure as
/// "no candidates" for that origin.
pub trait SettlementLookup {
    fn lookup(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> impl Future<Output = Result<Vec<RawSettlementRecord>, LookupError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Connection settings for [`OverpassClient`]
#[derive(Debug, Clone)]
pub struct OverpassOptions {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Total attempts per lookup, including the first
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for OverpassOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            user_agent: "Larch/0.1 (settlement survey)".to_string(),
            timeout: Duration::from_secs(180),
            max_attempts: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Queries an Overpass interpreter for city/town/village nodes
pub struct OverpassClient {
    client: Client,
    options: OverpassOptions,
}

impl OverpassClient {
    pub fn new(options: OverpassOptions) -> Result<Self, LookupError> {
        let client = Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .build()
            .map_err(LookupError::Client)?;

        Ok(Self { client, options })
    }

    pub fn endpoint(&self) -> &str {
        &self.options.endpoint
    }

    /// Overpass QL for populated places within `radius_km` of a point
    pub fn build_query(&self, lat: f64, lon: f64, radius_km: f64) -> String {
        format!(
            r#"[out:json][timeout:{}];node(around:{},{},{})["place"~"^(city|town|village)$"];out body;"#,
            self.options.timeout.as_secs().max(1),
            radius_km * 1000.0,
            lat,
            lon
        )
    }

    async fn fetch(&self, query: &str) -> Result<String, LookupError> {
        let endpoint = &self.options.endpoint;
        let max_attempts = self.options.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let result = self
                .client
                .post(endpoint.as_str())
                .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(query.to_string())
                .send()
                .await;

            let error = match result {
                Ok(response) if response.status().is_success() => {
                    return response.text().await.map_err(|source| LookupError::Request {
                        endpoint: endpoint.clone(),
                        source,
                    });
                }
                Ok(response) => LookupError::Status {
                    endpoint: endpoint.clone(),
                    status: response.status(),
                },
                Err(source) => LookupError::Request {
                    endpoint: endpoint.clone(),
                    source,
                },
            };

            if attempts >= max_attempts {
                return Err(error);
            }
            warn!(
                "Overpass request failed (attempt {}/{}): {}",
                attempts, max_attempts, error
            );
            tokio::time::sleep(self.options.retry_delay).await;
        }
    }
}

impl SettlementLookup for OverpassClient {
    async fn lookup(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> Result<Vec<RawSettlementRecord>, LookupError> {
        let query = self.build_query(lat, lon, radius_km);
        debug!("Overpass query: {}", query);

        let body = self.fetch(&query).await?;
        parse_response(&body)
    }
}

/// Extract node records from an Overpass JSON document.
///
/// Only an unreadable document is an error; a malformed element is logged
/// and skipped.
pub fn parse_response(body: &str) -> Result<Vec<RawSettlementRecord>, LookupError> {
    let response: OverpassResponse = serde_json::from_str(body)?;

    let records = response
        .elements
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<OverpassElement>(value) {
            Ok(element) => Some(element),
            Err(e) => {
                warn!("Malformed Overpass element, skipping: {}", e);
                None
            }
        })
        .filter(|e| e.element_type == "node")
        .filter_map(|mut e| {
            let (Some(lat), Some(lon)) = (e.lat, e.lon) else {
                warn!("Overpass node {} has no coordinates, skipping", e.id);
                return None;
            };
            Some(RawSettlementRecord {
                lat,
                lon,
                name: e.tags.remove("name"),
                place: e.tags.remove("place"),
                population: e.tags.remove("population"),
            })
        })
        .collect();

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(endpoint: String) -> OverpassClient {
        OverpassClient::new(OverpassOptions {
            endpoint,
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            ..OverpassOptions::default()
        })
        .unwrap()
    }

    fn sample_body() -> serde_json::Value {
        json!({
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 55.5, "lon": 37.5,
                 "tags": {"name": "Б", "place": "town", "population": "5000"}},
                {"type": "node", "id": 2, "lat": 55.1, "lon": 37.1,
                 "tags": {"place": "village"}},
                {"type": "way", "id": 3, "tags": {"name": "Дорога"}},
                {"type": "node", "id": 4, "tags": {"name": "Без координат"}}
            ]
        })
    }

    #[test]
    fn test_build_query() {
        let client = test_client("http://localhost".to_string());
        let query = client.build_query(55.0, 37.0, 100.0);
        assert!(query.contains("[out:json]"));
        assert!(query.contains("node(around:100000,55,37)"));
        assert!(query.contains(r#"["place"~"^(city|town|village)$"]"#));
    }

    #[test]
    fn test_parse_response() {
        let records = parse_response(&sample_body().to_string()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("Б"));
        assert_eq!(records[0].place.as_deref(), Some("town"));
        assert_eq!(records[0].population.as_deref(), Some("5000"));
        assert_eq!(records[1].name, None);
    }

    #[test]
    fn test_parse_skips_malformed_element() {
        let body = json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 55.5, "lon": 37.5, "tags": {"name": "Б"}},
                {"type": "node", "id": 2, "lat": "bad", "lon": 37.1, "tags": {"name": "В"}},
                {"type": "node", "id": 3, "lat": 55.2, "lon": 37.2, "tags": {"name": 7}}
            ]
        });
        let records = parse_response(&body.to_string()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Б"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_response("<osm></osm>"),
            Err(LookupError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_posts_query() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(body_string_contains("around:100000,55,37"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(format!("{}/api/interpreter", server.uri()));
        let records = client.lookup(55.0, 37.0, 100.0).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_retries_then_fails() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(format!("{}/api/interpreter", server.uri()));
        let err = client.lookup(55.0, 37.0, 100.0).await.unwrap_err();
        assert!(matches!(
            err,
            LookupError::Status { status, .. } if status == StatusCode::TOO_MANY_REQUESTS
        ));
    }

    #[tokio::test]
    async fn test_lookup_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = test_client(format!("{}/api/interpreter", server.uri()));
        assert!(matches!(
            client.lookup(55.0, 37.0, 100.0).await,
            Err(LookupError::Parse(_))
        ));
    }
}

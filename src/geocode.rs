//! Free-text place lookup against the Open-Meteo geocoding API
//!
//! Backs the map picker's search box. The endpoint is public and keyless.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::WayfarerError;
use crate::config::GeocodingConfig;
use crate::models::Coordinates;

/// A geocoded place candidate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub name: String,
    pub coordinates: Coordinates,
    pub country: Option<String>,
    /// First-level administrative area (state, region)
    pub admin1: Option<String>,
}

pub struct GeocodingClient {
    http: reqwest::Client,
    base_url: String,
    max_results: u32,
}

impl GeocodingClient {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .build()
            .context("Failed to build geocoding HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }

    /// Search for places matching a free-text query.
    #[tracing::instrument(name = "geocode_search", level = "debug", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Place>> {
        if query.trim().is_empty() {
            return Err(WayfarerError::validation("Search query cannot be empty").into());
        }

        let url = format!(
            "{}/search?name={}&count={}&language=en&format=json",
            self.base_url,
            urlencoding::encode(query.trim()),
            self.max_results
        );

        let response = self.http.get(&url).send().await?;
        let body: openmeteo::GeocodingResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse geocoding response")?;

        let places = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(Place::from)
            .collect();
        Ok(places)
    }
}

/// Open-Meteo geocoding response structures
mod openmeteo {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResponse {
        pub results: Option<Vec<GeocodingResult>>,
    }

    #[derive(Debug, Deserialize)]
    pub struct GeocodingResult {
        pub name: String,
        pub latitude: f64,
        pub longitude: f64,
        pub country: Option<String>,
        pub admin1: Option<String>,
    }
}

impl From<openmeteo::GeocodingResult> for Place {
    fn from(result: openmeteo::GeocodingResult) -> Self {
        Self {
            name: result.name,
            coordinates: Coordinates::new(result.latitude, result.longitude),
            country: result.country,
            admin1: result.admin1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> GeocodingClient {
        GeocodingClient::new(&GeocodingConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
            max_results: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("name", "Lisbon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "name": "Lisbon",
                    "latitude": 38.71667,
                    "longitude": -9.13333,
                    "country": "Portugal",
                    "admin1": "Lisbon"
                }]
            })))
            .mount(&server)
            .await;

        let places = client(&server.uri()).search("Lisbon").await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Lisbon");
        assert_eq!(places[0].country.as_deref(), Some("Portugal"));
    }

    #[tokio::test]
    async fn test_search_no_results_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let places = client(&server.uri()).search("Nowhereville").await.unwrap();
        assert!(places.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let server = MockServer::start().await;
        let result = client(&server.uri()).search("   ").await;
        assert!(result.is_err());
    }
}

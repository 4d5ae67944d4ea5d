// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP client for the current weather endpoint.

use std::time::Duration;

use log::debug;
use thiserror::Error;

use crate::model::{ApiResponse, CurrentConditions, Units};

/// Default API host. Overridable per client for tests.
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Path of the current weather endpoint.
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";

/// Request timeout. The provider normally answers well under a second;
/// anything beyond this indicates a stalled connection.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error surface of the weather client.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// The request could not be sent or the response body not read.
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status. A 401 here almost
    /// always means a missing or invalid API credential.
    #[error("weather request rejected with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body was not the expected JSON shape.
    #[error("failed to decode weather response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for the OpenWeatherMap current weather API.
///
/// Holds the credential and unit preference; each [`current`] call issues
/// one GET and decodes the reply. The client is cheap to clone and safe to
/// share across tasks.
///
/// [`current`]: WeatherClient::current
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    units: Units,
}

impl WeatherClient {
    /// Create a client against the production API host.
    pub fn new(api_key: String, units: Units) -> Result<Self, WeatherError> {
        Self::with_base_url(api_key, units, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against an alternate host (used by tests to point
    /// at a local mock server).
    pub fn with_base_url(
        api_key: String,
        units: Units,
        base_url: String,
    ) -> Result<Self, WeatherError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key,
            units,
        })
    }

    /// Unit system this client requests readings in.
    #[must_use]
    pub fn units(&self) -> Units {
        self.units
    }

    /// Fetch current conditions for the given coordinates.
    ///
    /// Exactly one GET per call; no retry, no caching. The returned record
    /// is complete and self-contained, so callers can swap it in wholesale.
    pub async fn current(&self, lat: f64, lon: f64) -> Result<CurrentConditions, WeatherError> {
        let url = format!("{}{}", self.base_url, CURRENT_WEATHER_PATH);
        debug!("Requesting current weather for {:.4}, {:.4}", lat, lon);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("appid", self.api_key.clone()),
                ("units", self.units.as_query().to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(WeatherError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: ApiResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_conditions((lat, lon)))
    }
}

/// Cap error bodies so a provider HTML page doesn't flood the log.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}…", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LONDON: &str = r#"{
        "name": "London",
        "main": {"temp": 15, "pressure": 1012, "humidity": 70},
        "weather": [{"description": "clear sky"}]
    }"#;

    fn client_for(server: &MockServer, units: Units) -> WeatherClient {
        WeatherClient::with_base_url("test-key".to_string(), units, server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_current_decodes_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "51.5"))
            .and(query_param("lon", "-0.13"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(LONDON, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Units::Metric);
        let conditions = client.current(51.5, -0.13).await.unwrap();

        assert_eq!(conditions.name, "London");
        assert_eq!(conditions.temperature, 15.0);
        assert_eq!(conditions.pressure, 1012);
        assert_eq!(conditions.humidity, 70);
        assert_eq!(conditions.description, "clear sky");
        assert_eq!(conditions.latitude, 51.5);
        assert_eq!(conditions.longitude, -0.13);
    }

    #[tokio::test]
    async fn test_units_parameter_follows_preference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(LONDON, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Units::Imperial);
        client.current(51.5, -0.13).await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_surfaces_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_raw(r#"{"cod":401,"message":"Invalid API key"}"#, "application/json"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Units::Metric);
        let err = client.current(51.5, -0.13).await.unwrap_err();

        match err {
            WeatherError::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_surfaces_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
            .mount(&server)
            .await;

        let client = client_for(&server, Units::Metric);
        let err = client.current(51.5, -0.13).await.unwrap_err();
        assert!(matches!(err, WeatherError::Decode(_)));
    }

    #[test]
    fn test_truncate_body_caps_long_payloads() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert!(truncated.chars().count() <= 201);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate_body("short"), "short");
    }
}

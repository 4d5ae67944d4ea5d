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

//! Data model for current weather readings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Unit system passed through to the provider via the `units` query
/// parameter. The provider converts temperatures server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Kelvin (the provider default when no `units` parameter is sent).
    Standard,
    /// Celsius.
    #[default]
    Metric,
    /// Fahrenheit.
    Imperial,
}

impl Units {
    /// Value used for the `units` query parameter.
    #[must_use]
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Standard => "standard",
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    /// Suffix for annotating temperatures in this unit system.
    #[must_use]
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Standard => "K",
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Units::Standard),
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!(
                "unknown unit system '{}' (expected standard, metric, or imperial)",
                other
            )),
        }
    }
}

/// An immutable point-in-time weather reading for one location.
///
/// Replaced wholesale whenever a new fetch completes; fields from an older
/// reading never survive alongside newer ones.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    /// Place name reported by the provider (may be empty for unnamed
    /// locations such as open water).
    pub name: String,

    /// Latitude echoed by the provider, in degrees.
    pub latitude: f64,

    /// Longitude echoed by the provider, in degrees.
    pub longitude: f64,

    /// Temperature in the unit system the reading was requested with.
    pub temperature: f64,

    /// Atmospheric pressure in hPa.
    pub pressure: u32,

    /// Relative humidity in percent.
    pub humidity: u8,

    /// Primary textual condition description, e.g. "clear sky".
    pub description: String,

    /// Observation time reported by the provider.
    pub observed_at: DateTime<Utc>,
}

// Raw response shape. Only the fields this application consumes are
// decoded; everything else in the provider payload is ignored.

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    coord: Option<ApiCoord>,
    weather: Vec<ApiCondition>,
    main: ApiMain,
    #[serde(default)]
    name: String,
    #[serde(default)]
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
    pressure: u32,
    humidity: u8,
}

impl ApiResponse {
    /// Flatten the provider payload into a [`CurrentConditions`] record.
    ///
    /// `requested` supplies the coordinates the fetch was issued for; they
    /// are used as the echo when the payload omits its `coord` block.
    pub(crate) fn into_conditions(self, requested: (f64, f64)) -> CurrentConditions {
        let (lat, lon) = self
            .coord
            .map_or(requested, |c| (c.lat, c.lon));

        let description = self
            .weather
            .first()
            .map(|w| w.description.clone())
            .unwrap_or_default();

        let observed_at = self
            .dt
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);

        CurrentConditions {
            name: self.name,
            latitude: lat,
            longitude: lon,
            temperature: self.main.temp,
            pressure: self.main.pressure,
            humidity: self.main.humidity,
            description,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "name": "London",
        "main": {"temp": 15, "pressure": 1012, "humidity": 70},
        "weather": [{"description": "clear sky"}]
    }"#;

    #[test]
    fn test_decode_minimal_payload() {
        let response: ApiResponse = serde_json::from_str(LONDON).unwrap();
        let conditions = response.into_conditions((51.5, -0.13));

        assert_eq!(conditions.name, "London");
        assert_eq!(conditions.temperature, 15.0);
        assert_eq!(conditions.pressure, 1012);
        assert_eq!(conditions.humidity, 70);
        assert_eq!(conditions.description, "clear sky");
        // No coord block in the payload, so the requested coordinates echo back
        assert_eq!(conditions.latitude, 51.5);
        assert_eq!(conditions.longitude, -0.13);
    }

    #[test]
    fn test_coord_block_takes_precedence_over_request() {
        let body = r#"{
            "coord": {"lat": 51.5085, "lon": -0.1257},
            "name": "London",
            "dt": 1700000000,
            "main": {"temp": 15.2, "pressure": 1012, "humidity": 70},
            "weather": [{"description": "clear sky"}]
        }"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        let conditions = response.into_conditions((51.5, -0.13));

        assert_eq!(conditions.latitude, 51.5085);
        assert_eq!(conditions.longitude, -0.1257);
        assert_eq!(conditions.observed_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_empty_weather_list_yields_empty_description() {
        let body = r#"{
            "name": "Nowhere",
            "main": {"temp": 0, "pressure": 1000, "humidity": 50},
            "weather": []
        }"#;
        let response: ApiResponse = serde_json::from_str(body).unwrap();
        let conditions = response.into_conditions((0.0, 0.0));
        assert!(conditions.description.is_empty());
    }

    #[test]
    fn test_units_round_trip() {
        for units in [Units::Standard, Units::Metric, Units::Imperial] {
            assert_eq!(units.as_query().parse::<Units>().unwrap(), units);
        }
        assert!("celsius".parse::<Units>().is_err());
    }
}

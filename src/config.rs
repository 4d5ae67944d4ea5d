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

//! Application configuration management.
//!
//! Persistent TOML configuration: the API credential, unit preference, and
//! an optional fixed-location override for machines without a usable
//! location source. Weather and location state are never persisted.

use owm_client::Units;
use serde::{Deserialize, Serialize};

/// App name used for the confy config path and the tile cache directory.
pub const APP_NAME: &str = "whereabouts-desktop";

/// Environment variable consulted for the API credential before the
/// config file.
pub const API_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// OpenWeatherMap API key (optional, env var takes precedence)
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Unit system for weather readings
    #[serde(default)]
    pub units: Units,

    /// Override latitude (for devices without a location source)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    /// Override longitude (for devices without a location source)
    #[serde(default)]
    pub override_longitude: Option<f64>,

    /// Label drawn next to the position marker
    #[serde(default = "default_marker_label")]
    pub marker_label: String,
}

fn default_marker_label() -> String {
    "You are here".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openweathermap_api_key: None,
            units: Units::default(),
            override_latitude: None,
            override_longitude: None,
            marker_label: default_marker_label(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating a default file on first run.
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Resolve the API credential: environment variable first, config
    /// file second. Returns `None` when neither supplies a non-empty key.
    pub fn resolve_api_key(&self) -> Option<String> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        resolve_api_key_from(env_key, self.openweathermap_api_key.as_deref())
    }

    /// Fixed-location override from the config file. Only honored when
    /// both coordinates are present.
    pub fn override_fix(&self) -> Option<(f64, f64)> {
        match (self.override_latitude, self.override_longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

fn resolve_api_key_from(env_key: Option<String>, config_key: Option<&str>) -> Option<String> {
    if let Some(key) = env_key {
        if !key.is_empty() {
            return Some(key);
        }
    }

    config_key.map(ToString::to_string).filter(|s| !s.is_empty())
}

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

//! Screen state machine.
//!
//! Everything the screen can be in lives here, UI-free: location
//! resolution, the derived map viewport, the weather lifecycle, and the
//! dialog visibility flag. The app shell feeds worker events in and reads
//! the resulting state out each frame.

use owm_client::CurrentConditions;

/// Fixed viewport span derived around a resolved position, degrees in
/// both axes.
pub const VIEWPORT_SPAN_DEG: f64 = 0.005;

const MIN_ZOOM: u8 = 3;
const MAX_ZOOM: u8 = 19;

/// Where a position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixSource {
    /// `--lat`/`--lon` on the command line.
    CliOverride,
    /// Override coordinates from the config file.
    ConfigOverride,
    /// Platform location service (CoreLocation).
    CoreLocation,
    /// IP-based lookup fallback.
    IpLookup,
}

/// A resolved device position. Never mutated; a re-resolution produces a
/// fresh fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub source: FixSource,
}

/// Map viewport derived from a fix: center point plus fixed span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_lat: f64,
    pub center_lon: f64,
    pub lat_span: f64,
    pub lon_span: f64,
}

impl Viewport {
    /// Derive the viewport for a fix with the fixed span.
    #[must_use]
    pub fn centered_on(fix: &LocationFix) -> Self {
        Self {
            center_lat: fix.latitude,
            center_lon: fix.longitude,
            lat_span: VIEWPORT_SPAN_DEG,
            lon_span: VIEWPORT_SPAN_DEG,
        }
    }

    /// Tile zoom level whose horizontal coverage best matches the span.
    #[must_use]
    pub fn initial_zoom(&self) -> u8 {
        let zoom = (360.0 / self.lon_span).log2().round();
        if zoom < f64::from(MIN_ZOOM) {
            MIN_ZOOM
        } else if zoom > f64::from(MAX_ZOOM) {
            MAX_ZOOM
        } else {
            zoom as u8
        }
    }
}

/// Location resolution lifecycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LocationState {
    /// Resolution in progress; the map area shows a notice.
    #[default]
    Resolving,
    /// Position resolved.
    Ready(LocationFix),
    /// The platform denied location permission.
    Denied,
    /// Every resolution source failed.
    Failed(String),
}

/// Weather fetch lifecycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WeatherState {
    /// No fetch has been issued yet.
    #[default]
    Idle,
    /// A fetch is in flight.
    Loading,
    /// Latest reading; replaced wholesale by any newer one.
    Ready(CurrentConditions),
    /// The last fetch failed.
    Failed(String),
}

/// Outcome of a location resolution attempt, delivered by the resolver
/// worker.
#[derive(Debug, Clone)]
pub enum LocationEvent {
    Fix(LocationFix),
    Denied,
    Failed(String),
}

/// Outcome of a weather fetch, delivered by the fetch worker.
#[derive(Debug, Clone)]
pub enum WeatherEvent {
    Loaded(CurrentConditions),
    Failed(String),
}

/// Weather fetch to issue for a freshly resolved position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// The whole screen: `Unresolved → LocationReady → WeatherReady`, with an
/// orthogonal hidden/visible dialog flag.
#[derive(Debug, Clone, Default)]
pub struct ScreenState {
    pub location: LocationState,
    pub viewport: Option<Viewport>,
    pub weather: WeatherState,
    pub dialog_open: bool,
}

impl ScreenState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a resolution outcome. A successful fix derives the viewport
    /// and returns the weather fetch to issue as a direct continuation,
    /// keeping the snapshot causally tied to the latest fix. Denial and
    /// failure produce no viewport and no fetch.
    pub fn apply_location(&mut self, event: LocationEvent) -> Option<FetchRequest> {
        match event {
            LocationEvent::Fix(fix) => {
                self.viewport = Some(Viewport::centered_on(&fix));
                self.location = LocationState::Ready(fix);
                self.weather = WeatherState::Loading;
                Some(FetchRequest {
                    latitude: fix.latitude,
                    longitude: fix.longitude,
                })
            }
            LocationEvent::Denied => {
                self.location = LocationState::Denied;
                None
            }
            LocationEvent::Failed(reason) => {
                self.location = LocationState::Failed(reason);
                None
            }
        }
    }

    /// Apply a fetch outcome. A loaded reading replaces any previous one
    /// wholesale.
    pub fn apply_weather(&mut self, event: WeatherEvent) {
        self.weather = match event {
            WeatherEvent::Loaded(conditions) => WeatherState::Ready(conditions),
            WeatherEvent::Failed(reason) => WeatherState::Failed(reason),
        };
    }

    /// Re-issue the fetch for the current fix, if one exists.
    pub fn refresh_weather(&mut self) -> Option<FetchRequest> {
        match self.location {
            LocationState::Ready(fix) => {
                self.weather = WeatherState::Loading;
                Some(FetchRequest {
                    latitude: fix.latitude,
                    longitude: fix.longitude,
                })
            }
            _ => None,
        }
    }

    /// Restart resolution from scratch (retry affordance). Clears the
    /// viewport and weather so nothing stale outlives the old fix.
    pub fn begin_resolving(&mut self) {
        self.location = LocationState::Resolving;
        self.viewport = None;
        self.weather = WeatherState::Idle;
    }

    /// Flip the weather dialog. Never touches location or weather state.
    pub fn toggle_dialog(&mut self) {
        self.dialog_open = !self.dialog_open;
    }

    pub fn close_dialog(&mut self) {
        self.dialog_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fix(lat: f64, lon: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: lon,
            source: FixSource::CoreLocation,
        }
    }

    fn conditions(name: &str, temp: f64) -> CurrentConditions {
        CurrentConditions {
            name: name.to_string(),
            latitude: 51.5,
            longitude: -0.13,
            temperature: temp,
            pressure: 1012,
            humidity: 70,
            description: "clear sky".to_string(),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_viewport_centered_with_fixed_span() {
        let mut state = ScreenState::new();
        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));

        let viewport = state.viewport.expect("viewport derived from fix");
        assert_eq!(viewport.center_lat, 51.5);
        assert_eq!(viewport.center_lon, -0.13);
        assert_eq!(viewport.lat_span, VIEWPORT_SPAN_DEG);
        assert_eq!(viewport.lon_span, VIEWPORT_SPAN_DEG);
    }

    #[test]
    fn test_fix_triggers_fetch_for_same_coordinates() {
        let mut state = ScreenState::new();
        let request = state.apply_location(LocationEvent::Fix(fix(48.85, 2.35)));

        assert_eq!(
            request,
            Some(FetchRequest {
                latitude: 48.85,
                longitude: 2.35
            })
        );
        assert_eq!(state.weather, WeatherState::Loading);
    }

    #[test]
    fn test_denied_produces_no_viewport_and_no_fetch() {
        let mut state = ScreenState::new();
        let request = state.apply_location(LocationEvent::Denied);

        assert_eq!(request, None);
        assert_eq!(state.viewport, None);
        assert_eq!(state.location, LocationState::Denied);
        assert_eq!(state.weather, WeatherState::Idle);
    }

    #[test]
    fn test_resolution_failure_produces_no_viewport_and_no_fetch() {
        let mut state = ScreenState::new();
        let request = state.apply_location(LocationEvent::Failed("no network".to_string()));

        assert_eq!(request, None);
        assert_eq!(state.viewport, None);
    }

    #[test]
    fn test_failed_fetch_keeps_toggle_functional() {
        let mut state = ScreenState::new();
        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));
        state.apply_weather(WeatherEvent::Failed("connection refused".to_string()));

        state.toggle_dialog();
        assert!(state.dialog_open);
        assert!(matches!(state.weather, WeatherState::Failed(_)));

        state.toggle_dialog();
        assert!(!state.dialog_open);
    }

    #[test]
    fn test_toggle_does_not_touch_location_or_weather() {
        let mut state = ScreenState::new();
        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));
        state.apply_weather(WeatherEvent::Loaded(conditions("London", 15.0)));

        let location_before = state.location.clone();
        let weather_before = state.weather.clone();

        state.toggle_dialog();
        state.toggle_dialog();

        assert!(!state.dialog_open);
        assert_eq!(state.location, location_before);
        assert_eq!(state.weather, weather_before);
    }

    #[test]
    fn test_new_reading_replaces_snapshot_wholesale() {
        let mut state = ScreenState::new();
        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));

        state.apply_weather(WeatherEvent::Loaded(conditions("London", 15.0)));
        let replacement = CurrentConditions {
            name: "Paris".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            temperature: 19.0,
            pressure: 1008,
            humidity: 55,
            description: "scattered clouds".to_string(),
            observed_at: Utc::now(),
        };
        state.apply_weather(WeatherEvent::Loaded(replacement.clone()));

        match &state.weather {
            WeatherState::Ready(current) => assert_eq!(current, &replacement),
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_refresh_requires_a_fix() {
        let mut state = ScreenState::new();
        assert_eq!(state.refresh_weather(), None);

        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));
        state.apply_weather(WeatherEvent::Loaded(conditions("London", 15.0)));
        let request = state.refresh_weather().expect("refresh with fix present");
        assert_eq!(request.latitude, 51.5);
        assert_eq!(state.weather, WeatherState::Loading);
    }

    #[test]
    fn test_begin_resolving_clears_derived_state() {
        let mut state = ScreenState::new();
        state.apply_location(LocationEvent::Fix(fix(51.5, -0.13)));
        state.apply_weather(WeatherEvent::Loaded(conditions("London", 15.0)));

        state.begin_resolving();
        assert_eq!(state.location, LocationState::Resolving);
        assert_eq!(state.viewport, None);
        assert_eq!(state.weather, WeatherState::Idle);
    }

    #[test]
    fn test_initial_zoom_is_street_level_for_fixed_span() {
        let viewport = Viewport::centered_on(&fix(51.5, -0.13));
        let zoom = viewport.initial_zoom();
        // 0.005 degrees across maps to the 16-17 zoom band
        assert!((16..=17).contains(&zoom), "zoom {} out of band", zoom);
    }
}

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

//! Device position resolution.
//!
//! One-shot resolution on a worker thread, first source wins:
//! a fixed override (CLI or config), the platform location service
//! (CoreLocation, with permission gating), then IP-based geolocation.
//! A permission denial stops resolution outright - no fallback source is
//! consulted, matching the platform's intent.

use std::sync::mpsc::Sender;

use log::{error, info, warn};

use crate::state::{FixSource, LocationEvent, LocationFix};

/// Resolve the device position in the background, delivering exactly one
/// [`LocationEvent`] on the channel and waking the UI afterwards.
pub fn spawn_resolver(
    override_fix: Option<LocationFix>,
    tx: Sender<LocationEvent>,
    ctx: egui::Context,
) {
    std::thread::spawn(move || {
        let event = resolve(override_fix);
        if tx.send(event).is_ok() {
            ctx.request_repaint();
        }
    });
}

fn resolve(override_fix: Option<LocationFix>) -> LocationEvent {
    if let Some(fix) = override_fix {
        info!(
            "Using fixed location override: {:.4}, {:.4}",
            fix.latitude, fix.longitude
        );
        return LocationEvent::Fix(fix);
    }

    match platform_probe() {
        Probe::Fix(lat, lon) => {
            info!("Position from platform location service: {}, {}", lat, lon);
            return LocationEvent::Fix(LocationFix {
                latitude: lat,
                longitude: lon,
                source: FixSource::CoreLocation,
            });
        }
        Probe::Denied => {
            warn!("Location permission denied");
            return LocationEvent::Denied;
        }
        Probe::Unavailable => {}
    }

    info!("Falling back to IP-based geolocation...");
    match ip_lookup() {
        Some((lat, lon)) => LocationEvent::Fix(LocationFix {
            latitude: lat,
            longitude: lon,
            source: FixSource::IpLookup,
        }),
        None => {
            error!("Failed to resolve a position from any source");
            LocationEvent::Failed("Could not determine the device position".to_string())
        }
    }
}

/// Outcome of the platform location service probe.
#[allow(
    dead_code,
    reason = "Fix and Denied are only constructed by the platform probe"
)]
enum Probe {
    Fix(f64, f64),
    Denied,
    Unavailable,
}

#[cfg(target_os = "macos")]
fn platform_probe() -> Probe {
    core_location::probe()
}

#[cfg(not(target_os = "macos"))]
fn platform_probe() -> Probe {
    Probe::Unavailable
}

/// IP-based geolocation: ipapi.co first, ip-api.com as backup. The two
/// providers use different field names for the same coordinates.
fn ip_lookup() -> Option<(f64, f64)> {
    if let Some(fix) = query_geo_provider("https://ipapi.co/json/", "latitude", "longitude") {
        return Some(fix);
    }
    query_geo_provider("http://ip-api.com/json/", "lat", "lon")
}

fn query_geo_provider(url: &str, lat_field: &str, lon_field: &str) -> Option<(f64, f64)> {
    let response = match reqwest::blocking::get(url) {
        Ok(response) => response,
        Err(e) => {
            warn!("Geolocation request to {} failed: {}", url, e);
            return None;
        }
    };

    let text = response.text().ok()?;
    let fix = parse_coordinates(&text, lat_field, lon_field);
    if let Some((lat, lon)) = fix {
        info!("Position via {}: {}, {}", url, lat, lon);
    }
    fix
}

fn parse_coordinates(body: &str, lat_field: &str, lon_field: &str) -> Option<(f64, f64)> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let lat = value.get(lat_field)?.as_f64()?;
    let lon = value.get(lon_field)?.as_f64()?;
    Some((lat, lon))
}

#[cfg(target_os = "macos")]
mod core_location {
    //! One-shot CoreLocation read via dynamic dispatch, including the
    //! authorization handshake.

    use std::time::Duration;

    use log::warn;
    use objc2::rc::Retained;
    use objc2::runtime::AnyObject;
    use objc2::{class, msg_send};
    use objc2_core_location::CLLocationCoordinate2D;

    use super::Probe;

    // CLAuthorizationStatus values
    const AUTH_NOT_DETERMINED: i32 = 0;
    const AUTH_RESTRICTED: i32 = 1;
    const AUTH_DENIED: i32 = 2;

    pub(super) fn probe() -> Probe {
        // SAFETY: CLLocationManager is created and used on this worker
        // thread only; all selectors exist on every supported macOS and
        // match the annotated return types.
        unsafe {
            let manager: Retained<AnyObject> = msg_send![class!(CLLocationManager), new];

            let mut status: i32 = msg_send![class!(CLLocationManager), authorizationStatus];
            if status == AUTH_NOT_DETERMINED {
                let _: () = msg_send![&*manager, requestWhenInUseAuthorization];
                // Give the authorization prompt a moment to settle
                std::thread::sleep(Duration::from_millis(500));
                status = msg_send![class!(CLLocationManager), authorizationStatus];
            }

            if status == AUTH_RESTRICTED || status == AUTH_DENIED {
                return Probe::Denied;
            }

            let _: () = msg_send![&*manager, startUpdatingLocation];
            // One-shot read: wait for the first update rather than wiring
            // up a delegate
            std::thread::sleep(Duration::from_secs(2));

            let location: Option<Retained<AnyObject>> = msg_send![&*manager, location];
            let _: () = msg_send![&*manager, stopUpdatingLocation];

            match location {
                Some(location) => {
                    let coord: CLLocationCoordinate2D = msg_send![&*location, coordinate];
                    Probe::Fix(coord.latitude, coord.longitude)
                }
                None => {
                    warn!("No position available from CoreLocation");
                    Probe::Unavailable
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_short_circuits_resolution() {
        let fix = LocationFix {
            latitude: 51.5,
            longitude: -0.13,
            source: FixSource::CliOverride,
        };
        match resolve(Some(fix)) {
            LocationEvent::Fix(resolved) => assert_eq!(resolved, fix),
            other => panic!("expected Fix, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_coordinates_per_provider_fields() {
        let ipapi = r#"{"ip": "1.2.3.4", "latitude": 51.5, "longitude": -0.13}"#;
        assert_eq!(
            parse_coordinates(ipapi, "latitude", "longitude"),
            Some((51.5, -0.13))
        );

        let ip_api = r#"{"status": "success", "lat": 48.85, "lon": 2.35}"#;
        assert_eq!(parse_coordinates(ip_api, "lat", "lon"), Some((48.85, 2.35)));
    }

    #[test]
    fn test_parse_coordinates_rejects_incomplete_bodies() {
        assert_eq!(parse_coordinates("not json", "lat", "lon"), None);
        assert_eq!(parse_coordinates(r#"{"lat": 1.0}"#, "lat", "lon"), None);
        assert_eq!(
            parse_coordinates(r#"{"lat": "fifty", "lon": 2.0}"#, "lat", "lon"),
            None
        );
    }
}

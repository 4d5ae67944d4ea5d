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

//! Web Mercator projection utilities.

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to a fractional tile Y coordinate at the given zoom
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to a fractional tile X coordinate at the given zoom
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert a tile Y coordinate back to latitude
    #[must_use]
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        let lat_rad = ((std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh()).atan();
        lat_rad.to_degrees()
    }

    /// Convert a tile X coordinate back to longitude
    #[must_use]
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        x / n * 360.0 - 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_round_trip() {
        for &(lat, lon) in &[(51.5, -0.13), (0.0, 0.0), (-33.87, 151.21)] {
            for zoom in [4, 10, 16] {
                let x = WebMercator::lon_to_x(lon, zoom);
                let y = WebMercator::lat_to_y(lat, zoom);
                assert!((WebMercator::tile_to_lon(x, zoom) - lon).abs() < 1e-9);
                assert!((WebMercator::tile_to_lat(y, zoom) - lat).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_origin_maps_to_tile_grid_center() {
        let zoom = 10;
        let n = 2_f64.powi(i32::from(zoom));
        assert!((WebMercator::lon_to_x(0.0, zoom) - n / 2.0).abs() < 1e-9);
        assert!((WebMercator::lat_to_y(0.0, zoom) - n / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_y_grows_southward() {
        let zoom = 8;
        assert!(WebMercator::lat_to_y(51.5, zoom) < WebMercator::lat_to_y(-33.87, zoom));
    }
}

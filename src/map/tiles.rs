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

//! Basemap tile fetching and caching.
//!
//! Tiles come from the Carto CDN dark basemap with subdomain load
//! balancing, are cached on disk under hash-derived names for seven days,
//! and are decoded into egui textures on background threads.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use egui::{ColorImage, TextureHandle};
use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::config::APP_NAME;
use crate::map::mercator::WebMercator;

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

const CACHE_DURATION_DAYS: u64 = 7;

/// Identity of one basemap tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    #[must_use]
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }

    /// Tile URL on the Carto CDN, with subdomain load balancing across
    /// a-d based on the tile coordinates.
    #[must_use]
    pub fn url(&self) -> String {
        let subdomain = ['a', 'b', 'c', 'd'][((self.x + self.y) % 4) as usize];
        format!(
            "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
            subdomain, self.zoom, self.x, self.y
        )
    }

    /// Cache filename derived from the URL hash.
    fn cache_filename(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.url().as_bytes());
        format!("{:x}.png", hasher.finalize())
    }
}

/// Lifecycle of one tile inside the manager.
enum TileState {
    Loading,
    Loaded(TextureHandle),
    Failed,
}

/// Tile store: memory map of texture states, disk cache, and the download
/// queue guard.
pub struct TileManager {
    cache_dir: PathBuf,
    tiles: Arc<Mutex<HashMap<TileCoord, TileState>>>,
    in_flight: Arc<Mutex<HashSet<TileCoord>>>,
}

impl std::fmt::Debug for TileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileManager")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TileManager {
    #[must_use]
    pub fn new() -> Self {
        let cache_dir = Self::cache_dir();

        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!("Failed to create tile cache directory: {}", e);
        }
        Self::cleanup_old_tiles(&cache_dir);

        Self {
            cache_dir,
            tiles: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn cache_dir() -> PathBuf {
        let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        path.push(APP_NAME);
        path.push("tiles");
        path
    }

    /// Drop cached tiles older than the cache duration.
    fn cleanup_old_tiles(cache_dir: &Path) {
        let now = SystemTime::now();
        let max_age = Duration::from_secs(CACHE_DURATION_DAYS * 24 * 60 * 60);

        let Ok(entries) = fs::read_dir(cache_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > max_age);
            if expired {
                debug!("Removing expired tile {:?}", entry.path());
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    /// Get a tile texture, loading from disk or queueing a download when
    /// it isn't resident yet.
    pub fn get_tile(&self, coord: TileCoord, ctx: &egui::Context) -> Option<TextureHandle> {
        let mut tiles = self.tiles.lock().unwrap();

        match tiles.get(&coord) {
            Some(TileState::Loaded(texture)) => Some(texture.clone()),
            Some(TileState::Loading | TileState::Failed) => None,
            None => {
                let cache_path = self.cache_dir.join(coord.cache_filename());
                if let Ok(bytes) = fs::read(&cache_path) {
                    match Self::texture_from_bytes(&bytes, coord, ctx) {
                        Ok(texture) => {
                            tiles.insert(coord, TileState::Loaded(texture.clone()));
                            return Some(texture);
                        }
                        Err(e) => warn!("Failed to load cached tile: {}", e),
                    }
                }

                tiles.insert(coord, TileState::Loading);
                drop(tiles);
                self.queue_download(coord, ctx.clone());
                None
            }
        }
    }

    fn queue_download(&self, coord: TileCoord, ctx: egui::Context) {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if !in_flight.insert(coord) {
                return;
            }
        }

        let tiles = Arc::clone(&self.tiles);
        let in_flight = Arc::clone(&self.in_flight);
        let cache_dir = self.cache_dir.clone();

        std::thread::spawn(move || {
            let state = Self::download_tile(coord, &cache_dir, &ctx);
            tiles.lock().unwrap().insert(coord, state);
            in_flight.lock().unwrap().remove(&coord);
            ctx.request_repaint();
        });
    }

    fn download_tile(coord: TileCoord, cache_dir: &Path, ctx: &egui::Context) -> TileState {
        let url = coord.url();
        debug!("Downloading tile {}", url);

        let response = match reqwest::blocking::get(&url) {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch tile: {}", e);
                return TileState::Failed;
            }
        };

        if !response.status().is_success() {
            warn!("Failed to download tile: HTTP {}", response.status());
            return TileState::Failed;
        }

        let bytes = match response.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read tile bytes: {}", e);
                return TileState::Failed;
            }
        };

        if let Err(e) = fs::write(cache_dir.join(coord.cache_filename()), &bytes) {
            warn!("Failed to save tile to cache: {}", e);
        }

        match Self::texture_from_bytes(&bytes, coord, ctx) {
            Ok(texture) => TileState::Loaded(texture),
            Err(e) => {
                warn!("Failed to decode tile image: {}", e);
                TileState::Failed
            }
        }
    }

    fn texture_from_bytes(
        bytes: &[u8],
        coord: TileCoord,
        ctx: &egui::Context,
    ) -> Result<TextureHandle, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let color_image = ColorImage::from_rgba_unmultiplied(
            [TILE_SIZE as usize, TILE_SIZE as usize],
            &rgba.into_raw(),
        );
        Ok(ctx.load_texture(
            format!("tile_{}_{}_{}", coord.zoom, coord.x, coord.y),
            color_image,
            Default::default(),
        ))
    }

    /// Enumerate the tiles covering a viewport, with each tile's pixel
    /// offset from the viewport center. X wraps around the antimeridian;
    /// Y is clamped to the projection.
    #[must_use]
    pub fn visible_tiles(
        center_lat: f64,
        center_lon: f64,
        zoom: u8,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Vec<(TileCoord, f32, f32)> {
        let mut tiles = Vec::new();

        let center_tile_x = WebMercator::lon_to_x(center_lon, zoom);
        let center_tile_y = WebMercator::lat_to_y(center_lat, zoom);

        let tiles_wide = (viewport_width / TILE_SIZE as f32).ceil() as i32 + 2;
        let tiles_high = (viewport_height / TILE_SIZE as f32).ceil() as i32 + 2;

        let start_x = center_tile_x.floor() as i32 - tiles_wide / 2;
        let start_y = center_tile_y.floor() as i32 - tiles_high / 2;

        let max_tile = 2_i32.pow(u32::from(zoom));

        for dy in 0..tiles_high {
            for dx in 0..tiles_wide {
                let tile_x = start_x + dx;
                let tile_y = start_y + dy;

                let wrapped_x = ((tile_x % max_tile) + max_tile) % max_tile;

                if tile_y >= 0 && tile_y < max_tile {
                    let coord = TileCoord::new(wrapped_x as u32, tile_y as u32, zoom);

                    let offset_x = (f64::from(tile_x) - center_tile_x) * f64::from(TILE_SIZE);
                    let offset_y = (f64::from(tile_y) - center_tile_y) * f64::from(TILE_SIZE);

                    tiles.push((coord, offset_x as f32, offset_y as f32));
                }
            }
        }

        tiles
    }

    /// Whether any tile is still being downloaded or decoded.
    pub fn has_loading_tiles(&self) -> bool {
        let tiles = self.tiles.lock().unwrap();
        tiles
            .values()
            .any(|state| matches!(state, TileState::Loading))
    }

    /// Number of tiles that failed to download or decode.
    pub fn error_count(&self) -> usize {
        let tiles = self.tiles.lock().unwrap();
        tiles
            .values()
            .filter(|state| matches!(state, TileState::Failed))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_balances_subdomains() {
        assert!(TileCoord::new(0, 0, 3)
            .url()
            .starts_with("https://a.basemaps.cartocdn.com/dark_all/3/0/0"));
        assert!(TileCoord::new(1, 0, 3)
            .url()
            .starts_with("https://b.basemaps.cartocdn.com/"));
        assert!(TileCoord::new(1, 2, 3)
            .url()
            .starts_with("https://d.basemaps.cartocdn.com/"));
    }

    #[test]
    fn test_cache_filename_is_stable_and_unique() {
        let a = TileCoord::new(10, 20, 12);
        let b = TileCoord::new(10, 21, 12);
        assert_eq!(a.cache_filename(), a.cache_filename());
        assert_ne!(a.cache_filename(), b.cache_filename());
        assert!(a.cache_filename().ends_with(".png"));
    }

    #[test]
    fn test_visible_tiles_cover_center() {
        let zoom = 16;
        let tiles = TileManager::visible_tiles(51.5, -0.13, zoom, 800.0, 600.0);
        assert!(!tiles.is_empty());

        let center = TileCoord::new(
            WebMercator::lon_to_x(-0.13, zoom).floor() as u32,
            WebMercator::lat_to_y(51.5, zoom).floor() as u32,
            zoom,
        );
        assert!(tiles.iter().any(|(coord, _, _)| *coord == center));
    }

    #[test]
    fn test_visible_tiles_wrap_longitude() {
        let zoom = 4;
        let max_tile = 2_u32.pow(u32::from(zoom));
        let tiles = TileManager::visible_tiles(0.0, 179.9, zoom, 1400.0, 400.0);
        // Crossing the antimeridian must stay within the tile grid
        assert!(tiles.iter().all(|(coord, _, _)| coord.x < max_tile));
    }
}

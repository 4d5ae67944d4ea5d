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

//! The egui map view.
//!
//! Paints the basemap tiles around a center point, the device position
//! marker, attribution, and a transient banner for tile problems. Panning
//! and zooming move the view only; the marker stays at the resolved
//! position.

use eframe::egui;

use crate::map::mercator::WebMercator;
use crate::map::tiles::{TileCoord, TileManager, TILE_SIZE};
use crate::state::Viewport;

const MIN_ZOOM: f32 = 3.0;
const MAX_ZOOM: f32 = 19.0;

/// Map widget state: view center, zoom, marker, and the tile store.
#[derive(Debug)]
pub struct MapView {
    center_lat: f64,
    center_lon: f64,
    marker_lat: f64,
    marker_lon: f64,
    marker_label: String,
    zoom: f32,
    tiles: TileManager,
    banner: Option<String>,
}

impl MapView {
    /// Create a view centered on a derived viewport, with the marker at
    /// its center.
    #[must_use]
    pub fn new(viewport: &Viewport, marker_label: String) -> Self {
        Self {
            center_lat: viewport.center_lat,
            center_lon: viewport.center_lon,
            marker_lat: viewport.center_lat,
            marker_lon: viewport.center_lon,
            marker_label,
            zoom: f32::from(viewport.initial_zoom()),
            tiles: TileManager::new(),
            banner: None,
        }
    }

    /// Render the map into the available space.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );

        let rect = response.rect;
        let center = rect.center();

        painter.rect_filled(rect, egui::CornerRadius::ZERO, egui::Color32::from_rgb(20, 22, 26));

        // Pinch / ctrl-scroll zoom
        let zoom_delta = ui.ctx().input(|i| i.zoom_delta());
        if (zoom_delta - 1.0).abs() > 0.001 {
            self.zoom = (self.zoom + zoom_delta.log2()).clamp(MIN_ZOOM, MAX_ZOOM);
        }

        let tile_zoom = self.zoom.round() as u8;
        let tile_pixel_size = TILE_SIZE as f32;

        let visible = TileManager::visible_tiles(
            self.center_lat,
            self.center_lon,
            tile_zoom,
            rect.width(),
            rect.height(),
        );

        let mut tiles_rendered = 0;
        for (coord, offset_x, offset_y) in visible {
            if let Some(texture) = self.tiles.get_tile(coord, ui.ctx()) {
                let tile_rect = egui::Rect::from_min_size(
                    egui::pos2(center.x + offset_x, center.y + offset_y),
                    egui::vec2(tile_pixel_size, tile_pixel_size),
                );
                painter.image(
                    texture.id(),
                    tile_rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
                tiles_rendered += 1;
            }
        }

        if self.tiles.error_count() > 0 {
            self.banner = Some(format!("Failed to load {} tiles", self.tiles.error_count()));
        } else if self.tiles.has_loading_tiles() {
            self.banner = Some("Loading map tiles...".to_string());
        } else if tiles_rendered > 0 {
            self.banner = None;
        }

        // Drag-to-pan, accounting for Mercator distortion away from the
        // equator
        if response.dragged() {
            let delta = response.drag_delta();
            let scale = 2.0_f64.powf(f64::from(self.zoom));
            let lat_per_pixel = 180.0 / (f64::from(tile_pixel_size) * scale);
            let lon_per_pixel = 360.0 / (f64::from(tile_pixel_size) * scale);

            let cos_lat = self.center_lat.to_radians().cos();

            self.center_lat += f64::from(delta.y) * lat_per_pixel;
            self.center_lon -= f64::from(delta.x) * lon_per_pixel / cos_lat.max(0.1);
            self.center_lat = self.center_lat.clamp(-85.0, 85.0);
        }

        let to_screen = |lat: f64, lon: f64| -> egui::Pos2 {
            let pixel_x = (WebMercator::lon_to_x(lon, tile_zoom)
                - WebMercator::lon_to_x(self.center_lon, tile_zoom))
                * f64::from(tile_pixel_size);
            let pixel_y = (WebMercator::lat_to_y(lat, tile_zoom)
                - WebMercator::lat_to_y(self.center_lat, tile_zoom))
                * f64::from(tile_pixel_size);
            egui::pos2(center.x + pixel_x as f32, center.y + pixel_y as f32)
        };

        self.draw_marker(&painter, rect, to_screen(self.marker_lat, self.marker_lon));

        painter.text(
            rect.left_top() + egui::vec2(10.0, 10.0),
            egui::Align2::LEFT_TOP,
            "Drag to pan | Pinch to zoom",
            egui::FontId::proportional(12.0),
            egui::Color32::from_rgb(170, 170, 170),
        );

        // Attribution (required by Carto)
        painter.text(
            rect.right_bottom() + egui::vec2(-10.0, -10.0),
            egui::Align2::RIGHT_BOTTOM,
            "© OpenStreetMap contributors © CARTO",
            egui::FontId::proportional(10.0),
            egui::Color32::from_rgb(150, 150, 150),
        );

        if let Some(banner) = self.banner.clone() {
            self.draw_banner(&painter, rect, &banner);
        }
    }

    /// Device position marker: filled circle, crosshair, and label.
    fn draw_marker(&self, painter: &egui::Painter, rect: egui::Rect, pos: egui::Pos2) {
        if !rect.contains(pos) {
            return;
        }

        let fill = egui::Color32::from_rgb(50, 255, 50);
        let stroke = egui::Stroke::new(2.0, egui::Color32::from_rgb(0, 180, 0));

        painter.circle(pos, 8.0, fill, stroke);

        let crosshair = 12.0;
        painter.line_segment(
            [pos + egui::vec2(-crosshair, 0.0), pos + egui::vec2(crosshair, 0.0)],
            stroke,
        );
        painter.line_segment(
            [pos + egui::vec2(0.0, -crosshair), pos + egui::vec2(0.0, crosshair)],
            stroke,
        );

        painter.text(
            pos + egui::vec2(0.0, -20.0),
            egui::Align2::CENTER_BOTTOM,
            &self.marker_label,
            egui::FontId::proportional(11.0),
            egui::Color32::from_rgb(0, 200, 0),
        );
    }

    fn draw_banner(&self, painter: &egui::Painter, rect: egui::Rect, message: &str) {
        let is_error = message.contains("Failed");
        let bg_color = if is_error {
            egui::Color32::from_rgb(220, 50, 50)
        } else {
            egui::Color32::from_rgb(255, 200, 100)
        };

        let banner_pos = rect.center_top() + egui::vec2(0.0, 20.0);
        let galley = painter.layout_no_wrap(
            message.to_string(),
            egui::FontId::proportional(12.0),
            egui::Color32::WHITE,
        );

        let padding = egui::vec2(12.0, 6.0);
        let bubble_rect = egui::Rect::from_center_size(banner_pos, galley.size() + padding * 2.0);

        painter.rect_filled(bubble_rect, egui::CornerRadius::same(5), bg_color);
        painter.text(
            banner_pos,
            egui::Align2::CENTER_CENTER,
            message,
            egui::FontId::proportional(12.0),
            egui::Color32::WHITE,
        );
    }
}

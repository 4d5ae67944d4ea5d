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

//! The location-weather screen.
//!
//! Owns the screen state, the map view, and the worker channels. Each
//! frame drains worker events into the state machine, then renders the
//! map (or a pre-resolution notice), the show-weather button, and the
//! weather dialog.

use std::sync::mpsc::{channel, Receiver, Sender};

use eframe::egui;
use owm_client::{CurrentConditions, Units, WeatherClient};

use crate::config::AppConfig;
use crate::location;
use crate::map::MapView;
use crate::state::{
    FetchRequest, LocationEvent, LocationFix, LocationState, ScreenState, WeatherEvent,
    WeatherState,
};
use crate::weather_task::WeatherTask;

pub struct WhereaboutsApp {
    state: ScreenState,
    map: Option<MapView>,
    config: AppConfig,
    override_fix: Option<LocationFix>,
    weather_client: WeatherClient,
    location_tx: Sender<LocationEvent>,
    location_rx: Receiver<LocationEvent>,
    weather_tx: Sender<WeatherEvent>,
    weather_rx: Receiver<WeatherEvent>,
    /// In-flight fetch; replacing or dropping it cancels the request.
    fetch: Option<WeatherTask>,
}

impl std::fmt::Debug for WhereaboutsApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhereaboutsApp")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WhereaboutsApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        weather_client: WeatherClient,
        override_fix: Option<LocationFix>,
    ) -> Self {
        let (location_tx, location_rx) = channel();
        let (weather_tx, weather_rx) = channel();

        location::spawn_resolver(override_fix, location_tx.clone(), cc.egui_ctx.clone());

        Self {
            state: ScreenState::new(),
            map: None,
            config,
            override_fix,
            weather_client,
            location_tx,
            location_rx,
            weather_tx,
            weather_rx,
            fetch: None,
        }
    }

    /// Drain worker outcomes into the state machine.
    fn poll_workers(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.location_rx.try_recv() {
            let request = self.state.apply_location(event);

            if let Some(viewport) = self.state.viewport {
                self.map = Some(MapView::new(&viewport, self.config.marker_label.clone()));
            }
            if let Some(request) = request {
                self.start_fetch(request, ctx);
            }
        }

        while let Ok(event) = self.weather_rx.try_recv() {
            self.state.apply_weather(event);
        }
    }

    fn start_fetch(&mut self, request: FetchRequest, ctx: &egui::Context) {
        // Replacing the handle cancels any fetch still in flight
        self.fetch = Some(WeatherTask::spawn(
            self.weather_client.clone(),
            request,
            self.weather_tx.clone(),
            ctx.clone(),
        ));
    }

    fn retry_location(&mut self, ctx: &egui::Context) {
        self.state.begin_resolving();
        self.map = None;
        self.fetch = None;
        location::spawn_resolver(self.override_fix, self.location_tx.clone(), ctx.clone());
    }

    /// Notice shown in the map area until a position exists.
    fn draw_pre_fix_notice(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (message, retryable) = match &self.state.location {
            LocationState::Resolving => ("Resolving location...".to_string(), false),
            LocationState::Denied => (
                "Permission to access location was denied".to_string(),
                true,
            ),
            LocationState::Failed(reason) => (reason.clone(), true),
            LocationState::Ready(_) => return,
        };

        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 2.0 - 30.0);
            ui.label(egui::RichText::new(message).size(15.0).weak());
            if retryable {
                ui.add_space(8.0);
                if ui.button("Try again").clicked() {
                    self.retry_location(ctx);
                }
            }
        });
    }

    fn draw_show_weather_button(&mut self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("show_weather_button"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -40.0))
            .show(ctx, |ui| {
                let label = if self.state.dialog_open {
                    "Hide weather"
                } else {
                    "Show weather"
                };
                let button = egui::Button::new(
                    egui::RichText::new(label)
                        .color(egui::Color32::BLACK)
                        .strong(),
                )
                .fill(egui::Color32::from_rgb(245, 233, 66));

                if ui.add(button).clicked() {
                    self.state.toggle_dialog();
                }
            });
    }

    fn draw_weather_dialog(&mut self, ctx: &egui::Context) {
        let mut open = self.state.dialog_open;
        let mut refresh = false;

        egui::Window::new("Current weather")
            .open(&mut open)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                match &self.state.weather {
                    WeatherState::Idle | WeatherState::Loading => {
                        ui.label(egui::RichText::new("Waiting for weather data...").weak());
                    }
                    WeatherState::Failed(reason) => {
                        ui.label(
                            egui::RichText::new(format!("Weather unavailable: {}", reason))
                                .color(egui::Color32::from_rgb(220, 120, 120)),
                        );
                        ui.add_space(6.0);
                        refresh = ui.button("Refresh").clicked();
                    }
                    WeatherState::Ready(conditions) => {
                        let units = self.weather_client.units();
                        egui::Grid::new("weather_grid")
                            .num_columns(2)
                            .spacing([16.0, 4.0])
                            .show(ui, |ui| {
                                for (label, value) in condition_rows(conditions, units) {
                                    ui.label(egui::RichText::new(label).weak());
                                    ui.label(egui::RichText::new(value).strong());
                                    ui.end_row();
                                }
                            });
                        ui.add_space(6.0);
                        ui.label(
                            egui::RichText::new(format!(
                                "Observed at {}",
                                conditions.observed_at.format("%H:%M UTC")
                            ))
                            .small()
                            .weak(),
                        );
                        ui.add_space(4.0);
                        refresh = ui.button("Refresh").clicked();
                    }
                }
            });

        if !open {
            self.state.close_dialog();
        }
        if refresh {
            if let Some(request) = self.state.refresh_weather() {
                self.start_fetch(request, ctx);
            }
        }
    }
}

impl eframe::App for WhereaboutsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_workers(ctx);

        if self.state.dialog_open && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.state.close_dialog();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| match &mut self.map {
                Some(map) => map.show(ui),
                None => self.draw_pre_fix_notice(ui, ctx),
            });

        // The button exists only once the map does, as in the original
        // screen; the dialog is reachable only through it
        if self.map.is_some() {
            self.draw_show_weather_button(ctx);
        }
        if self.state.dialog_open {
            self.draw_weather_dialog(ctx);
        }
    }
}

/// Label/value rows of the weather dialog, unit-annotated.
fn condition_rows(conditions: &CurrentConditions, units: Units) -> Vec<(String, String)> {
    vec![
        ("Location".to_string(), conditions.name.clone()),
        (
            "Coordinates".to_string(),
            format!("{:.4}°, {:.4}°", conditions.latitude, conditions.longitude),
        ),
        (
            "Temperature".to_string(),
            format!("{:.1} {}", conditions.temperature, units.temperature_suffix()),
        ),
        (
            "Pressure".to_string(),
            format!("{} hPa", conditions.pressure),
        ),
        ("Humidity".to_string(), format!("{}%", conditions.humidity)),
        ("Conditions".to_string(), conditions.description.clone()),
    ]
}

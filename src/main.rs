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

mod app;
mod config;
mod location;
mod map;
mod state;
mod weather_task;

use clap::Parser;
use eframe::egui;
use log::info;
use owm_client::{Units, WeatherClient};

use app::WhereaboutsApp;
use config::AppConfig;
use state::{FixSource, LocationFix};

/// Show the current location on a map, with current weather one press away
#[derive(Parser, Debug)]
#[command(name = "whereabouts-desktop")]
#[command(about = "Your current location on a map, with current weather one press away")]
struct Args {
    /// Fixed latitude in degrees, skipping location resolution
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Fixed longitude in degrees, skipping location resolution
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Unit system for weather readings: standard, metric, or imperial
    #[arg(long)]
    units: Option<Units>,
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init();
    let args = Args::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate the credential before any window opens; deferring this to
    // the first fetch would only surface as a provider-side 401
    let Some(api_key) = config.resolve_api_key() else {
        eprintln!("Error: no OpenWeatherMap API key configured.");
        eprintln!("Set the {} environment variable,", config::API_KEY_ENV);
        match AppConfig::get_config_path() {
            Ok(path) => eprintln!(
                "or add openweathermap_api_key to {}",
                path.display()
            ),
            Err(_) => eprintln!("or add openweathermap_api_key to the config file"),
        }
        std::process::exit(1);
    };

    let units = args.units.unwrap_or(config.units);
    let weather_client = match WeatherClient::new(api_key, units) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to construct weather client: {}", e);
            std::process::exit(1);
        }
    };

    let override_fix = match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Some(LocationFix {
            latitude: lat,
            longitude: lon,
            source: FixSource::CliOverride,
        }),
        _ => config.override_fix().map(|(lat, lon)| LocationFix {
            latitude: lat,
            longitude: lon,
            source: FixSource::ConfigOverride,
        }),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 700.0])
            .with_title("Whereabouts Desktop"),
        ..Default::default()
    };

    info!("Starting Whereabouts Desktop...");
    eframe::run_native(
        "Whereabouts Desktop",
        options,
        Box::new(move |cc| {
            Ok(Box::new(WhereaboutsApp::new(
                cc,
                config,
                weather_client,
                override_fix,
            )))
        }),
    )
}

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

//! Minimal client for the OpenWeatherMap current weather API.
//!
//! This library covers exactly one endpoint, `/data/2.5/weather` keyed by
//! latitude and longitude, and decodes the response into a flat
//! [`CurrentConditions`] record. It carries no caching, no retry policy,
//! and no UI concerns, so it can be reused and tested independently of the
//! desktop application that consumes it.
//!
//! # Quick Start
//!
//! ```no_run
//! use owm_client::{Units, WeatherClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = WeatherClient::new("my-api-key".to_string(), Units::Metric)
//!         .expect("client construction");
//!
//!     match client.current(51.5, -0.13).await {
//!         Ok(conditions) => println!("{}: {}", conditions.name, conditions.description),
//!         Err(e) => eprintln!("fetch failed: {}", e),
//!     }
//! }
//! ```

pub mod client;
pub mod model;

pub use client::{WeatherClient, WeatherError};
pub use model::{CurrentConditions, Units};

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

//! Map rendering and tile management.
//!
//! Web Mercator projection, Carto basemap tile fetching with an on-disk
//! cache, and the egui map view with the device position marker.

pub mod mercator;
pub mod tiles;
pub mod view;

pub use mercator::WebMercator;
pub use view::MapView;

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

//! Cancellable weather fetch worker.
//!
//! Each fetch runs on its own worker thread with a dedicated Tokio
//! runtime, racing the HTTP call against a cancellation token. The token
//! is cancelled when the task handle drops, so a superseding fetch or app
//! teardown can never deliver a stale result into live state.

use std::sync::mpsc::Sender;

use log::{error, info};
use owm_client::WeatherClient;
use tokio_util::sync::CancellationToken;

use crate::state::{FetchRequest, WeatherEvent};

/// Handle to one in-flight weather fetch. Dropping the handle cancels
/// the fetch.
#[derive(Debug)]
pub struct WeatherTask {
    token: CancellationToken,
}

impl WeatherTask {
    /// Start a fetch for the requested coordinates, delivering the
    /// outcome on the channel and waking the UI afterwards.
    pub fn spawn(
        client: WeatherClient,
        request: FetchRequest,
        tx: Sender<WeatherEvent>,
        ctx: egui::Context,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        info!(
                            "Weather fetch for {:.4}, {:.4} cancelled",
                            request.latitude, request.longitude
                        );
                    }
                    result = client.current(request.latitude, request.longitude) => {
                        let event = match result {
                            Ok(conditions) => {
                                info!(
                                    "Weather loaded for {}: {}",
                                    conditions.name, conditions.description
                                );
                                WeatherEvent::Loaded(conditions)
                            }
                            Err(e) => {
                                error!("Weather fetch failed: {}", e);
                                WeatherEvent::Failed(e.to_string())
                            }
                        };
                        if tx.send(event).is_ok() {
                            ctx.request_repaint();
                        }
                    }
                }
            });
        });

        Self { token }
    }
}

impl Drop for WeatherTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

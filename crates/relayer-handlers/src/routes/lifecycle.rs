// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use bridge_relayer_utils::HandlerError;
use serde::{Deserialize, Serialize};

use crate::controller::{RelayerController, RelayerStatus};

/// Body of `POST /start`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Talk to real nodes instead of the simulation. Defaults to the
    /// `relayer.use-real-clients` setting.
    pub use_real_clients: Option<bool>,
}

/// Answer of `POST /start`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    started: bool,
    use_real_clients: bool,
}

/// Answer of `POST /stop`.
#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    stopped: bool,
}

/// Handler for `GET /status`
pub async fn handle_status(
    State(controller): State<Arc<RelayerController>>,
) -> Json<RelayerStatus> {
    Json(controller.status().await)
}

/// Handler for `POST /start`
///
/// Spawns a new relayer instance. Answers `409` if one is already running.
pub async fn handle_start(
    State(controller): State<Arc<RelayerController>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartResponse>, HandlerError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let use_real_clients = request
        .use_real_clients
        .unwrap_or(controller.context().config.relayer.use_real_clients);
    controller.start(use_real_clients).await?;
    tracing::info!(use_real_clients, "Relayer started from the API");
    Ok(Json(StartResponse {
        started: true,
        use_real_clients,
    }))
}

/// Handler for `POST /stop`
///
/// Answers `400` if there is no relayer to stop.
pub async fn handle_stop(
    State(controller): State<Arc<RelayerController>>,
) -> Result<Json<StopResponse>, HandlerError> {
    controller.stop().await?;
    tracing::info!("Relayer stopped from the API");
    Ok(Json(StopResponse { stopped: true }))
}

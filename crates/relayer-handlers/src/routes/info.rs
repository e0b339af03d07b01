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
use bridge_relayer_config::BridgeRelayerConfig;
use serde::Serialize;

use crate::controller::RelayerController;

/// Answer of `GET /info`: the configuration without any secret.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerInformationResponse {
    #[serde(flatten)]
    config: BridgeRelayerConfig,
    version: &'static str,
}

/// Handles relayer configuration requests
///
/// Returns a Result with the `RelayerInformationResponse` on success
pub async fn handle_relayer_info(
    State(controller): State<Arc<RelayerController>>,
) -> Json<RelayerInformationResponse> {
    Json(RelayerInformationResponse {
        config: controller.context().config.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

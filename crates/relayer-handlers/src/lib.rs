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

//! Relayer handlers for the HTTP control API
//!
//! Every route lives under `/api/v1`:
//!
//! | Method | Path | API key |
//! |---|---|---|
//! | `GET` | `/status` | no |
//! | `POST` | `/start` | yes |
//! | `POST` | `/stop` | no |
//! | `POST` | `/submit-proof` | yes |
//! | `GET` | `/info` | no |
//! | `GET` | `/metrics` | no |

#![warn(missing_docs)]

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

/// API key middleware
pub mod auth;
/// The owner of the relayer instance
mod controller;
/// Module handles relayer API
pub mod routes;

pub use controller::{RelayerController, RelayerStatus};

/// Builds the control API router for `controller`.
pub fn build_router(controller: Arc<RelayerController>) -> Router {
    let protected = Router::new()
        .route("/start", post(routes::handle_start))
        .route("/submit-proof", post(routes::handle_submit_proof))
        .route_layer(middleware::from_fn_with_state(
            controller.clone(),
            auth::require_api_key,
        ));
    let api = Router::new()
        .route("/status", get(routes::handle_status))
        .route("/stop", post(routes::handle_stop))
        .route("/info", get(routes::handle_relayer_info))
        .route("/metrics", get(routes::handle_metric_info))
        .merge(protected);

    Router::new().nest("/api/v1", api).with_state(controller)
}

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
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use bridge_relayer_utils::HandlerError;

use crate::controller::RelayerController;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Query parameter carrying the API key.
pub const API_KEY_QUERY: &str = "api_key";

fn provided_key<B>(req: &Request<B>) -> Option<String> {
    if let Some(key) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(key.to_owned());
    }
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == API_KEY_QUERY)
        .map(|(_, v)| v.into_owned())
}

/// Rejects requests without the configured API key.
///
/// Without a configured key every request goes through.
pub async fn require_api_key<B>(
    State(controller): State<Arc<RelayerController>>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let Some(expected) = controller.context().config.api_key.as_ref() else {
        return next.run(req).await;
    };
    match provided_key(&req) {
        Some(key) if key == expected.expose() => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "Unauthorized request");
            HandlerError(StatusCode::UNAUTHORIZED, "unauthorized".to_string())
                .into_response()
        }
    }
}

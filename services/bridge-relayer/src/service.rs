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

//! # Relayer Service Module 🕸️
//!
//! A module for starting the long-running tasks of the relayer.
//!
//! ## Overview
//!
//! The relayer runs two things throughout its lifetime: the HTTP control API
//! and, once started, the relay loop that keeps up with the source chain.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use bridge_relayer_context::Shutdown;
use bridge_relayer_handlers::{build_router, RelayerController};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the control API of the relayer with its layers applied.
pub fn build_app(controller: Arc<RelayerController>) -> Router {
    build_router(controller)
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
}

/// Sets up the HTTP server of the relayer and binds it to the configured
/// port on all interfaces.
///
/// Returns `Ok((addr, server))` on success. The server future runs until
/// `shutdown` fires, then finishes the in-flight requests.
///
/// # Arguments
///
/// * `controller` - Owner of the relayer instance the API drives
/// * `shutdown` - Signal that stops the server gracefully
pub fn build_web_services(
    controller: Arc<RelayerController>,
    mut shutdown: Shutdown,
) -> crate::Result<(SocketAddr, impl Future<Output = ()> + 'static)> {
    let port = controller.context().config.port;
    let socket_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = build_app(controller);
    let server = axum::Server::try_bind(&socket_addr)?
        .serve(app.into_make_service());
    let addr = server.local_addr();
    let server = server.with_graceful_shutdown(async move {
        shutdown.recv().await;
    });
    let fut = async move {
        if let Err(e) = server.await {
            tracing::error!("HTTP server stopped with error: {}", e);
        }
    };
    Ok((addr, fut))
}

/// Starts all background services of the relayer.
///
/// This does not block, the relay loop is fired on a background task. Use
/// the returned error to tell a bad configuration from a running relayer.
pub async fn ignite(controller: &RelayerController) -> crate::Result<()> {
    let use_real_clients =
        controller.context().config.relayer.use_real_clients;
    tracing::debug!(use_real_clients, "Igniting the relay loop");
    controller.start(use_real_clients).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bridge_relay_engine::RelayState;
    use bridge_relayer_config::BridgeRelayerConfig;
    use bridge_relayer_context::RelayerContext;
    use bridge_relayer_store::InMemoryStore;

    use super::*;

    fn controller() -> Arc<RelayerController> {
        let mut config = BridgeRelayerConfig::default();
        config.port = 0;
        config.relayer.polling_interval = 10;
        let ctx = RelayerContext::new(config, InMemoryStore::default())
            .unwrap();
        Arc::new(RelayerController::new(ctx))
    }

    #[tokio::test]
    async fn server_answers_status_and_stops_on_shutdown() {
        let controller = controller();
        let ctx = controller.context().clone();
        let (addr, server) =
            build_web_services(controller.clone(), ctx.shutdown_signal())
                .unwrap();
        assert_ne!(addr.port(), 0);
        let server = tokio::spawn(server);

        let url = format!("http://127.0.0.1:{}/api/v1/status", addr.port());
        let body: serde_json::Value =
            reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(body["running"], false);
        assert_eq!(body["state"], "stopped");

        ctx.shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn ignite_starts_a_single_relayer() {
        let controller = controller();
        ignite(&controller).await.unwrap();
        assert!(matches!(
            ignite(&controller).await,
            Err(crate::Error::AlreadyRunning)
        ));
        let status = controller.status().await;
        assert!(status.running);
        assert_ne!(status.state, RelayState::Stopped);
        controller.shutdown().await.unwrap();
        assert!(!controller.status().await.running);
    }
}

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

//! Bridge Relayer Binary.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use bridge_relayer::service;
use bridge_relayer_config::cli::{create_store, load_config, setup_logger, Opts};
use bridge_relayer_context::RelayerContext;
use bridge_relayer_handlers::RelayerController;
use bridge_relayer_store::CheckpointStore;
use tokio::signal::unix;

/// The main entry point for the relayer.
///
/// # Arguments
///
/// * `args` - The command line arguments.
#[paw::main]
#[tokio::main]
async fn main(args: Opts) -> anyhow::Result<()> {
    setup_logger(args.verbose, "bridge_relayer")?;
    match dotenv::dotenv() {
        Ok(_) => {
            tracing::trace!("Loaded .env file");
        }
        Err(e) => {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    // The configuration is validated and configured from the given directory
    let config = load_config(args.config_dir.clone())?;

    // persistent storage for the relayer checkpoint
    let store = create_store(&args, &config)?;
    tracing::info!("Checkpoint kept at {}", store.path().display());
    if args.reset_checkpoint {
        tracing::warn!("--reset-checkpoint given, relaying starts over from genesis");
        store.reset().await?;
    }

    // The RelayerContext takes a configuration and the store, and populates
    // objects that are needed throughout the lifetime of the relayer.
    let ctx = RelayerContext::new(config, store)?;
    let controller = Arc::new(RelayerController::new(ctx.clone()));

    // the build_web_services command sets up routing (endpoint queries /
    // requests mapped to handled code) so clients can drive the relayer.
    let (addr, server) = service::build_web_services(
        controller.clone(),
        ctx.shutdown_signal(),
    )?;
    tracing::info!("Starting the server on {}", addr);
    // start the server.
    let server_handle = tokio::spawn(server);
    // start the relay loop.
    // this does not block, will fire the loop on a background task.
    service::ignite(&controller).await?;
    tracing::event!(
        target: bridge_relayer_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %bridge_relayer_utils::probe::Kind::Lifecycle,
        started = true
    );
    // watch for signals
    let mut ctrlc_signal = unix::signal(unix::SignalKind::interrupt())?;
    let mut termination_signal = unix::signal(unix::SignalKind::terminate())?;
    let mut quit_signal = unix::signal(unix::SignalKind::quit())?;
    tokio::select! {
        _ = ctrlc_signal.recv() => {
            tracing::warn!("Interrupted (Ctrl+C) ...");
        },
        _ = termination_signal.recv() => {
            tracing::warn!("Got Terminate signal ...");
        },
        _ = quit_signal.recv() => {
            tracing::warn!("Quitting ...");
        },
    }
    tracing::event!(
        target: bridge_relayer_utils::probe::TARGET,
        tracing::Level::DEBUG,
        kind = %bridge_relayer_utils::probe::Kind::Lifecycle,
        shutdown = true
    );
    tracing::warn!("Shutting down...");
    // send shutdown signal to all of the application.
    ctx.shutdown();
    // let the relay loop finish the block it is on.
    if let Err(e) = controller.shutdown().await {
        tracing::error!("Relayer did not stop cleanly: {}", e);
    }
    if let Err(e) = server_handle.await {
        tracing::error!("HTTP server task failed: {}", e);
    }
    tracing::info!("Clean Exit ..");
    Ok(())
}

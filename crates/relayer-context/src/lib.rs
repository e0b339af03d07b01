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

#![warn(missing_docs)]
//! # Relayer Context Module 🕸️
//!
//! A module for managing the context of the relayer.
//!
//! The context owns the configuration, the metrics, the process wide
//! shutdown signal and the checkpoint store, and knows how to build the
//! clients a relayer runs with, either against real nodes or against an
//! in-memory simulation.
use std::sync::Arc;
use std::time::Duration;

use bridge_chain_client::InMemoryChain;
use bridge_envelope::{EnvelopeKey, EnvelopeKeys, RecipientSecret};
use bridge_relay_engine::{RelayConfig, RelayerHandle};
use bridge_relayer_config::BridgeRelayerConfig;
use bridge_relayer_store::CheckpointStore;
use bridge_relayer_utils::metric::Metrics;
use bridge_submitters::MockedSubmitter;
use tokio::sync::broadcast;

/// Builds relayer backends from the context.
mod factory;

pub use bridge_relay_engine::Shutdown;
pub use factory::ContextBackends;

/// RelayerContext contains Relayer's configuration and shutdown signal.
#[derive(Clone)]
pub struct RelayerContext {
    /// The configuration of the relayer.
    pub config: BridgeRelayerConfig,
    /// Broadcasts a shutdown signal to all active connections.
    ///
    /// The initial `shutdown` trigger is provided by the `run` caller. The
    /// server is responsible for gracefully shutting down active connections.
    /// When a connection task is spawned, it is passed a broadcast receiver
    /// handle. When a graceful shutdown is initiated, a `()` value is sent via
    /// the broadcast::Sender. Each active connection receives it, reaches a
    /// safe terminal state, and completes the task.
    notify_shutdown: broadcast::Sender<()>,
    /// Represents the metrics for the relayer
    pub metrics: Metrics,
    store: Arc<dyn CheckpointStore>,
    /// The source chain used when real clients are off.
    simulated_chain: InMemoryChain,
    /// The destination used when real clients are off.
    mocked_submitter: MockedSubmitter,
}

impl std::fmt::Debug for RelayerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayerContext")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish()
    }
}

impl RelayerContext {
    /// Creates a new RelayerContext.
    pub fn new<S>(
        config: BridgeRelayerConfig,
        store: S,
    ) -> bridge_relayer_utils::Result<Self>
    where
        S: CheckpointStore,
    {
        let (notify_shutdown, _) = broadcast::channel(2);
        let metrics = Metrics::new()?;
        Ok(Self {
            config,
            notify_shutdown,
            metrics,
            store: Arc::new(store),
            simulated_chain: InMemoryChain::new(),
            mocked_submitter: MockedSubmitter::new(),
        })
    }

    /// Returns a broadcast receiver handle for the shutdown signal.
    pub fn shutdown_signal(&self) -> Shutdown {
        Shutdown::new(self.notify_shutdown.subscribe())
    }

    /// Sends a shutdown signal to all subscribed tasks/connections.
    pub fn shutdown(&self) {
        let _ = self.notify_shutdown.send(());
    }

    /// The checkpoint store every relayer of this process uses.
    pub fn store(&self) -> Arc<dyn CheckpointStore> {
        self.store.clone()
    }

    /// The in-memory source chain of the simulation.
    ///
    /// Blocks pushed here are seen by relayers started without real clients.
    pub fn simulated_chain(&self) -> &InMemoryChain {
        &self.simulated_chain
    }

    /// The mocked destination of the simulation.
    pub fn mocked_submitter(&self) -> &MockedSubmitter {
        &self.mocked_submitter
    }

    /// The keys used to open envelopes.
    ///
    /// Falls back to the well known development key when none is configured.
    pub fn envelope_keys(&self) -> bridge_relayer_utils::Result<EnvelopeKeys> {
        let symmetric = match &self.config.envelope.key {
            Some(secret) => EnvelopeKey::from_secret(secret.expose()),
            None => EnvelopeKey::default(),
        };
        let mut keys = EnvelopeKeys::symmetric(symmetric);
        if let Some(private_key) = &self.config.envelope.private_key {
            keys = keys.with_recipient(RecipientSecret::from_hex(
                private_key.expose(),
            )?);
        }
        Ok(keys)
    }

    /// The relay loop tuning from the config.
    pub fn relay_config(&self) -> bridge_relayer_utils::Result<RelayConfig> {
        let config = RelayConfig::builder()
            .min_confirmations(self.config.source.min_confirmations)
            .poll_interval(self.config.relayer.polling_interval())
            .retry_delay(self.config.relayer.retry_delay())
            .marker(self.config.source.marker_tag.clone())
            .keys(self.envelope_keys()?)
            .build();
        Ok(config)
    }

    /// A factory building the backends of a relayer from this context.
    pub fn backend_factory(&self, use_real_clients: bool) -> ContextBackends {
        ContextBackends::new(self.clone(), use_real_clients)
    }

    /// Spawns a new relayer instance wired from this context.
    pub fn spawn_relayer(
        &self,
        use_real_clients: bool,
    ) -> bridge_relayer_utils::Result<RelayerHandle> {
        let relay_config = self.relay_config()?;
        tracing::info!(
            use_real_clients,
            min_confirmations = relay_config.min_confirmations,
            "Spawning relayer"
        );
        Ok(bridge_relay_engine::spawn(
            relay_config,
            self.backend_factory(use_real_clients),
            self.metrics.clone(),
        ))
    }
}

/// Converts a timeout in milliseconds from the config.
pub(crate) fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

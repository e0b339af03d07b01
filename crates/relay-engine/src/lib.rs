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

//! # Relay Engine 🕸️
//!
//! The engine scans the source chain block by block, picks out bridge
//! transactions, and forwards every verified bridge event to the destination
//! at most once.
//!
//! ## Overview
//!
//! A relayer is a single tokio task. It is started with [`spawn`] and
//! controlled through the returned [`RelayerHandle`]:
//!
//! ```text
//! Stopped -> Starting -> Running -> Stopping -> Stopped
//! ```
//!
//! While `Starting`, the engine asks its [`BackendFactory`] for the chain
//! client, verifier, submitter and checkpoint store, then loads the
//! checkpoint. Any failure there is retried after `retry_delay` until the
//! relayer is stopped.
//!
//! While `Running`, every tick fetches the tip once and walks the heights
//! after the checkpoint up to the last final one. Each block is persisted
//! before the engine moves on to the next height.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use bridge_chain_client::SourceChainClient;
use bridge_envelope::EnvelopeKeys;
use bridge_proof_verifiers::ProofVerifier;
use bridge_relayer_store::CheckpointStore;
use bridge_relayer_types::SubmissionReceipt;
use bridge_relayer_utils::metric::Metrics;
use bridge_relayer_utils::Result;
use bridge_submitters::DestinationSubmitter;
use bridge_tx_extractor::MarkerTag;
use serde::Serialize;
use typed_builder::TypedBuilder;

/// The scan loop.
mod engine;
/// The control handle of a running relayer.
mod handle;
/// Cooperative stop signal.
pub mod shutdown;

pub use handle::RelayerHandle;
pub use shutdown::Shutdown;

/// Default number of blocks that must follow a block before it is final.
pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 6;
/// Default pause between two ticks once the relayer caught up with the tip.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);
/// Default pause after a failed tick or a failed start.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5_000);

/// Whether a transaction mined at `tx_height` is buried deep enough under
/// `tip` to be relayed.
///
/// `min_confirmations = 0` makes a transaction final as soon as the tip
/// reaches its height.
pub fn is_final(tx_height: u64, tip: u64, min_confirmations: u64) -> bool {
    tip >= tx_height && tip - tx_height >= min_confirmations
}

/// Tuning of a single relayer instance.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RelayConfig {
    /// Blocks that must follow a block before its transactions are relayed.
    #[builder(default = DEFAULT_MIN_CONFIRMATIONS)]
    pub min_confirmations: u64,
    /// Pause between ticks once the relayer caught up with the tip.
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    /// Pause after a failed tick or a failed start.
    #[builder(default = DEFAULT_RETRY_DELAY)]
    pub retry_delay: Duration,
    /// The script prefix that marks bridge transactions.
    #[builder(default)]
    pub marker: MarkerTag,
    /// Keys used to open envelopes.
    #[builder(default)]
    pub keys: EnvelopeKeys,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The lifecycle state of a relayer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    /// Not running, or waiting to retry a failed start.
    #[display(fmt = "stopped")]
    Stopped,
    /// Building backends and loading the checkpoint.
    #[display(fmt = "starting")]
    Starting,
    /// Scanning the source chain.
    #[display(fmt = "running")]
    Running,
    /// A stop was requested and the engine is winding down.
    #[display(fmt = "stopping")]
    Stopping,
}

/// Something observable that happened inside the relayer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelayEvent {
    /// The relayer is running and will scan from `resume_height`.
    #[serde(rename_all = "camelCase")]
    Started {
        /// The first height that will be looked at.
        resume_height: u64,
    },
    /// A height was fully processed and persisted.
    #[serde(rename_all = "camelCase")]
    BlockProcessed {
        /// The processed height.
        height: u64,
        /// How many transactions in the block carried the bridge marker.
        bridge_txs: usize,
    },
    /// A bridge event was forwarded and its nullifier durably recorded.
    TransactionProcessed {
        /// Source transaction id.
        txid: String,
        /// The nullifier of the relayed event.
        nullifier: String,
        /// What the destination answered.
        receipt: SubmissionReceipt,
    },
    /// The destination refused a verified bridge event.
    TransactionFailed {
        /// Source transaction id.
        txid: String,
        /// Why the submission failed.
        reason: String,
    },
    /// The relayer stopped.
    Stopped,
}

/// The pluggable collaborators a relayer runs with.
#[derive(Debug, Clone)]
pub struct RelayBackends {
    /// Read access to the source chain.
    pub chain: Arc<dyn SourceChainClient>,
    /// Checks bridge proofs.
    pub verifier: Arc<dyn ProofVerifier>,
    /// Forwards verified events to the destination.
    pub submitter: Arc<dyn DestinationSubmitter>,
    /// Where the checkpoint lives.
    pub store: Arc<dyn CheckpointStore>,
}

/// Builds the backends of a relayer each time it starts.
#[async_trait::async_trait]
pub trait BackendFactory: Send + Sync + 'static {
    /// Constructs and validates the backends.
    async fn build(&self) -> Result<RelayBackends>;
}

/// Already built backends are handed out as they are.
#[async_trait::async_trait]
impl BackendFactory for RelayBackends {
    async fn build(&self) -> Result<RelayBackends> {
        Ok(self.clone())
    }
}

/// Spawns a relayer task and returns its handle.
///
/// The relayer starts right away. Dropping the handle without calling
/// [`RelayerHandle::stop`] stops the relayer at its next check.
pub fn spawn<F>(config: RelayConfig, factory: F, metrics: Metrics) -> RelayerHandle
where
    F: BackendFactory,
{
    engine::spawn(config, factory, metrics)
}

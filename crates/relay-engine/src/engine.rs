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
use std::time::Duration;

use backoff::backoff::Backoff;
use bridge_relayer_store::Checkpoint;
use bridge_relayer_types::SourceTransaction;
use bridge_relayer_utils::metric::Metrics;
use bridge_relayer_utils::retry::FixedDelay;
use bridge_relayer_utils::{probe, Result};
use bridge_submitters::DestinationSubmitter;
use bridge_tx_extractor::Extraction;
use tokio::sync::{broadcast, watch};

use crate::{
    is_final, BackendFactory, RelayBackends, RelayConfig, RelayEvent,
    RelayState, RelayerHandle, Shutdown,
};

/// Lagging subscribers lose the oldest events past this many.
const EVENTS_CAPACITY: usize = 256;

/// What happened to a single source transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxOutcome {
    NotBridge,
    Malformed,
    AlreadyRelayed,
    Rejected,
    SubmissionFailed,
    Relayed,
}

/// State owned by a running relayer.
struct Scan {
    backends: RelayBackends,
    checkpoint: Checkpoint,
}

struct Engine {
    config: RelayConfig,
    metrics: Metrics,
    shutdown: Shutdown,
    state: watch::Sender<RelayState>,
    checkpoint: watch::Sender<Checkpoint>,
    submitter: watch::Sender<Option<Arc<dyn DestinationSubmitter>>>,
    events: broadcast::Sender<RelayEvent>,
}

pub(crate) fn spawn<F>(
    config: RelayConfig,
    factory: F,
    metrics: Metrics,
) -> RelayerHandle
where
    F: BackendFactory,
{
    let (state_tx, state_rx) = watch::channel(RelayState::Stopped);
    let (checkpoint_tx, checkpoint_rx) = watch::channel(Checkpoint::default());
    let (submitter_tx, submitter_rx) = watch::channel(None);
    let (events_tx, _) = broadcast::channel(EVENTS_CAPACITY);
    let (stop_tx, stop_rx) = broadcast::channel(2);

    let engine = Engine {
        config,
        metrics,
        shutdown: Shutdown::new(stop_rx),
        state: state_tx,
        checkpoint: checkpoint_tx,
        submitter: submitter_tx,
        events: events_tx.clone(),
    };
    let task = tokio::spawn(engine.run(factory));
    RelayerHandle {
        state: state_rx,
        checkpoint: checkpoint_rx,
        submitter: submitter_rx,
        events: events_tx,
        stop: stop_tx,
        task,
    }
}

impl Engine {
    async fn run<F: BackendFactory>(mut self, factory: F) {
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            started = true
        );
        if let Some((backends, checkpoint)) = self.start(&factory).await {
            self.relay(backends, checkpoint).await;
        }
        self.submitter.send_replace(None);
        self.state.send_replace(RelayState::Stopped);
        self.emit(RelayEvent::Stopped);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::Lifecycle,
            shutdown = true
        );
        tracing::info!("Relayer stopped");
    }

    /// Builds the backends and loads the checkpoint, retrying until it works
    /// or a stop is requested.
    async fn start<F: BackendFactory>(
        &mut self,
        factory: &F,
    ) -> Option<(RelayBackends, Checkpoint)> {
        let mut backoff = FixedDelay::new(self.config.retry_delay);
        loop {
            if self.shutdown.is_shutdown() {
                return None;
            }
            self.state.send_replace(RelayState::Starting);
            match Self::prepare(factory).await {
                Ok(prepared) => return Some(prepared),
                Err(e) => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.retry_delay);
                    tracing::error!(
                        error = %e,
                        retry_in = ?delay,
                        "Failed to start the relayer"
                    );
                    self.state.send_replace(RelayState::Stopped);
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %probe::Kind::Retry,
                        stage = "start",
                        backoff = ?delay,
                    );
                    if self.sleep_or_stop(delay).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn prepare<F: BackendFactory>(
        factory: &F,
    ) -> Result<(RelayBackends, Checkpoint)> {
        let backends = factory.build().await?;
        let checkpoint = backends.store.load().await?;
        Ok((backends, checkpoint))
    }

    async fn relay(&mut self, backends: RelayBackends, checkpoint: Checkpoint) {
        let resume_height = checkpoint.next_height();
        self.metrics
            .last_processed_height
            .set(checkpoint.last_processed_height as f64);
        self.checkpoint.send_replace(checkpoint.clone());
        self.submitter.send_replace(Some(backends.submitter.clone()));
        if !backends.verifier.is_production_grade() {
            tracing::warn!(
                verifier = ?backends.verifier,
                "!!! Proof verification is STUBBED: bridge proofs are NOT checked. \
                 Never run this configuration against real funds !!!"
            );
        }
        self.state.send_replace(RelayState::Running);
        tracing::info!(
            %resume_height,
            nullifiers = checkpoint.nullifiers.len(),
            min_confirmations = self.config.min_confirmations,
            "Relayer started"
        );
        self.emit(RelayEvent::Started { resume_height });

        let mut scan = Scan {
            backends,
            checkpoint,
        };
        let mut backoff = FixedDelay::new(self.config.retry_delay);
        loop {
            if self.shutdown.is_shutdown() {
                break;
            }
            let pause = match self.tick(&mut scan).await {
                Ok(()) => self.config.poll_interval,
                Err(e) => {
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or(self.config.retry_delay);
                    let next_height = scan.checkpoint.next_height();
                    if e.is_transient() {
                        tracing::warn!(
                            error = %e,
                            %next_height,
                            "Relay tick hit a transient error, retrying in {delay:?}"
                        );
                    } else {
                        tracing::error!(
                            error = %e,
                            %next_height,
                            "Relay tick failed, retrying in {delay:?}"
                        );
                    }
                    self.metrics.relay_loop_back_off.inc();
                    tracing::event!(
                        target: probe::TARGET,
                        tracing::Level::DEBUG,
                        kind = %probe::Kind::Retry,
                        stage = "tick",
                        backoff = ?delay,
                    );
                    delay
                }
            };
            if self.sleep_or_stop(pause).await {
                break;
            }
        }
        self.state.send_replace(RelayState::Stopping);
        tracing::info!(
            last_processed_height = scan.checkpoint.last_processed_height,
            "Relayer stopping"
        );
    }

    /// Walks every final height after the checkpoint, up to the tip.
    #[tracing::instrument(
        skip_all,
        fields(from = scan.checkpoint.next_height())
    )]
    async fn tick(&mut self, scan: &mut Scan) -> Result<()> {
        let tip = scan.backends.chain.current_height().await?;
        let mut height = scan.checkpoint.next_height();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::TRACE,
            kind = %probe::Kind::Sync,
            %tip,
            %height,
            behind = tip.saturating_sub(scan.checkpoint.last_processed_height),
        );
        while height <= tip {
            if self.shutdown.is_shutdown() {
                return Ok(());
            }
            if !is_final(height, tip, self.config.min_confirmations) {
                tracing::trace!(
                    %height,
                    %tip,
                    "Waiting for {} confirmations",
                    self.config.min_confirmations
                );
                break;
            }
            self.process_block(scan, height).await?;
            height += 1;
        }
        Ok(())
    }

    async fn process_block(&self, scan: &mut Scan, height: u64) -> Result<()> {
        let block = scan.backends.chain.block_at(height).await?;
        let mut bridge_txs = 0;
        for tx in &block.tx {
            let outcome = self.process_tx(scan, tx, height).await?;
            if outcome != TxOutcome::NotBridge {
                bridge_txs += 1;
            }
        }

        let mut next = scan.checkpoint.clone();
        next.advance_to(height);
        scan.backends.store.save(&next).await?;
        scan.checkpoint = next;
        self.checkpoint.send_replace(scan.checkpoint.clone());

        self.metrics.blocks_processed.inc();
        self.metrics.last_processed_height.set(height as f64);
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::TRACE,
            kind = %probe::Kind::Checkpoint,
            %height,
            nullifiers = scan.checkpoint.nullifiers.len(),
        );
        tracing::debug!(%height, bridge_txs, "Block processed");
        self.emit(RelayEvent::BlockProcessed { height, bridge_txs });
        Ok(())
    }

    /// Runs one transaction through extract, replay check, verify and submit.
    ///
    /// Only a failure to persist the nullifier escapes as an error.
    async fn process_tx(
        &self,
        scan: &mut Scan,
        tx: &SourceTransaction,
        height: u64,
    ) -> Result<TxOutcome> {
        let txid = tx.txid.as_str();
        let decoded = match bridge_tx_extractor::extract(
            tx,
            height,
            &self.config.marker,
            &self.config.keys,
        ) {
            Extraction::NotBridge => return Ok(TxOutcome::NotBridge),
            Extraction::Malformed(e) => {
                self.metrics.bridge_txs_seen.inc();
                self.metrics.malformed_txs.inc();
                tracing::warn!(
                    %txid,
                    %height,
                    error = %e,
                    "Skipping malformed bridge transaction"
                );
                return Ok(TxOutcome::Malformed);
            }
            Extraction::Bridge(decoded) => decoded,
        };
        self.metrics.bridge_txs_seen.inc();
        let event = &decoded.event;
        let nullifier = event.nullifier.as_str();

        if scan.checkpoint.is_spent(nullifier) {
            self.metrics.replays_rejected.inc();
            tracing::info!(
                %txid,
                %height,
                %nullifier,
                "Nullifier already relayed, skipping"
            );
            return Ok(TxOutcome::AlreadyRelayed);
        }

        let verifier = &scan.backends.verifier;
        if !verifier
            .verify(&event.commitment, nullifier, &event.proof)
            .await
        {
            self.metrics.verification_rejections.inc();
            tracing::warn!(%txid, %height, %nullifier, "Proof rejected");
            return Ok(TxOutcome::Rejected);
        }
        if !verifier.is_production_grade() {
            tracing::warn!(
                %txid,
                %nullifier,
                "Relaying a proof that was only checked by a stub verifier"
            );
        }

        let receipt = match scan
            .backends
            .submitter
            .submit(&decoded.submission_payload())
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.metrics.submission_failures.inc();
                tracing::error!(
                    %txid,
                    %height,
                    %nullifier,
                    error = %e,
                    "Destination refused a verified bridge event, it will not be retried"
                );
                self.emit(RelayEvent::TransactionFailed {
                    txid: txid.to_owned(),
                    reason: e.to_string(),
                });
                return Ok(TxOutcome::SubmissionFailed);
            }
        };

        // kept in memory even if the save below fails, so the event is not
        // sent twice by this process.
        scan.checkpoint.spend(nullifier);
        scan.backends.store.save(&scan.checkpoint).await?;
        self.checkpoint.send_replace(scan.checkpoint.clone());

        self.metrics.events_relayed.inc();
        tracing::event!(
            target: probe::TARGET,
            tracing::Level::DEBUG,
            kind = %probe::Kind::BridgeRelay,
            %txid,
            %height,
            %nullifier,
            amount = decoded.plaintext.amount,
            receipt = %receipt.0,
        );
        tracing::info!(%txid, %height, %nullifier, "Bridge event relayed");
        self.emit(RelayEvent::TransactionProcessed {
            txid: txid.to_owned(),
            nullifier: nullifier.to_owned(),
            receipt,
        });
        Ok(TxOutcome::Relayed)
    }

    /// Sleeps for `duration`, returns `true` if a stop came first.
    async fn sleep_or_stop(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.shutdown.recv() => true,
        }
    }

    fn emit(&self, event: RelayEvent) {
        // nobody listening is fine.
        let _ = self.events.send(event);
    }
}

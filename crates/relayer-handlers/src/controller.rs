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

use bridge_relay_engine::{RelayEvent, RelayState, RelayerHandle};
use bridge_relayer_context::RelayerContext;
use bridge_relayer_utils::{Error, Result};
use bridge_submitters::DestinationSubmitter;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

/// Owns the (at most one) relayer instance of the process.
///
/// Handlers reach it through the axum state; there is no global instance.
#[derive(Debug)]
pub struct RelayerController {
    ctx: RelayerContext,
    relayer: Mutex<Option<RelayerHandle>>,
}

/// What `GET /status` answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerStatus {
    /// Whether a relayer task is alive.
    pub running: bool,
    /// Its lifecycle state.
    pub state: RelayState,
    /// The last persisted height, when a relayer exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed_block: Option<u64>,
}

impl RelayerController {
    /// Creates a controller without a running relayer.
    pub fn new(ctx: RelayerContext) -> Self {
        Self {
            ctx,
            relayer: Mutex::new(None),
        }
    }

    /// The context relayers are built from.
    pub fn context(&self) -> &RelayerContext {
        &self.ctx
    }

    /// The status of the current relayer, if any.
    pub async fn status(&self) -> RelayerStatus {
        let guard = self.relayer.lock().await;
        match guard.as_ref() {
            Some(handle) => RelayerStatus {
                running: handle.is_running(),
                state: handle.state(),
                last_processed_block: Some(
                    handle.checkpoint().last_processed_height,
                ),
            },
            None => RelayerStatus {
                running: false,
                state: RelayState::Stopped,
                last_processed_block: None,
            },
        }
    }

    /// Spawns a new relayer, unless one is already running.
    pub async fn start(&self, use_real_clients: bool) -> Result<()> {
        let mut guard = self.relayer.lock().await;
        if matches!(guard.as_ref(), Some(handle) if handle.is_running()) {
            return Err(Error::AlreadyRunning);
        }
        *guard = Some(self.ctx.spawn_relayer(use_real_clients)?);
        Ok(())
    }

    /// Stops the current relayer and waits for it.
    ///
    /// The lock is held until the relayer task has ended, so a concurrent
    /// `start` cannot spawn a second relayer next to one that is still
    /// finishing its block.
    pub async fn stop(&self) -> Result<()> {
        let mut guard = self.relayer.lock().await;
        let handle = guard.take().ok_or(Error::NotRunning)?;
        handle.stop().await
    }

    /// The submitter of the running relayer.
    pub async fn submitter(&self) -> Result<Arc<dyn DestinationSubmitter>> {
        let guard = self.relayer.lock().await;
        guard
            .as_ref()
            .and_then(RelayerHandle::submitter)
            .ok_or(Error::NotRunning)
    }

    /// Subscribes to the events of the current relayer.
    pub async fn subscribe(&self) -> Option<broadcast::Receiver<RelayEvent>> {
        self.relayer.lock().await.as_ref().map(RelayerHandle::subscribe)
    }

    /// Stops the relayer if there is one. Used on process shutdown.
    pub async fn shutdown(&self) -> Result<()> {
        match self.stop().await {
            Err(Error::NotRunning) => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use bridge_envelope::EnvelopeKey;
    use bridge_relayer_config::BridgeRelayerConfig;
    use bridge_relayer_store::{Checkpoint, CheckpointStore, InMemoryStore};
    use bridge_tx_extractor::{mock_bridge_tx, MarkerTag, MockBridgeTx};
    use tokio::sync::Notify;

    use super::*;

    /// Holds the first save until `release` is notified.
    #[derive(Debug, Clone)]
    struct GatedStore {
        inner: InMemoryStore,
        gated: Arc<AtomicBool>,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl GatedStore {
        fn new() -> Self {
            Self {
                inner: InMemoryStore::default(),
                gated: Arc::new(AtomicBool::new(true)),
                entered: Arc::new(Notify::new()),
                release: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CheckpointStore for GatedStore {
        async fn load(&self) -> Result<Checkpoint> {
            self.inner.load().await
        }

        async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
            if self.gated.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.save(checkpoint).await
        }
    }

    #[tokio::test]
    async fn start_waits_for_a_stopping_relayer() {
        let store = GatedStore::new();
        let mut config = BridgeRelayerConfig::default();
        config.relayer.polling_interval = 10;
        config.relayer.retry_delay = 10;
        config.source.min_confirmations = 0;
        let ctx = RelayerContext::new(config, store.clone()).unwrap();
        let controller = Arc::new(RelayerController::new(ctx));

        let tx = mock_bridge_tx(
            &MockBridgeTx::builder()
                .commitment("0xaa")
                .nullifier("0xbb")
                .proof("0x01")
                .amount(1.0)
                .recipient("R")
                .build(),
            &MarkerTag::default(),
            &EnvelopeKey::default(),
        )
        .unwrap();
        controller.context().simulated_chain().push_block(vec![tx]);
        controller.start(false).await.unwrap();

        // submitted, but the nullifier is not saved yet
        store.entered.notified().await;
        assert_eq!(controller.context().mocked_submitter().calls().len(), 1);

        let stop = tokio::spawn({
            let controller = controller.clone();
            async move { controller.stop().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let start = tokio::spawn({
            let controller = controller.clone();
            async move { controller.start(false).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!stop.is_finished());
        assert!(!start.is_finished());

        store.release.notify_one();
        stop.await.unwrap().unwrap();
        start.await.unwrap().unwrap();

        // give the new relayer a few ticks over the same block
        tokio::time::sleep(Duration::from_millis(100)).await;
        let calls = controller.context().mocked_submitter().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].nullifier, "0xbb");
        let cp = store.inner.snapshot().unwrap();
        assert!(cp.is_spent("0xbb"));
        assert_eq!(cp.last_processed_height, 1);
        assert!(controller.status().await.running);

        controller.shutdown().await.unwrap();
    }
}

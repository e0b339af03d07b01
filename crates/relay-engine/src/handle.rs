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

use bridge_relayer_store::Checkpoint;
use bridge_relayer_utils::{Error, Result};
use bridge_submitters::DestinationSubmitter;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::{RelayEvent, RelayState};

/// Controls a relayer spawned with [`crate::spawn`].
#[derive(Debug)]
pub struct RelayerHandle {
    pub(crate) state: watch::Receiver<RelayState>,
    pub(crate) checkpoint: watch::Receiver<Checkpoint>,
    pub(crate) submitter:
        watch::Receiver<Option<Arc<dyn DestinationSubmitter>>>,
    pub(crate) events: broadcast::Sender<RelayEvent>,
    pub(crate) stop: broadcast::Sender<()>,
    pub(crate) task: JoinHandle<()>,
}

impl RelayerHandle {
    /// The current lifecycle state.
    pub fn state(&self) -> RelayState {
        *self.state.borrow()
    }

    /// Whether the relayer task is still alive, including while it waits to
    /// retry a failed start.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Subscribes to the lifecycle events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// The last persisted checkpoint.
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint.borrow().clone()
    }

    /// The submitter of the running relayer, for direct submissions.
    ///
    /// Submissions made through it bypass the nullifier ledger.
    pub fn submitter(&self) -> Option<Arc<dyn DestinationSubmitter>> {
        self.submitter.borrow().clone()
    }

    /// Waits until a persisted checkpoint satisfies `f`.
    ///
    /// Fails with [`Error::NotRunning`] if the relayer stops first.
    pub async fn wait_for_checkpoint(
        &self,
        f: impl FnMut(&Checkpoint) -> bool,
    ) -> Result<Checkpoint> {
        let mut rx = self.checkpoint.clone();
        let checkpoint = rx.wait_for(f).await.map_err(|_| Error::NotRunning)?;
        Ok(checkpoint.clone())
    }

    /// Waits until the relayer enters `state`.
    pub async fn wait_for_state(&self, state: RelayState) -> Result<()> {
        let mut rx = self.state.clone();
        rx.wait_for(|s| *s == state)
            .await
            .map_err(|_| Error::NotRunning)?;
        Ok(())
    }

    /// Signals the relayer to stop and waits for its task to end.
    ///
    /// A block that is being processed is finished first.
    pub async fn stop(self) -> Result<()> {
        // no receiver left means the task already ended.
        let _ = self.stop.send(());
        self.task.await.map_err(|e| {
            tracing::error!(error = %e, "Relayer task stopped abnormally");
            Error::TaskStoppedAbnormally
        })
    }
}

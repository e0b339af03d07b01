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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bridge_relayer_utils::Error;
use parking_lot::RwLock;

use super::{Checkpoint, CheckpointStore};

/// InMemoryStore is a store that keeps the checkpoint in memory.
///
/// Clones share the same state, which lets a test keep a handle on the store
/// it gave to a relayer.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    checkpoint: Arc<RwLock<Option<Checkpoint>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore").finish()
    }
}

impl InMemoryStore {
    /// Creates a store that already holds `checkpoint`.
    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        let store = Self::default();
        *store.checkpoint.write() = Some(checkpoint);
        store
    }

    /// Makes every following save fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The last successfully saved checkpoint.
    pub fn snapshot(&self) -> Option<Checkpoint> {
        self.checkpoint.read().clone()
    }

    /// How many saves succeeded.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CheckpointStore for InMemoryStore {
    async fn load(&self) -> crate::Result<Checkpoint> {
        Ok(self.snapshot().unwrap_or_default())
    }

    #[tracing::instrument(skip_all, fields(height = checkpoint.last_processed_height))]
    async fn save(&self, checkpoint: &Checkpoint) -> crate::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence(
                "in-memory store is set to fail saves".into(),
            ));
        }
        *self.checkpoint.write() = Some(checkpoint.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

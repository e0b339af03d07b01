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

//! # Relayer Store Module 🕸️
//!
//! A module for managing the durable state of the relayer.
//!
//! ## Overview
//!
//! The relayer keeps exactly one piece of durable state: the [`Checkpoint`],
//! which records the last fully processed source chain height and the set of
//! nullifiers that were already relayed. Everything else is rebuilt from the
//! source chain on startup.
use std::collections::BTreeSet;
use std::fmt::Debug;

use bridge_relayer_utils::Result;
use serde::{Deserialize, Serialize};

/// A module for storing the checkpoint as a JSON file on disk.
pub mod file;
/// A module for managing in-memory storage of the relayer.
pub mod mem;

/// A store that keeps the checkpoint in a JSON file.
pub use file::JsonFileStore;
/// A store that uses in memory data structures as the backend.
pub use mem::InMemoryStore;

/// The default file name of the checkpoint, relative to the data directory.
pub const DEFAULT_CHECKPOINT_FILE: &str = "relayer_state.json";

/// Durable relay progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The last source chain height that was fully processed.
    #[serde(rename = "lastProcessedBlock", default)]
    pub last_processed_height: u64,
    /// Nullifiers of every bridge event that was verified and forwarded.
    #[serde(default)]
    pub nullifiers: BTreeSet<String>,
}

impl Checkpoint {
    /// Whether this nullifier was already relayed.
    pub fn is_spent(&self, nullifier: &str) -> bool {
        self.nullifiers.contains(nullifier)
    }

    /// Records a relayed nullifier, returns `false` if it was already there.
    pub fn spend(&mut self, nullifier: impl Into<String>) -> bool {
        self.nullifiers.insert(nullifier.into())
    }

    /// Moves the checkpoint forward to `height`.
    ///
    /// Heights never go backwards; a lower height is ignored.
    pub fn advance_to(&mut self, height: u64) {
        self.last_processed_height = self.last_processed_height.max(height);
    }

    /// The next height the relayer has to look at.
    pub fn next_height(&self) -> u64 {
        self.last_processed_height.saturating_add(1)
    }
}

/// CheckpointStore is a simple trait for loading and saving the relayer
/// [`Checkpoint`].
#[async_trait::async_trait]
pub trait CheckpointStore: Debug + Send + Sync + 'static {
    /// Loads the checkpoint.
    ///
    /// If nothing was saved yet, returns the genesis checkpoint (height 0, no
    /// nullifiers). State that exists but cannot be read is an error.
    async fn load(&self) -> Result<Checkpoint>;

    /// Saves the checkpoint, replacing the previous one atomically.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Throws away any saved progress.
    async fn reset(&self) -> Result<()> {
        tracing::warn!("Resetting the relayer checkpoint to genesis");
        self.save(&Checkpoint::default()).await
    }
}

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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_relayer_types::{Block, SourceTransaction};
use bridge_relayer_utils::{Error, Result};
use parking_lot::RwLock;

/// A source chain that lives in memory.
///
/// Clones share the same blocks, so a test can keep pushing blocks into a
/// chain the relayer is already scanning.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChain {
    blocks: Arc<RwLock<Vec<Block>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryChain {
    /// Creates an empty chain (tip at height 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a block holding `txs` and returns it.
    pub fn push_block(&self, txs: Vec<SourceTransaction>) -> Block {
        let mut blocks = self.blocks.write();
        let height = blocks.len() as u64 + 1;
        let block = Block {
            height,
            hash: Some(format!("{height:064x}")),
            tx: txs,
        };
        blocks.push(block.clone());
        block
    }

    /// Appends `n` blocks without transactions.
    pub fn push_empty_blocks(&self, n: usize) {
        for _ in 0..n {
            self.push_block(Vec::new());
        }
    }

    /// Makes every call fail like an unreachable node would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self, method: &str) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::ChainRpc {
                method: method.to_owned(),
                message: "in-memory chain is set to be unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl super::SourceChainClient for InMemoryChain {
    async fn current_height(&self) -> Result<u64> {
        self.ensure_available("getblockcount")?;
        Ok(self.blocks.read().len() as u64)
    }

    async fn block_at(&self, height: u64) -> Result<Block> {
        self.ensure_available("getblock")?;
        let blocks = self.blocks.read();
        height
            .checked_sub(1)
            .and_then(|i| blocks.get(i as usize))
            .cloned()
            .ok_or(Error::BlockNotFound(height))
    }
}

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

//! Source Chain Clients
//!
//! Read access to the source chain: the current tip and full blocks by
//! height. Heights start at 1.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use bridge_relayer_types::Block;
use bridge_relayer_utils::Result;

/// In-memory chain for simulations and tests
mod mem;
/// JSON-RPC node client
mod rpc;

pub use mem::InMemoryChain;
pub use rpc::JsonRpcChainClient;

/// A trait for reading the source chain.
#[async_trait::async_trait]
pub trait SourceChainClient: std::fmt::Debug + Send + Sync {
    /// The height of the current chain tip.
    async fn current_height(&self) -> Result<u64>;

    /// The block at `height`, with its full transactions.
    async fn block_at(&self, height: u64) -> Result<Block>;
}

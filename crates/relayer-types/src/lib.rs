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

//! Types shared between the bridge relayer crates.

/// Bridge events, envelopes and destination payloads.
pub mod bridge;
/// Block and transaction shapes returned by the source chain.
pub mod chain;
pub mod rpc_url;
/// Secret strings that can be read from the environment.
pub mod secret;

pub use bridge::{
    BridgeEvent, DecodedBridgeEvent, EnvelopePlaintext, SubmissionPayload,
    SubmissionReceipt,
};
pub use chain::{Block, ScriptPubKey, SourceTransaction, TxOutput};
pub use rpc_url::RpcUrl;
pub use secret::SecretString;

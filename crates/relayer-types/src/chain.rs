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

use serde::{Deserialize, Serialize};

/// A source chain block with its full transactions, as returned by
/// `getblock <hash> 2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// The height of this block.
    pub height: u64,
    /// The block hash, if the source knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Transactions in the order the node returned them.
    #[serde(default)]
    pub tx: Vec<SourceTransaction>,
}

/// A decoded source chain transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTransaction {
    /// The transaction id.
    pub txid: String,
    /// Transaction outputs.
    #[serde(default)]
    pub vout: Vec<TxOutput>,
}

/// A single transaction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Output value in coins, zero for data carrier outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Output index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// The locking script.
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: Option<ScriptPubKey>,
}

/// The locking script of an output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScriptPubKey {
    /// Human readable script assembly, e.g. `OP_RETURN 6869`.
    #[serde(default)]
    pub asm: String,
    /// Raw script hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
}

impl TxOutput {
    /// Creates an output that only carries a script assembly.
    pub fn with_asm(asm: impl Into<String>) -> Self {
        Self {
            value: None,
            n: None,
            script_pub_key: Some(ScriptPubKey {
                asm: asm.into(),
                hex: None,
            }),
        }
    }

    /// The script assembly of this output, if there is one.
    pub fn asm(&self) -> Option<&str> {
        self.script_pub_key
            .as_ref()
            .map(|s| s.asm.as_str())
            .filter(|asm| !asm.is_empty())
    }
}

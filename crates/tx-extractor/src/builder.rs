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

use std::sync::atomic::{AtomicU64, Ordering};

use bridge_envelope::EnvelopeKey;
use bridge_relayer_types::{EnvelopePlaintext, SourceTransaction, TxOutput};
use bridge_relayer_utils::Result;
use typed_builder::TypedBuilder;

use crate::MarkerTag;

static MOCK_TX_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_mock_txid() -> String {
    format!("mock-tx-{}", MOCK_TX_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Builds the output script of a bridge transaction.
pub fn build_bridge_script(
    marker: &MarkerTag,
    commitment: &str,
    nullifier: &str,
    proof: &str,
    envelope: &str,
) -> String {
    let payload = [commitment, nullifier, proof, envelope].join("|");
    format!("{marker} {}", hex::encode(payload))
}

/// A simulated bridge transfer.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MockBridgeTx {
    /// The transaction id, generated when not given.
    #[builder(default = next_mock_txid(), setter(into))]
    pub txid: String,
    /// Commitment field of the payload.
    #[builder(setter(into))]
    pub commitment: String,
    /// Nullifier field of the payload.
    #[builder(setter(into))]
    pub nullifier: String,
    /// Proof field of the payload.
    #[builder(setter(into))]
    pub proof: String,
    /// Amount sealed in the envelope.
    #[builder(default)]
    pub amount: f64,
    /// A `0x` hex public key of at least 33 bytes selects a recipient keyed
    /// envelope; anything else is sealed with the shared key.
    #[builder(default, setter(into))]
    pub recipient: String,
}

impl MockBridgeTx {
    fn recipient_is_public_key(&self) -> bool {
        self.recipient.starts_with("0x") && self.recipient.len() >= 66
    }
}

/// Builds a source transaction carrying `mock` as a bridge output.
pub fn mock_bridge_tx(
    mock: &MockBridgeTx,
    marker: &MarkerTag,
    key: &EnvelopeKey,
) -> Result<SourceTransaction> {
    let plaintext = EnvelopePlaintext::new(mock.amount, mock.recipient.clone());
    let envelope = if mock.recipient_is_public_key() {
        bridge_envelope::encrypt_for_recipient(&plaintext, &mock.recipient)?
    } else {
        bridge_envelope::encrypt(&plaintext, key)?
    };
    let asm = build_bridge_script(
        marker,
        &mock.commitment,
        &mock.nullifier,
        &mock.proof,
        &envelope,
    );
    Ok(SourceTransaction {
        txid: mock.txid.clone(),
        vout: vec![TxOutput::with_asm(asm)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_hides_amount_and_recipient() {
        let tx = mock_bridge_tx(
            &MockBridgeTx::builder()
                .commitment("0x1")
                .nullifier("0x2")
                .proof("0x3")
                .amount(42.0)
                .recipient("miden1qmockrecipient")
                .build(),
            &MarkerTag::default(),
            &EnvelopeKey::default(),
        )
        .unwrap();
        assert!(tx.txid.starts_with("mock-tx-"));

        let asm = tx.vout[0].asm().unwrap();
        assert!(asm.starts_with("OP_RETURN BRIDGE "));
        let hex = asm.split_whitespace().skip(2).collect::<String>();
        let decoded = String::from_utf8(hex::decode(hex).unwrap()).unwrap();
        let fields: Vec<_> = decoded.split('|').collect();
        assert_eq!(&fields[..3], &["0x1", "0x2", "0x3"]);
        assert!(!decoded.contains("miden1qmockrecipient"));
    }

    #[test]
    fn generated_txids_are_unique() {
        let a = MockBridgeTx::builder()
            .commitment("0x1")
            .nullifier("0x2")
            .proof("0x3")
            .build();
        let b = MockBridgeTx::builder()
            .commitment("0x1")
            .nullifier("0x2")
            .proof("0x3")
            .build();
        assert_ne!(a.txid, b.txid);
    }
}

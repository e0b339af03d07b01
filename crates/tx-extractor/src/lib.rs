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

//! # Bridge Transaction Extractor
//!
//! A bridge transaction carries an output whose script assembly looks like
//!
//! ```text
//! OP_RETURN BRIDGE <hex>
//! ```
//!
//! where `<hex>` decodes to the UTF-8 string
//! `commitment|nullifier|proof|envelope`. The envelope is opened with the
//! relayer [`EnvelopeKeys`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

use bridge_envelope::EnvelopeKeys;
use bridge_relayer_types::{BridgeEvent, DecodedBridgeEvent, SourceTransaction};

mod builder;
mod marker;

pub use builder::{build_bridge_script, mock_bridge_tx, MockBridgeTx};
pub use marker::{MarkerTag, DEFAULT_MARKER_TAG};

/// Why a bridge transaction could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The payload after the marker is not valid hex.
    #[error("payload is not valid hex")]
    InvalidHex,
    /// The decoded payload is not UTF-8.
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,
    /// The payload does not have exactly four `|` separated fields.
    #[error("payload has {} fields, expected 4", _0)]
    FieldCount(usize),
    /// A required field is empty.
    #[error("`{}` is empty", _0)]
    EmptyField(&'static str),
    /// A field that must be `0x` prefixed hex is not.
    #[error("`{}` is not 0x-prefixed hex", _0)]
    NotHex(&'static str),
    /// A field that must start with `0x` does not.
    #[error("`{}` is not 0x-prefixed", _0)]
    MissingPrefix(&'static str),
    /// The envelope did not open with the configured keys.
    #[error("envelope could not be decrypted")]
    UnreadableEnvelope,
}

/// The result of looking at a single source transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// No output carries the bridge marker.
    NotBridge,
    /// The transaction carries the marker but its payload is unusable.
    Malformed(ExtractError),
    /// A fully decoded bridge event.
    Bridge(DecodedBridgeEvent),
}

/// Looks for a bridge event in `tx`, found in the block at `height`.
///
/// The first output carrying `marker` decides the outcome; later outputs are
/// not looked at.
pub fn extract(
    tx: &SourceTransaction,
    height: u64,
    marker: &MarkerTag,
    keys: &EnvelopeKeys,
) -> Extraction {
    let Some(payload) = tx
        .vout
        .iter()
        .filter_map(|out| out.asm())
        .find_map(|asm| marker.strip(asm))
    else {
        return Extraction::NotBridge;
    };

    match decode(tx, height, &payload, keys) {
        Ok(event) => Extraction::Bridge(event),
        Err(e) => Extraction::Malformed(e),
    }
}

fn decode(
    tx: &SourceTransaction,
    height: u64,
    payload: &[&str],
    keys: &EnvelopeKeys,
) -> Result<DecodedBridgeEvent, ExtractError> {
    let bytes =
        hex::decode(payload.concat()).map_err(|_| ExtractError::InvalidHex)?;
    let text = String::from_utf8(bytes).map_err(|_| ExtractError::InvalidUtf8)?;
    let fields: Vec<&str> = text.split('|').collect();
    let [commitment, nullifier, proof, envelope] = fields[..] else {
        return Err(ExtractError::FieldCount(fields.len()));
    };

    ensure_hex_id("commitment", commitment)?;
    ensure_hex_id("nullifier", nullifier)?;
    // the proof is opaque to us, the verifier decides what it means
    if proof.is_empty() {
        return Err(ExtractError::EmptyField("proof"));
    }
    if !proof.starts_with("0x") {
        return Err(ExtractError::MissingPrefix("proof"));
    }
    if envelope.is_empty() {
        return Err(ExtractError::EmptyField("envelope"));
    }

    let plaintext = bridge_envelope::decrypt(envelope, keys)
        .ok_or(ExtractError::UnreadableEnvelope)?;

    Ok(DecodedBridgeEvent {
        event: BridgeEvent {
            txid: tx.txid.clone(),
            height,
            commitment: commitment.to_owned(),
            nullifier: nullifier.to_owned(),
            proof: proof.to_owned(),
            envelope: envelope.to_owned(),
        },
        plaintext,
    })
}

fn ensure_hex_id(name: &'static str, value: &str) -> Result<(), ExtractError> {
    if value.is_empty() {
        return Err(ExtractError::EmptyField(name));
    }
    match value.strip_prefix("0x") {
        Some(digits)
            if !digits.is_empty()
                && digits.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Ok(())
        }
        _ => Err(ExtractError::NotHex(name)),
    }
}

#[cfg(test)]
mod tests {
    use bridge_envelope::{EnvelopeKey, RecipientSecret};
    use bridge_relayer_types::{EnvelopePlaintext, TxOutput};

    use super::*;

    fn tx_with_asm(asm: &str) -> SourceTransaction {
        SourceTransaction {
            txid: "t1".into(),
            vout: vec![TxOutput::with_asm("OP_DUP OP_HASH160"), TxOutput::with_asm(asm)],
        }
    }

    fn encode(payload: &str) -> String {
        format!("{DEFAULT_MARKER_TAG} {}", hex::encode(payload))
    }

    #[test]
    fn plain_transfer_is_not_a_bridge_tx() {
        let keys = EnvelopeKeys::default();
        let tx = tx_with_asm("OP_RETURN 68656c6c6f");
        assert_eq!(extract(&tx, 1, &MarkerTag::default(), &keys), Extraction::NotBridge);
        let empty = SourceTransaction { txid: "t2".into(), vout: vec![] };
        assert_eq!(extract(&empty, 1, &MarkerTag::default(), &keys), Extraction::NotBridge);
    }

    #[test]
    fn decodes_a_well_formed_bridge_tx() {
        let keys = EnvelopeKeys::default();
        let tx = mock_bridge_tx(
            &MockBridgeTx::builder()
                .txid("t1")
                .commitment("0xaa")
                .nullifier("0xbb")
                .proof("0xproof")
                .amount(42.0)
                .recipient("R")
                .build(),
            &MarkerTag::default(),
            &keys.symmetric,
        )
        .unwrap();
        let Extraction::Bridge(decoded) = extract(&tx, 3, &MarkerTag::default(), &keys)
        else {
            panic!("expected a bridge event");
        };
        assert_eq!(decoded.event.txid, "t1");
        assert_eq!(decoded.event.height, 3);
        assert_eq!(decoded.event.commitment, "0xaa");
        assert_eq!(decoded.event.nullifier, "0xbb");
        assert_eq!(decoded.event.proof, "0xproof");
        assert_eq!(decoded.plaintext, EnvelopePlaintext::new(42.0, "R"));
    }

    #[test]
    fn hex_may_be_split_over_several_tokens() {
        let keys = EnvelopeKeys::default();
        let envelope =
            bridge_envelope::encrypt(&EnvelopePlaintext::new(1.0, "R"), &keys.symmetric)
                .unwrap();
        let hex = hex::encode(format!("0xaa|0xbb|0x01|{envelope}"));
        let (a, b) = hex.split_at(10);
        let tx = tx_with_asm(&format!("OP_RETURN BRIDGE {a} {b}"));
        assert!(matches!(
            extract(&tx, 1, &MarkerTag::default(), &keys),
            Extraction::Bridge(_)
        ));
    }

    #[test]
    fn proof_is_not_required_to_be_hex() {
        let keys = EnvelopeKeys::default();
        let envelope =
            bridge_envelope::encrypt(&EnvelopePlaintext::new(1.0, "R"), &keys.symmetric)
                .unwrap();
        for proof in ["0x", "0xproof", "0x01zz"] {
            let tx = tx_with_asm(&encode(&format!("0xaa|0xbb|{proof}|{envelope}")));
            let Extraction::Bridge(decoded) =
                extract(&tx, 1, &MarkerTag::default(), &keys)
            else {
                panic!("expected a bridge event for proof {proof}");
            };
            assert_eq!(decoded.event.proof, proof);
        }
    }

    #[test]
    fn malformed_payloads() {
        let keys = EnvelopeKeys::default();
        let marker = MarkerTag::default();
        let cases = [
            (format!("{DEFAULT_MARKER_TAG} zz"), ExtractError::InvalidHex),
            (format!("{DEFAULT_MARKER_TAG} ff"), ExtractError::InvalidUtf8),
            (encode("0xaa|0xbb|0x01"), ExtractError::FieldCount(3)),
            (encode("0xaa|0xbb|0x01|e|extra"), ExtractError::FieldCount(5)),
            (encode("|0xbb|0x01|e"), ExtractError::EmptyField("commitment")),
            (encode("0xaa|bb|0x01|e"), ExtractError::NotHex("nullifier")),
            (encode("0xaa|0xbb||e"), ExtractError::EmptyField("proof")),
            (encode("0xaa|0xbb|proof|e"), ExtractError::MissingPrefix("proof")),
            (encode("0xaa|0xbb|0x01|"), ExtractError::EmptyField("envelope")),
            (encode("0xaa|0xbb|0x01|bm9wZQ=="), ExtractError::UnreadableEnvelope),
            (DEFAULT_MARKER_TAG.to_string(), ExtractError::FieldCount(1)),
        ];
        for (asm, expected) in cases {
            assert_eq!(
                extract(&tx_with_asm(&asm), 1, &marker, &keys),
                Extraction::Malformed(expected),
                "{asm}"
            );
        }
    }

    #[test]
    fn envelope_under_another_key_is_malformed() {
        let sender = EnvelopeKey::from_secret("sender only");
        let tx = mock_bridge_tx(
            &MockBridgeTx::builder()
                .commitment("0xaa")
                .nullifier("0xbb")
                .proof("0x01")
                .amount(5.0)
                .recipient("R")
                .build(),
            &MarkerTag::default(),
            &sender,
        )
        .unwrap();
        assert_eq!(
            extract(&tx, 1, &MarkerTag::default(), &EnvelopeKeys::default()),
            Extraction::Malformed(ExtractError::UnreadableEnvelope)
        );
    }

    #[test]
    fn recipient_keyed_envelope_needs_the_recipient_secret() {
        let secret = RecipientSecret::random();
        let tx = mock_bridge_tx(
            &MockBridgeTx::builder()
                .commitment("0xaa")
                .nullifier("0xbb")
                .proof("0x01")
                .amount(99.0)
                .recipient(secret.public_key_hex())
                .build(),
            &MarkerTag::default(),
            &EnvelopeKey::default(),
        )
        .unwrap();

        let without = EnvelopeKeys::default();
        assert_eq!(
            extract(&tx, 1, &MarkerTag::default(), &without),
            Extraction::Malformed(ExtractError::UnreadableEnvelope)
        );

        let with = EnvelopeKeys::default().with_recipient(secret);
        let Extraction::Bridge(decoded) = extract(&tx, 1, &MarkerTag::default(), &with)
        else {
            panic!("expected a bridge event");
        };
        assert_eq!(decoded.plaintext.amount, 99.0);
    }
}

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

/// A bridge intent found in a source chain transaction, before its envelope
/// is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeEvent {
    /// The source transaction carrying this event.
    pub txid: String,
    /// Height of the block containing the transaction.
    pub height: u64,
    /// Binds the event to cryptographic state on the source side.
    pub commitment: String,
    /// Unique identifier of the event, used for replay prevention.
    pub nullifier: String,
    /// Opaque proof, only meaningful to the verifier.
    pub proof: String,
    /// Encoded envelope ciphertext.
    pub envelope: String,
}

/// The decrypted content of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePlaintext {
    /// Amount transferred, never negative.
    ///
    /// Accepts a JSON number or a numeric string; a missing amount is zero.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    /// Destination recipient; `None` when the envelope carried an empty one.
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        serialize_with = "none_as_empty_string"
    )]
    pub recipient: Option<String>,
}

impl EnvelopePlaintext {
    /// Creates a new plaintext.
    pub fn new(amount: f64, recipient: impl Into<String>) -> Self {
        let recipient = recipient.into();
        Self {
            amount,
            recipient: (!recipient.is_empty()).then_some(recipient),
        }
    }

    /// A plaintext is well formed if the amount is a finite, non-negative number.
    pub fn is_well_formed(&self) -> bool {
        self.amount.is_finite() && self.amount >= 0.0
    }
}

/// A bridge event whose envelope was opened successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBridgeEvent {
    /// The raw event.
    pub event: BridgeEvent,
    /// The opened envelope.
    pub plaintext: EnvelopePlaintext,
}

impl DecodedBridgeEvent {
    /// Builds the payload that is forwarded to the destination.
    pub fn submission_payload(&self) -> SubmissionPayload {
        SubmissionPayload {
            commitment: self.event.commitment.clone(),
            nullifier: self.event.nullifier.clone(),
            proof: self.event.proof.clone(),
            amount: self.plaintext.amount,
            recipient: self.plaintext.recipient.clone(),
        }
    }
}

/// What a destination submitter receives for a verified bridge event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    /// Commitment of the event.
    pub commitment: String,
    /// Nullifier of the event.
    pub nullifier: String,
    /// Proof of the event.
    #[serde(default)]
    pub proof: String,
    /// Decrypted amount.
    #[serde(default)]
    pub amount: f64,
    /// Decrypted recipient.
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Whatever the destination answered for an accepted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionReceipt(pub serde_json::Value);

impl SubmissionReceipt {
    /// The destination transaction id, when the receipt carries one.
    pub fn txid(&self) -> Option<&str> {
        self.0
            .get("txid")
            .or_else(|| self.0.get("tx"))
            .and_then(serde_json::Value::as_str)
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Amount::deserialize(deserializer)? {
        Amount::Number(n) => Ok(n),
        Amount::Text(s) => s.trim().parse::<f64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid amount `{s}`: {e}"))
        }),
    }
}

fn empty_string_as_none<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn none_as_empty_string<S>(
    value: &Option<String>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

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

use base64::engine::general_purpose;
use base64::Engine;
use bridge_relayer_types::EnvelopePlaintext;
use bridge_relayer_utils::{Error, Result};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{AffinePoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{symmetric, ASYMMETRIC_PREFIX};

#[derive(Serialize, Deserialize)]
struct Body {
    /// Hex encoded SEC1 ephemeral public key.
    epk: String,
    /// Base64 symmetric packing under the derived key.
    data: String,
}

/// The secp256k1 secret key of an envelope recipient.
#[derive(Clone)]
pub struct RecipientSecret(SecretKey);

impl RecipientSecret {
    /// Parses a hex encoded (optionally `0x` prefixed) 32 byte secret key.
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = hex::decode(strip_0x(value.trim()))?;
        SecretKey::from_slice(&bytes)
            .map(Self)
            .map_err(|_| Error::Generic("invalid envelope private key"))
    }

    /// Generates a fresh recipient key.
    pub fn random() -> Self {
        Self(SecretKey::random(&mut OsRng))
    }

    /// The compressed SEC1 public key, hex encoded with a `0x` prefix.
    pub fn public_key_hex(&self) -> String {
        let point = self.0.public_key().to_encoded_point(true);
        format!("0x{}", hex::encode(point.as_bytes()))
    }
}

impl std::fmt::Debug for RecipientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RecipientSecret")
            .field(&self.public_key_hex())
            .finish()
    }
}

/// Encrypts `plaintext` so that only the owner of `recipient_public_key`
/// (hex SEC1, compressed or not) can open it.
pub fn encrypt_for_recipient(
    plaintext: &EnvelopePlaintext,
    recipient_public_key: &str,
) -> Result<String> {
    let recipient = parse_public_key(recipient_public_key)?;
    let ephemeral = SecretKey::random(&mut OsRng);
    let key = shared_key(&ephemeral, &recipient);

    let packed = symmetric::seal(serde_json::to_vec(plaintext)?.as_slice(), &key)?;
    let body = Body {
        epk: hex::encode(ephemeral.public_key().to_encoded_point(true).as_bytes()),
        data: general_purpose::STANDARD.encode(packed),
    };
    let body = serde_json::to_vec(&body)?;
    Ok(format!(
        "{ASYMMETRIC_PREFIX}{}",
        general_purpose::STANDARD.encode(body)
    ))
}

pub(crate) fn open(
    body: &str,
    secret: &RecipientSecret,
) -> Option<EnvelopePlaintext> {
    let raw = general_purpose::STANDARD.decode(body.trim()).ok()?;
    let body: Body = serde_json::from_slice(&raw).ok()?;
    let epk = parse_public_key(&body.epk).ok()?;
    let key = shared_key(&secret.0, &epk);
    let packed = general_purpose::STANDARD.decode(body.data).ok()?;
    let bytes = symmetric::unseal(&packed, &key)?;
    serde_json::from_slice(&bytes).ok()
}

/// SHA-256 of the compressed shared point.
fn shared_key(secret: &SecretKey, public: &PublicKey) -> [u8; 32] {
    let shared =
        AffinePoint::from(public.to_projective() * *secret.to_nonzero_scalar());
    Sha256::digest(shared.to_encoded_point(true).as_bytes()).into()
}

fn parse_public_key(value: &str) -> Result<PublicKey> {
    let bytes = hex::decode(strip_0x(value.trim()))
        .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| Error::InvalidPublicKey(value.to_string()))
}

fn strip_0x(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

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

//! # Bridge Envelopes
//!
//! The amount and recipient of a bridge transfer travel inside an encrypted
//! envelope. Two flavours exist:
//!
//! * **symmetric**: AES-256-GCM under a key shared between the sender and the
//!   relayer, encoded as `base64(nonce || tag || ciphertext)`.
//! * **recipient keyed**: the sender does an ECDH on secp256k1 between a fresh
//!   ephemeral key and the recipient public key, and uses the hashed shared
//!   point as the AES key. Encoded as `EC:` followed by
//!   `base64({"epk": <hex>, "data": <symmetric packing>})`.
//!
//! Decryption never fails loudly: anything that does not open cleanly into a
//! well formed [`EnvelopePlaintext`] yields `None`.

use bridge_relayer_types::EnvelopePlaintext;
use sha2::{Digest, Sha256};

mod asymmetric;
mod symmetric;

pub use asymmetric::{encrypt_for_recipient, RecipientSecret};
pub use symmetric::encrypt;

/// Prefix of recipient keyed envelopes.
pub const ASYMMETRIC_PREFIX: &str = "EC:";

/// The key used when nothing is configured. Only fit for local simulations.
pub const DEFAULT_ENVELOPE_KEY: &str = "0123456789abcdef0123456789abcdef";

/// A 256-bit symmetric envelope key.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey([u8; 32]);

impl EnvelopeKey {
    /// Derives the key from a configured secret.
    ///
    /// A secret of exactly 32 bytes is used as is, anything else is hashed
    /// with SHA-256.
    pub fn from_secret(secret: &str) -> Self {
        let bytes = secret.as_bytes();
        match <[u8; 32]>::try_from(bytes) {
            Ok(key) => Self(key),
            Err(_) => Self(Sha256::digest(bytes).into()),
        }
    }

    /// Wraps raw key bytes.
    pub const fn from_bytes(key: [u8; 32]) -> Self {
        Self(key)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the well known development key.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for EnvelopeKey {
    fn default() -> Self {
        Self::from_secret(DEFAULT_ENVELOPE_KEY)
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EnvelopeKey").finish()
    }
}

/// Everything the relayer may use to open envelopes.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeKeys {
    /// The shared symmetric key.
    pub symmetric: EnvelopeKey,
    /// The recipient secret key for `EC:` envelopes, if the relayer has one.
    pub recipient: Option<RecipientSecret>,
}

impl EnvelopeKeys {
    /// Keys that can only open symmetric envelopes.
    pub fn symmetric(key: EnvelopeKey) -> Self {
        Self {
            symmetric: key,
            recipient: None,
        }
    }

    /// Adds a recipient secret key.
    pub fn with_recipient(mut self, recipient: RecipientSecret) -> Self {
        self.recipient = Some(recipient);
        self
    }
}

/// Opens an envelope of either flavour.
pub fn decrypt(envelope: &str, keys: &EnvelopeKeys) -> Option<EnvelopePlaintext> {
    let plaintext = match envelope.strip_prefix(ASYMMETRIC_PREFIX) {
        Some(body) => {
            let Some(secret) = keys.recipient.as_ref() else {
                tracing::debug!(
                    "Recipient keyed envelope but no recipient key configured"
                );
                return None;
            };
            asymmetric::open(body, secret)?
        }
        None => symmetric::open(envelope, &keys.symmetric)?,
    };
    plaintext.is_well_formed().then_some(plaintext)
}

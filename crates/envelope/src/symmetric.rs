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

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose;
use base64::Engine;
use bridge_relayer_types::EnvelopePlaintext;
use bridge_relayer_utils::{Error, Result};

use crate::EnvelopeKey;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encrypts `plaintext` under the shared key.
pub fn encrypt(plaintext: &EnvelopePlaintext, key: &EnvelopeKey) -> Result<String> {
    let packed = seal(serde_json::to_vec(plaintext)?.as_slice(), key.as_bytes())?;
    Ok(general_purpose::STANDARD.encode(packed))
}

pub(crate) fn open(envelope: &str, key: &EnvelopeKey) -> Option<EnvelopePlaintext> {
    let packed = general_purpose::STANDARD.decode(envelope.trim()).ok()?;
    let bytes = unseal(&packed, key.as_bytes())?;
    serde_json::from_slice(&bytes).ok()
}

/// AES-256-GCM with a random nonce, packed as `nonce || tag || ciphertext`.
pub(crate) fn seal(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>> {
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| Error::EnvelopeEncryption)?;
    let nonce: [u8; NONCE_LEN] = rand::random();
    // aes-gcm appends the tag to the ciphertext.
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| Error::EnvelopeEncryption)?;
    let (ct, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut packed = Vec::with_capacity(NONCE_LEN + sealed.len());
    packed.extend_from_slice(&nonce);
    packed.extend_from_slice(tag);
    packed.extend_from_slice(ct);
    Ok(packed)
}

pub(crate) fn unseal(packed: &[u8], key: &[u8; 32]) -> Option<Vec<u8>> {
    if packed.len() < NONCE_LEN + TAG_LEN {
        return None;
    }
    let (nonce, rest) = packed.split_at(NONCE_LEN);
    let (tag, ct) = rest.split_at(TAG_LEN);

    let mut sealed = Vec::with_capacity(rest.len());
    sealed.extend_from_slice(ct);
    sealed.extend_from_slice(tag);

    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    cipher.decrypt(Nonce::from_slice(nonce), sealed.as_slice()).ok()
}

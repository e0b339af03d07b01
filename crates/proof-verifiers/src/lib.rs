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

//! Proof Verifier Backends
//!
//! The relayer never checks a bridge proof itself, it asks a verifier.
//!
//! As of now, the following backends are supported:
//! - [`RemoteProofVerifier`]: a verifier service reachable over HTTP.
//! - [`LocalStubVerifier`]: a prefix check, only fit for simulations.
//!
//! ## Usage
//! ```rust,ignore
//! use bridge_proof_verifiers::{ProofVerifier, RemoteProofVerifier};
//! let verifier = RemoteProofVerifier::new(url, Duration::from_secs(10))?;
//! let ok = verifier.verify("0xaa", "0xbb", "0x01").await;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Local stub backend
mod local;
/// Remote HTTP backend
mod remote;

pub use local::{LocalStubVerifier, STUB_PROOF_PREFIX};
pub use remote::RemoteProofVerifier;

/// A trait for a proof verification backend.
///
/// Verification is fail-closed: a verifier that cannot reach a verdict
/// answers `false`.
#[async_trait::async_trait]
pub trait ProofVerifier: std::fmt::Debug + Send + Sync {
    /// Checks `proof` for the given commitment and nullifier.
    async fn verify(&self, commitment: &str, nullifier: &str, proof: &str)
        -> bool;

    /// Whether this verifier gives real cryptographic guarantees.
    fn is_production_grade(&self) -> bool {
        true
    }
}

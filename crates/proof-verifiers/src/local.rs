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

/// The prefix every proof accepted by the stub has to start with.
pub const STUB_PROOF_PREFIX: &str = "0x";

/// A stub verifier that accepts any proof starting with `0x`.
///
/// It does not verify anything and must never run against real funds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStubVerifier;

impl LocalStubVerifier {
    /// Creates a new stub verifier
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl super::ProofVerifier for LocalStubVerifier {
    async fn verify(
        &self,
        _commitment: &str,
        nullifier: &str,
        proof: &str,
    ) -> bool {
        let accepted = proof.starts_with(STUB_PROOF_PREFIX);
        if accepted {
            tracing::warn!(
                %nullifier,
                "Stub verifier ACCEPTED a proof without verifying it"
            );
        }
        accepted
    }

    fn is_production_grade(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::ProofVerifier;

    use super::*;

    #[tokio::test]
    async fn accepts_only_prefixed_proofs() {
        let v = LocalStubVerifier::new();
        assert!(v.verify("0xaa", "0xbb", "0x01").await);
        assert!(v.verify("0xaa", "0xbb", "0x").await);
        assert!(!v.verify("0xaa", "0xbb", "").await);
        assert!(!v.verify("0xaa", "0xbb", "deadbeef").await);
        assert!(!v.is_production_grade());
    }
}

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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bridge_relayer_types::{SubmissionPayload, SubmissionReceipt};
use bridge_relayer_utils::{Error, Result};
use parking_lot::RwLock;

/// A submitter that keeps every payload it gets.
///
/// Clones share the recorded calls.
#[derive(Debug, Clone, Default)]
pub struct MockedSubmitter {
    calls: Arc<RwLock<Vec<SubmissionPayload>>>,
    failing: Arc<AtomicBool>,
}

impl MockedSubmitter {
    /// Creates a new mocked submitter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mocked submitter that refuses every submission.
    #[must_use]
    pub fn failing() -> Self {
        let this = Self::default();
        this.set_failing(true);
        this
    }

    /// Makes the following submissions fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every payload submitted so far, failed ones included.
    pub fn calls(&self) -> Vec<SubmissionPayload> {
        self.calls.read().clone()
    }
}

#[async_trait::async_trait]
impl super::DestinationSubmitter for MockedSubmitter {
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt> {
        let n = {
            let mut calls = self.calls.write();
            calls.push(payload.clone());
            calls.len()
        };
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Submission {
                status: 503,
                body: "mocked submitter is set to fail".into(),
            });
        }
        tracing::debug!(nullifier = %payload.nullifier, "Mocked submission #{n}");
        Ok(SubmissionReceipt(serde_json::json!({
            "success": true,
            "txid": format!("mock_{n}"),
        })))
    }
}

#[cfg(test)]
mod tests {
    use crate::DestinationSubmitter;

    use super::*;

    fn payload(nullifier: &str) -> SubmissionPayload {
        SubmissionPayload {
            commitment: "0xaa".into(),
            nullifier: nullifier.into(),
            proof: "0x01".into(),
            amount: 1.0,
            recipient: None,
        }
    }

    #[tokio::test]
    async fn records_calls_and_numbers_receipts() {
        let s = MockedSubmitter::new();
        let handle = s.clone();
        let r1 = s.submit(&payload("0x01")).await.unwrap();
        let r2 = s.submit(&payload("0x02")).await.unwrap();
        assert_eq!(r1.txid(), Some("mock_1"));
        assert_eq!(r2.txid(), Some("mock_2"));
        let calls = handle.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].nullifier, "0x02");
    }

    #[tokio::test]
    async fn failing_mode() {
        let s = MockedSubmitter::failing();
        assert!(s.submit(&payload("0x01")).await.is_err());
        assert_eq!(s.calls().len(), 1);
        s.set_failing(false);
        assert!(s.submit(&payload("0x01")).await.is_ok());
    }
}

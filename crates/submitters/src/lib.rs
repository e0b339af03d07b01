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

//! Destination Submitter Backends
//!
//! A submitter forwards a verified bridge event to the destination ledger.
//!
//! - [`HttpSubmitter`]: `POST <node>/bridge/submit` on a destination node.
//! - [`MockedSubmitter`]: records payloads, for simulations and tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use bridge_relayer_types::{SubmissionPayload, SubmissionReceipt};
use bridge_relayer_utils::Result;

/// HTTP backend
mod http;
/// Mocked backend
mod mocked;

pub use http::HttpSubmitter;
pub use mocked::MockedSubmitter;

/// A trait for a destination submission backend.
#[async_trait::async_trait]
pub trait DestinationSubmitter: std::fmt::Debug + Send + Sync {
    /// Submits a verified bridge event to the destination.
    ///
    /// An `Ok` means the destination accepted it.
    async fn submit(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt>;
}

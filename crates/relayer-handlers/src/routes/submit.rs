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

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use bridge_relayer_types::{SubmissionPayload, SubmissionReceipt};
use bridge_relayer_utils::HandlerError;
use serde::{Deserialize, Serialize};

use crate::controller::RelayerController;

/// Body of `POST /submit-proof`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitProofRequest {
    commitment: Option<String>,
    nullifier: Option<String>,
    #[serde(default)]
    proof: String,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    recipient: Option<String>,
}

impl SubmitProofRequest {
    fn into_payload(self) -> Option<SubmissionPayload> {
        let commitment = self.commitment.filter(|c| !c.is_empty())?;
        let nullifier = self.nullifier.filter(|n| !n.is_empty())?;
        Some(SubmissionPayload {
            commitment,
            nullifier,
            proof: self.proof,
            amount: self.amount,
            recipient: self.recipient.filter(|r| !r.is_empty()),
        })
    }
}

/// Answer of `POST /submit-proof`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitProofResponse {
    success: bool,
    result: SubmissionReceipt,
}

/// Handler for `POST /submit-proof`
///
/// Forwards a payload straight to the submitter of the running relayer. The
/// nullifier ledger is not consulted nor updated.
pub async fn handle_submit_proof(
    State(controller): State<Arc<RelayerController>>,
    body: Result<Json<SubmitProofRequest>, JsonRejection>,
) -> Result<Json<SubmitProofResponse>, HandlerError> {
    let submitter = controller.submitter().await?;
    let invalid = || {
        HandlerError(StatusCode::BAD_REQUEST, "invalid payload".to_string())
    };
    let Json(request) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected submit-proof body");
        invalid()
    })?;
    let payload = request.into_payload().ok_or_else(invalid)?;

    let receipt = submitter.submit(&payload).await.map_err(|e| {
        tracing::error!(nullifier = %payload.nullifier, error = %e, "Direct submission failed");
        HandlerError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    tracing::info!(nullifier = %payload.nullifier, "Direct submission accepted");
    Ok(Json(SubmitProofResponse {
        success: true,
        result: receipt,
    }))
}
